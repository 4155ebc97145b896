//! Subcommand implementations and the plumbing they share.

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use client::{ApiClient, FileTokenBackend, Session, TokenStore};
use serde::Serialize;
use shared::{
    config::client::ClientConfig,
    models::{Identity, ProfileKind, Role},
};

pub mod admin;
pub mod applications;
pub mod completion;
pub mod config;
pub mod opportunities;
pub mod profile;
pub mod session;

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub json: bool,
}

/// Resolve and validate configuration.
pub fn load_config(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config = ClientConfig::load_config(path).context("failed to load configuration")?;
    if let Err(problems) = config.validate() {
        bail!("invalid configuration: {}", problems.join("; "));
    }
    Ok(config)
}

/// A signed-in (or anonymous) session over the configured backend.
pub struct Context {
    pub session: Session<ApiClient>,
    pub token_path: PathBuf,
}

impl Context {
    /// Open the token file and build the client without touching the network.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let backend = FileTokenBackend::from_config(config.token_path.clone());
        let token_path = backend.path().to_path_buf();
        let tokens = TokenStore::open(backend);
        let api = ApiClient::new(config, tokens).context("failed to build HTTP client")?;
        Ok(Self {
            session: Session::from_client(api),
            token_path,
        })
    }

    /// Open and resume the stored session.
    pub async fn resume(config: &ClientConfig) -> Result<Self> {
        let mut context = Self::open(config)?;
        context.session.resume().await;
        tracing::debug!(
            authenticated = context.session.is_authenticated(),
            token_path = %context.token_path.display(),
            "session resumed"
        );
        Ok(context)
    }

    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    /// The signed-in identity. Fails with the resume error, if there was one.
    pub fn user(&self) -> Result<&Identity> {
        match self.session.user() {
            Some(identity) => Ok(identity),
            None => match self.session.error() {
                Some(error) => bail!("{error}. run `alumnet session login` to sign in again"),
                None => bail!("no active session found; run `alumnet session login` first"),
            },
        }
    }

    /// Check the role locally before calling a role-scoped endpoint. The
    /// backend still decides; this only saves a round-trip.
    pub fn require_role(&self, role: Role) -> Result<&Identity> {
        self.user()?;
        Ok(self.session.require_role(role)?)
    }
}

/// Which profile variant belongs to a role. Admins have none.
pub fn profile_kind_for(role: Role) -> Option<ProfileKind> {
    match role {
        Role::Alumni => Some(ProfileKind::Alumni),
        Role::Student => Some(ProfileKind::Student),
        Role::Admin => None,
    }
}

/// Pretty-print `value` as JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Placeholder for absent optional values in summaries.
pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.is_empty() => text,
        _ => "-",
    }
}
