//! Process-wide slot for the bearer credential.
//!
//! The in-memory slot is what outgoing requests read. A [`TokenBackend`]
//! mirrors it to durable storage so a later run can resume the session; an
//! absent entry means "logged out". Nothing here inspects expiry: an expired
//! token is only discovered when the backend rejects it.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use directories::BaseDirs;
use thiserror::Error;

/// Fixed name of the durable token entry.
pub const TOKEN_KEY: &str = "jwt_token";

/// Opaque bearer token. `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("failed to access token file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable mirror of the token slot.
pub trait TokenBackend: Send + Sync + fmt::Debug {
    /// Read the persisted token, if any.
    ///
    /// # Errors
    /// Returns an error when storage exists but cannot be read.
    fn load(&self) -> Result<Option<Credential>, TokenStoreError>;

    /// Persist `token`, or remove the entry when `None`.
    ///
    /// # Errors
    /// Returns an error when storage cannot be written or removed.
    fn store(&self, token: Option<&Credential>) -> Result<(), TokenStoreError>;
}

/// Token persisted as a single owner-only file.
#[derive(Debug, Clone)]
pub struct FileTokenBackend {
    path: PathBuf,
}

impl FileTokenBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `path` when configured, the platform default otherwise.
    #[must_use]
    pub fn from_config(path: Option<PathBuf>) -> Self {
        Self::new(path.unwrap_or_else(default_token_path))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenBackend for FileTokenBackend {
    fn load(&self) -> Result<Option<Credential>, TokenStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|err| self.io_error(err))?;
        let token = contents.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Credential::new(token)))
        }
    }

    fn store(&self, token: Option<&Credential>) -> Result<(), TokenStoreError> {
        match token {
            Some(token) => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
                }
                fs::write(&self.path, token.expose()).map_err(|err| self.io_error(err))?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                        .map_err(|err| self.io_error(err))?;
                }
            }
            None => {
                if self.path.exists() {
                    fs::remove_file(&self.path).map_err(|err| self.io_error(err))?;
                }
            }
        }
        Ok(())
    }
}

/// Default token location: `<config dir>/alumnet/jwt_token`.
#[must_use]
pub fn default_token_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("alumnet").join(TOKEN_KEY))
        .unwrap_or_else(|| PathBuf::from(format!("./{TOKEN_KEY}")))
}

/// Non-persistent backend for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryTokenBackend {
    slot: Mutex<Option<Credential>>,
}

impl MemoryTokenBackend {
    #[must_use]
    pub fn with_token(token: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(token)),
        }
    }
}

impl TokenBackend for MemoryTokenBackend {
    fn load(&self) -> Result<Option<Credential>, TokenStoreError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn store(&self, token: Option<&Credential>) -> Result<(), TokenStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = token.cloned();
        Ok(())
    }
}

/// Shared handle to the credential slot. Clones see the same token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    slot: Arc<RwLock<Option<Credential>>>,
    backend: Arc<dyn TokenBackend>,
}

impl TokenStore {
    /// Open a store, seeding the slot from `backend`.
    ///
    /// An unreadable mirror is logged and treated as logged out.
    pub fn open(backend: impl TokenBackend + 'static) -> Self {
        let initial = backend.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable stored token");
            None
        });
        Self {
            slot: Arc::new(RwLock::new(initial)),
            backend: Arc::new(backend),
        }
    }

    /// A store with no durable mirror.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(MemoryTokenBackend::default())
    }

    #[must_use]
    pub fn get(&self) -> Option<Credential> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the token, or clear it with `None`.
    ///
    /// The in-memory slot is updated first and stays updated even when the
    /// durable mirror fails.
    ///
    /// # Errors
    /// Returns the mirror's error when persisting fails.
    pub fn set(&self, token: Option<Credential>) -> Result<(), TokenStoreError> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = token.clone();
        tracing::debug!(present = token.is_some(), "token updated");
        self.backend.store(token.as_ref())
    }
}
