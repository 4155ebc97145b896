//! Who is signed in.
//!
//! A [`Session`] is created once per process and owned by whoever drives the
//! UI. It starts in [`SessionState::Resuming`] and settles into exactly one of
//! the other two states; the signed-in identity lives inside
//! [`SessionState::Authenticated`], so there is no way to hold a user while
//! anonymous or the reverse.
//!
//! Role checks offered here decide what to show. They are not access
//! control: the backend authorizes every request on its own.

use shared::models::{Identity, LoginRequest, Registration, Role};
use thiserror::Error;

use crate::{
    api::{ApiClient, AuthApi},
    error::ApiError,
    token_store::{Credential, TokenStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup: a stored token has not been checked yet.
    Resuming,
    Authenticated(Identity),
    Anonymous,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Please log in first")]
    NotAuthenticated,

    #[error("This action requires the {required} role")]
    Forbidden { required: Role },
}

/// Explicitly owned session state machine.
#[derive(Debug)]
pub struct Session<A> {
    api: A,
    tokens: TokenStore,
    state: SessionState,
    loading: bool,
    error: Option<String>,
}

impl Session<ApiClient> {
    /// Session over a real client, sharing its token slot.
    #[must_use]
    pub fn from_client(api: ApiClient) -> Self {
        let tokens = api.tokens().clone();
        Self::new(api, tokens)
    }
}

impl<A: AuthApi> Session<A> {
    /// A fresh session in [`SessionState::Resuming`].
    ///
    /// `tokens` must be the same store the API client reads from.
    pub fn new(api: A, tokens: TokenStore) -> Self {
        Self {
            api,
            tokens,
            state: SessionState::Resuming,
            loading: true,
            error: None,
        }
    }

    /// Restore the session from a stored token.
    ///
    /// Any failure to resolve the token to an identity forces a logout: the
    /// token is cleared, the state becomes anonymous and the error message is
    /// kept for display. This never returns an error.
    pub async fn resume(&mut self) -> &SessionState {
        self.state = SessionState::Resuming;
        self.loading = true;

        if self.tokens.is_present() {
            match self.api.current_identity().await {
                Ok(identity) => {
                    tracing::debug!(user_id = identity.id, role = %identity.role, "session resumed");
                    self.error = None;
                    self.state = SessionState::Authenticated(identity);
                }
                Err(err) => {
                    tracing::debug!(error = %err, "stored token rejected");
                    self.clear_token();
                    self.error = Some(err.to_string());
                    self.state = SessionState::Anonymous;
                }
            }
        } else {
            self.state = SessionState::Anonymous;
        }

        self.loading = false;
        &self.state
    }

    /// Sign in with email and password.
    ///
    /// On failure nothing is stored and the message is recorded in
    /// [`Session::error`]. An authenticated session stays authenticated; one
    /// still resuming settles as anonymous.
    ///
    /// # Errors
    /// Returns the API failure, which is also recorded.
    pub async fn login(
        &mut self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<&Identity, SessionError> {
        let credentials = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let result = self.api.login(&credentials).await;
        self.accept(result)
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    /// Same as [`Session::login`].
    pub async fn register(&mut self, registration: Registration) -> Result<&Identity, SessionError> {
        let result = self.api.register(&registration).await;
        self.accept(result)
    }

    fn accept(
        &mut self,
        result: Result<shared::models::AuthResponse, ApiError>,
    ) -> Result<&Identity, SessionError> {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.error = Some(err.to_string());
                self.loading = false;
                if self.state == SessionState::Resuming {
                    self.state = SessionState::Anonymous;
                }
                return Err(err.into());
            }
        };

        if let Err(err) = self.tokens.set(Some(Credential::new(response.access_token))) {
            tracing::warn!(error = %err, "token kept in memory only");
        }
        tracing::info!(user_id = response.user.id, role = %response.user.role, "signed in");

        self.error = None;
        self.loading = false;
        self.state = SessionState::Authenticated(response.user);
        match &self.state {
            SessionState::Authenticated(identity) => Ok(identity),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    /// Forget the token, the identity and any recorded error. Cannot fail.
    pub fn logout(&mut self) {
        self.clear_token();
        if let SessionState::Authenticated(identity) = &self.state {
            tracing::info!(user_id = identity.id, "signed out");
        }
        self.state = SessionState::Anonymous;
        self.loading = false;
        self.error = None;
    }

    fn clear_token(&self) {
        if let Err(err) = self.tokens.set(None) {
            tracing::warn!(error = %err, "failed to remove stored token");
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The signed-in identity; `Some` exactly when authenticated.
    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// UX gate only; see the module docs.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.user().is_some_and(|identity| identity.role == role)
    }

    /// The signed-in identity, or [`SessionError::NotAuthenticated`].
    ///
    /// # Errors
    /// Fails when nobody is signed in.
    pub fn require_user(&self) -> Result<&Identity, SessionError> {
        self.user().ok_or(SessionError::NotAuthenticated)
    }

    /// Like [`Session::require_user`], but also checks the role.
    ///
    /// # Errors
    /// Fails when nobody is signed in or the role differs.
    pub fn require_role(&self, required: Role) -> Result<&Identity, SessionError> {
        let identity = self.require_user()?;
        if identity.role == required {
            Ok(identity)
        } else {
            Err(SessionError::Forbidden { required })
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// The client this session authenticates through.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }
}
