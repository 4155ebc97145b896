use std::path::Path;

use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder,
    multipart::{Form, Part},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use shared::{
    config::client::ClientConfig,
    models::{
        AdminStats, Application, ApplicationEnvelope, ApplicationListResponse, ApplicationStatus,
        AuthResponse, ErrorResponse, Identity, LoginRequest, MeResponse, MessageResponse,
        NewOpportunity, Opportunity, OpportunityEnvelope, OpportunityFilters,
        OpportunityListResponse, OpportunityUpdate, ProfileEnvelope, ProfileKind, Registration,
        StatusUpdateRequest, UserListResponse, UserRecord,
    },
};
use url::Url;

use crate::{error::ApiError, token_store::TokenStore};

const USER_AGENT: &str = "alumnet-cli";

/// Thin REST client for the AlumNet backend.
///
/// One attempt per call: no retries, no timeouts. The bearer token is read
/// from the shared [`TokenStore`] at send time, so a login through any clone
/// of the store is picked up immediately.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    tokens: TokenStore,
}

impl ApiClient {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        Self::with_base_url(&config.api_base_url, tokens)
    }

    /// Build a client rooted at `base_url` (including any `/api` prefix).
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_base_url(base_url: &Url, tokens: TokenStore) -> Result<Self, ApiError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            http,
            tokens,
        })
    }

    /// The credential slot this client authenticates with.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn api_url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|source| ApiError::InvalidUrl {
            path: path.to_string(),
            source,
        })
    }

    fn prepare(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.api_url(path)?;
        let token = self.tokens.get();
        tracing::debug!(%method, path, authenticated = token.is_some(), "api request");

        let builder = self.http.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        })
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = ErrorResponse::from_body(&body).message().to_string();
            tracing::debug!(%status, %message, "api request rejected");
            return Err(ApiError::Server { status, message });
        }

        serde_json::from_slice(&body).map_err(ApiError::Decode)
    }

    /// Send one request, serializing `body` as JSON when present.
    ///
    /// # Errors
    /// Transport failures, non-2xx responses (message taken from the body's
    /// `error` or `msg` field) and undecodable bodies all surface as [`ApiError`].
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let mut builder = self.prepare(method, path)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    async fn delete(&self, path: &str) -> Result<MessageResponse, ApiError> {
        self.request::<MessageResponse, ()>(Method::DELETE, path, None)
            .await
    }

    // Authentication

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        self.request(Method::POST, "auth/register", Some(registration))
            .await
    }

    /// The token in the response is not stored here; the session owns that.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.request(Method::POST, "auth/login", Some(credentials))
            .await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn current_identity(&self) -> Result<Identity, ApiError> {
        let me: MeResponse = self.get("auth/me").await?;
        Ok(me.user)
    }

    // Admin

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        let list: UserListResponse = self.get("admin/users").await?;
        Ok(list.users)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn delete_user(&self, user_id: i64) -> Result<MessageResponse, ApiError> {
        self.delete(&format!("admin/users/{user_id}")).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        self.get("admin/stats").await
    }

    // Alumni

    /// Postings created by the signed-in alumnus.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn my_opportunities(&self) -> Result<Vec<Opportunity>, ApiError> {
        let list: OpportunityListResponse = self.get("alumni/opportunities").await?;
        Ok(list.opportunities)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn create_opportunity(
        &self,
        opportunity: &NewOpportunity,
    ) -> Result<Opportunity, ApiError> {
        let envelope: OpportunityEnvelope = self
            .request(Method::POST, "alumni/opportunities", Some(opportunity))
            .await?;
        Ok(envelope.opportunity)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn update_opportunity(
        &self,
        opportunity_id: i64,
        update: &OpportunityUpdate,
    ) -> Result<Opportunity, ApiError> {
        let envelope: OpportunityEnvelope = self
            .request(
                Method::PUT,
                &format!("alumni/opportunities/{opportunity_id}"),
                Some(update),
            )
            .await?;
        Ok(envelope.opportunity)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn delete_opportunity(&self, opportunity_id: i64) -> Result<MessageResponse, ApiError> {
        self.delete(&format!("alumni/opportunities/{opportunity_id}"))
            .await
    }

    /// Applications received on the signed-in alumnus' postings.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn received_applications(&self) -> Result<Vec<Application>, ApiError> {
        let list: ApplicationListResponse = self.get("alumni/applications").await?;
        Ok(list.applications)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn update_application_status(
        &self,
        application_id: i64,
        status: ApplicationStatus,
    ) -> Result<Application, ApiError> {
        let envelope: ApplicationEnvelope = self
            .request(
                Method::PUT,
                &format!("alumni/applications/{application_id}/status"),
                Some(&StatusUpdateRequest { status }),
            )
            .await?;
        Ok(envelope.application)
    }

    // Student

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn list_opportunities(
        &self,
        filters: &OpportunityFilters,
    ) -> Result<Vec<Opportunity>, ApiError> {
        let builder = self
            .prepare(Method::GET, "student/opportunities")?
            .query(&filters.to_query());
        let list: OpportunityListResponse = self.execute(builder).await?;
        Ok(list.opportunities)
    }

    /// Apply with an optional resume. Sent as multipart, never JSON.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn apply_to_opportunity(
        &self,
        opportunity_id: i64,
        resume: Option<ResumeUpload>,
    ) -> Result<Application, ApiError> {
        let mut form = Form::new();
        if let Some(resume) = resume {
            form = form.part("resume", resume.into_part()?);
        }
        let builder = self
            .prepare(
                Method::POST,
                &format!("student/opportunities/{opportunity_id}/apply"),
            )?
            .multipart(form);
        let envelope: ApplicationEnvelope = self.execute(builder).await?;
        Ok(envelope.application)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn my_applications(&self) -> Result<Vec<Application>, ApiError> {
        let list: ApplicationListResponse = self.get("student/applications").await?;
        Ok(list.applications)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn withdraw_application(&self, application_id: i64) -> Result<MessageResponse, ApiError> {
        self.delete(&format!("student/applications/{application_id}"))
            .await
    }

    // Profiles

    /// Raw profile record; normalization is the caller's business.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn fetch_profile(&self, kind: ProfileKind, user_id: i64) -> Result<Value, ApiError> {
        let builder = self
            .prepare(Method::GET, "profile")?
            .query(&profile_query(kind, user_id));
        let envelope: ProfileEnvelope = self.execute(builder).await?;
        Ok(envelope.profile)
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn update_profile(
        &self,
        kind: ProfileKind,
        user_id: i64,
        payload: &Value,
    ) -> Result<Value, ApiError> {
        let builder = self
            .prepare(Method::PUT, "profile")?
            .query(&profile_query(kind, user_id))
            .json(payload);
        let envelope: ProfileEnvelope = self.execute(builder).await?;
        Ok(envelope.profile)
    }
}

fn profile_query(kind: ProfileKind, user_id: i64) -> [(&'static str, String); 2] {
    [("type", kind.to_string()), ("id", user_id.to_string())]
}

/// A resume attached to an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    file_name: String,
    bytes: Vec<u8>,
}

impl ResumeUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a resume from disk.
    ///
    /// # Errors
    /// Returns [`ApiError::Upload`] if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ApiError::Upload {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "resume".to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Content type derived from the extension; the backend accepts PDF, DOC and DOCX.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("pdf") => "application/pdf",
            Some("doc") => "application/msword",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            _ => "application/octet-stream",
        }
    }

    fn into_part(self) -> Result<Part, ApiError> {
        let mime = self.mime_type();
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime)?)
    }
}

/// Authentication calls the session depends on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token and identity.
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError>;

    /// Create an account and sign it in.
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError>;

    /// Resolve the currently attached token to an identity.
    async fn current_identity(&self) -> Result<Identity, ApiError>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        Self::login(self, credentials).await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        Self::register(self, registration).await
    }

    async fn current_identity(&self) -> Result<Identity, ApiError> {
        Self::current_identity(self).await
    }
}

/// Profile calls the reconciler depends on.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Fetch the raw profile record of `user_id`.
    async fn fetch_profile(&self, kind: ProfileKind, user_id: i64) -> Result<Value, ApiError>;

    /// Store `payload` and return the server's canonical record.
    async fn update_profile(
        &self,
        kind: ProfileKind,
        user_id: i64,
        payload: &Value,
    ) -> Result<Value, ApiError>;
}

#[async_trait]
impl ProfileApi for ApiClient {
    async fn fetch_profile(&self, kind: ProfileKind, user_id: i64) -> Result<Value, ApiError> {
        Self::fetch_profile(self, kind, user_id).await
    }

    async fn update_profile(
        &self,
        kind: ProfileKind,
        user_id: i64,
        payload: &Value,
    ) -> Result<Value, ApiError> {
        Self::update_profile(self, kind, user_id, payload).await
    }
}
