mod common;

use client::{
    ApiClient, ApiError, Credential, MemoryTokenBackend, Outcome, ProfileError, ProfileReconciler,
    ResumeUpload, Session, SessionState, TokenStore,
};
use common::{EXPIRED_TOKEN, TestServer, VALID_TOKEN};
use reqwest::StatusCode;
use shared::models::{
    ApplicationStatus, OpportunityFilters, OpportunityType, ProfileField, ProfileKind,
    ProfilePatch, Role,
};

#[tokio::test]
async fn bearer_header_follows_token_slot() {
    let server = TestServer::spawn().await;
    let api = server.client(None);

    let error = api.current_identity().await.unwrap_err();
    assert_eq!(server.last_authorization(), None);
    assert_eq!(error.to_string(), "Missing Authorization Header");
    assert!(error.is_unauthorized());

    api.tokens()
        .set(Some(Credential::new(VALID_TOKEN)))
        .unwrap();
    let identity = api.current_identity().await.unwrap();
    assert_eq!(identity.role, Role::Alumni);
    assert_eq!(
        server.last_authorization(),
        Some(format!("Bearer {VALID_TOKEN}"))
    );
}

#[tokio::test]
async fn error_field_is_surfaced_verbatim() {
    let server = TestServer::spawn().await;
    let mut session = Session::from_client(server.client(None));
    session.resume().await;

    let error = session.login("asha@example.com", "wrong").await.unwrap_err();
    assert_eq!(error.to_string(), "Invalid email or password");
    assert_eq!(session.error(), Some("Invalid email or password"));
    assert!(!session.tokens().is_present());
}

#[tokio::test]
async fn unparseable_error_body_falls_back() {
    let server = TestServer::spawn().await;
    let api = server.client(Some(VALID_TOKEN));

    match api.admin_stats().await.unwrap_err() {
        ApiError::Server { status, message } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(message, "Request failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = url::Url::parse(&format!("http://{addr}/api")).unwrap();
    let api = ApiClient::with_base_url(&base_url, TokenStore::in_memory()).unwrap();
    let error = api.current_identity().await.unwrap_err();
    assert!(matches!(error, ApiError::Transport(_)), "{error}");
    assert!(error.to_string().starts_with("network error"));
}

#[tokio::test]
async fn login_then_resume_in_a_new_process() {
    let server = TestServer::spawn().await;

    let mut session = Session::from_client(server.client(None));
    session.resume().await;
    session.login("asha@example.com", "secret").await.unwrap();
    let token = session.tokens().get().unwrap();
    assert_eq!(token.expose(), VALID_TOKEN);

    // A later run seeded with the persisted token resumes without a login.
    let tokens = TokenStore::open(MemoryTokenBackend::with_token(token));
    let api = ApiClient::with_base_url(&server.base_url, tokens).unwrap();
    let mut resumed = Session::from_client(api);
    resumed.resume().await;
    assert!(resumed.has_role(Role::Alumni));
}

#[tokio::test]
async fn expired_token_at_startup_logs_out() {
    let server = TestServer::spawn().await;
    let api = server.client(Some(EXPIRED_TOKEN));
    let tokens = api.tokens().clone();

    let mut session = Session::from_client(api);
    session.resume().await;

    assert_eq!(session.state(), &SessionState::Anonymous);
    assert!(session.user().is_none());
    assert!(tokens.get().is_none());
    assert_eq!(session.error(), Some("Token has expired"));
}

#[tokio::test]
async fn filters_become_query_parameters() {
    let server = TestServer::spawn().await;
    let api = server.client(Some(VALID_TOKEN));

    let filters = OpportunityFilters {
        kind: Some(OpportunityType::Internship),
        category: None,
        min_cgpa: Some(7.0),
    };
    let opportunities = api.list_opportunities(&filters).await.unwrap();
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].kind, OpportunityType::Internship);

    let recorded = server.recorded.lock().unwrap();
    let query = recorded.queries.last().unwrap();
    assert_eq!(query.get("type").map(String::as_str), Some("internship"));
    assert_eq!(query.get("min_cgpa").map(String::as_str), Some("7"));
    assert!(!query.contains_key("category"));
}

#[tokio::test]
async fn apply_sends_resume_as_multipart() {
    let server = TestServer::spawn().await;
    let api = server.client(Some(VALID_TOKEN));

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("resume.pdf");
    std::fs::write(&path, b"%PDF-1.4 fake").unwrap();
    let resume = ResumeUpload::from_path(&path).await.unwrap();

    let application = api.apply_to_opportunity(3, Some(resume)).await.unwrap();
    assert_eq!(application.opportunity_id, 3);
    assert_eq!(application.status, ApplicationStatus::Pending);

    let recorded = server.recorded.lock().unwrap();
    let upload = recorded.uploads.last().unwrap();
    assert_eq!(upload.part_name, "resume");
    assert_eq!(upload.file_name.as_deref(), Some("resume.pdf"));
    assert_eq!(upload.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(upload.bytes, b"%PDF-1.4 fake");
}

#[tokio::test]
async fn apply_without_resume_and_error_paths() {
    let server = TestServer::spawn().await;
    let api = server.client(Some(VALID_TOKEN));

    let application = api.apply_to_opportunity(4, None).await.unwrap();
    assert!(application.resume_file.is_none());
    assert!(server.recorded.lock().unwrap().uploads.is_empty());

    let error = api.apply_to_opportunity(404, None).await.unwrap_err();
    assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(error.to_string(), "Opportunity not found");
}

#[tokio::test]
async fn profile_save_round_trip() {
    let server = TestServer::spawn().await;
    let api = server.client(Some(VALID_TOKEN));
    let mut reconciler = ProfileReconciler::new(api, ProfileKind::Alumni, Some(7));

    assert_eq!(reconciler.load(None).await.unwrap(), Outcome::Applied);
    let loaded = reconciler.displayed().unwrap();
    assert_eq!(loaded.linked_in, "https://linkedin.com/in/asha");
    assert_eq!(loaded.get(ProfileField::WorkingDomain), Some("Data"));

    reconciler
        .edit(&ProfilePatch::new().with(ProfileField::Name, "  Asha K  "))
        .unwrap();
    assert_eq!(reconciler.save().await.unwrap(), Outcome::Applied);

    let saved = reconciler.displayed().unwrap();
    assert_eq!(saved.name, "Asha K");
    assert_eq!(saved.id, Some(11));
    assert_eq!(saved.profile_pic, "asha.png");
    assert!(!reconciler.is_editing());

    let recorded = server.recorded.lock().unwrap();
    let sent = recorded.profile_updates.last().unwrap();
    assert_eq!(sent["linkedIn"], "https://linkedin.com/in/asha");
    assert!(sent.get("profile_pic").is_none());
    let query = recorded.queries.last().unwrap();
    assert_eq!(query.get("type").map(String::as_str), Some("alumni"));
    assert_eq!(query.get("id").map(String::as_str), Some("7"));
}

#[tokio::test]
async fn rejected_profile_save_rolls_back() {
    let server = TestServer::spawn().await;
    let api = server.client(Some(VALID_TOKEN));
    let mut reconciler = ProfileReconciler::new(api, ProfileKind::Alumni, Some(7));
    reconciler.load(Some(7)).await.unwrap();
    let loaded = reconciler.displayed().unwrap();

    reconciler
        .edit(&ProfilePatch::new().with(ProfileField::Email, "taken@example.com"))
        .unwrap();
    let before = reconciler.displayed().unwrap();

    let error = reconciler.save().await.unwrap_err();
    assert!(matches!(error, ProfileError::Api(_)));
    assert_eq!(reconciler.error(), Some("Email already in use"));
    assert_eq!(reconciler.displayed().unwrap(), before);
    assert_eq!(reconciler.base().unwrap(), &loaded);
}
