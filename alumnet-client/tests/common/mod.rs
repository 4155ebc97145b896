//! In-process fake of the AlumNet backend, bound to an ephemeral port.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use client::{ApiClient, Credential, TokenStore};
use serde_json::{Value, json};
use url::Url;

pub const VALID_TOKEN: &str = "valid.jwt.token";
pub const EXPIRED_TOKEN: &str = "expired.jwt.token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub opportunity_id: i64,
    pub part_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub authorization: Vec<Option<String>>,
    pub queries: Vec<HashMap<String, String>>,
    pub uploads: Vec<RecordedUpload>,
    pub profile_updates: Vec<Value>,
    pub profile: Option<Value>,
}

type Shared = Arc<Mutex<Recorded>>;

pub struct TestServer {
    pub base_url: Url,
    pub recorded: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let recorded: Shared = Arc::default();
        recorded.lock().unwrap().profile = Some(json!({
            "id": 11,
            "user_id": 7,
            "name": "Asha",
            "email": "asha@example.com",
            "linkedin": "https://linkedin.com/in/asha",
            "domain": "Data",
            "occupation": "Engineer",
            "company": "Acme",
            "profile_pic": "asha.png"
        }));

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .route("/api/admin/stats", get(stats))
            .route("/api/student/opportunities", get(list_opportunities))
            .route("/api/student/opportunities/{id}/apply", post(apply))
            .route("/api/profile", get(fetch_profile).put(update_profile))
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = Url::parse(&format!("http://{addr}/api")).unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            recorded,
            handle,
        }
    }

    /// A client with an in-memory token slot, optionally pre-seeded.
    pub fn client(&self, token: Option<&str>) -> ApiClient {
        let tokens = TokenStore::in_memory();
        if let Some(token) = token {
            tokens.set(Some(Credential::new(token))).unwrap();
        }
        ApiClient::with_base_url(&self.base_url, tokens).unwrap()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.recorded
            .lock()
            .unwrap()
            .authorization
            .last()
            .cloned()
            .flatten()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn record_auth(state: &Shared, headers: &HeaderMap) -> Option<String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.lock().unwrap().authorization.push(value.clone());
    value
}

fn identity() -> Value {
    json!({
        "id": 7,
        "name": "Asha",
        "email": "asha@example.com",
        "role": "alumni",
        "created_at": "2024-05-01T10:00:00"
    })
}

/// Mirrors the backend's JWT layer: 401 with `msg` for missing or expired tokens.
fn authorize(state: &Shared, headers: &HeaderMap) -> Result<(), Response> {
    match record_auth(state, headers).as_deref() {
        Some(value) if value == format!("Bearer {VALID_TOKEN}") => Ok(()),
        Some(value) if value == format!("Bearer {EXPIRED_TOKEN}") => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"msg": "Token has expired"})),
        )
            .into_response()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"msg": "Missing Authorization Header"})),
        )
            .into_response()),
    }
}

async fn login(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record_auth(&state, &headers);
    if body["password"] == "secret" {
        Json(json!({
            "message": "Login successful",
            "access_token": VALID_TOKEN,
            "user": identity()
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid email or password"})),
        )
            .into_response()
    }
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(json!({"user": identity()})).into_response()
}

async fn stats(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record_auth(&state, &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>upstream exploded</html>").into_response()
}

async fn list_opportunities(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    state.lock().unwrap().queries.push(query);
    Json(json!({
        "opportunities": [{
            "id": 1,
            "alumni_id": 7,
            "type": "internship",
            "title": "Data intern",
            "description": "Summer role",
            "min_cgpa": 7.5,
            "category": "General",
            "deadline": "2025-06-30",
            "alumni_name": "Asha"
        }]
    }))
    .into_response()
}

async fn apply(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Opportunity not found"})),
        )
            .into_response();
    }

    let mut resume_file = Value::Null;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let part_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        resume_file = file_name.clone().map_or(Value::Null, Value::String);
        state.lock().unwrap().uploads.push(RecordedUpload {
            opportunity_id: id,
            part_name,
            file_name,
            content_type,
            bytes,
        });
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Application submitted successfully",
            "application": {
                "id": 5,
                "student_id": 9,
                "opportunity_id": id,
                "status": "pending",
                "resume_file": resume_file,
                "applied_at": "2025-01-02T03:04:05"
            }
        })),
    )
        .into_response()
}

async fn fetch_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let mut recorded = state.lock().unwrap();
    recorded.queries.push(query);
    Json(json!({"profile": recorded.profile.clone()})).into_response()
}

/// Stores the payload and answers with a normalized copy: names are trimmed
/// and server-managed fields are left out.
async fn update_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(payload): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let mut recorded = state.lock().unwrap();
    recorded.queries.push(query);
    recorded.profile_updates.push(payload.clone());

    if payload["email"] == "taken@example.com" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "Email already in use"})),
        )
            .into_response();
    }

    let mut canonical = payload;
    if let Some(name) = canonical["name"].as_str() {
        canonical["name"] = Value::String(name.trim().to_string());
    }
    recorded.profile = Some(canonical.clone());
    Json(json!({"profile": canonical})).into_response()
}
