//! End-to-end session flow against an in-process mock of the auth API.
use std::io;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};

use task_session::config::Config;
use task_session::error::NETWORK_FALLBACK_MESSAGE;
use task_session::services::session::{MemorySessionStorage, SessionStatus};
use task_session::state::AppState;

const API_PREFIX: &str = "/rest/api/v1";

#[derive(Clone, Copy)]
enum LoginMode {
    Accept,
    Reject,
    Garbage,
}

#[derive(Clone, Copy)]
enum LogoutMode {
    Acknowledge,
    ServerError,
}

#[derive(Clone)]
struct Mock {
    login: LoginMode,
    logout: LogoutMode,
    token: String,
    // Authorization header seen per route, in arrival order.
    seen: Arc<Mutex<Vec<(&'static str, Option<String>)>>>,
}

impl Mock {
    fn record(&self, route: &'static str, headers: &HeaderMap) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push((route, auth));
    }

    fn seen(&self, route: &str) -> Vec<Option<String>> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == route)
            .map(|(_, auth)| auth.clone())
            .collect()
    }
}

async fn login_handler(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    mock.record("login", &headers);
    assert!(body.get("email").is_some() && body.get("password").is_some());

    match mock.login {
        LoginMode::Accept => Json(json!({
            "success": true,
            "message": "Login successful",
            "data": {"access_token": mock.token, "refresh_token": ""},
            "statusCode": 200,
            "timestamp": "2026-10-16T10:00:00Z"
        }))
        .into_response(),
        LoginMode::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "message": "Invalid credentials",
                "data": null,
                "statusCode": 401,
                "timestamp": "2026-10-16T10:00:00Z"
            })),
        )
            .into_response(),
        LoginMode::Garbage => (StatusCode::BAD_GATEWAY, "upstream exploded").into_response(),
    }
}

async fn logout_handler(State(mock): State<Mock>, headers: HeaderMap) -> axum::response::Response {
    mock.record("logout", &headers);
    match mock.logout {
        LogoutMode::Acknowledge => Json(json!({
            "success": true,
            "message": "Logout successful",
            "data": null,
            "statusCode": 200,
            "timestamp": "2026-10-16T10:00:00Z"
        }))
        .into_response(),
        LogoutMode::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn task_handler(State(mock): State<Mock>, headers: HeaderMap) -> StatusCode {
    mock.record("task", &headers);
    if headers.contains_key(header::AUTHORIZATION) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

fn jwt(claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"mock-server-secret"),
    )
    .unwrap()
}

fn fresh_token() -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    jwt(json!({"username": "alice", "upn": "a@b.com", "exp": exp}))
}

/// Serve the mock on an ephemeral port and return the API base URL.
async fn spawn_mock(mock: Mock) -> String {
    let api = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", get(logout_handler))
        .route("/task", get(task_handler))
        .with_state(mock);
    let app = Router::new().nest(API_PREFIX, api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}{API_PREFIX}")
}

fn mock(login: LoginMode, logout: LogoutMode) -> Mock {
    Mock {
        login,
        logout,
        token: fresh_token(),
        seen: Arc::new(Mutex::new(Vec::new())),
    }
}

/// Log sink for a scoped fmt subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn state_for(api_url: &str) -> AppState {
    let config = Config::for_api_url(api_url).unwrap();
    AppState::new(config, Arc::new(MemorySessionStorage::new())).unwrap()
}

#[tokio::test]
async fn login_stores_token_and_requests_carry_it() {
    let mock = mock(LoginMode::Accept, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);
    let session = &state.session;

    assert_eq!(session.status(), SessionStatus::LoggedOut);
    let tokens = session.login("a@b.com", "secret").await.unwrap();

    assert_eq!(tokens.access_token, mock.token);
    assert_eq!(session.store().get_token(), Some(mock.token.clone()));
    assert_eq!(session.status(), SessionStatus::LoggedIn);
    assert!(session.is_authenticated());
    assert!(!session.is_expired());
    assert_eq!(session.username(), "alice");
    assert_eq!(session.get_claim("role").as_deref(), Some(""));

    let response = state.http.get(&format!("{api_url}/task")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(mock.seen("task"), vec![Some(format!("Bearer {}", mock.token))]);
}

#[tokio::test]
async fn login_route_never_receives_the_header() {
    let mock = mock(LoginMode::Accept, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);

    state.session.store().set_token("stale-token");
    state.session.login("a@b.com", "secret").await.unwrap();
    state.session.login("a@b.com", "secret").await.unwrap();

    assert_eq!(mock.seen("login"), vec![None, None]);
}

#[tokio::test]
async fn rejected_login_surfaces_server_message() {
    let mock = mock(LoginMode::Reject, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);
    state.session.store().set_token("previous");

    let err = state.session.login("a@b.com", "secret").await.unwrap_err();

    assert_eq!(err.user_message(), "Invalid credentials");
    assert_eq!(state.session.store().get_token().as_deref(), Some("previous"));
    assert!(!state.session.is_loading());
}

#[tokio::test]
async fn unstructured_failure_uses_fallback_message() {
    let mock = mock(LoginMode::Garbage, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock).await;
    let state = state_for(&api_url);

    let err = state.session.login("a@b.com", "secret").await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.user_message(), NETWORK_FALLBACK_MESSAGE);
    assert_eq!(state.session.store().get_token(), None);
}

#[tokio::test]
async fn unreachable_server_uses_fallback_message() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let state = state_for(&format!("http://{addr}{API_PREFIX}"));

    let err = state.session.login("a@b.com", "secret").await.unwrap_err();
    assert_eq!(err.user_message(), NETWORK_FALLBACK_MESSAGE);

    state.session.store().set_token("T1");
    let err = state.session.logout().await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(state.session.store().get_token().as_deref(), Some("T1"));
}

#[tokio::test]
async fn logout_clears_session_after_acknowledgement() {
    let mock = mock(LoginMode::Accept, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);
    state.session.login("a@b.com", "secret").await.unwrap();

    let mut status = state.session.subscribe();
    state.session.logout().await.unwrap();

    assert_eq!(state.session.store().get_token(), None);
    assert!(!state.session.is_authenticated());
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SessionStatus::LoggedOut);
    // Logout is an authenticated call.
    assert_eq!(mock.seen("logout"), vec![Some(format!("Bearer {}", mock.token))]);
}

#[tokio::test]
async fn failed_logout_keeps_token() {
    let mock = mock(LoginMode::Accept, LogoutMode::ServerError);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);
    state.session.login("a@b.com", "secret").await.unwrap();

    let err = state.session.logout().await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(state.session.store().get_token(), Some(mock.token.clone()));
    assert_eq!(state.session.status(), SessionStatus::LoggedIn);
}

#[tokio::test]
async fn expired_token_is_sent_and_still_authenticated() {
    let mock = mock(LoginMode::Accept, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);

    let expired = jwt(json!({"username": "alice", "exp": chrono::Utc::now().timestamp() - 1}));
    state.session.store().set_token(&expired);

    assert!(state.session.is_authenticated());
    assert!(state.session.is_expired());

    state.http.get(&format!("{api_url}/task")).await.unwrap();
    assert_eq!(mock.seen("task"), vec![Some(format!("Bearer {expired}"))]);
}

#[tokio::test]
async fn no_token_means_no_header() {
    let mock = mock(LoginMode::Accept, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);

    let response = state.http.get(&format!("{api_url}/task")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(mock.seen("task"), vec![None]);
}

#[tokio::test]
async fn login_route_is_excluded_when_api_url_is_not_canonical() {
    let mock = mock(LoginMode::Accept, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let port = api_url
        .trim_start_matches("http://127.0.0.1:")
        .split('/')
        .next()
        .unwrap()
        .to_string();
    let state = state_for(&format!("HTTP://127.0.0.1:{port}/rest/./api/v1/"));

    state.session.store().set_token("stale-token");
    state.session.login("a@b.com", "secret").await.unwrap();
    assert_eq!(mock.seen("login"), vec![None]);

    state.http.get(&format!("{api_url}/task")).await.unwrap();
    assert_eq!(mock.seen("task"), vec![Some(format!("Bearer {}", mock.token))]);
}

#[tokio::test]
async fn info_logs_never_carry_credentials_or_token() {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mock = mock(LoginMode::Accept, LogoutMode::Acknowledge);
    let api_url = spawn_mock(mock.clone()).await;
    let state = state_for(&api_url);
    state.session.login("alice@example.com", "secret-pw").await.unwrap();

    let text = logs.text();
    assert!(text.contains("session started"), "{text}");
    assert!(!text.contains("alice@example.com"), "{text}");
    assert!(!text.contains("secret-pw"), "{text}");
    assert!(!text.contains(&mock.token), "{text}");
}
