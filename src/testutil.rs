//! In-process axum backend for session and client tests.
//!
//! Serves the auth endpoints plus a handful of probe routes on an ephemeral
//! port. Access tokens are minted sequentially (`token-1`, `token-2`, ...);
//! `invalidate` rotates the expected token server-side so the client's copy
//! goes stale, which is how tests manufacture 401s.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::{get, post};
use serde_json::{Value, json};
use uuid::Uuid;

pub(crate) struct AuthBackend {
    pub user_id: Uuid,
    pub login_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub accept_login: AtomicBool,
    pub accept_refresh: AtomicBool,
    pub fail_logout: AtomicBool,
    /// Artificial latency on refresh, to let concurrent 401s pile up.
    pub refresh_delay_ms: AtomicU64,
    issued: AtomicUsize,
    current_token: Mutex<String>,
    /// Headers observed by the `/probe` route.
    pub probes: Mutex<Vec<ProbeRecord>>,
}

#[derive(Debug, Clone)]
pub(crate) struct ProbeRecord {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub csrf: Option<String>,
}

impl AuthBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            user_id: Uuid::new_v4(),
            login_calls: AtomicUsize::new(0),
            signup_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            accept_login: AtomicBool::new(true),
            accept_refresh: AtomicBool::new(true),
            fail_logout: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
            issued: AtomicUsize::new(0),
            current_token: Mutex::new(String::new()),
            probes: Mutex::new(Vec::new()),
        })
    }

    /// Mint the next access token and make it the one `authorized` expects.
    fn mint(&self) -> (String, usize) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{n}");
        *self.current_token.lock().unwrap() = token.clone();
        (token, n)
    }

    /// Rotate the expected token without telling the client, so its copy
    /// goes stale and the next protected call returns 401.
    pub(crate) fn invalidate(&self) {
        self.mint();
    }

    pub(crate) fn current_token(&self) -> String {
        self.current_token.lock().unwrap().clone()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = self.current_token();
        if expected.is_empty() {
            return false;
        }
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {expected}"))
    }

    fn user_body(&self) -> Value {
        json!({
            "id": self.user_id,
            "email": "alice@example.com",
            "full_name": "Alice",
            "picture": null,
        })
    }

    pub(crate) fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/auth/login/json", post(login))
            .route("/auth/signup", post(signup))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/users/me", get(me))
            .route("/protected", get(protected))
            .route("/probe", get(probe).post(probe))
            .route("/secure-probe", post(secure_probe))
            .route("/always-401", get(always_401))
            .route("/boom", get(boom))
            .route("/chat/message", post(chat_message))
            .with_state(Arc::clone(self))
    }
}

/// Serve the auth backend on an ephemeral port, returning its base URL.
pub(crate) async fn spawn_backend(backend: &Arc<AuthBackend>) -> String {
    spawn_router(backend.router()).await
}

/// Serve any router on an ephemeral port, returning its base URL.
pub(crate) async fn spawn_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn set_cookies(n: usize) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    AppendHeaders([
        (header::SET_COOKIE, format!("refresh_token=rt-{n}; Path=/; HttpOnly")),
        (header::SET_COOKIE, format!("csrf_token=csrf-{n}; Path=/")),
    ])
}

async fn login(State(backend): State<Arc<AuthBackend>>) -> axum::response::Response {
    backend.login_calls.fetch_add(1, Ordering::SeqCst);
    if !backend.accept_login.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "invalid credentials" })))
            .into_response();
    }
    // Login sets the refresh cookie; the access token only comes via refresh.
    (StatusCode::OK, set_cookies(0), Json(json!({ "ok": true }))).into_response()
}

async fn signup(State(backend): State<Arc<AuthBackend>>) -> axum::response::Response {
    backend.signup_calls.fetch_add(1, Ordering::SeqCst);
    if !backend.accept_login.load(Ordering::SeqCst) {
        return (StatusCode::CONFLICT, Json(json!({ "detail": "email already registered" })))
            .into_response();
    }
    (StatusCode::OK, set_cookies(0), Json(json!({ "ok": true }))).into_response()
}

async fn refresh(
    State(backend): State<Arc<AuthBackend>>,
    headers: HeaderMap,
) -> axum::response::Response {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = backend.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let has_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("refresh_token="));
    if !has_cookie {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "missing refresh token" })))
            .into_response();
    }
    if !backend.accept_refresh.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "refresh token invalid" })))
            .into_response();
    }
    let (token, n) = backend.mint();
    let body = json!({ "access_token": token, "user": backend.user_body() });
    (StatusCode::OK, set_cookies(n), Json(body)).into_response()
}

async fn logout(State(backend): State<Arc<AuthBackend>>) -> axum::response::Response {
    backend.logout_calls.fetch_add(1, Ordering::SeqCst);
    if backend.fail_logout.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "logout failed" })))
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn me(State(backend): State<Arc<AuthBackend>>, headers: HeaderMap) -> axum::response::Response {
    if !backend.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "token expired" }))).into_response();
    }
    Json(backend.user_body()).into_response()
}

async fn protected(
    State(backend): State<Arc<AuthBackend>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !backend.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "token expired" }))).into_response();
    }
    Json(json!({ "ok": true })).into_response()
}

async fn probe(
    State(backend): State<Arc<AuthBackend>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let header_str =
        |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(ToOwned::to_owned);
    backend.probes.lock().unwrap().push(ProbeRecord {
        authorization: header_str("authorization"),
        content_type: header_str("content-type"),
        csrf: header_str("x-csrf-token"),
    });
    Json(json!({ "ok": true })).into_response()
}

/// Like `probe`, but only records once authorized; unauthorized calls 401 so
/// tests can observe the headers of a retried request.
async fn secure_probe(
    State(backend): State<Arc<AuthBackend>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !backend.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "token expired" }))).into_response();
    }
    probe(State(backend), headers).await
}

async fn always_401() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "still unauthorized" }))).into_response()
}

async fn boom() -> axum::response::Response {
    (StatusCode::IM_A_TEAPOT, Json(json!({ "detail": "teapot" }))).into_response()
}

async fn chat_message(
    State(backend): State<Arc<AuthBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !backend.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "token expired" }))).into_response();
    }
    let message = body.get("message").and_then(Value::as_str).unwrap_or_default();
    Json(json!({ "reply": format!("echo: {message}") })).into_response()
}
