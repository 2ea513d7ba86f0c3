#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use gatekeep_api::auth::password::{PasswordPolicy, Passwords};
use gatekeep_api::auth::token::TokenConfig;
use gatekeep_api::config::{EncryptionKey, ServerConfig};
use gatekeep_api::mail::{MailConfig, MailError, MailTransport, OutgoingMail};
use gatekeep_api::router::build_app_router;
use gatekeep_api::state::{AppState, Backends};
use gatekeep_core::clock::ManualClock;
use gatekeep_core::ids::RandomIds;
use gatekeep_core::login_token::LoginPolicy;
use gatekeep_core::session::SessionPolicy;
use gatekeep_core::types::Timestamp;
use gatekeep_db::store::MemoryStore;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const CONFIRM_URL: &str = "https://app.test/confirm";

/// Build a test `ServerConfig` with safe defaults and cheap password hashing.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        token: TokenConfig {
            secret: "integration-test-secret".to_string(),
            clock_skew_secs: 0,
            admin_token_ttl_hours: 168,
        },
        login: LoginPolicy::default(),
        session: SessionPolicy::default(),
        require_client_fingerprint: false,
        password: PasswordPolicy {
            min_length: 8,
            memory_kib: 1024,
            iterations: 1,
        },
        settings_key: EncryptionKey([42; 32]),
        mail: MailConfig {
            from_address: "noreply@gatekeep.test".to_string(),
            timeout_secs: 1,
            confirm_url: CONFIRM_URL.to_string(),
        },
    }
}

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Recording mailer
// ---------------------------------------------------------------------------

/// Keeps sent messages in memory. Can be switched to fail every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// The approval token from the newest login email.
    pub fn last_approval_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let html = &sent.last().expect("no email was sent").html;
        let start = html.find("token=").expect("email has no token link") + "token=".len();
        let end = html[start..].find('"').expect("unterminated link") + start;
        html[start..end].to_string()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::NotConfigured);
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The full router plus handles on the in-memory backends behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers over the
/// in-memory store, a manual clock starting at [`t0`] and a recording mailer.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let mailer = Arc::new(RecordingMailer::default());
    let passwords = Passwords::new(&config.password).expect("test argon2 params are valid");

    let state = AppState::new(
        config,
        passwords,
        Backends {
            store: store.clone(),
            mailer: mailer.clone(),
            clock: clock.clone(),
            ids: Arc::new(RandomIds),
        },
    );

    TestApp {
        router: build_app_router(state),
        store,
        clock,
        mailer,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", "Mozilla/5.0 (X11; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0")
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, json_request(Method::GET, uri, None, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, json_request(Method::GET, uri, Some(token), None)).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, None, Some(body))).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, Some(token), Some(body))).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, Some(token), Some(body))).await
}

pub async fn patch_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, json_request(Method::PATCH, uri, Some(token), None)).await
}

/// `GET` with the login handoff header instead of a bearer token.
pub async fn get_with_handoff(app: Router, uri: &str, login_token: &str) -> Response<Body> {
    send(app, handoff_request(Method::GET, uri, login_token)).await
}

/// `PATCH` with the login handoff header instead of a bearer token.
pub async fn patch_with_handoff(app: Router, uri: &str, login_token: &str) -> Response<Body> {
    send(app, handoff_request(Method::PATCH, uri, login_token)).await
}

fn handoff_request(method: Method, uri: &str, login_token: &str) -> Request<Body> {
    let mut request = json_request(method, uri, None, None);
    request
        .headers_mut()
        .insert("x-login-token", login_token.parse().unwrap());
    request
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// Register the first admin (open registration) and sign in. Returns the
/// admin token.
pub async fn bootstrap_admin(app: &TestApp) -> String {
    let response = post_json(
        app.app(),
        "/api/v1/admins",
        serde_json::json!({
            "name": "Root",
            "username": "root",
            "password": "correct horse",
            "repeat_password": "correct horse",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        app.app(),
        "/api/v1/admins/login",
        serde_json::json!({ "username": "root", "password": "correct horse" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

/// Request a login token for `email`. Returns the handoff token from the
/// response and the approval token from the email.
pub async fn request_login(app: &TestApp, email: &str) -> (String, String) {
    let response = post_json(
        app.app(),
        "/api/v1/login-tokens",
        serde_json::json!({ "email": email }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let handoff = json["data"]["token"].as_str().unwrap().to_string();
    (handoff, app.mailer.last_approval_token())
}

pub async fn decide(app: &TestApp, approval_token: &str, approve: bool) -> Response<Body> {
    post_json(
        app.app(),
        "/api/v1/login-tokens/decision",
        serde_json::json!({ "token": approval_token, "approve": approve }),
    )
    .await
}

/// Full passwordless sign-in. Returns the session token and the user JSON.
pub async fn sign_in(app: &TestApp, email: &str) -> (String, Value) {
    let (handoff, approval) = request_login(app, email).await;
    assert_eq!(decide(app, &approval, true).await.status(), StatusCode::OK);

    let response = get_with_handoff(app.app(), "/api/v1/users/me", &handoff).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let token = json["data"]["session_token"].as_str().unwrap().to_string();
    (token, json["data"]["user"].clone())
}
