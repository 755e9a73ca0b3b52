//! Integration tests exercising the webhook -> orchestrator -> storage stack
//! against a temporary SQLite database and mocked provider endpoints.

mod repository_test;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tempfile::TempDir;
use tokio::sync::RwLock;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadline_controller::config::Config;
use leadline_controller::models::internal::NewBusiness;
use leadline_controller::orchestrator::ConversationOrchestrator;
use leadline_controller::services::responder::AiResponder;
use leadline_controller::services::sms_client::TwilioClient;
use leadline_controller::storage::repository::{LeadRepository, SeaOrmLeadRepository};
use leadline_controller::storage::init_db;
use leadline_controller::{create_router, AppState, RateLimiter};

pub const BUSINESS_PHONE: &str = "+15550001111";
pub const CUSTOMER_PHONE: &str = "+15551230001";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<SeaOrmLeadRepository>,
    pub twilio: MockServer,
    pub ai: MockServer,
    // Keeps the SQLite file alive for the duration of the test.
    _db_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(1000, None).await
}

pub async fn spawn_app_with(rate_limit: u32, webhook_token: Option<String>) -> TestApp {
    let db_dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}", db_dir.path().join("test.db").display());
    let db = init_db(&db_url).await.unwrap();
    let repo = Arc::new(SeaOrmLeadRepository::new(db));

    let twilio = MockServer::start().await;
    let ai = MockServer::start().await;

    let sms_client = TwilioClient::new(twilio.uri(), "ACTEST".to_string(), "token".to_string());
    let responder = AiResponder::new(ai.uri(), "test-key".to_string(), "gemini-test".to_string());

    let orchestrator = Arc::new(ConversationOrchestrator::new(
        repo.clone() as Arc<dyn LeadRepository>,
        sms_client,
        responder,
        0,
    ));

    let config = Config {
        server_port: 8080,
        database_url: db_url,
        twilio_api_url: twilio.uri(),
        twilio_account_sid: "ACTEST".to_string(),
        twilio_auth_token: "token".to_string(),
        ai_api_url: ai.uri(),
        ai_api_key: "test-key".to_string(),
        ai_model: "gemini-test".to_string(),
        webhook_token,
        greeting_delay_cap_secs: 0,
        rate_limit_per_minute: Some(rate_limit),
        log_level: "info".to_string(),
    };

    let state = AppState {
        config: Arc::new(RwLock::new(config)),
        repo: repo.clone() as Arc<dyn LeadRepository>,
        orchestrator,
    };

    TestApp {
        router: create_router(state, RateLimiter::new(rate_limit)),
        repo,
        twilio,
        ai,
        _db_dir: db_dir,
    }
}

pub fn default_business() -> NewBusiness {
    NewBusiness {
        phone_number: BUSINESS_PHONE.to_string(),
        name: "Joe's Plumbing".to_string(),
        assistant_name: "Sarah".to_string(),
        services: vec!["leak repair".to_string(), "drain cleaning".to_string()],
        pricing_notes: None,
        business_hours: Some("Mon-Fri 8am-6pm".to_string()),
        auto_response_enabled: true,
        greeting_delay_secs: 0,
        max_messages_before_human: 10,
    }
}

/// Percent-encodes a phone number for a form body (only `+` needs escaping).
pub fn enc(phone: &str) -> String {
    phone.replace('+', "%2B")
}

pub fn voice_form(to: &str, from: &str, status: &str, sid: &str) -> String {
    format!(
        "To={}&From={}&CallStatus={}&CallSid={}",
        enc(to),
        enc(from),
        status,
        sid
    )
}

pub fn sms_form(to: &str, from: &str, body: &str, sid: &str) -> String {
    format!(
        "To={}&From={}&Body={}&MessageSid={}",
        enc(to),
        enc(from),
        body.replace(' ', "+"),
        sid
    )
}

pub async fn post_form(app: &TestApp, uri: &str, body: String) -> axum::response::Response {
    use tower::ServiceExt;

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body))
        .unwrap();

    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> axum::response::Response {
    use tower::ServiceExt;

    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Mounts a Twilio Messages endpoint that acknowledges every send.
pub async fn mount_twilio_send(server: &MockServer, sid: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/ACTEST/Messages.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "sid": sid,
            "status": "queued"
        })))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts a model endpoint whose single candidate carries `text`.
pub async fn mount_ai_reply(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": text}]}}
            ]
        })))
        .mount(server)
        .await;
}
