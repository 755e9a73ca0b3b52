use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::api::dto::*;
use crate::api::rate_limiter::{rate_limit_middleware, RateLimiter};
use crate::api::webhooks;
use crate::auth::webhook_token_middleware;
use crate::config::Config;
use crate::orchestrator::ConversationOrchestrator;
use crate::storage::repository::LeadRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub repo: Arc<dyn LeadRepository>,
    pub orchestrator: Arc<ConversationOrchestrator>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Leadline Controller", description = "Missed-call to SMS lead qualification"),
    components(schemas(VoiceWebhookForm, SmsWebhookForm, HealthResponse, ErrorResponse))
)]
struct ApiDoc;

pub async fn health(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_router(state: AppState, limiter: RateLimiter) -> Router {
    let webhook_routes = Router::new()
        .route("/webhooks/voice", post(webhooks::voice_webhook))
        .route("/webhooks/sms", post(webhooks::sms_webhook))
        .route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            webhook_token_middleware,
        ));

    Router::new()
        .merge(webhook_routes)
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
