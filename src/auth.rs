//! Optional shared-token check for the webhook endpoints.
//!
//! When `webhook_token` is unset the middleware passes everything through;
//! provider signature validation stays an infrastructure concern.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::routes::AppState;

pub async fn webhook_token_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.config.read().await.webhook_token.clone();
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get("x-webhook-token")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| token_from_query(request.uri().query()));

    if provided.as_deref() == Some(expected.as_str()) {
        next.run(request).await
    } else {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Invalid webhook token" })),
        )
            .into_response()
    }
}

fn token_from_query(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .map(str::to_string)
}
