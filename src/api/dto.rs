use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ==================== WEBHOOK PAYLOADS ====================

/// Voice status webhook, form-encoded by the telephony provider.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct VoiceWebhookForm {
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "CallStatus")]
    pub call_status: String,
    #[serde(rename = "CallSid")]
    pub call_sid: String,
}

/// Inbound SMS webhook, form-encoded by the telephony provider.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SmsWebhookForm {
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "MessageSid")]
    pub message_sid: String,
}

// ==================== RESPONSE DTOs ====================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}
