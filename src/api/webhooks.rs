//! The two provider-facing webhook handlers. Both always answer with a TwiML
//! document: provider webhooks expect acknowledgment regardless of internal
//! processing outcome, so no processing failure surfaces as a 5xx.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Form,
};

use crate::api::dto::{SmsWebhookForm, VoiceWebhookForm};
use crate::api::routes::AppState;
use crate::api::twiml;
use crate::orchestrator::inbound_sms::InboundSmsEvent;
use crate::orchestrator::missed_call::{MissedCallEvent, VoiceDisposition};

pub async fn voice_webhook(
    State(state): State<AppState>,
    Form(form): Form<VoiceWebhookForm>,
) -> Response {
    tracing::info!(
        "Voice webhook: {} -> {} ({})",
        form.from,
        form.to,
        form.call_status
    );

    let disposition = state
        .orchestrator
        .handle_missed_call(MissedCallEvent {
            destination: form.to,
            caller: form.from,
            call_status: form.call_status,
            call_sid: form.call_sid,
        })
        .await;

    let message = match disposition {
        VoiceDisposition::NumberInactive => "This number is not currently in service. Goodbye.",
        VoiceDisposition::Acknowledged => {
            "Sorry we missed your call. We'll text you back in just a moment."
        }
    };

    xml_response(twiml::voice_say(message))
}

pub async fn sms_webhook(
    State(state): State<AppState>,
    Form(form): Form<SmsWebhookForm>,
) -> Response {
    tracing::info!("SMS webhook: {} -> {}", form.from, form.to);

    if let Err(e) = state
        .orchestrator
        .process_inbound_sms(InboundSmsEvent {
            destination: form.to,
            sender: form.from,
            body: form.body,
            message_sid: form.message_sid,
        })
        .await
    {
        tracing::error!("Inbound SMS processing failed: {}", e);
    }

    xml_response(twiml::empty_response())
}

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}
