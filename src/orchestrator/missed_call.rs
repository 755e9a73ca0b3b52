//! Missed-call handling: record the attempt, then greet the caller over SMS
//! exactly once per active conversation window.

use std::sync::Arc;
use std::time::Duration;

use crate::models::internal::{
    is_missed_call_status, Business, CallRecord, Direction, Intent, LeadSource, LeadStatus,
    NewCallRecord, NewMessage, SenderType,
};
use crate::orchestrator::OrchestratorError;
use crate::services::responder::render_greeting;
use crate::services::sms_client::TwilioClient;
use crate::storage::repository::LeadRepository;

/// Inbound voice event, already decoded from the provider webhook.
#[derive(Debug, Clone)]
pub struct MissedCallEvent {
    pub destination: String,
    pub caller: String,
    pub call_status: String,
    pub call_sid: String,
}

/// What the voice webhook should say back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceDisposition {
    /// No business is provisioned for the dialed number.
    NumberInactive,
    Acknowledged,
}

#[derive(Clone)]
pub struct MissedCallFlow {
    repo: Arc<dyn LeadRepository>,
    sms: TwilioClient,
    /// Upper bound on the configured greeting delay.
    delay_cap_secs: u64,
}

impl MissedCallFlow {
    pub fn new(repo: Arc<dyn LeadRepository>, sms: TwilioClient, delay_cap_secs: u64) -> Self {
        Self {
            repo,
            sms,
            delay_cap_secs,
        }
    }

    /// Entry point for the voice webhook. Returns the disposition for the
    /// spoken response immediately; the greeting SMS runs on a spawned task
    /// and can never fail the call's own response.
    pub async fn handle(&self, event: MissedCallEvent) -> VoiceDisposition {
        let business = match self.repo.find_business_by_phone(&event.destination).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Business lookup failed for {}: {}", event.destination, e);
                None
            }
        };

        // Recorded unconditionally, for reporting, whether or not a business
        // matched. A failure here must not affect the voice response.
        let record = match self
            .repo
            .record_call(NewCallRecord {
                business_id: business.as_ref().map(|b| b.id),
                caller_phone: event.caller.clone(),
                destination_phone: event.destination.clone(),
                call_sid: event.call_sid.clone(),
                call_status: event.call_status.clone(),
            })
            .await
        {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!("Failed to record call {}: {}", event.call_sid, e);
                None
            }
        };

        let Some(business) = business else {
            return VoiceDisposition::NumberInactive;
        };

        if is_missed_call_status(&event.call_status) {
            let flow = self.clone();
            let caller = event.caller.clone();
            tokio::spawn(async move {
                if let Err(e) = flow.greet(business, record, caller).await {
                    tracing::warn!("Missed-call greeting flow failed: {}", e);
                }
            });
        }

        VoiceDisposition::Acknowledged
    }

    async fn greet(
        &self,
        business: Business,
        record: Option<CallRecord>,
        caller: String,
    ) -> Result<(), OrchestratorError> {
        if !business.auto_response_enabled {
            tracing::debug!("Auto-response disabled for business {}", business.id);
            return Ok(());
        }

        // An ongoing thread must not be re-greeted.
        if self
            .repo
            .find_active_conversation(business.id, &caller)
            .await?
            .is_some()
        {
            tracing::debug!("Active conversation exists for {}, skipping greeting", caller);
            return Ok(());
        }

        let lead = self
            .repo
            .find_or_create_lead(business.id, &caller, LeadSource::MissedCall)
            .await?;

        let (conversation, created) = self
            .repo
            .ensure_active_conversation(business.id, lead.id, &caller)
            .await?;
        if !created {
            // A concurrent duplicate event created it first; its greeting is
            // already on the way.
            return Ok(());
        }

        let greeting = render_greeting(&business.name, &business.assistant_name);

        let delay = (business.greeting_delay_secs as u64).min(self.delay_cap_secs);
        if delay > 0 {
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }

        let receipt = self
            .sms
            .send_sms(&caller, &business.phone_number, &greeting)
            .await?;

        self.repo
            .insert_message(NewMessage {
                conversation_id: conversation.id,
                direction: Direction::Outbound,
                sender_type: SenderType::Ai,
                content: greeting,
                intent: Some(Intent::Greeting),
                confidence: None,
                provider_sid: Some(receipt.sid),
            })
            .await?;

        self.repo
            .set_lead_status(lead.id, LeadStatus::Contacted)
            .await?;

        if let Some(record) = record {
            self.repo.mark_call_processed(record.id, lead.id).await?;
        }

        tracing::info!(
            "Sent missed-call greeting to {} for business {}",
            caller,
            business.id
        );
        Ok(())
    }
}
