//! Inbound-SMS turn processing: the mode gate, the responder call, and the
//! escalation decision.

use std::sync::Arc;

use crate::models::internal::{
    Business, Conversation, ConversationMode, Direction, Intent, LeadSource, NewMessage,
    SenderType,
};
use crate::orchestrator::escalation::{self, EscalationReason, TurnSignals, HANDOFF_MESSAGE};
use crate::orchestrator::OrchestratorError;
use crate::services::responder::{AiReply, AiResponder, ResponseContext};
use crate::services::sms_client::TwilioClient;
use crate::storage::repository::LeadRepository;

/// Inbound SMS event, already decoded from the provider webhook.
#[derive(Debug, Clone)]
pub struct InboundSmsEvent {
    pub destination: String,
    pub sender: String,
    pub body: String,
    pub message_sid: String,
}

#[derive(Clone)]
pub struct TurnProcessor {
    repo: Arc<dyn LeadRepository>,
    sms: TwilioClient,
    responder: AiResponder,
}

impl TurnProcessor {
    pub fn new(repo: Arc<dyn LeadRepository>, sms: TwilioClient, responder: AiResponder) -> Self {
        Self {
            repo,
            sms,
            responder,
        }
    }

    /// Processes one customer turn end to end. A responder failure is not an
    /// error for the webhook: the inbound message stays persisted and the
    /// customer simply gets no reply this turn.
    pub async fn process(&self, event: InboundSmsEvent) -> Result<(), OrchestratorError> {
        let Some(business) = self.repo.find_business_by_phone(&event.destination).await? else {
            tracing::warn!("Inbound SMS for unknown number {}", event.destination);
            return Ok(());
        };

        let conversation = match self
            .repo
            .find_active_conversation(business.id, &event.sender)
            .await?
        {
            Some(c) => c,
            None => {
                let lead = self
                    .repo
                    .find_or_create_lead(business.id, &event.sender, LeadSource::Sms)
                    .await?;
                let (conversation, _created) = self
                    .repo
                    .ensure_active_conversation(business.id, lead.id, &event.sender)
                    .await?;
                conversation
            }
        };

        // History for the prompt is read before the inbound insert so the new
        // message appears only as the final user turn.
        let history = self.repo.get_conversation_messages(conversation.id).await?;

        // The inbound message is persisted before any mode check: history
        // must reflect everything received.
        self.repo
            .insert_message(NewMessage {
                conversation_id: conversation.id,
                direction: Direction::Inbound,
                sender_type: SenderType::Customer,
                content: event.body.clone(),
                intent: None,
                confidence: None,
                provider_sid: Some(event.message_sid.clone()),
            })
            .await?;

        // Mode gate: once a human owns the thread, the automation stays out.
        if conversation.mode == ConversationMode::Human {
            tracing::debug!("Conversation {} in human mode, no auto-reply", conversation.id);
            return Ok(());
        }

        let context = ResponseContext {
            business_name: business.name.clone(),
            assistant_name: business.assistant_name.clone(),
            services: business.services.clone(),
            pricing_notes: business.pricing_notes.clone(),
            business_hours: business.business_hours.clone(),
            collected_info: conversation.collected_info.clone(),
            history: history.clone(),
        };

        let reply = match self.responder.respond(&context, &event.body).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    "Responder failed for conversation {}: {}",
                    conversation.id,
                    e
                );
                return Ok(());
            }
        };

        let signals = TurnSignals {
            message_count_so_far: history.len() as u64 + 1,
            max_messages_before_human: business.max_messages_before_human,
            intent: reply.intent,
            confidence: reply.confidence,
        };

        match escalation::evaluate(&signals) {
            Some(reason) => {
                self.escalate(&business, &conversation, &event.sender, reason)
                    .await
            }
            None => {
                self.apply_reply(&business, &conversation, &event.sender, reply)
                    .await
            }
        }
    }

    /// One-way transition to human mode; the fixed hand-off notice replaces
    /// the AI's own reply and this turn's extractions are discarded.
    async fn escalate(
        &self,
        business: &Business,
        conversation: &Conversation,
        sender: &str,
        reason: EscalationReason,
    ) -> Result<(), OrchestratorError> {
        tracing::info!(
            "Escalating conversation {} to human ({})",
            conversation.id,
            reason.as_str()
        );

        self.repo
            .set_conversation_mode(conversation.id, ConversationMode::Human)
            .await?;

        let receipt = self
            .sms
            .send_sms(sender, &business.phone_number, HANDOFF_MESSAGE)
            .await?;

        self.repo
            .insert_message(NewMessage {
                conversation_id: conversation.id,
                direction: Direction::Outbound,
                sender_type: SenderType::Ai,
                content: HANDOFF_MESSAGE.to_string(),
                intent: Some(Intent::Escalation),
                confidence: None,
                provider_sid: Some(receipt.sid),
            })
            .await?;

        Ok(())
    }

    async fn apply_reply(
        &self,
        business: &Business,
        conversation: &Conversation,
        sender: &str,
        reply: AiReply,
    ) -> Result<(), OrchestratorError> {
        let receipt = self
            .sms
            .send_sms(sender, &business.phone_number, &reply.response)
            .await?;

        self.repo
            .insert_message(NewMessage {
                conversation_id: conversation.id,
                direction: Direction::Outbound,
                sender_type: SenderType::Ai,
                content: reply.response.clone(),
                intent: Some(reply.intent),
                confidence: Some(reply.confidence),
                provider_sid: Some(receipt.sid),
            })
            .await?;

        self.repo
            .update_conversation_context(
                conversation.id,
                &reply.collected_info,
                Some(reply.intent),
            )
            .await?;

        // Only this turn's extraction touches the lead; the accumulated map
        // would overwrite fields edited out of band.
        self.repo
            .apply_lead_qualification(conversation.lead_id, &reply.extracted)
            .await?;

        Ok(())
    }
}
