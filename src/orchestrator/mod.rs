pub mod escalation;
pub mod inbound_sms;
pub mod missed_call;

use std::sync::Arc;

use crate::services::responder::AiResponder;
use crate::services::sms_client::TwilioClient;
use crate::storage::repository::{LeadRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("SMS send error: {0}")]
    Sms(#[from] crate::services::sms_client::SmsError),
    #[error("Responder error: {0}")]
    Responder(#[from] crate::services::responder::ResponderError),
}

/// Composes the two webhook-driven flows over shared repo and clients.
pub struct ConversationOrchestrator {
    pub missed_calls: missed_call::MissedCallFlow,
    pub turns: inbound_sms::TurnProcessor,
}

impl ConversationOrchestrator {
    pub fn new(
        repo: Arc<dyn LeadRepository>,
        sms: TwilioClient,
        responder: AiResponder,
        greeting_delay_cap_secs: u64,
    ) -> Self {
        Self {
            missed_calls: missed_call::MissedCallFlow::new(
                repo.clone(),
                sms.clone(),
                greeting_delay_cap_secs,
            ),
            turns: inbound_sms::TurnProcessor::new(repo, sms, responder),
        }
    }

    pub async fn handle_missed_call(
        &self,
        event: missed_call::MissedCallEvent,
    ) -> missed_call::VoiceDisposition {
        self.missed_calls.handle(event).await
    }

    pub async fn process_inbound_sms(
        &self,
        event: inbound_sms::InboundSmsEvent,
    ) -> Result<(), OrchestratorError> {
        self.turns.process(event).await
    }
}
