//! Escalation policy: the one-way ai -> human decision, expressed as an
//! ordered rule list so precedence is testable and extensible.

use crate::models::internal::Intent;

pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.4;
pub const OBJECTION_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Fixed reply sent in place of the AI's own when a conversation escalates.
pub const HANDOFF_MESSAGE: &str =
    "Thanks for the details! I'm connecting you with a team member who will follow up shortly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    MaxMessagesReached,
    LowConfidence,
    ObjectionHandling,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::MaxMessagesReached => "max_messages_reached",
            EscalationReason::LowConfidence => "low_confidence",
            EscalationReason::ObjectionHandling => "objection_handling",
        }
    }
}

/// Inputs to the escalation decision for one turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnSignals {
    /// Messages persisted in the conversation, including the inbound turn
    /// being answered.
    pub message_count_so_far: u64,
    pub max_messages_before_human: u32,
    pub intent: Intent,
    pub confidence: f32,
}

type Predicate = fn(&TurnSignals) -> bool;

/// Rules in precedence order; the first match wins.
fn rules() -> [(EscalationReason, Predicate); 3] {
    [
        (EscalationReason::MaxMessagesReached, |s| {
            s.message_count_so_far + 1 >= s.max_messages_before_human as u64
        }),
        (EscalationReason::LowConfidence, |s| {
            s.confidence < LOW_CONFIDENCE_THRESHOLD
        }),
        (EscalationReason::ObjectionHandling, |s| {
            s.intent == Intent::Objection && s.confidence < OBJECTION_CONFIDENCE_THRESHOLD
        }),
    ]
}

pub fn evaluate(signals: &TurnSignals) -> Option<EscalationReason> {
    rules()
        .into_iter()
        .find(|(_, predicate)| predicate(signals))
        .map(|(reason, _)| reason)
}
