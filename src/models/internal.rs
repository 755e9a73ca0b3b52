use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Classified intent of a message, as reported by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Inquiry,
    Scheduling,
    Objection,
    Information,
    Offtopic,
    Goodbye,
    /// Tag for the outbound hand-off notice, never produced by the model.
    Escalation,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Inquiry => "inquiry",
            Intent::Scheduling => "scheduling",
            Intent::Objection => "objection",
            Intent::Information => "information",
            Intent::Offtopic => "offtopic",
            Intent::Goodbye => "goodbye",
            Intent::Escalation => "escalation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "greeting" => Some(Intent::Greeting),
            "inquiry" => Some(Intent::Inquiry),
            "scheduling" => Some(Intent::Scheduling),
            "objection" => Some(Intent::Objection),
            "information" => Some(Intent::Information),
            "offtopic" => Some(Intent::Offtopic),
            "goodbye" => Some(Intent::Goodbye),
            "escalation" => Some(Intent::Escalation),
            _ => None,
        }
    }

    /// Model output uses free text; anything unrecognized counts as an inquiry.
    pub fn parse_or_inquiry(s: &str) -> Self {
        Self::parse(s.trim()).unwrap_or(Intent::Inquiry)
    }
}

/// The closed set of qualification fields the responder may extract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum QualificationField {
    Service,
    Urgency,
    Property,
    Name,
    Address,
    PreferredTime,
}

impl QualificationField {
    pub const ALL: [QualificationField; 6] = [
        QualificationField::Service,
        QualificationField::Urgency,
        QualificationField::Property,
        QualificationField::Name,
        QualificationField::Address,
        QualificationField::PreferredTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationField::Service => "service",
            QualificationField::Urgency => "urgency",
            QualificationField::Property => "property",
            QualificationField::Name => "name",
            QualificationField::Address => "address",
            QualificationField::PreferredTime => "preferred_time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "service" => Some(QualificationField::Service),
            "urgency" => Some(QualificationField::Urgency),
            "property" => Some(QualificationField::Property),
            "name" => Some(QualificationField::Name),
            "address" => Some(QualificationField::Address),
            "preferred_time" => Some(QualificationField::PreferredTime),
            _ => None,
        }
    }

    /// The question the assistant still needs answered for this field.
    pub fn question(&self) -> &'static str {
        match self {
            QualificationField::Service => "What service do you need?",
            QualificationField::Urgency => "How urgent is this?",
            QualificationField::Property => "Is this a home or a business?",
            QualificationField::Name => "What is your name?",
            QualificationField::Address => "What is the service address?",
            QualificationField::PreferredTime => "When works best for you?",
        }
    }
}

/// Merge-only map of qualification field values accumulated across turns.
///
/// Each merge may add or overwrite individual keys; keys absent from the
/// incoming set are preserved. Nothing is ever cleared wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CollectedInfo(BTreeMap<QualificationField, String>);

impl CollectedInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: QualificationField) -> Option<&str> {
        self.0.get(&field).map(|s| s.as_str())
    }

    pub fn insert(&mut self, field: QualificationField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    /// Per-field last-write-wins merge.
    pub fn merge(&mut self, other: &CollectedInfo) {
        for (field, value) in &other.0 {
            self.0.insert(*field, value.clone());
        }
    }

    /// Fields not yet answered, in a stable order.
    pub fn missing(&self) -> Vec<QualificationField> {
        QualificationField::ALL
            .iter()
            .copied()
            .filter(|f| !self.0.contains_key(f))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QualificationField, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds a set from a loose string map, dropping unknown keys.
    pub fn from_raw<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut info = Self::new();
        for (key, value) in pairs {
            if let Some(field) = QualificationField::parse(key) {
                info.insert(field, value);
            }
        }
        info
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    AppointmentSet,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::AppointmentSet => "appointment_set",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(LeadStatus::New),
            "contacted" => Some(LeadStatus::Contacted),
            "qualified" => Some(LeadStatus::Qualified),
            "appointment_set" => Some(LeadStatus::AppointmentSet),
            "converted" => Some(LeadStatus::Converted),
            "lost" => Some(LeadStatus::Lost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    MissedCall,
    Sms,
    Manual,
    Website,
    Referral,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::MissedCall => "missed_call",
            LeadSource::Sms => "sms",
            LeadSource::Manual => "manual",
            LeadSource::Website => "website",
            LeadSource::Referral => "referral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "missed_call" => Some(LeadSource::MissedCall),
            "sms" => Some(LeadSource::Sms),
            "manual" => Some(LeadSource::Manual),
            "website" => Some(LeadSource::Website),
            "referral" => Some(LeadSource::Referral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ConversationStatus::Active),
            "closed" => Some(ConversationStatus::Closed),
            _ => None,
        }
    }
}

/// Whether the automatic responder may act on a conversation.
///
/// The ai -> human transition is one-way from the automation's perspective;
/// reverting is a manual dashboard action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    Ai,
    Human,
}

impl ConversationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationMode::Ai => "ai",
            ConversationMode::Human => "human",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(ConversationMode::Ai),
            "human" => Some(ConversationMode::Human),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(Direction::Inbound),
            "outbound" => Some(Direction::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Ai,
    Human,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Customer => "customer",
            SenderType::Ai => "ai",
            SenderType::Human => "human",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(SenderType::Customer),
            "ai" => Some(SenderType::Ai),
            "human" => Some(SenderType::Human),
            _ => None,
        }
    }
}

/// A provisioned business with its AI settings. Provisioning itself is a
/// dashboard concern; the core only reads these rows.
#[derive(Debug, Clone, Serialize)]
pub struct Business {
    pub id: Uuid,
    pub phone_number: String,
    pub name: String,
    pub assistant_name: String,
    pub services: Vec<String>,
    pub pricing_notes: Option<String>,
    pub business_hours: Option<String>,
    pub auto_response_enabled: bool,
    pub greeting_delay_secs: u32,
    pub max_messages_before_human: u32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub phone_number: String,
    pub name: String,
    pub assistant_name: String,
    pub services: Vec<String>,
    pub pricing_notes: Option<String>,
    pub business_hours: Option<String>,
    pub auto_response_enabled: bool,
    pub greeting_delay_secs: u32,
    pub max_messages_before_human: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lead {
    pub id: Uuid,
    pub business_id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    pub status: LeadStatus,
    pub service_needed: Option<String>,
    pub urgency: Option<String>,
    pub property_type: Option<String>,
    pub source: LeadSource,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub business_id: Uuid,
    pub lead_id: Uuid,
    pub customer_phone: String,
    pub status: ConversationStatus,
    pub mode: ConversationMode,
    pub collected_info: CollectedInfo,
    pub last_intent: Option<Intent>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub direction: Direction,
    pub sender_type: SenderType,
    pub content: String,
    pub intent: Option<Intent>,
    pub confidence: Option<f32>,
    pub provider_sid: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub direction: Direction,
    pub sender_type: SenderType,
    pub content: String,
    pub intent: Option<Intent>,
    pub confidence: Option<f32>,
    pub provider_sid: Option<String>,
}

/// One recorded call attempt, kept for reporting whether or not a business
/// matched the dialed number.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub id: Uuid,
    pub business_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub caller_phone: String,
    pub destination_phone: String,
    pub call_sid: String,
    pub call_status: String,
    pub processed: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCallRecord {
    pub business_id: Option<Uuid>,
    pub caller_phone: String,
    pub destination_phone: String,
    pub call_sid: String,
    pub call_status: String,
}

/// Call statuses that should trigger the missed-call greeting flow.
pub fn is_missed_call_status(status: &str) -> bool {
    matches!(status, "no-answer" | "busy" | "failed")
}
