//! Leadline Controller - missed-call to SMS lead qualification

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;

// Re-export for convenience
pub use services::responder::AiResponder;
pub use services::sms_client::TwilioClient;

// Re-export main types for convenience
pub use crate::api::rate_limiter::RateLimiter;
pub use crate::api::routes::{create_router, AppState};
pub use crate::config::Config;
pub use crate::models::internal::{
    Business, CollectedInfo, Conversation, ConversationMode, Intent, Lead, Message,
    QualificationField,
};
pub use crate::orchestrator::ConversationOrchestrator;
pub use crate::storage::db::init_db;
pub use crate::storage::repository::{LeadRepository, SeaOrmLeadRepository};
