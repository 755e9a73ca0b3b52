use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{prelude::*, QueryOrder, Set, SqlErr};
use uuid::Uuid;

use crate::models::internal::{
    Business, CallRecord, CollectedInfo, Conversation, ConversationMode, ConversationStatus,
    Direction, Intent, Lead, LeadSource, LeadStatus, Message, NewBusiness, NewCallRecord,
    NewMessage, QualificationField, SenderType,
};
use crate::storage::entities::{businesses, call_records, conversations, leads, messages};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DbError(#[from] sea_orm::DbErr),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

// ============================================
// TRAIT DEFINITION - with Send + Sync bounds
// ============================================
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn create_business(&self, business: NewBusiness) -> Result<Business, RepositoryError>;
    async fn find_business_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<Business>, RepositoryError>;

    async fn find_or_create_lead(
        &self,
        business_id: Uuid,
        phone: &str,
        source: LeadSource,
    ) -> Result<Lead, RepositoryError>;
    async fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> Result<(), RepositoryError>;
    async fn apply_lead_qualification(
        &self,
        id: Uuid,
        info: &CollectedInfo,
    ) -> Result<(), RepositoryError>;
    async fn find_lead_by_id(&self, id: Uuid) -> Result<Option<Lead>, RepositoryError>;

    async fn find_active_conversation(
        &self,
        business_id: Uuid,
        customer_phone: &str,
    ) -> Result<Option<Conversation>, RepositoryError>;
    /// Creates the active conversation for (business, customer), or returns
    /// the existing one if another request won the race. The flag is true
    /// only when this call created the row.
    async fn ensure_active_conversation(
        &self,
        business_id: Uuid,
        lead_id: Uuid,
        customer_phone: &str,
    ) -> Result<(Conversation, bool), RepositoryError>;
    async fn set_conversation_mode(
        &self,
        id: Uuid,
        mode: ConversationMode,
    ) -> Result<(), RepositoryError>;
    async fn update_conversation_context(
        &self,
        id: Uuid,
        collected_info: &CollectedInfo,
        last_intent: Option<Intent>,
    ) -> Result<(), RepositoryError>;

    async fn insert_message(&self, message: NewMessage) -> Result<Message, RepositoryError>;
    async fn get_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, RepositoryError>;
    async fn count_messages(&self, conversation_id: Uuid) -> Result<u64, RepositoryError>;

    async fn record_call(&self, call: NewCallRecord) -> Result<CallRecord, RepositoryError>;
    async fn mark_call_processed(
        &self,
        id: Uuid,
        lead_id: Uuid,
    ) -> Result<(), RepositoryError>;

    fn get_db(&self) -> &DatabaseConnection;
}

// ============================================
// IMPLEMENTATION STRUCT
// ============================================
pub struct SeaOrmLeadRepository {
    db: DatabaseConnection,
}

impl SeaOrmLeadRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn now_string() -> String {
    chrono::Utc::now().naive_utc().to_string()
}

fn parse_ts(raw: &str) -> Result<NaiveDateTime, RepositoryError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| RepositoryError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

fn parse_id(raw: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw).map_err(|e| RepositoryError::Corrupt(format!("bad uuid '{}': {}", raw, e)))
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ============================================
// TRAIT IMPLEMENTATION
// ============================================
#[async_trait]
impl LeadRepository for SeaOrmLeadRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn create_business(&self, business: NewBusiness) -> Result<Business, RepositoryError> {
        let id = Uuid::new_v4();
        let services = serde_json::to_string(&business.services)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        let active_model = businesses::ActiveModel {
            id: Set(id.to_string()),
            phone_number: Set(business.phone_number),
            name: Set(business.name),
            assistant_name: Set(business.assistant_name),
            services: Set(services),
            pricing_notes: Set(business.pricing_notes),
            business_hours: Set(business.business_hours),
            auto_response_enabled: Set(business.auto_response_enabled),
            greeting_delay_secs: Set(business.greeting_delay_secs as i64),
            max_messages_before_human: Set(business.max_messages_before_human as i64),
            created_at: Set(now_string()),
        };

        let model = active_model.insert(&self.db).await?;
        tracing::info!("Created business: {}", id);
        business_from_model(model)
    }

    async fn find_business_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<Business>, RepositoryError> {
        let model = businesses::Entity::find()
            .filter(businesses::Column::PhoneNumber.eq(phone_number))
            .one(&self.db)
            .await?;

        model.map(business_from_model).transpose()
    }

    async fn find_or_create_lead(
        &self,
        business_id: Uuid,
        phone: &str,
        source: LeadSource,
    ) -> Result<Lead, RepositoryError> {
        let existing = leads::Entity::find()
            .filter(leads::Column::BusinessId.eq(business_id.to_string()))
            .filter(leads::Column::Phone.eq(phone))
            .one(&self.db)
            .await?;

        if let Some(model) = existing {
            return lead_from_model(model);
        }

        let id = Uuid::new_v4();
        let now = now_string();
        let active_model = leads::ActiveModel {
            id: Set(id.to_string()),
            business_id: Set(business_id.to_string()),
            phone: Set(phone.to_string()),
            name: Set(None),
            status: Set(LeadStatus::New.as_str().to_string()),
            service_needed: Set(None),
            urgency: Set(None),
            property_type: Set(None),
            source: Set(source.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        match active_model.insert(&self.db).await {
            Ok(model) => {
                tracing::info!("Created lead {} for business {}", id, business_id);
                lead_from_model(model)
            }
            // Concurrent first contact from the same phone: reuse the winner.
            Err(err) if is_unique_violation(&err) => {
                let model = leads::Entity::find()
                    .filter(leads::Column::BusinessId.eq(business_id.to_string()))
                    .filter(leads::Column::Phone.eq(phone))
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound("lead after conflict".into()))?;
                lead_from_model(model)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> Result<(), RepositoryError> {
        let model = leads::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Lead not found".to_string()))?;

        let mut active_model: leads::ActiveModel = model.into();
        active_model.status = Set(status.as_str().to_string());
        active_model.updated_at = Set(now_string());

        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn apply_lead_qualification(
        &self,
        id: Uuid,
        info: &CollectedInfo,
    ) -> Result<(), RepositoryError> {
        let model = leads::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Lead not found".to_string()))?;

        let mut active_model: leads::ActiveModel = model.into();
        let mut touched = false;

        if let Some(value) = info.get(QualificationField::Service) {
            active_model.service_needed = Set(Some(value.to_string()));
            touched = true;
        }
        if let Some(value) = info.get(QualificationField::Urgency) {
            active_model.urgency = Set(Some(value.to_string()));
            touched = true;
        }
        if let Some(value) = info.get(QualificationField::Property) {
            active_model.property_type = Set(Some(value.to_string()));
            touched = true;
        }
        if let Some(value) = info.get(QualificationField::Name) {
            active_model.name = Set(Some(value.to_string()));
            touched = true;
        }

        if touched {
            active_model.updated_at = Set(now_string());
            active_model.update(&self.db).await?;
        }
        Ok(())
    }

    async fn find_lead_by_id(&self, id: Uuid) -> Result<Option<Lead>, RepositoryError> {
        let model = leads::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        model.map(lead_from_model).transpose()
    }

    async fn find_active_conversation(
        &self,
        business_id: Uuid,
        customer_phone: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let model = conversations::Entity::find()
            .filter(conversations::Column::BusinessId.eq(business_id.to_string()))
            .filter(conversations::Column::CustomerPhone.eq(customer_phone))
            .filter(conversations::Column::Status.eq(ConversationStatus::Active.as_str()))
            .one(&self.db)
            .await?;

        model.map(conversation_from_model).transpose()
    }

    async fn ensure_active_conversation(
        &self,
        business_id: Uuid,
        lead_id: Uuid,
        customer_phone: &str,
    ) -> Result<(Conversation, bool), RepositoryError> {
        let id = Uuid::new_v4();
        let now = now_string();
        let active_model = conversations::ActiveModel {
            id: Set(id.to_string()),
            business_id: Set(business_id.to_string()),
            lead_id: Set(lead_id.to_string()),
            customer_phone: Set(customer_phone.to_string()),
            status: Set(ConversationStatus::Active.as_str().to_string()),
            mode: Set(ConversationMode::Ai.as_str().to_string()),
            collected_info: Set("{}".to_string()),
            last_intent: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        match active_model.insert(&self.db).await {
            Ok(model) => {
                tracing::info!("Created conversation {} for business {}", id, business_id);
                Ok((conversation_from_model(model)?, true))
            }
            // The partial unique index on active conversations lost us the
            // race: another request created the thread first. Reuse it.
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find_active_conversation(business_id, customer_phone)
                    .await?
                    .ok_or_else(|| {
                        RepositoryError::NotFound("active conversation after conflict".into())
                    })?;
                Ok((existing, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set_conversation_mode(
        &self,
        id: Uuid,
        mode: ConversationMode,
    ) -> Result<(), RepositoryError> {
        let model = conversations::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Conversation not found".to_string()))?;

        let mut active_model: conversations::ActiveModel = model.into();
        active_model.mode = Set(mode.as_str().to_string());
        active_model.updated_at = Set(now_string());

        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn update_conversation_context(
        &self,
        id: Uuid,
        collected_info: &CollectedInfo,
        last_intent: Option<Intent>,
    ) -> Result<(), RepositoryError> {
        let model = conversations::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Conversation not found".to_string()))?;

        let serialized = serde_json::to_string(collected_info)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        let mut active_model: conversations::ActiveModel = model.into();
        active_model.collected_info = Set(serialized);
        active_model.last_intent = Set(last_intent.map(|i| i.as_str().to_string()));
        active_model.updated_at = Set(now_string());

        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let id = Uuid::new_v4();
        let active_model = messages::ActiveModel {
            id: Set(id.to_string()),
            conversation_id: Set(message.conversation_id.to_string()),
            direction: Set(message.direction.as_str().to_string()),
            sender_type: Set(message.sender_type.as_str().to_string()),
            content: Set(message.content),
            intent: Set(message.intent.map(|i| i.as_str().to_string())),
            confidence: Set(message.confidence.map(|c| c as f64)),
            provider_sid: Set(message.provider_sid),
            created_at: Set(now_string()),
        };

        let model = active_model.insert(&self.db).await?;
        tracing::debug!("Stored message: {}", id);
        message_from_model(model)
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, RepositoryError> {
        let msg_models = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .order_by_asc(messages::Column::CreatedAt)
            .all(&self.db)
            .await?;

        msg_models.into_iter().map(message_from_model).collect()
    }

    async fn count_messages(&self, conversation_id: Uuid) -> Result<u64, RepositoryError> {
        let count = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn record_call(&self, call: NewCallRecord) -> Result<CallRecord, RepositoryError> {
        let id = Uuid::new_v4();
        let active_model = call_records::ActiveModel {
            id: Set(id.to_string()),
            business_id: Set(call.business_id.map(|b| b.to_string())),
            lead_id: Set(None),
            caller_phone: Set(call.caller_phone),
            destination_phone: Set(call.destination_phone),
            call_sid: Set(call.call_sid),
            call_status: Set(call.call_status),
            processed: Set(false),
            created_at: Set(now_string()),
        };

        let model = active_model.insert(&self.db).await?;
        call_record_from_model(model)
    }

    async fn mark_call_processed(&self, id: Uuid, lead_id: Uuid) -> Result<(), RepositoryError> {
        let model = call_records::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Call record not found".to_string()))?;

        let mut active_model: call_records::ActiveModel = model.into();
        active_model.processed = Set(true);
        active_model.lead_id = Set(Some(lead_id.to_string()));

        active_model.update(&self.db).await?;
        Ok(())
    }
}

// ============================================
// Conversions
// ============================================

fn business_from_model(model: businesses::Model) -> Result<Business, RepositoryError> {
    let services: Vec<String> = serde_json::from_str(&model.services)
        .map_err(|e| RepositoryError::Corrupt(format!("bad services json: {}", e)))?;

    Ok(Business {
        id: parse_id(&model.id)?,
        phone_number: model.phone_number,
        name: model.name,
        assistant_name: model.assistant_name,
        services,
        pricing_notes: model.pricing_notes,
        business_hours: model.business_hours,
        auto_response_enabled: model.auto_response_enabled,
        greeting_delay_secs: model.greeting_delay_secs.max(0) as u32,
        max_messages_before_human: model.max_messages_before_human.max(0) as u32,
        created_at: parse_ts(&model.created_at)?,
    })
}

fn lead_from_model(model: leads::Model) -> Result<Lead, RepositoryError> {
    Ok(Lead {
        id: parse_id(&model.id)?,
        business_id: parse_id(&model.business_id)?,
        phone: model.phone,
        name: model.name,
        status: LeadStatus::parse(&model.status)
            .ok_or_else(|| RepositoryError::Corrupt(format!("bad lead status '{}'", model.status)))?,
        service_needed: model.service_needed,
        urgency: model.urgency,
        property_type: model.property_type,
        source: LeadSource::parse(&model.source)
            .ok_or_else(|| RepositoryError::Corrupt(format!("bad lead source '{}'", model.source)))?,
        created_at: parse_ts(&model.created_at)?,
        updated_at: parse_ts(&model.updated_at)?,
    })
}

fn conversation_from_model(model: conversations::Model) -> Result<Conversation, RepositoryError> {
    let collected_info: CollectedInfo = serde_json::from_str(&model.collected_info)
        .map_err(|e| RepositoryError::Corrupt(format!("bad collected_info json: {}", e)))?;

    Ok(Conversation {
        id: parse_id(&model.id)?,
        business_id: parse_id(&model.business_id)?,
        lead_id: parse_id(&model.lead_id)?,
        customer_phone: model.customer_phone,
        status: ConversationStatus::parse(&model.status).ok_or_else(|| {
            RepositoryError::Corrupt(format!("bad conversation status '{}'", model.status))
        })?,
        mode: ConversationMode::parse(&model.mode).ok_or_else(|| {
            RepositoryError::Corrupt(format!("bad conversation mode '{}'", model.mode))
        })?,
        collected_info,
        last_intent: model.last_intent.as_deref().and_then(Intent::parse),
        created_at: parse_ts(&model.created_at)?,
        updated_at: parse_ts(&model.updated_at)?,
    })
}

fn message_from_model(model: messages::Model) -> Result<Message, RepositoryError> {
    Ok(Message {
        id: parse_id(&model.id)?,
        conversation_id: parse_id(&model.conversation_id)?,
        direction: Direction::parse(&model.direction).ok_or_else(|| {
            RepositoryError::Corrupt(format!("bad direction '{}'", model.direction))
        })?,
        sender_type: SenderType::parse(&model.sender_type).ok_or_else(|| {
            RepositoryError::Corrupt(format!("bad sender type '{}'", model.sender_type))
        })?,
        content: model.content,
        intent: model.intent.as_deref().and_then(Intent::parse),
        confidence: model.confidence.map(|c| c as f32),
        provider_sid: model.provider_sid,
        created_at: parse_ts(&model.created_at)?,
    })
}

fn call_record_from_model(model: call_records::Model) -> Result<CallRecord, RepositoryError> {
    Ok(CallRecord {
        id: parse_id(&model.id)?,
        business_id: model.business_id.as_deref().map(parse_id).transpose()?,
        lead_id: model.lead_id.as_deref().map(parse_id).transpose()?,
        caller_phone: model.caller_phone,
        destination_phone: model.destination_phone,
        call_sid: model.call_sid,
        call_status: model.call_status,
        processed: model.processed,
        created_at: parse_ts(&model.created_at)?,
    })
}
