use std::sync::Arc;

use tempfile::TempDir;

use leadline_controller::models::internal::{
    CollectedInfo, ConversationMode, Direction, Intent, LeadSource, LeadStatus, NewCallRecord,
    NewMessage, QualificationField, SenderType,
};
use leadline_controller::storage::entities::call_records;
use leadline_controller::storage::init_db;
use leadline_controller::storage::repository::{LeadRepository, SeaOrmLeadRepository};
use sea_orm::EntityTrait;

use crate::{default_business, BUSINESS_PHONE, CUSTOMER_PHONE};

async fn setup() -> (Arc<SeaOrmLeadRepository>, TempDir) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("repo.db").display());
    let db = init_db(&url).await.unwrap();
    (Arc::new(SeaOrmLeadRepository::new(db)), dir)
}

#[tokio::test]
async fn test_business_round_trip() {
    let (repo, _dir) = setup().await;

    let created = repo.create_business(default_business()).await.unwrap();
    let found = repo
        .find_business_by_phone(BUSINESS_PHONE)
        .await
        .unwrap()
        .expect("business should be found");

    assert_eq!(found.id, created.id);
    assert_eq!(found.name, "Joe's Plumbing");
    assert_eq!(found.services, vec!["leak repair", "drain cleaning"]);
    assert_eq!(found.max_messages_before_human, 10);
    assert!(found.auto_response_enabled);

    assert!(repo
        .find_business_by_phone("+19998887777")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_find_or_create_lead_is_idempotent() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();

    let first = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::MissedCall)
        .await
        .unwrap();
    assert_eq!(first.status, LeadStatus::New);
    assert_eq!(first.source, LeadSource::MissedCall);

    // Second contact from the same phone reuses the lead, source included.
    let second = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::Sms)
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.source, LeadSource::MissedCall);

    let other = repo
        .find_or_create_lead(business.id, "+15559990000", LeadSource::Sms)
        .await
        .unwrap();
    assert_ne!(other.id, first.id);
}

#[tokio::test]
async fn test_single_active_conversation_per_customer() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();
    let lead = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::MissedCall)
        .await
        .unwrap();

    let (first, created) = repo
        .ensure_active_conversation(business.id, lead.id, CUSTOMER_PHONE)
        .await
        .unwrap();
    assert!(created);
    assert_eq!(first.mode, ConversationMode::Ai);
    assert!(first.collected_info.is_empty());

    // The partial unique index turns the duplicate insert into a reuse.
    let (second, created) = repo
        .ensure_active_conversation(business.id, lead.id, CUSTOMER_PHONE)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
}

#[tokio::test]
async fn test_conversation_mode_transition() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();
    let lead = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::Sms)
        .await
        .unwrap();
    let (conversation, _) = repo
        .ensure_active_conversation(business.id, lead.id, CUSTOMER_PHONE)
        .await
        .unwrap();

    repo.set_conversation_mode(conversation.id, ConversationMode::Human)
        .await
        .unwrap();

    let reloaded = repo
        .find_active_conversation(business.id, CUSTOMER_PHONE)
        .await
        .unwrap()
        .expect("conversation should stay active");
    assert_eq!(reloaded.mode, ConversationMode::Human);
}

#[tokio::test]
async fn test_conversation_context_round_trip() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();
    let lead = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::Sms)
        .await
        .unwrap();
    let (conversation, _) = repo
        .ensure_active_conversation(business.id, lead.id, CUSTOMER_PHONE)
        .await
        .unwrap();

    let mut info = CollectedInfo::new();
    info.insert(QualificationField::Service, "water heater");
    info.insert(QualificationField::Urgency, "this week");

    repo.update_conversation_context(conversation.id, &info, Some(Intent::Scheduling))
        .await
        .unwrap();

    let reloaded = repo
        .find_active_conversation(business.id, CUSTOMER_PHONE)
        .await
        .unwrap()
        .expect("conversation should exist");
    assert_eq!(reloaded.collected_info, info);
    assert_eq!(reloaded.last_intent, Some(Intent::Scheduling));
}

#[tokio::test]
async fn test_messages_kept_in_order() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();
    let lead = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::Sms)
        .await
        .unwrap();
    let (conversation, _) = repo
        .ensure_active_conversation(business.id, lead.id, CUSTOMER_PHONE)
        .await
        .unwrap();

    for (direction, sender, content) in [
        (Direction::Inbound, SenderType::Customer, "first"),
        (Direction::Outbound, SenderType::Ai, "second"),
        (Direction::Inbound, SenderType::Customer, "third"),
    ] {
        repo.insert_message(NewMessage {
            conversation_id: conversation.id,
            direction,
            sender_type: sender,
            content: content.to_string(),
            intent: None,
            confidence: None,
            provider_sid: None,
        })
        .await
        .unwrap();
    }

    let messages = repo.get_conversation_messages(conversation.id).await.unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert_eq!(repo.count_messages(conversation.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_lead_qualification_fields() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();
    let lead = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::Sms)
        .await
        .unwrap();

    let mut info = CollectedInfo::new();
    info.insert(QualificationField::Service, "leak repair");
    info.insert(QualificationField::Urgency, "emergency");
    info.insert(QualificationField::Property, "home");
    info.insert(QualificationField::Name, "Dana");
    // Address has no lead column; it lives only in collected_info.
    info.insert(QualificationField::Address, "12 Main St");

    repo.apply_lead_qualification(lead.id, &info).await.unwrap();

    let reloaded = repo
        .find_lead_by_id(lead.id)
        .await
        .unwrap()
        .expect("lead should exist");
    assert_eq!(reloaded.service_needed.as_deref(), Some("leak repair"));
    assert_eq!(reloaded.urgency.as_deref(), Some("emergency"));
    assert_eq!(reloaded.property_type.as_deref(), Some("home"));
    assert_eq!(reloaded.name.as_deref(), Some("Dana"));
}

#[tokio::test]
async fn test_partial_qualification_leaves_other_fields() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();
    let lead = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::Sms)
        .await
        .unwrap();

    let mut info = CollectedInfo::new();
    info.insert(QualificationField::Name, "Dana");
    repo.apply_lead_qualification(lead.id, &info).await.unwrap();

    let mut update = CollectedInfo::new();
    update.insert(QualificationField::Urgency, "high");
    repo.apply_lead_qualification(lead.id, &update).await.unwrap();

    let reloaded = repo.find_lead_by_id(lead.id).await.unwrap().unwrap();
    assert_eq!(reloaded.name.as_deref(), Some("Dana"));
    assert_eq!(reloaded.urgency.as_deref(), Some("high"));
}

#[tokio::test]
async fn test_call_record_lifecycle() {
    let (repo, _dir) = setup().await;
    let business = repo.create_business(default_business()).await.unwrap();
    let lead = repo
        .find_or_create_lead(business.id, CUSTOMER_PHONE, LeadSource::MissedCall)
        .await
        .unwrap();

    let record = repo
        .record_call(NewCallRecord {
            business_id: Some(business.id),
            caller_phone: CUSTOMER_PHONE.to_string(),
            destination_phone: BUSINESS_PHONE.to_string(),
            call_sid: "CA1".to_string(),
            call_status: "no-answer".to_string(),
        })
        .await
        .unwrap();
    assert!(!record.processed);
    assert_eq!(record.lead_id, None);

    repo.mark_call_processed(record.id, lead.id).await.unwrap();

    let models = call_records::Entity::find()
        .all(repo.get_db())
        .await
        .unwrap();
    assert_eq!(models.len(), 1);
    assert!(models[0].processed);
    assert_eq!(
        models[0].lead_id.as_deref(),
        Some(lead.id.to_string().as_str())
    );
}
