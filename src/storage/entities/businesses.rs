use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "businesses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub phone_number: String,
    pub name: String,
    pub assistant_name: String,
    /// JSON array of offered services.
    pub services: String,
    pub pricing_notes: Option<String>,
    pub business_hours: Option<String>,
    pub auto_response_enabled: bool,
    pub greeting_delay_secs: i64,
    pub max_messages_before_human: i64,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
