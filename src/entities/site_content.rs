use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-row table; the row id is always [`SITE_CONTENT_ID`].
pub const SITE_CONTENT_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site_content")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(skip_serializing)]
    pub id: i32,
    pub footer_text: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub payment_qr_url: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
