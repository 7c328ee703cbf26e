use common::RepairStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repair")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Key of the public status page.
    #[sea_orm(unique)]
    pub public_token: Uuid,

    /// Snapshot of the customer at intake; not a foreign key.
    pub customer_id: i32,
    pub customer_name: String,

    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub problem_notes: String,
    /// Device unlock code, kept as entered.
    pub password_pin: Option<String>,
    /// JSON array of accessory names.
    #[sea_orm(column_type = "Json")]
    pub accessories: serde_json::Value,
    /// Data URL of a drawn signature or a typed name.
    pub signature: String,

    pub status: RepairStatus,
    pub assigned_technician_id: Option<i32>,
    pub assigned_to_name: String,

    pub created_at: DateTimeUtc,
    pub ready_at: Option<DateTimeUtc>,
    pub archived_at: Option<DateTimeUtc>,
}

impl Model {
    pub fn lifecycle(&self) -> common::Lifecycle {
        common::Lifecycle {
            status: self.status,
            created_at: self.created_at,
            ready_at: self.ready_at,
            archived_at: self.archived_at,
        }
    }

    pub fn accessory_list(&self) -> Vec<String> {
        serde_json::from_value(self.accessories.clone()).unwrap_or_default()
    }
}

impl ActiveModelBehavior for ActiveModel {}
