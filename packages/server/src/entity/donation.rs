use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Snapshot of the donor at the time of donation; not a foreign key.
    pub customer_id: i32,
    pub customer_name: String,

    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub notes: String,

    /// Email of the admin who recorded the donation.
    pub received_by: String,
    pub donated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
