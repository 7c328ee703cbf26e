use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::donation;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateDonationRequest {
    pub customer_id: i32,
    #[schema(example = "Laptop")]
    pub device_type: String,
    #[schema(example = "Dell")]
    pub brand: String,
    #[schema(example = "Latitude 5490")]
    pub model: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct DonationResponse {
    pub id: i32,
    pub customer_id: i32,
    pub customer_name: String,
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub notes: String,
    pub received_by: String,
    pub donated_at: DateTime<Utc>,
}

impl From<donation::Model> for DonationResponse {
    fn from(m: donation::Model) -> Self {
        Self {
            id: m.id,
            customer_id: m.customer_id,
            customer_name: m.customer_name,
            device_type: m.device_type,
            brand: m.brand,
            model: m.model,
            notes: m.notes,
            received_by: m.received_by,
            donated_at: m.donated_at,
        }
    }
}
