use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::customer;
use crate::error::AppError;

use super::repair::RepairResponse;
use super::shared::require_text;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCustomerRequest {
    #[schema(example = "Ann Lee")]
    pub full_name: String,
    #[schema(example = "ann@example.com")]
    pub email: Option<String>,
    #[schema(example = "555-0100")]
    pub phone: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateCustomerRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Trimmed customer fields ready to store.
pub struct CustomerFields {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

/// A customer needs a name and at least one way to be reached.
pub fn validate_customer(full_name: &str, email: &str, phone: &str) -> Result<CustomerFields, AppError> {
    let full_name = require_text(full_name, "Full name")?;
    let email = email.trim().to_string();
    let phone = phone.trim().to_string();
    if email.is_empty() && phone.is_empty() {
        return Err(AppError::Validation(
            "Provide an email or a phone number".into(),
        ));
    }
    Ok(CustomerFields {
        full_name,
        email,
        phone,
    })
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct CustomerListQuery {
    /// Case-insensitive match on name or email, substring match on phone.
    pub search: Option<String>,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct CustomerResponse {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<customer::Model> for CustomerResponse {
    fn from(m: customer::Model) -> Self {
        Self {
            id: m.id,
            full_name: m.full_name,
            email: m.email,
            phone: m.phone,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CustomerDetailResponse {
    #[serde(flatten)]
    pub customer: CustomerResponse,
    /// Repairs of this customer visible to the caller, newest first.
    pub repairs: Vec<RepairResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BulkDeleteRequest {
    #[schema(example = json!([4, 7]))]
    pub ids: Vec<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}
