use chrono::{DateTime, Utc};
use common::RepairStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::repair;
use crate::error::AppError;

use super::shared::{optional_text, require_text};

/// Request body for checking a device in.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRepairRequest {
    #[schema(example = 3)]
    pub customer_id: i32,
    #[schema(example = "Phone")]
    pub device_type: String,
    #[schema(example = "Apple")]
    pub brand: String,
    #[schema(example = "iPhone 13")]
    pub model: String,
    #[schema(example = "Cracked screen, battery drains fast")]
    pub problem_notes: String,
    /// Unlock code, stored as entered.
    pub password_pin: Option<String>,
    #[serde(default)]
    #[schema(example = json!(["Charger", "Case"]))]
    pub accessories: Vec<String>,
    /// Drawn signature as a data URL, or a typed name.
    pub signature: String,
    /// Admin only: assign a technician at intake instead of "To Be Determined".
    pub technician_id: Option<i32>,
}

/// Validated, trimmed intake fields.
pub struct RepairIntake {
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub problem_notes: String,
    pub password_pin: Option<String>,
    pub accessories: Vec<String>,
    pub signature: String,
}

pub fn validate_create_repair(payload: &CreateRepairRequest) -> Result<RepairIntake, AppError> {
    let intake = RepairIntake {
        device_type: require_text(&payload.device_type, "Device type")?,
        brand: require_text(&payload.brand, "Brand")?,
        model: require_text(&payload.model, "Model")?,
        problem_notes: require_text(&payload.problem_notes, "Problem notes")?,
        password_pin: optional_text(payload.password_pin.as_deref()),
        accessories: normalize_accessories(&payload.accessories),
        signature: payload.signature.trim().to_string(),
    };
    if intake.signature.is_empty() {
        return Err(AppError::Validation(
            "A customer signature is required".into(),
        ));
    }
    Ok(intake)
}

/// Trim, drop blanks and de-duplicate case-insensitively, keeping first spelling.
pub fn normalize_accessories(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim();
        if item.is_empty() || out.iter().any(|o| o.eq_ignore_ascii_case(item)) {
            continue;
        }
        out.push(item.to_string());
    }
    out
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "In Progress")]
    pub status: RepairStatus,
}

/// Technician assignment. `technician_id` wins when both are given.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AssignTechnicianRequest {
    pub technician_id: Option<i32>,
    /// Legacy free-text assignee, matched against technician names and emails.
    #[schema(example = "Bob")]
    pub name: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct RepairListQuery {
    /// Only repairs in this status (e.g. `In Progress`).
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct RepairResponse {
    pub id: i32,
    pub public_token: Uuid,
    /// Short reference customers can read out over the phone.
    #[schema(example = "3FA85C")]
    pub short_id: String,
    /// Public status page for this ticket.
    pub status_url: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub problem_notes: String,
    pub password_pin: Option<String>,
    pub accessories: Vec<String>,
    pub signature: String,
    pub status: RepairStatus,
    pub assigned_technician_id: Option<i32>,
    pub assigned_to_name: String,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Public status page URL for a token.
pub fn status_url(public_base_url: &str, token: &Uuid) -> String {
    format!(
        "{}/repair-status/{}",
        public_base_url.trim_end_matches('/'),
        token
    )
}

/// Last six hex digits of the token, upper-cased.
pub fn short_id(token: &Uuid) -> String {
    let simple = token.simple().to_string();
    simple[simple.len() - 6..].to_uppercase()
}

impl RepairResponse {
    pub fn from_model(m: repair::Model, public_base_url: &str) -> Self {
        let accessories = m.accessory_list();
        Self {
            id: m.id,
            short_id: short_id(&m.public_token),
            status_url: status_url(public_base_url, &m.public_token),
            public_token: m.public_token,
            customer_id: m.customer_id,
            customer_name: m.customer_name,
            device_type: m.device_type,
            brand: m.brand,
            model: m.model,
            problem_notes: m.problem_notes,
            password_pin: m.password_pin,
            accessories,
            signature: m.signature,
            status: m.status,
            assigned_technician_id: m.assigned_technician_id,
            assigned_to_name: m.assigned_to_name,
            created_at: m.created_at,
            ready_at: m.ready_at,
            archived_at: m.archived_at,
        }
    }
}

/// Archived repair with its resolved technician.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ArchivedRepair {
    #[serde(flatten)]
    pub repair: RepairResponse,
    /// A donation exists for the same customer and device.
    pub donated: bool,
}

/// Archived repairs of one technician.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ArchiveGroup {
    #[schema(example = "Bob")]
    pub technician_name: String,
    pub repairs: Vec<ArchivedRepair>,
}

/// Unauthenticated status view shown to customers.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PublicRepairResponse {
    pub short_id: String,
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub status: RepairStatus,
    #[schema(example = "A technician is currently working on your device.")]
    pub status_message: String,
    #[schema(example = "Bob")]
    pub technician_name: String,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}
