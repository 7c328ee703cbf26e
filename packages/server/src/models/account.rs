use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{admin, technician};
use crate::error::AppError;

use super::shared::{normalize_email, optional_text, require_text, validate_email};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTechnicianRequest {
    #[schema(example = "Bob")]
    pub name: String,
    #[schema(example = "bob@example.com")]
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateTechnicianRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `null` clears the phone number.
    #[serde(default, deserialize_with = "super::shared::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
}

/// Trimmed technician fields; email lowercased.
pub struct TechnicianFields {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

pub fn validate_technician(
    name: &str,
    email: &str,
    phone: Option<&str>,
) -> Result<TechnicianFields, AppError> {
    let name = require_text(name, "Name")?;
    let email = normalize_email(&require_text(email, "Email")?);
    validate_email(&email)?;
    Ok(TechnicianFields {
        name,
        email,
        phone: optional_text(phone),
    })
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateAdminRequest {
    #[schema(example = "owner@example.com")]
    pub email: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateAdminRequest {
    pub email: String,
}

pub fn validate_admin_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(&require_text(email, "Email")?);
    validate_email(&email)?;
    Ok(email)
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct TechnicianResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub force_password_change: bool,
    pub created_at: DateTime<Utc>,
}

impl From<technician::Model> for TechnicianResponse {
    fn from(m: technician::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            phone: m.phone,
            force_password_change: m.force_password_change,
            created_at: m.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct AdminResponse {
    pub id: i32,
    pub email: String,
    pub force_password_change: bool,
    pub created_at: DateTime<Utc>,
}

impl From<admin::Model> for AdminResponse {
    fn from(m: admin::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            force_password_change: m.force_password_change,
            created_at: m.created_at,
        }
    }
}

/// Credentials handed to the creating admin once.
///
/// The onboarding URL carries only a short-lived signed token; the
/// temporary password never appears in it.
#[derive(Serialize, utoipa::ToSchema)]
pub struct OnboardingGrant {
    pub email: String,
    #[schema(example = "Xk4mPq9RtW2z")]
    pub temporary_password: String,
    pub onboarding_url: String,
    /// SVG QR code of `onboarding_url`.
    pub qr_svg: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CreatedTechnicianResponse {
    pub technician: TechnicianResponse,
    pub onboarding: OnboardingGrant,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CreatedAdminResponse {
    pub admin: AdminResponse,
    pub onboarding: OnboardingGrant,
}
