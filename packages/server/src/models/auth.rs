use common::Role;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Account email; matched case-insensitively.
    #[schema(example = "admin@example.com")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// Which account table to check. Defaults to `Admin`.
    #[serde(default)]
    pub role: Role,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    /// The account still uses a temporary password; only `/auth/me` and
    /// `/auth/password` accept this token until it is changed.
    pub force_password_change: bool,
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub email: String,
    pub role: Role,
    #[schema(example = json!(["repair:create"]))]
    pub permissions: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub force_password_change: bool,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct OnboardingRequest {
    /// Token from the onboarding link.
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}
