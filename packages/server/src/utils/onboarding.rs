use chrono::{Duration, Utc};
use common::Role;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::account::OnboardingGrant;
use crate::utils::{hash, jwt, password, qr};

/// Fresh temporary credentials for an account.
pub struct TempCredentials {
    pub temporary_password: String,
    pub password_hash: String,
    /// Stored on the account; binds the next onboarding token.
    pub nonce: String,
}

pub fn new_credentials(config: &AppConfig) -> Result<TempCredentials, AppError> {
    let temporary_password = password::generate_temp_password(config.auth.temp_password_length);
    let password_hash = hash::hash_password(&temporary_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
    Ok(TempCredentials {
        temporary_password,
        password_hash,
        nonce: password::generate_nonce(),
    })
}

/// Build the onboarding link, its QR code and the one-time view of the password.
pub fn grant(
    config: &AppConfig,
    role: Role,
    account_id: i32,
    email: &str,
    credentials: TempCredentials,
) -> Result<OnboardingGrant, AppError> {
    let ttl = config.auth.onboarding_ttl_minutes;
    let token = jwt::sign_onboarding(
        account_id,
        email,
        role,
        &credentials.nonce,
        &config.auth.jwt_secret,
        ttl,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    let onboarding_url = format!(
        "{}/onboarding?token={}",
        config.app.public_base_url.trim_end_matches('/'),
        token
    );
    let qr_svg = qr::svg_for(&onboarding_url)?;

    Ok(OnboardingGrant {
        email: email.to_string(),
        temporary_password: credentials.temporary_password,
        onboarding_url,
        qr_svg,
        expires_at: Utc::now() + Duration::minutes(ttl),
    })
}
