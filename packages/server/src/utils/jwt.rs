use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use common::Role;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const ONBOARDING_PURPOSE: &str = "onboarding";

/// Session token claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Email
    pub uid: i32,    // Admin or technician ID, depending on role
    pub role: Role,
    pub permissions: Vec<String>,
    pub force_password_change: bool,
    /// Account session version at signing; a password change revokes the token.
    pub ver: i32,
    pub exp: usize, // Expiration timestamp
}

/// Claims of a single-use onboarding link.
#[derive(Debug, Serialize, Deserialize)]
pub struct OnboardingClaims {
    pub sub: String,
    pub uid: i32,
    pub role: Role,
    pub purpose: String,
    /// Must equal the nonce stored on the account to be redeemable.
    pub nonce: String,
    pub exp: usize,
}

fn expiry(ttl: Duration) -> Result<usize> {
    let Some(at) = Utc::now().checked_add_signed(ttl) else {
        bail!("token lifetime out of range");
    };
    Ok(at.timestamp() as usize)
}

/// Sign a session token for an account.
pub fn sign(
    account_id: i32,
    email: &str,
    role: Role,
    force_password_change: bool,
    session_version: i32,
    secret: &str,
    ttl_hours: i64,
) -> Result<String> {
    let claims = Claims {
        sub: email.to_owned(),
        uid: account_id,
        role,
        permissions: role.permissions(),
        force_password_change,
        ver: session_version,
        exp: expiry(Duration::hours(ttl_hours))?,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a session token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Sign an onboarding token bound to `nonce`.
pub fn sign_onboarding(
    account_id: i32,
    email: &str,
    role: Role,
    nonce: &str,
    secret: &str,
    ttl_minutes: i64,
) -> Result<String> {
    let claims = OnboardingClaims {
        sub: email.to_owned(),
        uid: account_id,
        role,
        purpose: ONBOARDING_PURPOSE.to_string(),
        nonce: nonce.to_owned(),
        exp: expiry(Duration::minutes(ttl_minutes))?,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verify an onboarding token. Session tokens are rejected.
pub fn verify_onboarding(token: &str, secret: &str) -> Result<OnboardingClaims> {
    let claims = decode::<OnboardingClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;
    if claims.purpose != ONBOARDING_PURPOSE {
        bail!("not an onboarding token");
    }
    Ok(claims)
}
