use rand::Rng;

use crate::error::AppError;

const TEMP_PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";

pub const MIN_PASSWORD_LEN: usize = 8;

/// Generate a random temporary password without look-alike characters.
pub fn generate_temp_password(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len.max(MIN_PASSWORD_LEN))
        .map(|_| TEMP_PASSWORD_CHARSET[rng.random_range(0..TEMP_PASSWORD_CHARSET.len())] as char)
        .collect()
}

/// Random nonce binding an onboarding token to the account.
pub fn generate_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Validate a new password and its confirmation.
pub fn validate_new_password(new_password: &str, confirm_password: &str) -> Result<(), AppError> {
    if new_password.is_empty() || confirm_password.is_empty() {
        return Err(AppError::Validation("Please fill in both fields".into()));
    }
    if new_password != confirm_password {
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
