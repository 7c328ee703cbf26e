use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use common::Role;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::account::{self, Account};
use crate::utils::jwt::{self, Claims};

/// Authenticated account extracted from the `Authorization: Bearer <token>` header.
///
/// The account is re-read on every request, so `email` is the current one.
///
/// Add this as a handler parameter to require authentication.
/// Permission checks happen via `require_permission()` in the handler body.
/// Tokens issued for a temporary password are rejected with
/// `PASSWORD_CHANGE_REQUIRED`; use [`AccountUser`] where those must pass.
pub struct AuthUser {
    pub account_id: i32,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Returns `Ok(())` if the user has the given permission, `Err(PermissionDenied)` otherwise.
    pub fn require_permission(&self, permission: &str) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Any holder of a valid session token, including one that must still
/// change a temporary password.
pub struct AccountUser {
    pub account_id: i32,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub force_password_change: bool,
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Read the bearer token from the header, falling back to `?access_token=`
/// for clients such as `EventSource` that cannot set headers.
fn bearer_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(header) = parts.headers.get("Authorization") {
        let value = header.to_str().map_err(|_| AppError::TokenInvalid)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;
        return Ok(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.access_token)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::TokenMissing)
}

fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let token = bearer_token(parts)?;
    jwt::verify(&token, &state.config.auth.jwt_secret).map_err(|_| AppError::TokenInvalid)
}

/// Verify the token and load the account behind it. Tokens of deleted
/// accounts, or signed before the last password change, are rejected.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<(Claims, Account), AppError> {
    let claims = claims_from_parts(parts, state)?;
    let account = account::find_by_id(&state.db, claims.role, claims.uid)
        .await?
        .ok_or(AppError::TokenInvalid)?;
    if account.session_version != claims.ver {
        tracing::debug!(account_id = account.id, "Revoked session token");
        return Err(AppError::TokenInvalid);
    }
    Ok((claims, account))
}

impl FromRequestParts<AppState> for AccountUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (claims, account) = authenticate(parts, state).await?;

        Ok(AccountUser {
            account_id: account.id,
            email: account.email,
            role: claims.role,
            permissions: claims.permissions,
            force_password_change: account.force_password_change,
        })
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (claims, account) = authenticate(parts, state).await?;
        if account.force_password_change {
            return Err(AppError::PasswordChangeRequired);
        }

        Ok(AuthUser {
            account_id: account.id,
            email: account.email,
            role: claims.role,
            permissions: claims.permissions,
        })
    }
}
