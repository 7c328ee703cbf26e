use axum::{Json, extract::State};
use common::Role;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{admin, technician};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AccountUser;
use crate::extractors::json::AppJson;
use crate::live::Collection;
use crate::models::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, OnboardingRequest,
    validate_login_request,
};
use crate::models::shared::normalize_email;
use crate::state::AppState;
use crate::utils::account::{self, Account};
use crate::utils::{hash, jwt, password};

/// Store a permanent password: clears the change flag and any pending
/// onboarding token, and revokes earlier sessions. Returns the new session
/// version.
async fn store_password<C: ConnectionTrait>(
    db: &C,
    role: Role,
    account: &Account,
    new_password: &str,
) -> Result<i32, AppError> {
    let id = account.id;
    let session_version = account.session_version + 1;
    let password_hash = hash::hash_password(new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    match role {
        Role::Admin => {
            admin::ActiveModel {
                id: Set(id),
                password_hash: Set(password_hash),
                force_password_change: Set(false),
                onboarding_nonce: Set(None),
                session_version: Set(session_version),
                ..Default::default()
            }
            .update(db)
            .await?;
        }
        Role::Student => {
            technician::ActiveModel {
                id: Set(id),
                password_hash: Set(password_hash),
                force_password_change: Set(false),
                onboarding_nonce: Set(None),
                session_version: Set(session_version),
                ..Default::default()
            }
            .update(db)
            .await?;
        }
    }
    Ok(session_version)
}

fn login_response(
    state: &AppState,
    role: Role,
    account_id: i32,
    email: String,
    force_password_change: bool,
    session_version: i32,
) -> Result<LoginResponse, AppError> {
    let token = jwt::sign(
        account_id,
        &email,
        role,
        force_password_change,
        session_version,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(LoginResponse {
        success: true,
        force_password_change,
        token,
        email,
        role,
        permissions: role.permissions(),
    })
}

fn account_collection(role: Role) -> Collection {
    match role {
        Role::Admin => Collection::Admins,
        Role::Student => Collection::Technicians,
    }
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in as an admin or a technician",
    description = "Looks the email up case-insensitively in the account table selected by `role` (default `Admin`) and verifies the password. Unknown emails and wrong passwords both yield `INVALID_CREDENTIALS`.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(role = %payload.role))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let email = normalize_email(&payload.email);
    let account = account::find_by_email(&state.db, payload.role, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &account.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(account_id = account.id, "Login succeeded");
    let response = login_response(
        &state,
        payload.role,
        account.id,
        account.email,
        account.force_password_change,
        account.session_version,
    )?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the current session",
    description = "Returns the identity behind the token. Accepts tokens that still require a password change.",
    responses(
        (status = 200, description = "Current session", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(account), fields(account_id = account.account_id))]
pub async fn me(account: AccountUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: account.account_id,
        email: account.email,
        role: account.role,
        permissions: account.permissions,
        force_password_change: account.force_password_change,
    })
}

#[utoipa::path(
    post,
    path = "/password",
    tag = "Auth",
    operation_id = "changePassword",
    summary = "Change the current account's password",
    description = "Sets a new password (at least 8 characters, confirmed) and clears the forced-change flag. Returns a fresh token without the flag.",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, account, payload), fields(account_id = account.account_id))]
pub async fn change_password(
    account: AccountUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    password::validate_new_password(&payload.new_password, &payload.confirm_password)?;

    let existing = account::find_by_id(&state.db, account.role, account.account_id)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let session_version =
        store_password(&state.db, account.role, &existing, &payload.new_password).await?;
    state.live.touch(account_collection(account.role));

    let response = login_response(
        &state,
        account.role,
        existing.id,
        existing.email,
        false,
        session_version,
    )?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/onboarding",
    tag = "Auth",
    operation_id = "redeemOnboarding",
    summary = "Set a password from an onboarding link",
    description = "Redeems the short-lived token of an onboarding link, sets the chosen password and logs the account in. Each token works once and is invalidated by a later password reset.",
    request_body = OnboardingRequest,
    responses(
        (status = 200, description = "Password set and logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Expired, used or invalid link (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn redeem_onboarding(
    State(state): State<AppState>,
    AppJson(payload): AppJson<OnboardingRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let claims = jwt::verify_onboarding(&payload.token, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::TokenInvalid)?;
    password::validate_new_password(&payload.new_password, &payload.confirm_password)?;

    let txn = state.db.begin().await?;

    let account = account::find_by_id(&txn, claims.role, claims.uid)
        .await?
        .ok_or(AppError::TokenInvalid)?;
    if account.onboarding_nonce.as_deref() != Some(claims.nonce.as_str())
        || account.email != claims.sub
    {
        tracing::debug!(account_id = account.id, "Stale onboarding token");
        return Err(AppError::TokenInvalid);
    }

    let session_version =
        store_password(&txn, claims.role, &account, &payload.new_password).await?;
    txn.commit().await?;

    state.live.touch(account_collection(claims.role));
    tracing::info!(account_id = account.id, "Onboarding completed");

    let response = login_response(
        &state,
        claims.role,
        account.id,
        account.email,
        false,
        session_version,
    )?;
    Ok(Json(response))
}
