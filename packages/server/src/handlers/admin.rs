use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::{Role, perm};
use sea_orm::*;
use tracing::instrument;

use crate::entity::admin;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::live::Collection;
use crate::models::account::{
    AdminResponse, CreateAdminRequest, CreatedAdminResponse, OnboardingGrant, UpdateAdminRequest,
    validate_admin_email,
};
use crate::state::AppState;
use crate::utils::onboarding;

async fn find_admin<C: ConnectionTrait>(db: &C, id: i32) -> Result<admin::Model, AppError> {
    admin::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".into()))
}

async fn email_in_use<C: ConnectionTrait>(db: &C, email: &str) -> Result<bool, DbErr> {
    Ok(admin::Entity::find()
        .filter(admin::Column::Email.eq(email))
        .count(db)
        .await?
        > 0)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Admins",
    operation_id = "listAdmins",
    summary = "List admins",
    description = "Admins ordered by email. Requires `admin:manage` permission.",
    responses(
        (status = 200, description = "Admins", body = Vec<AdminResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_admins(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminResponse>>, AppError> {
    auth_user.require_permission(perm::ADMIN_MANAGE)?;

    let rows = admin::Entity::find()
        .order_by_asc(admin::Column::Email)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Admins",
    operation_id = "createAdmin",
    summary = "Add an admin",
    description = "Creates the account with a random temporary password and returns its onboarding grant. Requires `admin:manage` permission.",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = CreatedAdminResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Email already used (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_admin(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(perm::ADMIN_MANAGE)?;
    let email = validate_admin_email(&payload.email)?;

    if email_in_use(&state.db, &email).await? {
        return Err(AppError::EmailTaken);
    }

    let credentials = onboarding::new_credentials(&state.config)?;
    let model = admin::ActiveModel {
        email: Set(email),
        password_hash: Set(credentials.password_hash.clone()),
        force_password_change: Set(true),
        onboarding_nonce: Set(Some(credentials.nonce.clone())),
        session_version: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(AppError::from_email_write)?;
    state.live.touch(Collection::Admins);
    tracing::info!(admin_id = model.id, "Admin created");

    let onboarding = onboarding::grant(&state.config, Role::Admin, model.id, &model.email, credentials)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedAdminResponse {
            admin: model.into(),
            onboarding,
        }),
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Admins",
    operation_id = "updateAdmin",
    summary = "Change an admin's email",
    description = "Requires `admin:manage` permission.",
    params(("id" = i32, Path, description = "Admin ID")),
    request_body = UpdateAdminRequest,
    responses(
        (status = 200, description = "Admin updated", body = AdminResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Admin not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Email already used (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_admin(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateAdminRequest>,
) -> Result<Json<AdminResponse>, AppError> {
    auth_user.require_permission(perm::ADMIN_MANAGE)?;
    let existing = find_admin(&state.db, id).await?;
    let email = validate_admin_email(&payload.email)?;

    if email == existing.email {
        return Ok(Json(existing.into()));
    }
    if email_in_use(&state.db, &email).await? {
        return Err(AppError::EmailTaken);
    }

    let mut active: admin::ActiveModel = existing.into();
    active.email = Set(email);
    let model = active
        .update(&state.db)
        .await
        .map_err(AppError::from_email_write)?;
    state.live.touch(Collection::Admins);

    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/reset-password",
    tag = "Admins",
    operation_id = "resetAdminPassword",
    summary = "Issue a new temporary password",
    description = "Replaces the password with a new temporary one, forces a change on next login and invalidates earlier onboarding links. Requires `admin:manage` permission.",
    params(("id" = i32, Path, description = "Admin ID")),
    responses(
        (status = 200, description = "New onboarding grant", body = OnboardingGrant),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Admin not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn reset_admin_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<OnboardingGrant>, AppError> {
    auth_user.require_permission(perm::ADMIN_MANAGE)?;
    let existing = find_admin(&state.db, id).await?;
    let credentials = onboarding::new_credentials(&state.config)?;

    let session_version = existing.session_version + 1;
    let mut active: admin::ActiveModel = existing.into();
    active.password_hash = Set(credentials.password_hash.clone());
    active.session_version = Set(session_version);
    active.force_password_change = Set(true);
    active.onboarding_nonce = Set(Some(credentials.nonce.clone()));
    let model = active.update(&state.db).await?;
    state.live.touch(Collection::Admins);
    tracing::info!(admin_id = id, "Admin password reset");

    let grant = onboarding::grant(&state.config, Role::Admin, model.id, &model.email, credentials)?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Admins",
    operation_id = "deleteAdmin",
    summary = "Delete an admin",
    description = "Refused while this is the only admin. Requires `admin:manage` permission.",
    params(("id" = i32, Path, description = "Admin ID")),
    responses(
        (status = 204, description = "Admin deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Admin not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Last remaining admin (LAST_ADMIN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_admin(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(perm::ADMIN_MANAGE)?;

    // Lock every admin row so concurrent deletes see each other's result.
    let txn = state.db.begin().await?;
    let ids: Vec<i32> = admin::Entity::find()
        .select_only()
        .column(admin::Column::Id)
        .lock_exclusive()
        .into_tuple()
        .all(&txn)
        .await?;
    if !ids.contains(&id) {
        return Err(AppError::NotFound("Admin not found".into()));
    }
    if ids.len() <= 1 {
        return Err(AppError::LastAdmin);
    }
    admin::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    state.live.touch(Collection::Admins);
    tracing::info!(admin_id = id, "Admin deleted");

    Ok(StatusCode::NO_CONTENT)
}
