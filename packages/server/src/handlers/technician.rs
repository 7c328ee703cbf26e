use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::import::{ImportBatch, ImportLine};
use common::{Role, perm};
use sea_orm::*;
use tracing::instrument;

use crate::entity::technician;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::live::Collection;
use crate::models::account::*;
use crate::models::import::{
    ImportRequest, ImportSummary, TechnicianImportResponse, validate_import_request,
};
use crate::state::AppState;
use crate::utils::onboarding;

async fn find_technician<C: ConnectionTrait>(db: &C, id: i32) -> Result<technician::Model, AppError> {
    technician::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Technician not found".into()))
}

async fn email_in_use<C: ConnectionTrait>(
    db: &C,
    email: &str,
    except_id: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = technician::Entity::find().filter(technician::Column::Email.eq(email));
    if let Some(id) = except_id {
        query = query.filter(technician::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// Insert a technician with fresh temporary credentials and build their grant.
async fn insert_with_grant(
    state: &AppState,
    fields: TechnicianFields,
) -> Result<(technician::Model, OnboardingGrant), AppError> {
    let credentials = onboarding::new_credentials(&state.config)?;

    let model = technician::ActiveModel {
        name: Set(fields.name),
        email: Set(fields.email),
        phone: Set(fields.phone),
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

    let grant = onboarding::grant(&state.config, Role::Student, model.id, &model.email, credentials)?;
    Ok((model, grant))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Technicians",
    operation_id = "listTechnicians",
    summary = "List technicians",
    description = "Technicians ordered by name. Requires `technician:view` permission.",
    responses(
        (status = 200, description = "Technicians", body = Vec<TechnicianResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_technicians(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TechnicianResponse>>, AppError> {
    auth_user.require_permission(perm::TECHNICIAN_VIEW)?;

    let rows = technician::Entity::find()
        .order_by_asc(technician::Column::Name)
        .order_by_asc(technician::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Technicians",
    operation_id = "createTechnician",
    summary = "Add a technician",
    description = "Creates the account with a random temporary password and returns its onboarding grant. The password is only shown in this response. Requires `technician:manage` permission.",
    request_body = CreateTechnicianRequest,
    responses(
        (status = 201, description = "Technician created", body = CreatedTechnicianResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Email already used (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_technician(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTechnicianRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(perm::TECHNICIAN_MANAGE)?;
    let fields = validate_technician(&payload.name, &payload.email, payload.phone.as_deref())?;

    if email_in_use(&state.db, &fields.email, None).await? {
        return Err(AppError::EmailTaken);
    }

    let (model, onboarding) = insert_with_grant(&state, fields).await?;
    state.live.touch(Collection::Technicians);
    tracing::info!(technician_id = model.id, "Technician created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedTechnicianResponse {
            technician: model.into(),
            onboarding,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/import",
    tag = "Technicians",
    operation_id = "importTechnicians",
    summary = "Bulk add technicians from pasted lines",
    description = "Same line format and counting rules as the customer import. Every added technician gets an onboarding grant. Requires `technician:manage` permission.",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Import summary with onboarding grants", body = TechnicianImportResponse),
        (status = 400, description = "Nothing pasted (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn import_technicians(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImportRequest>,
) -> Result<Json<TechnicianImportResponse>, AppError> {
    auth_user.require_permission(perm::TECHNICIAN_MANAGE)?;
    validate_import_request(&payload)?;

    let existing: Vec<String> = technician::Entity::find()
        .select_only()
        .column(technician::Column::Email)
        .into_tuple()
        .all(&state.db)
        .await?;
    let mut batch = ImportBatch::new(existing.iter().map(String::as_str));
    let mut summary = ImportSummary::default();
    let mut grants = Vec::new();

    for line in ImportBatch::lines(&payload.text) {
        let entry = match batch.check(line) {
            ImportLine::Candidate(entry) => entry,
            ImportLine::Duplicate(email) => {
                summary.duplicates += 1;
                summary.duplicate_emails.push(email);
                continue;
            }
            ImportLine::Skipped => {
                summary.skipped += 1;
                continue;
            }
        };

        let fields = match validate_technician(&entry.name, &entry.email, entry.phone.as_deref()) {
            Ok(fields) => fields,
            Err(_) => {
                tracing::warn!(email = %entry.email, "Skipping technician with invalid email");
                summary.skipped += 1;
                continue;
            }
        };

        match insert_with_grant(&state, fields).await {
            Ok((model, grant)) => {
                batch.mark_added(&model.email);
                summary.added += 1;
                grants.push(grant);
            }
            Err(e) => {
                tracing::warn!(email = %entry.email, error = ?e, "Failed to import technician");
                summary.failed += 1;
            }
        }
    }

    if summary.added > 0 {
        state.live.touch(Collection::Technicians);
    }
    tracing::info!(
        added = summary.added,
        duplicates = summary.duplicates,
        skipped = summary.skipped,
        failed = summary.failed,
        "Technician import finished"
    );

    Ok(Json(TechnicianImportResponse {
        summary,
        onboarding: grants,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Technicians",
    operation_id = "updateTechnician",
    summary = "Edit a technician",
    description = "Only provided fields change. Email uniqueness is re-checked when it changes. Requires `technician:manage` permission.",
    params(("id" = i32, Path, description = "Technician ID")),
    request_body = UpdateTechnicianRequest,
    responses(
        (status = 200, description = "Technician updated", body = TechnicianResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Technician not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Email already used (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_technician(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTechnicianRequest>,
) -> Result<Json<TechnicianResponse>, AppError> {
    auth_user.require_permission(perm::TECHNICIAN_MANAGE)?;
    let existing = find_technician(&state.db, id).await?;

    let phone = match payload.phone {
        Some(phone) => phone,
        None => existing.phone.clone(),
    };
    let fields = validate_technician(
        payload.name.as_deref().unwrap_or(&existing.name),
        payload.email.as_deref().unwrap_or(&existing.email),
        phone.as_deref(),
    )?;

    if fields.email != existing.email && email_in_use(&state.db, &fields.email, Some(id)).await? {
        return Err(AppError::EmailTaken);
    }

    let mut active: technician::ActiveModel = existing.into();
    active.name = Set(fields.name);
    active.email = Set(fields.email);
    active.phone = Set(fields.phone);
    let model = active
        .update(&state.db)
        .await
        .map_err(AppError::from_email_write)?;
    state.live.touch(Collection::Technicians);

    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/reset-password",
    tag = "Technicians",
    operation_id = "resetTechnicianPassword",
    summary = "Issue a new temporary password",
    description = "Replaces the password with a new temporary one, forces a change on next login and invalidates earlier onboarding links. Requires `technician:manage` permission.",
    params(("id" = i32, Path, description = "Technician ID")),
    responses(
        (status = 200, description = "New onboarding grant", body = OnboardingGrant),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Technician not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn reset_technician_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<OnboardingGrant>, AppError> {
    auth_user.require_permission(perm::TECHNICIAN_MANAGE)?;
    let existing = find_technician(&state.db, id).await?;
    let credentials = onboarding::new_credentials(&state.config)?;

    let session_version = existing.session_version + 1;
    let mut active: technician::ActiveModel = existing.into();
    active.password_hash = Set(credentials.password_hash.clone());
    active.session_version = Set(session_version);
    active.force_password_change = Set(true);
    active.onboarding_nonce = Set(Some(credentials.nonce.clone()));
    let model = active.update(&state.db).await?;
    state.live.touch(Collection::Technicians);
    tracing::info!(technician_id = id, "Technician password reset");

    let grant = onboarding::grant(&state.config, Role::Student, model.id, &model.email, credentials)?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Technicians",
    operation_id = "deleteTechnician",
    summary = "Delete a technician",
    description = "Repairs keep their recorded assignee name. Requires `technician:manage` permission.",
    params(("id" = i32, Path, description = "Technician ID")),
    responses(
        (status = 204, description = "Technician deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Technician not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_technician(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(perm::TECHNICIAN_MANAGE)?;

    let result = technician::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Technician not found".into()));
    }
    state.live.touch(Collection::Technicians);
    tracing::info!(technician_id = id, "Technician deleted");

    Ok(StatusCode::NO_CONTENT)
}
