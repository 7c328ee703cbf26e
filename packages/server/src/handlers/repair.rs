use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use common::assignment::{self, UNASSIGNED_SENTINEL};
use common::perm;
use common::{Lifecycle, RepairStatus, Role};
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::{customer, donation, repair, technician};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::live::Collection;
use crate::live::session::SessionScope;
use crate::models::repair::*;
use crate::state::AppState;
use crate::utils::access::{find_repair, find_visible_repair, technician_refs};
use crate::utils::qr;

fn respond(state: &AppState, model: repair::Model) -> RepairResponse {
    RepairResponse::from_model(model, &state.config.app.public_base_url)
}

fn apply_lifecycle(active: &mut repair::ActiveModel, lc: Lifecycle) {
    active.status = Set(lc.status);
    active.created_at = Set(lc.created_at);
    active.ready_at = Set(lc.ready_at);
    active.archived_at = Set(lc.archived_at);
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Repairs",
    operation_id = "createRepair",
    summary = "Check a device in",
    description = "Creates a repair ticket in `Pending` with no ready or archived time. Admins may pick a technician with `technician_id`, otherwise the ticket is assigned to \"To Be Determined\". Students are always assigned to themselves. Requires `repair:create` permission.",
    request_body = CreateRepairRequest,
    responses(
        (status = 201, description = "Repair created", body = RepairResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, PASSWORD_CHANGE_REQUIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(customer_id = payload.customer_id))]
pub async fn create_repair(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRepairRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(perm::REPAIR_CREATE)?;
    let intake = validate_create_repair(&payload)?;

    let customer = customer::Entity::find_by_id(payload.customer_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!("Customer {} does not exist", payload.customer_id))
        })?;

    let (assigned_technician_id, assigned_to_name) = match auth_user.role {
        Role::Student => {
            let me = technician::Entity::find_by_id(auth_user.account_id)
                .one(&state.db)
                .await?
                .ok_or(AppError::TokenInvalid)?;
            (Some(me.id), me.name)
        }
        Role::Admin => match payload.technician_id {
            Some(tech_id) => {
                let tech = technician::Entity::find_by_id(tech_id)
                    .one(&state.db)
                    .await?
                    .ok_or_else(|| {
                        AppError::Validation(format!("Technician {tech_id} does not exist"))
                    })?;
                (Some(tech.id), tech.name)
            }
            None => (None, UNASSIGNED_SENTINEL.to_string()),
        },
    };

    let mut new_repair = repair::ActiveModel {
        public_token: Set(Uuid::new_v4()),
        customer_id: Set(customer.id),
        customer_name: Set(customer.full_name),
        device_type: Set(intake.device_type),
        brand: Set(intake.brand),
        model: Set(intake.model),
        problem_notes: Set(intake.problem_notes),
        password_pin: Set(intake.password_pin),
        accessories: Set(serde_json::json!(intake.accessories)),
        signature: Set(intake.signature),
        assigned_technician_id: Set(assigned_technician_id),
        assigned_to_name: Set(assigned_to_name),
        ..Default::default()
    };
    apply_lifecycle(&mut new_repair, Lifecycle::intake(Utc::now()));

    let model = new_repair.insert(&state.db).await?;
    state.live.touch(Collection::Repairs);
    tracing::info!(repair_id = model.id, "Repair checked in");

    Ok((StatusCode::CREATED, Json(respond(&state, model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Repairs",
    operation_id = "listRepairs",
    summary = "List repairs",
    description = "Repairs newest first, optionally filtered by status. Students only see repairs assigned to them.",
    params(RepairListQuery),
    responses(
        (status = 200, description = "Repairs", body = Vec<RepairResponse>),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_repairs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<RepairListQuery>,
) -> Result<Json<Vec<RepairResponse>>, AppError> {
    let scope = SessionScope::load(&state.db, &auth_user).await?;

    let mut select = repair::Entity::find();
    if let Some(raw) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: RepairStatus = raw
            .parse()
            .map_err(|e: common::repair_status::ParseStatusError| {
                AppError::Validation(e.to_string())
            })?;
        select = select.filter(repair::Column::Status.eq(status));
    }

    let rows = select
        .order_by_desc(repair::Column::CreatedAt)
        .order_by_desc(repair::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(
        rows.into_iter()
            .filter(|m| scope.can_see_model(m))
            .map(|m| respond(&state, m))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Repairs",
    operation_id = "getRepair",
    summary = "Get a repair",
    params(("id" = i32, Path, description = "Repair ID")),
    responses(
        (status = 200, description = "Repair details", body = RepairResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Repair not found or not visible (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_repair(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RepairResponse>, AppError> {
    let scope = SessionScope::load(&state.db, &auth_user).await?;
    let model = find_visible_repair(&state.db, &scope, id).await?;
    Ok(Json(respond(&state, model)))
}

#[utoipa::path(
    patch,
    path = "/{id}/status",
    tag = "Repairs",
    operation_id = "updateRepairStatus",
    summary = "Change a repair's status",
    description = "Any status may follow any other. `Ready` stamps the ready time, every other status clears it (archiving included). `Archived` stamps the archive time, which later changes never clear. Students may only change repairs assigned to them. Requires `repair:update_status` permission.",
    params(("id" = i32, Path, description = "Repair ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = RepairResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Repair not found or not visible (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, status = %payload.status))]
pub async fn update_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<RepairResponse>, AppError> {
    auth_user.require_permission(perm::REPAIR_UPDATE_STATUS)?;
    let scope = SessionScope::load(&state.db, &auth_user).await?;
    let existing = find_visible_repair(&state.db, &scope, id).await?;

    let from = existing.status;
    let next = existing.lifecycle().transition(payload.status, Utc::now());
    let mut active: repair::ActiveModel = existing.into();
    apply_lifecycle(&mut active, next);
    let model = active.update(&state.db).await?;

    state.live.touch(Collection::Repairs);
    tracing::info!(repair_id = id, %from, to = %model.status, "Repair status changed");

    Ok(Json(respond(&state, model)))
}

#[utoipa::path(
    put,
    path = "/{id}/assignee",
    tag = "Repairs",
    operation_id = "assignTechnician",
    summary = "Assign a technician",
    description = "Assigns by `technician_id`, or by a legacy `name` matched against technician emails then names (case-insensitive; unmatched names are stored as given). Choosing \"To Be Determined\" changes nothing. Requires `repair:assign` permission.",
    params(("id" = i32, Path, description = "Repair ID")),
    request_body = AssignTechnicianRequest,
    responses(
        (status = 200, description = "Assignee updated (or unchanged for the placeholder)", body = RepairResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Repair not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn assign_technician(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AssignTechnicianRequest>,
) -> Result<Json<RepairResponse>, AppError> {
    auth_user.require_permission(perm::REPAIR_ASSIGN)?;
    let existing = find_repair(&state.db, id).await?;

    let (technician_id, name) = match (payload.technician_id, payload.name.as_deref()) {
        (Some(tech_id), _) => {
            let tech = technician::Entity::find_by_id(tech_id)
                .one(&state.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Technician not found".into()))?;
            (Some(tech.id), tech.name)
        }
        (None, Some(name)) if assignment::is_sentinel(name) => {
            tracing::debug!(repair_id = id, "Ignoring placeholder assignment");
            return Ok(Json(respond(&state, existing)));
        }
        (None, Some(name)) if !name.trim().is_empty() => {
            let technicians = technician_refs(&state.db).await?;
            match assignment::find_technician(name, &technicians) {
                Some(t) => (Some(t.id), t.name.clone()),
                None => (None, name.trim().to_string()),
            }
        }
        _ => {
            return Err(AppError::Validation(
                "Provide a technician_id or a name".into(),
            ));
        }
    };

    let mut active: repair::ActiveModel = existing.into();
    active.assigned_technician_id = Set(technician_id);
    active.assigned_to_name = Set(name);
    let model = active.update(&state.db).await?;

    state.live.touch(Collection::Repairs);
    Ok(Json(respond(&state, model)))
}

#[utoipa::path(
    post,
    path = "/{id}/clone",
    tag = "Repairs",
    operation_id = "cloneRepair",
    summary = "Reopen an archived repair as a new ticket",
    description = "Copies customer, device, problem, accessories, PIN, signature and assignee of an archived repair into a new `Pending` ticket with fresh timestamps and status link. Requires `repair:clone` permission.",
    params(("id" = i32, Path, description = "ID of the archived repair")),
    responses(
        (status = 201, description = "New repair created", body = RepairResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Repair not found or not visible (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Repair is not archived (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn clone_repair(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(perm::REPAIR_CLONE)?;
    let scope = SessionScope::load(&state.db, &auth_user).await?;
    let source = find_visible_repair(&state.db, &scope, id).await?;

    if source.status != RepairStatus::Archived {
        return Err(AppError::Conflict(
            "Only archived repairs can be cloned".into(),
        ));
    }

    let mut copy = repair::ActiveModel {
        public_token: Set(Uuid::new_v4()),
        customer_id: Set(source.customer_id),
        customer_name: Set(source.customer_name),
        device_type: Set(source.device_type),
        brand: Set(source.brand),
        model: Set(source.model),
        problem_notes: Set(source.problem_notes),
        password_pin: Set(source.password_pin),
        accessories: Set(source.accessories),
        signature: Set(source.signature),
        assigned_technician_id: Set(source.assigned_technician_id),
        assigned_to_name: Set(source.assigned_to_name),
        ..Default::default()
    };
    apply_lifecycle(&mut copy, Lifecycle::cloned(Utc::now()));

    let model = copy.insert(&state.db).await?;
    state.live.touch(Collection::Repairs);
    tracing::info!(source_id = id, repair_id = model.id, "Repair cloned");

    Ok((StatusCode::CREATED, Json(respond(&state, model))))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Repairs",
    operation_id = "deleteRepair",
    summary = "Delete an archived repair",
    description = "Permanently removes an archived repair. Active repairs cannot be deleted. Requires `repair:delete` permission.",
    params(("id" = i32, Path, description = "Repair ID")),
    responses(
        (status = 204, description = "Repair deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Repair not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Repair is not archived (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_repair(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(perm::REPAIR_DELETE)?;
    let existing = find_repair(&state.db, id).await?;

    if existing.status != RepairStatus::Archived {
        return Err(AppError::Conflict(
            "Only archived repairs can be deleted".into(),
        ));
    }

    repair::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;
    state.live.touch(Collection::Repairs);

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/archive",
    tag = "Repairs",
    operation_id = "listArchive",
    summary = "Archived repairs grouped by technician",
    description = "Archived repairs grouped under the resolved technician name, groups sorted by name and repairs newest archive first. Each entry says whether a matching donation was recorded. Students only see their own repairs.",
    responses(
        (status = 200, description = "Archive", body = Vec<ArchiveGroup>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_archive(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ArchiveGroup>>, AppError> {
    let scope = SessionScope::load(&state.db, &auth_user).await?;

    let rows = repair::Entity::find()
        .filter(repair::Column::Status.eq(RepairStatus::Archived))
        .order_by_desc(repair::Column::ArchivedAt)
        .order_by_desc(repair::Column::Id)
        .all(&state.db)
        .await?;
    let technicians = technician_refs(&state.db).await?;
    let donations = donation::Entity::find().all(&state.db).await?;

    let mut groups: BTreeMap<String, Vec<ArchivedRepair>> = BTreeMap::new();
    for model in rows.into_iter().filter(|m| scope.can_see_model(m)) {
        let technician_name =
            assignment::resolve_technician_name(&model.assigned_to_name, &technicians);
        let donated = donations.iter().any(|d| {
            d.customer_id == model.customer_id
                && d.device_type == model.device_type
                && d.brand == model.brand
                && d.model == model.model
        });
        groups
            .entry(technician_name)
            .or_default()
            .push(ArchivedRepair {
                repair: respond(&state, model),
                donated,
            });
    }

    Ok(Json(
        groups
            .into_iter()
            .map(|(technician_name, repairs)| ArchiveGroup {
                technician_name,
                repairs,
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/qr",
    tag = "Repairs",
    operation_id = "getRepairQr",
    summary = "QR code of the public status link",
    params(("id" = i32, Path, description = "Repair ID")),
    responses(
        (status = 200, description = "SVG image", content_type = "image/svg+xml", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Repair not found or not visible (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn repair_qr(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let scope = SessionScope::load(&state.db, &auth_user).await?;
    let model = find_visible_repair(&state.db, &scope, id).await?;

    let svg = qr::svg_for(&status_url(
        &state.config.app.public_base_url,
        &model.public_token,
    ))?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
