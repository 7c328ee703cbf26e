use axum::Json;
use axum::extract::{Path, State};
use common::assignment::resolve_technician_name;
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::repair;
use crate::error::{AppError, ErrorBody};
use crate::models::repair::{PublicRepairResponse, short_id};
use crate::state::AppState;
use crate::utils::access::technician_refs;

#[utoipa::path(
    get,
    path = "/repairs/{token}",
    tag = "Public",
    operation_id = "getPublicRepairStatus",
    summary = "Customer-facing repair status",
    description = "Looked up by the token in the status link handed to the customer. No authentication.",
    params(("token" = String, Path, description = "Public repair token")),
    responses(
        (status = 200, description = "Repair status", body = PublicRepairResponse),
        (status = 404, description = "Unknown link (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_public_repair(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PublicRepairResponse>, AppError> {
    let not_found = || AppError::NotFound("Repair not found".into());
    let token = Uuid::parse_str(token.trim()).map_err(|_| not_found())?;

    let model = repair::Entity::find()
        .filter(repair::Column::PublicToken.eq(token))
        .one(&state.db)
        .await?
        .ok_or_else(not_found)?;

    let technicians = technician_refs(&state.db).await?;
    let technician_name = model
        .assigned_technician_id
        .and_then(|id| technicians.iter().find(|t| t.id == id))
        .map(|t| t.name.clone())
        .unwrap_or_else(|| resolve_technician_name(&model.assigned_to_name, &technicians));

    Ok(Json(PublicRepairResponse {
        short_id: short_id(&model.public_token),
        device_type: model.device_type,
        brand: model.brand,
        model: model.model,
        status: model.status,
        status_message: model.status.customer_message().to_string(),
        technician_name,
        created_at: model.created_at,
        ready_at: model.ready_at,
        archived_at: model.archived_at,
    }))
}
