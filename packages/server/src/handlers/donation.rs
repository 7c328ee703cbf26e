use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::perm;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{customer, donation};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::live::Collection;
use crate::models::donation::{CreateDonationRequest, DonationResponse};
use crate::models::shared::require_text;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Donations",
    operation_id = "listDonations",
    summary = "List donated devices",
    description = "Newest first. Requires `donation:manage` permission.",
    responses(
        (status = 200, description = "Donations", body = Vec<DonationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_donations(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DonationResponse>>, AppError> {
    auth_user.require_permission(perm::DONATION_MANAGE)?;

    let rows = donation::Entity::find()
        .order_by_desc(donation::Column::DonatedAt)
        .order_by_desc(donation::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Donations",
    operation_id = "createDonation",
    summary = "Record a donated device",
    description = "The donor must be an existing customer. The acting admin is recorded as the receiver. Donations cannot be edited afterwards. Requires `donation:manage` permission.",
    request_body = CreateDonationRequest,
    responses(
        (status = 201, description = "Donation recorded", body = DonationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(customer_id = payload.customer_id))]
pub async fn create_donation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(perm::DONATION_MANAGE)?;

    let device_type = require_text(&payload.device_type, "Device type")?;
    let brand = require_text(&payload.brand, "Brand")?;
    let model = require_text(&payload.model, "Model")?;
    let notes = payload.notes.as_deref().unwrap_or_default().trim().to_string();

    let donor = customer::Entity::find_by_id(payload.customer_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Validation("Customer does not exist".into()))?;

    let saved = donation::ActiveModel {
        customer_id: Set(donor.id),
        customer_name: Set(donor.full_name),
        device_type: Set(device_type),
        brand: Set(brand),
        model: Set(model),
        notes: Set(notes),
        received_by: Set(auth_user.email.clone()),
        donated_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    state.live.touch(Collection::Donations);
    tracing::info!(donation_id = saved.id, "Donation recorded");

    Ok((StatusCode::CREATED, Json(DonationResponse::from(saved))))
}
