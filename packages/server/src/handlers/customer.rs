use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use common::import::{ImportBatch, ImportLine};
use common::perm;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{customer, repair};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::live::Collection;
use crate::live::session::SessionScope;
use crate::models::customer::*;
use crate::models::import::{ImportRequest, ImportSummary, validate_import_request};
use crate::models::repair::RepairResponse;
use crate::models::shared::{escape_like, validate_bulk_ids};
use crate::state::AppState;
use crate::utils::access::find_customer;
use crate::utils::qr;

const MAX_BULK_DELETE: usize = 500;

#[utoipa::path(
    get,
    path = "/",
    tag = "Customers",
    operation_id = "listCustomers",
    summary = "List or search customers",
    description = "Customers ordered by full name. `search` matches names and emails case-insensitively and phone numbers by substring. Requires `customer:view` permission.",
    params(CustomerListQuery),
    responses(
        (status = 200, description = "Customers", body = Vec<CustomerResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_customers(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    auth_user.require_permission(perm::CUSTOMER_VIEW)?;

    let mut select = customer::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(customer::Column::FullName)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(customer::Column::Email)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    )
                    .add(
                        Expr::col(customer::Column::Phone)
                            .like(LikeExpr::new(format!("%{term}%")).escape('\\')),
                    ),
            );
        }
    }

    let rows = select
        .order_by_asc(customer::Column::FullName)
        .order_by_asc(customer::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Customers",
    operation_id = "createCustomer",
    summary = "Add a customer",
    description = "Requires a full name and an email or phone number. Requires `customer:edit` permission.",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_customer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(perm::CUSTOMER_EDIT)?;
    let fields = validate_customer(
        &payload.full_name,
        payload.email.as_deref().unwrap_or_default(),
        payload.phone.as_deref().unwrap_or_default(),
    )?;

    let model = customer::ActiveModel {
        full_name: Set(fields.full_name),
        email: Set(fields.email),
        phone: Set(fields.phone),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    state.live.touch(Collection::Customers);

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Customers",
    operation_id = "getCustomer",
    summary = "Get a customer with their repairs",
    description = "Includes the customer's repairs visible to the caller, newest first. Requires `customer:view` permission.",
    params(("id" = i32, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer details", body = CustomerDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Customer not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_customer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CustomerDetailResponse>, AppError> {
    auth_user.require_permission(perm::CUSTOMER_VIEW)?;
    let model = find_customer(&state.db, id).await?;
    let scope = SessionScope::load(&state.db, &auth_user).await?;

    let repairs = repair::Entity::find()
        .filter(repair::Column::CustomerId.eq(id))
        .order_by_desc(repair::Column::CreatedAt)
        .order_by_desc(repair::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|r| scope.can_see_model(r))
        .map(|r| RepairResponse::from_model(r, &state.config.app.public_base_url))
        .collect();

    Ok(Json(CustomerDetailResponse {
        customer: model.into(),
        repairs,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Customers",
    operation_id = "updateCustomer",
    summary = "Edit a customer",
    description = "Only provided fields change; the result must still have a name and an email or phone. Repairs and donations keep the name they were recorded with. Requires `customer:edit` permission.",
    params(("id" = i32, Path, description = "Customer ID")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = CustomerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Customer not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_customer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCustomerRequest>,
) -> Result<Json<CustomerResponse>, AppError> {
    auth_user.require_permission(perm::CUSTOMER_EDIT)?;
    let existing = find_customer(&state.db, id).await?;

    let fields = validate_customer(
        payload.full_name.as_deref().unwrap_or(&existing.full_name),
        payload.email.as_deref().unwrap_or(&existing.email),
        payload.phone.as_deref().unwrap_or(&existing.phone),
    )?;

    let mut active: customer::ActiveModel = existing.into();
    active.full_name = Set(fields.full_name);
    active.email = Set(fields.email);
    active.phone = Set(fields.phone);
    let model = active.update(&state.db).await?;
    state.live.touch(Collection::Customers);

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Customers",
    operation_id = "deleteCustomer",
    summary = "Delete a customer",
    description = "Removes only the customer; their repairs and donations are kept. Requires `customer:delete` permission.",
    params(("id" = i32, Path, description = "Customer ID")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Customer not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_customer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(perm::CUSTOMER_DELETE)?;

    let result = customer::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Customer not found".into()));
    }
    state.live.touch(Collection::Customers);

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/bulk-delete",
    tag = "Customers",
    operation_id = "bulkDeleteCustomers",
    summary = "Delete several customers at once",
    description = "Deletes the given customers in one transaction. Unknown IDs are ignored. Requires `customer:delete` permission.",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Customers deleted", body = BulkDeleteResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(count = payload.ids.len()))]
pub async fn bulk_delete_customers(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    auth_user.require_permission(perm::CUSTOMER_DELETE)?;
    validate_bulk_ids(&payload.ids, "ids", MAX_BULK_DELETE)?;

    let txn = state.db.begin().await?;
    let result = customer::Entity::delete_many()
        .filter(customer::Column::Id.is_in(payload.ids))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    state.live.touch(Collection::Customers);
    Ok(Json(BulkDeleteResponse {
        deleted: result.rows_affected,
    }))
}

#[utoipa::path(
    post,
    path = "/import",
    tag = "Customers",
    operation_id = "importCustomers",
    summary = "Bulk add customers from pasted lines",
    description = "One `name,email[,phone]` per line. Malformed lines are skipped; emails already on file (case-insensitive) or repeated in the batch are reported as duplicates. Each line is stored on its own, so one failure does not stop the rest. Requires `customer:edit` permission.",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Import summary", body = ImportSummary),
        (status = 400, description = "Nothing pasted (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn import_customers(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImportRequest>,
) -> Result<Json<ImportSummary>, AppError> {
    auth_user.require_permission(perm::CUSTOMER_EDIT)?;
    validate_import_request(&payload)?;

    let existing: Vec<String> = customer::Entity::find()
        .select_only()
        .column(customer::Column::Email)
        .into_tuple()
        .all(&state.db)
        .await?;
    let mut batch = ImportBatch::new(existing.iter().map(String::as_str));
    let mut summary = ImportSummary::default();

    let now = chrono::Utc::now();
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

        let result = customer::ActiveModel {
            full_name: Set(entry.name),
            email: Set(entry.email.clone()),
            phone: Set(entry.phone.unwrap_or_default()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&state.db)
        .await;

        match result {
            Ok(_) => {
                batch.mark_added(&entry.email);
                summary.added += 1;
            }
            Err(e) => {
                tracing::warn!(email = %entry.email, error = %e, "Failed to import customer");
                summary.failed += 1;
            }
        }
    }

    if summary.added > 0 {
        state.live.touch(Collection::Customers);
    }
    tracing::info!(
        added = summary.added,
        duplicates = summary.duplicates,
        skipped = summary.skipped,
        failed = summary.failed,
        "Customer import finished"
    );

    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/{id}/qr",
    tag = "Customers",
    operation_id = "getCustomerQr",
    summary = "QR code that dials the customer",
    description = "SVG QR code of `tel:<phone>`. Requires `customer:view` permission.",
    params(("id" = i32, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "SVG image", content_type = "image/svg+xml", body = String),
        (status = 400, description = "Customer has no phone number (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Customer not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn customer_qr(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(perm::CUSTOMER_VIEW)?;
    let model = find_customer(&state.db, id).await?;

    let phone = model.phone.trim();
    if phone.is_empty() {
        return Err(AppError::Validation(
            "Customer has no phone number".into(),
        ));
    }
    let svg = qr::svg_for(&format!("tel:{phone}"))?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
