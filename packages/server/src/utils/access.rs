use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};

use common::assignment::TechnicianRef;

use crate::entity::{customer, repair, technician};
use crate::error::AppError;
use crate::live::session::SessionScope;

/// Look up a repair by ID, returning 404 if not found.
pub async fn find_repair<C: ConnectionTrait>(db: &C, id: i32) -> Result<repair::Model, AppError> {
    repair::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Repair not found".into()))
}

/// Look up a repair the session may see. Hidden repairs are reported as
/// missing so their existence is not revealed.
pub async fn find_visible_repair<C: ConnectionTrait>(
    db: &C,
    scope: &SessionScope,
    id: i32,
) -> Result<repair::Model, AppError> {
    let model = find_repair(db, id).await?;
    if !scope.can_see_model(&model) {
        return Err(AppError::NotFound("Repair not found".into()));
    }
    Ok(model)
}

/// Look up a customer by ID, returning 404 if not found.
pub async fn find_customer<C: ConnectionTrait>(db: &C, id: i32) -> Result<customer::Model, AppError> {
    customer::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".into()))
}

/// All technicians as matching references, ordered by name.
pub async fn technician_refs<C: ConnectionTrait>(db: &C) -> Result<Vec<TechnicianRef>, AppError> {
    let rows = technician::Entity::find()
        .order_by_asc(technician::Column::Name)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|t| TechnicianRef {
            id: t.id,
            name: t.name,
            email: t.email,
        })
        .collect())
}
