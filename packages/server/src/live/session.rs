//! What a signed-in session may see.

use common::Role;
use common::assignment::StudentIdentity;
use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entity::{repair, technician};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::repair::RepairResponse;

use super::Collection;

const ADMIN_COLLECTIONS: &[Collection] = &[
    Collection::Technicians,
    Collection::Repairs,
    Collection::Customers,
    Collection::Donations,
    Collection::Admins,
];

const STUDENT_COLLECTIONS: &[Collection] = &[
    Collection::Technicians,
    Collection::Repairs,
    Collection::Customers,
];

/// Role-based view of the shared state.
#[derive(Clone, Debug)]
pub enum SessionScope {
    Admin,
    Student(StudentIdentity),
}

impl SessionScope {
    /// Build the scope for an authenticated caller. Students are matched
    /// through their technician record.
    pub async fn load<C: ConnectionTrait>(db: &C, auth_user: &AuthUser) -> Result<Self, AppError> {
        match auth_user.role {
            Role::Admin => Ok(Self::Admin),
            Role::Student => {
                let tech = technician::Entity::find_by_id(auth_user.account_id)
                    .one(db)
                    .await?
                    .ok_or(AppError::TokenInvalid)?;
                Ok(Self::Student(StudentIdentity {
                    technician_id: Some(tech.id),
                    email: tech.email,
                    name: Some(tech.name),
                }))
            }
        }
    }

    pub fn collections(&self) -> &'static [Collection] {
        match self {
            Self::Admin => ADMIN_COLLECTIONS,
            Self::Student(_) => STUDENT_COLLECTIONS,
        }
    }

    pub fn can_see(&self, assigned_technician_id: Option<i32>, assigned_to_name: &str) -> bool {
        match self {
            Self::Admin => true,
            Self::Student(me) => me.can_see(assigned_technician_id, assigned_to_name),
        }
    }

    pub fn can_see_model(&self, repair: &repair::Model) -> bool {
        self.can_see(repair.assigned_technician_id, &repair.assigned_to_name)
    }

    /// Keep only the repairs this session may see, preserving order.
    pub fn filter_repairs(&self, items: &[RepairResponse]) -> Vec<RepairResponse> {
        items
            .iter()
            .filter(|r| self.can_see(r.assigned_technician_id, &r.assigned_to_name))
            .cloned()
            .collect()
    }
}
