use common::Role;
use sea_orm::*;

use crate::entity::{admin, technician};

/// Credential fields shared by both account tables.
pub struct Account {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub force_password_change: bool,
    pub onboarding_nonce: Option<String>,
    pub session_version: i32,
}

impl From<admin::Model> for Account {
    fn from(m: admin::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            password_hash: m.password_hash,
            force_password_change: m.force_password_change,
            onboarding_nonce: m.onboarding_nonce,
            session_version: m.session_version,
        }
    }
}

impl From<technician::Model> for Account {
    fn from(m: technician::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            password_hash: m.password_hash,
            force_password_change: m.force_password_change,
            onboarding_nonce: m.onboarding_nonce,
            session_version: m.session_version,
        }
    }
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    role: Role,
    email: &str,
) -> Result<Option<Account>, DbErr> {
    Ok(match role {
        Role::Admin => admin::Entity::find()
            .filter(admin::Column::Email.eq(email))
            .one(db)
            .await?
            .map(Account::from),
        Role::Student => technician::Entity::find()
            .filter(technician::Column::Email.eq(email))
            .one(db)
            .await?
            .map(Account::from),
    })
}

pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    role: Role,
    id: i32,
) -> Result<Option<Account>, DbErr> {
    Ok(match role {
        Role::Admin => admin::Entity::find_by_id(id).one(db).await?.map(Account::from),
        Role::Student => technician::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(Account::from),
    })
}
