use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "technician")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    /// Stored lowercased.
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,

    /// Argon2 PHC string.
    pub password_hash: String,
    pub force_password_change: bool,
    /// Nonce of the only onboarding token that may still be redeemed.
    pub onboarding_nonce: Option<String>,

    /// Bumped whenever the password changes; older session tokens stop working.
    pub session_version: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
