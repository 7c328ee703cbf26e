use sea_orm::*;
use tracing::info;

use crate::config::BootstrapConfig;
use crate::entity::admin;
use crate::models::shared::normalize_email;
use crate::utils::hash;

/// Create the configured default admin when no admin exists yet.
///
/// The account must change its password on first login.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    config: &BootstrapConfig,
) -> anyhow::Result<()> {
    if admin::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let email = normalize_email(&config.admin_email);
    let password_hash = hash::hash_password(&config.admin_password)
        .map_err(|e| anyhow::anyhow!("Password hash error: {}", e))?;

    admin::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        force_password_change: Set(true),
        onboarding_nonce: Set(None),
        session_version: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(email = %email, "Seeded bootstrap admin");
    Ok(())
}
