use std::sync::Arc;

use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use tracing::info;

use crate::config::LiveConfig;
use crate::entity::{admin, customer, donation, repair, technician};
use crate::models::account::{AdminResponse, TechnicianResponse};
use crate::models::customer::CustomerResponse;
use crate::models::donation::DonationResponse;
use crate::models::repair::RepairResponse;

use super::feed::{Feed, RetryPolicy};

/// The five live collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Technicians,
    Repairs,
    Customers,
    Donations,
    Admins,
}

impl Collection {
    /// Event name on the live stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technicians => "technicians",
            Self::Repairs => "repairs",
            Self::Customers => "customers",
            Self::Donations => "donations",
            Self::Admins => "admins",
        }
    }
}

/// Shared session state: one feed per collection, each kept current by its
/// own refresher.
pub struct LiveSync {
    pub technicians: Arc<Feed<TechnicianResponse>>,
    pub repairs: Arc<Feed<RepairResponse>>,
    pub customers: Arc<Feed<CustomerResponse>>,
    pub donations: Arc<Feed<DonationResponse>>,
    pub admins: Arc<Feed<AdminResponse>>,
}

impl LiveSync {
    /// Create the feeds and spawn their refreshers.
    pub fn start(db: DatabaseConnection, config: &LiveConfig, public_base_url: &str) -> Arc<Self> {
        let policy = RetryPolicy {
            base_ms: config.retry_base_ms,
            max_ms: config.retry_max_ms,
        };
        let live = Arc::new(Self {
            technicians: Feed::new(Collection::Technicians.as_str()),
            repairs: Feed::new(Collection::Repairs.as_str()),
            customers: Feed::new(Collection::Customers.as_str()),
            donations: Feed::new(Collection::Donations.as_str()),
            admins: Feed::new(Collection::Admins.as_str()),
        });

        let conn = db.clone();
        live.technicians.spawn_refresher(policy, move || load_technicians(conn.clone()));

        let conn = db.clone();
        let base_url: Arc<str> = Arc::from(public_base_url);
        live.repairs.spawn_refresher(policy, move || {
            load_repairs(conn.clone(), Arc::clone(&base_url))
        });

        let conn = db.clone();
        live.customers.spawn_refresher(policy, move || load_customers(conn.clone()));

        let conn = db.clone();
        live.donations.spawn_refresher(policy, move || load_donations(conn.clone()));

        let conn = db;
        live.admins.spawn_refresher(policy, move || load_admins(conn.clone()));

        info!(
            retry_base_ms = policy.base_ms,
            retry_max_ms = policy.max_ms,
            "Live sync started"
        );
        live
    }

    /// Mark a collection changed after a successful write.
    pub fn touch(&self, collection: Collection) {
        match collection {
            Collection::Technicians => self.technicians.mark_dirty(),
            Collection::Repairs => self.repairs.mark_dirty(),
            Collection::Customers => self.customers.mark_dirty(),
            Collection::Donations => self.donations.mark_dirty(),
            Collection::Admins => self.admins.mark_dirty(),
        }
    }

    /// Total open subscriptions across all feeds.
    pub fn subscriber_count(&self) -> usize {
        self.technicians.subscriber_count()
            + self.repairs.subscriber_count()
            + self.customers.subscriber_count()
            + self.donations.subscriber_count()
            + self.admins.subscriber_count()
    }
}

async fn load_technicians(db: DatabaseConnection) -> Result<Vec<TechnicianResponse>, DbErr> {
    let rows = technician::Entity::find()
        .order_by_asc(technician::Column::Name)
        .order_by_asc(technician::Column::Id)
        .all(&db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn load_repairs(db: DatabaseConnection, base_url: Arc<str>) -> Result<Vec<RepairResponse>, DbErr> {
    let rows = repair::Entity::find()
        .order_by_desc(repair::Column::CreatedAt)
        .order_by_desc(repair::Column::Id)
        .all(&db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|m| RepairResponse::from_model(m, &base_url))
        .collect())
}

async fn load_customers(db: DatabaseConnection) -> Result<Vec<CustomerResponse>, DbErr> {
    let rows = customer::Entity::find()
        .order_by_asc(customer::Column::FullName)
        .order_by_asc(customer::Column::Id)
        .all(&db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn load_donations(db: DatabaseConnection) -> Result<Vec<DonationResponse>, DbErr> {
    let rows = donation::Entity::find()
        .order_by_desc(donation::Column::DonatedAt)
        .order_by_desc(donation::Column::Id)
        .all(&db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn load_admins(db: DatabaseConnection) -> Result<Vec<AdminResponse>, DbErr> {
    let rows = admin::Entity::find()
        .order_by_asc(admin::Column::Email)
        .all(&db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
