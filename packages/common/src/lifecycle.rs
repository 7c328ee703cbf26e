//! Status transitions of a repair ticket and their timestamp side effects.
//!
//! Any status may be chosen from any other; the transition only decides which
//! lifecycle timestamps change. Handlers persist the returned value as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repair_status::RepairStatus;

/// The status of a repair together with its lifecycle timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub status: RepairStatus,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// Lifecycle of a freshly created ticket.
    pub fn intake(now: DateTime<Utc>) -> Self {
        Self {
            status: RepairStatus::Pending,
            created_at: now,
            ready_at: None,
            archived_at: None,
        }
    }

    /// Compute the lifecycle after moving to `to` at time `now`.
    ///
    /// * `Ready` stamps `ready_at`.
    /// * Every other target clears `ready_at`, `Archived` included, so an
    ///   archived ticket no longer shows when it became ready.
    /// * `Archived` stamps `archived_at`; nothing ever clears it.
    pub fn transition(self, to: RepairStatus, now: DateTime<Utc>) -> Self {
        let ready_at = match to {
            RepairStatus::Ready => Some(now),
            _ => None,
        };
        let archived_at = match to {
            RepairStatus::Archived => Some(now),
            _ => self.archived_at,
        };

        Self {
            status: to,
            created_at: self.created_at,
            ready_at,
            archived_at,
        }
    }

    /// Lifecycle for a ticket cloned from this one: a brand new intake.
    pub fn cloned(now: DateTime<Utc>) -> Self {
        Self::intake(now)
    }
}
