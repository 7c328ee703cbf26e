#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a repair ticket from intake to pickup.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
/// The wire and storage names are the shop's display strings, so `InProgress` travels
/// as `"In Progress"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum RepairStatus {
    /// Received at the counter, waiting for a technician.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pending"))]
    Pending,
    /// A technician is working on the device.
    #[serde(rename = "In Progress")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "In Progress"))]
    InProgress,
    /// Repaired and waiting for pickup.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Ready"))]
    Ready,
    /// Picked up and closed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Archived"))]
    Archived,
}

impl RepairStatus {
    /// All possible status values, in lifecycle order.
    pub const ALL: &'static [RepairStatus] =
        &[Self::Pending, Self::InProgress, Self::Ready, Self::Archived];

    /// Returns true while the device is still in the shop's active queue.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Archived)
    }

    /// Returns the display string used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Ready => "Ready",
            Self::Archived => "Archived",
        }
    }

    /// Customer-facing explanation shown on the public status page.
    pub fn customer_message(&self) -> &'static str {
        match self {
            Self::Pending => "Your repair request has been received and is waiting to be assigned.",
            Self::InProgress => "A technician is currently working on your device.",
            Self::Ready => "Your device is repaired and ready for pickup!",
            Self::Archived => "This repair has been completed and archived.",
        }
    }
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RepairStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status '{invalid}'. Valid values: Pending, In Progress, Ready, Archived")]
pub struct ParseStatusError {
    invalid: String,
}

impl FromStr for RepairStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "In Progress" => Ok(Self::InProgress),
            "Ready" => Ok(Self::Ready),
            "Archived" => Ok(Self::Archived),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
