use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission strings carried in access tokens.
pub mod perm {
    pub const REPAIR_CREATE: &str = "repair:create";
    pub const REPAIR_UPDATE_STATUS: &str = "repair:update_status";
    pub const REPAIR_CLONE: &str = "repair:clone";
    pub const REPAIR_VIEW_ALL: &str = "repair:view_all";
    pub const REPAIR_ASSIGN: &str = "repair:assign";
    pub const REPAIR_DELETE: &str = "repair:delete";
    pub const CUSTOMER_VIEW: &str = "customer:view";
    pub const CUSTOMER_EDIT: &str = "customer:edit";
    pub const CUSTOMER_DELETE: &str = "customer:delete";
    pub const TECHNICIAN_VIEW: &str = "technician:view";
    pub const TECHNICIAN_MANAGE: &str = "technician:manage";
    pub const ADMIN_MANAGE: &str = "admin:manage";
    pub const DONATION_MANAGE: &str = "donation:manage";
}

const SHARED: &[&str] = &[
    perm::REPAIR_CREATE,
    perm::REPAIR_UPDATE_STATUS,
    perm::REPAIR_CLONE,
    perm::CUSTOMER_VIEW,
    perm::CUSTOMER_EDIT,
    perm::TECHNICIAN_VIEW,
];

const ADMIN_ONLY: &[&str] = &[
    perm::REPAIR_VIEW_ALL,
    perm::REPAIR_ASSIGN,
    perm::REPAIR_DELETE,
    perm::CUSTOMER_DELETE,
    perm::TECHNICIAN_MANAGE,
    perm::ADMIN_MANAGE,
    perm::DONATION_MANAGE,
];

/// Who is signed in: shop administrators or student technicians.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Student => "Student",
        }
    }

    /// Permissions granted to this role.
    pub fn permissions(&self) -> Vec<String> {
        let extra: &[&str] = match self {
            Self::Admin => ADMIN_ONLY,
            Self::Student => &[],
        };
        SHARED
            .iter()
            .chain(extra.iter())
            .map(|p| p.to_string())
            .collect()
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role '{0}'. Valid values: Admin, Student")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Self::Admin),
            "Student" => Ok(Self::Student),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}
