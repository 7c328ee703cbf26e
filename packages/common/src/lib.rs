pub mod assignment;
pub mod import;
pub mod lifecycle;
pub mod repair_status;
pub mod retry;
pub mod role;

pub use lifecycle::Lifecycle;
pub use repair_status::RepairStatus;
pub use role::{Role, perm};
