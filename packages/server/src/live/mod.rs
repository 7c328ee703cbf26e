//! Live sync: server-held snapshots of every collection, pushed to clients.

pub mod feed;
mod hub;
pub mod session;

pub use feed::{Feed, RetryPolicy, Snapshot, Subscription};
pub use hub::{Collection, LiveSync};
