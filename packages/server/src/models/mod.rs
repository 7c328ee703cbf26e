pub mod account;
pub mod auth;
pub mod customer;
pub mod donation;
pub mod import;
pub mod live;
pub mod repair;
pub mod shared;
