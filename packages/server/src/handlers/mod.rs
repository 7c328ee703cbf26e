pub mod admin;
pub mod auth;
pub mod customer;
pub mod donation;
pub mod live;
pub mod public;
pub mod repair;
pub mod technician;
