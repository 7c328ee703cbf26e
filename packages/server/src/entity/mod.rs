pub mod admin;
pub mod customer;
pub mod donation;
pub mod repair;
pub mod technician;
