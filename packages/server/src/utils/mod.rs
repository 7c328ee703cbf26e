pub mod access;
pub mod account;
pub mod hash;
pub mod jwt;
pub mod onboarding;
pub mod password;
pub mod qr;
