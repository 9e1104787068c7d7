pub mod auth;
pub mod error;
pub mod ids;
pub mod records;
