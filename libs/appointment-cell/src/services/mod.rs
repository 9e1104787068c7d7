pub mod appointments;
pub mod lifecycle;
pub mod query;
pub mod refs;
