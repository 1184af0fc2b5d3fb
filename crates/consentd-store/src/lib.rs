//! Consentd Store — SQLite-backed consent records and audit logs.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::ConsentStore;
pub use types::*;
