//! SQLite persistence: migrations and the repository implementation of
//! `CommissionStore`.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
