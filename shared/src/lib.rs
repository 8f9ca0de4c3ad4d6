//! Shared configuration types for the pg-dal data access helpers
//!
//! This crate holds the configuration surface consumed by the `dal_db`
//! crate: connection parameters resolved once from the process environment
//! (or built explicitly for tests and embedding applications) and passed by
//! reference to the database layer.

pub mod config;

// Re-export commonly used items at crate root
pub use config::database::DatabaseConfig;
