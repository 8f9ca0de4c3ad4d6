//! Configuration module
//!
//! Configuration is resolved once at process start and passed by reference
//! to the database layer, so the executors never touch ambient environment
//! state themselves.

pub mod database;

pub use database::DatabaseConfig;
