//! # pg-dal database layer
//!
//! A thin data-access layer over PostgreSQL: resolve connection parameters
//! once (usually from the environment), then run parameterized read and
//! write statements through short-lived, per-call connections.
//!
//! There is deliberately no pooling, no transaction management beyond
//! autocommit, and no query builder - this crate is the glue between
//! application code and the driver, nothing more.
//!
//! ```no_run
//! use dal_db::{Database, SqlParams};
//!
//! # async fn example() -> Result<(), dal_db::DbError> {
//! let db = Database::from_env();
//!
//! let user = db
//!     .execute_select_one(
//!         "SELECT name FROM users WHERE id = :id",
//!         &SqlParams::new().with("id", 1),
//!     )
//!     .await?;
//!
//! let inserted = db
//!     .execute_dml_statement(
//!         "INSERT INTO users(name) VALUES (:name) RETURNING id",
//!         &SqlParams::new().with("name", "Bo"),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod database;
pub mod error;
pub mod params;
pub mod row;

// Re-export the public surface at crate root
pub use connection::establish_connection;
pub use database::Database;
pub use error::DbError;
pub use params::{expand_named, SqlParam, SqlParams};
pub use row::{Row, SqlValue};

// The configuration type lives in the shared crate; re-export it so most
// callers only depend on dal_db.
pub use dal_shared::DatabaseConfig;
