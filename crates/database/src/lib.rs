//! # Loyalty Database Crate
//!
//! Read access to the loyalty program tables.
//!
//! ## Public API
//!
//! - `DataStore`: the async seam every store implements (`fetch`, `ping`).
//! - `PgStore`: PostgreSQL implementation over a `PgPool`.
//! - `MemoryStore`: in-memory implementation for tests and demos.
//! - `DbRepository`: typed fetchers that decode rows and skip malformed ones.
//! - `connect` / `run_migrations`: pool setup and schema migrations.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod query;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryStore;
pub use query::{Entity, FetchQuery, Filter, FilterOp, FilterValue, Row};
pub use repository::{DbRepository, LedgerQuery};
pub use store::{DataStore, PgStore};
