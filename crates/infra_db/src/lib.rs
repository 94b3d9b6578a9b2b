//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the claim adjudication core, using SQLx.
//!
//! # Architecture
//!
//! Two layers, kept apart:
//! - [`repositories`] speak SQL and plain row structs
//! - [`adapters`] implement the `domain_claims` ports over them
//!
//! Status changes are conditional `UPDATE ... WHERE status = $from`
//! statements, so two racing writers can never both succeed. The "one open
//! claim per policy" rule is enforced by a partial unique index as well as
//! a locked check inside the insert transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresClaimStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! let claims = PostgresClaimStore::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PostgresClaimStore, PostgresNotifier, PostgresPolicyStore};
