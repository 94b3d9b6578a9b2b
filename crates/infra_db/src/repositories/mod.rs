//! Repository implementations
//!
//! Repositories own the SQL and speak in row types; the adapters in
//! [`crate::adapters`] translate rows to domain types and implement the
//! domain ports on top.
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow`, so the
//! crate builds without a live database.

pub mod claims;
pub mod payouts;
pub mod policies;
pub mod notifications;

pub use claims::ClaimsRepository;
pub use payouts::PayoutRepository;
pub use policies::PolicyRepository;
pub use notifications::NotificationRepository;
