//! Domain Adapters
//!
//! Implementations of the claims domain ports on top of the repository
//! layer. Each adapter:
//! - Implements one port trait from `domain_claims::ports`
//! - Translates between domain models and row types
//! - Turns [`DatabaseError`](crate::DatabaseError) into `PortError`
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimStore;
//! use domain_claims::ClaimStore;
//!
//! let store = PostgresClaimStore::new(pool);
//! let claim = store.get_claim(claim_id).await?;
//! ```

pub mod claims;
pub mod notifications;
pub mod policies;

pub use claims::PostgresClaimStore;
pub use notifications::PostgresNotifier;
pub use policies::PostgresPolicyStore;
