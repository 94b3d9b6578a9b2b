//! Test Utilities Crate
//!
//! Shared test infrastructure, fixtures, and helpers for the claims test
//! suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for policies, claims and verdicts
//! - `builders`: Builder patterns for policies and claim commands
//! - `harness`: A workflow wired to in-memory stores and scripted backends
//! - `database`: PostgreSQL container management
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
