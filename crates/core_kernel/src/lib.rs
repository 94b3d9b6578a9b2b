//! Core Kernel - Foundational types for the claims platform
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Coverage periods used for policy validity windows
//! - Strongly-typed identifiers
//! - Port error and health types for adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{CoveragePeriod, TemporalError};
pub use identifiers::{
    PolicyId, ClaimId, PartyId, PayoutId, DocumentId, NotificationId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use error::CoreError;
