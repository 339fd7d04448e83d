//! # borrowbox
//!
//! Data service for a peer-to-peer item-lending community.
//!
//! Members sign up with an email on an allowed domain, receive a six-digit
//! code that expires after a fixed window, and can log in only once the
//! code has been consumed. Items they list can be requested, returned,
//! discussed and finally retired, which removes the item together with
//! every borrowing request, history row and message that references it in
//! one transaction.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── VerificationService, SessionGate,
//!     │   RetirementCoordinator, LendingService (service/)
//!     ├── NotificationSender (notify/)
//!     │
//!     ├── AccountStore + LendingStore (persistence/)
//!     │
//!     └── PostgreSQL, or the in-memory store
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod service;

#[cfg(test)]
#[allow(clippy::panic)]
mod test_support;
