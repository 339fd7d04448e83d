//! Service layer: business logic orchestration.
//!
//! [`VerificationService`] issues and consumes verification codes,
//! [`SessionGate`] guards login, [`RetirementCoordinator`] runs the item
//! cascade and [`LendingService`] covers the remaining lending operations.
//! Services depend on the store traits in [`crate::persistence`], never on a
//! concrete store.

use std::sync::Arc;

pub mod lending;
pub mod retirement;
pub mod session;
pub mod verification;

pub use lending::LendingService;
pub use retirement::RetirementCoordinator;
pub use session::SessionGate;
pub use verification::{Delivery, IssueReceipt, VerificationService};

/// Server clock shared by the services. Expiry decisions never use a
/// caller-supplied time.
pub type SharedClock = Arc<dyn mockable::Clock + Send + Sync>;
