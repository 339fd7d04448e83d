//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::{AccountStore, LendingStore};
use crate::service::{
    LendingService, RetirementCoordinator, SessionGate, SharedClock, VerificationService,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Signup, resend and activation.
    pub verification: Arc<VerificationService>,
    /// Login gate.
    pub sessions: Arc<SessionGate>,
    /// Item cascade deletion.
    pub retirement: Arc<RetirementCoordinator>,
    /// Items, requests, returns and messages.
    pub lending: Arc<LendingService>,
}

impl AppState {
    /// Wires every service to the same stores and clock.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        lending_store: Arc<dyn LendingStore>,
        clock: SharedClock,
        verification: VerificationService,
    ) -> Self {
        Self {
            verification: Arc::new(verification),
            sessions: Arc::new(SessionGate::new(Arc::clone(&accounts))),
            retirement: Arc::new(RetirementCoordinator::new(Arc::clone(&lending_store))),
            lending: Arc::new(LendingService::new(lending_store, accounts, clock)),
        }
    }
}
