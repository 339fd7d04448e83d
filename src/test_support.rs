//! Shared test doubles for service tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;

use crate::app_state::AppState;
use crate::domain::{AllowedDomains, EmailAddress, VerificationCode};
use crate::notify::{NotificationSender, NotifyError};
use crate::persistence::MemoryStore;
use crate::service::VerificationService;

pub const ALLOWED_DOMAIN: &str = "allowed.example";

pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn at_epoch_offset(seconds: i64) -> Self {
        let Some(now) = Utc.timestamp_opt(1_700_000_000 + seconds, 0).single() else {
            panic!("invalid timestamp");
        };
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    pub fn advance(&self, delta: Duration) {
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCode {
    pub recipient: String,
    pub code: String,
    pub display_name: String,
}

/// Records every send; optionally fails them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentCode>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        match self.fail.lock() {
            Ok(mut fail) => *fail = failing,
            Err(_) => panic!("notifier mutex"),
        }
    }

    pub fn sent(&self) -> Vec<SentCode> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(_) => panic!("notifier mutex"),
        }
    }

    pub fn last_code(&self) -> String {
        let Some(last) = self.sent().pop() else {
            panic!("no code was sent");
        };
        last.code
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(
        &self,
        recipient: &EmailAddress,
        code: &VerificationCode,
        display_name: &str,
    ) -> Result<(), NotifyError> {
        let failing = match self.fail.lock() {
            Ok(fail) => *fail,
            Err(_) => panic!("notifier mutex"),
        };
        if failing {
            return Err(NotifyError::Unreachable("connection refused".to_string()));
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(SentCode {
                recipient: recipient.as_str().to_string(),
                code: code.as_str().to_string(),
                display_name: display_name.to_string(),
            }),
            Err(_) => panic!("notifier mutex"),
        }
        Ok(())
    }
}

/// A verification service wired to in-memory collaborators.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<MutableClock>,
    pub verification: VerificationService,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(MutableClock::at_epoch_offset(0));
        let verification = VerificationService::new(
            Arc::clone(&store) as _,
            Arc::clone(&notifier) as _,
            Arc::clone(&clock) as _,
            AllowedDomains::new([ALLOWED_DOMAIN]),
            Duration::minutes(15),
        );
        Self {
            store,
            notifier,
            clock,
            verification,
        }
    }

    /// Handler state over the same store, notifier and clock.
    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::clone(&self.store) as _,
            Arc::clone(&self.store) as _,
            Arc::clone(&self.clock) as _,
            self.fresh_verification(),
        )
    }

    fn fresh_verification(&self) -> VerificationService {
        VerificationService::new(
            Arc::clone(&self.store) as _,
            Arc::clone(&self.notifier) as _,
            Arc::clone(&self.clock) as _,
            AllowedDomains::new([ALLOWED_DOMAIN]),
            Duration::minutes(15),
        )
    }
}
