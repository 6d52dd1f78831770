//! Local mailer for dry runs and testing.
//!
//! Stores emails in memory instead of sending them. Only the newest
//! `MAIL_LOCAL_CAPACITY` messages are kept. Select it with
//! `MAIL_PROVIDER=local`, or hand one to the router in tests:
//!
//! ```rust,ignore
//! use mailgate::providers::LocalMailer;
//!
//! let mailer = Arc::new(LocalMailer::new());
//! let app = mailgate::router(AppState::new(config, mailer.clone()));
//!
//! // ... drive the router ...
//!
//! assert_eq!(mailer.email_count(), 1);
//! assert_eq!(mailer.last_email().unwrap().email.to[0].email, "user@example.com");
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::storage::{MemoryStorage, StoredEmail};

/// Mailer that keeps every delivered email in memory.
pub struct LocalMailer {
    storage: Arc<MemoryStorage>,
    /// If set, deliver() will return this error (for testing error paths).
    fail_with: RwLock<Option<String>>,
}

impl LocalMailer {
    /// Create a new local mailer with fresh storage.
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::shared())
    }

    /// Create a local mailer with existing storage.
    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self {
            storage,
            fail_with: RwLock::new(None),
        }
    }

    // =========================================================================
    // Failure Simulation
    // =========================================================================

    /// Make every following delivery fail with `message`.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }

    /// Clear the failure state.
    pub fn clear_failure(&self) {
        *self.fail_with.write() = None;
    }

    // =========================================================================
    // Email Access
    // =========================================================================

    /// Get the most recently sent email.
    pub fn last_email(&self) -> Option<StoredEmail> {
        self.storage.last()
    }

    /// Get the count of stored emails.
    pub fn email_count(&self) -> usize {
        self.storage.count()
    }
}

impl Default for LocalMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LocalMailer {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        if let Some(message) = self.fail_with.read().clone() {
            return Err(MailError::SendError(message));
        }

        let message_id = self.storage.push(email.clone());
        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
