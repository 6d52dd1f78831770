//! Mailer trait and delivery result types.
//!
//! The router stores its transport as `Arc<dyn Mailer>` so the provider can be
//! picked from the environment at startup. Native async traits are not
//! object-safe, hence `#[async_trait]`.

use async_trait::async_trait;

use crate::email::Email;
use crate::error::MailError;

/// Result of a successful email delivery.
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    /// Message ID assigned by the transport
    pub message_id: String,
}

impl DeliveryResult {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// A mail transport.
///
/// `deliver` resolves once the transport has accepted or rejected the
/// message. Failures carry no fine-grained codes, only a [`MailError`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single email.
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }
}
