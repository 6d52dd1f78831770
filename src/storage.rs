//! In-memory store of delivered messages, backing [`LocalMailer`](crate::providers::LocalMailer).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::email::Email;

/// Messages kept by [`MemoryStorage::new`].
const DEFAULT_CAPACITY: usize = 100;

/// A stored email with metadata.
#[derive(Debug, Clone)]
pub struct StoredEmail {
    /// Unique identifier for this email.
    pub id: String,
    /// The email content.
    pub email: Email,
    /// When the email was "sent" (stored).
    pub sent_at: DateTime<Utc>,
}

/// Thread-safe in-memory storage, kept in insertion order.
///
/// Holds at most `capacity` messages; pushing past it evicts the oldest.
#[derive(Debug)]
pub struct MemoryStorage {
    emails: RwLock<VecDeque<StoredEmail>>,
    capacity: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Storage keeping only the newest `capacity` messages (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            emails: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Create storage wrapped in an Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store an email and return its ID.
    pub fn push(&self, email: Email) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut emails = self.emails.write();
        while emails.len() >= self.capacity {
            if let Some(evicted) = emails.pop_front() {
                tracing::debug!(id = %evicted.id, "Evicted stored email");
            }
        }
        emails.push_back(StoredEmail {
            id: id.clone(),
            email,
            sent_at: Utc::now(),
        });
        id
    }

    /// The most recently stored email.
    pub fn last(&self) -> Option<StoredEmail> {
        self.emails.read().back().cloned()
    }

    /// All stored emails, newest first.
    pub fn all(&self) -> Vec<StoredEmail> {
        self.emails.read().iter().rev().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.emails.read().len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
