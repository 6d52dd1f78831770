//! # mailgate
//!
//! HTTP API that validates email requests and relays them to an SMTP server,
//! optionally with file attachments.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /                             -> "API para gestionar correos"
//! POST /send_mail                    -> JSON {subject, body, sender?, recipients[], cc?[], bcc?[]}
//! POST /send_mail_with_attachments   -> multipart: data=<same JSON>, attachments=<files>
//! ```
//!
//! Responses are `200 {"message": ...}`, `400 {"errors": [{field, message}]}`,
//! `413 {"error": ...}` for oversized uploads, and `500 {"error": ...}` when
//! the message could not be delivered.
//!
//! ## Embedding
//!
//! ```rust,ignore
//! use mailgate::{router, AppState, Config};
//!
//! let config = Config::from_env()?;
//! let mailer = config.mailer()?;
//! let app = router(AppState::new(config, mailer));
//! ```
//!
//! See [`config`] for the environment variables.
//!
//! ## Feature Flags
//!
//! - `smtp` - SMTP transport via lettre (default)
//! - `local` - In-memory transport for dry runs and tests (default)
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `mailgate_emails_total` | Counter | endpoint, status | Send attempts |
//! | `mailgate_delivery_duration_seconds` | Histogram | endpoint | Compose + delivery time |
//!
//! Install a recorder (e.g., `metrics-exporter-prometheus`) in your app to collect them.

/// The version of the mailgate crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod attachment;
mod email;
mod error;
mod mailer;

pub mod compose;
pub mod config;
pub mod providers;
pub mod request;
pub mod routes;
pub mod template;
pub mod upload;

#[cfg(feature = "local")]
mod storage;

// Re-exports
pub use address::{Address, ToAddress};
pub use attachment::Attachment;
pub use config::Config;
pub use email::Email;
pub use error::MailError;
pub use mailer::{DeliveryResult, Mailer};
pub use request::{EmailRequest, FieldError, ValidationErrors};
pub use routes::{router, AppState};

#[cfg(feature = "local")]
pub use storage::{MemoryStorage, StoredEmail};
