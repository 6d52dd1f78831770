//! Mail transports.
//!
//! Each provider implements the [`Mailer`](crate::Mailer) trait.
//!
//! | Provider | Feature Flag | `MAIL_PROVIDER` | Description |
//! |----------|-------------|-----------------|-------------|
//! | [`SmtpMailer`] | `smtp` | `smtp` | SMTP relay via lettre |
//! | [`LocalMailer`] | `local` | `local` | In-memory storage for dry runs/testing |
//! | [`LoggerMailer`] | (none) | `logger`, `logger_full` | Logs emails without sending |

#[cfg(feature = "smtp")]
mod smtp;
#[cfg(feature = "smtp")]
pub use smtp::{SmtpBuilder, SmtpMailer, TlsMode};

#[cfg(feature = "local")]
mod local;
#[cfg(feature = "local")]
pub use local::LocalMailer;

mod logger;
pub use logger::LoggerMailer;
