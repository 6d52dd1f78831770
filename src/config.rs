//! Process-wide configuration, read once at startup.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MAIL_PROVIDER` | `smtp` | `smtp`, `logger`, `logger_full`, `local` |
//! | `MAIL_SERVER` | `localhost` | SMTP server host |
//! | `MAIL_PORT` | `25` | SMTP server port |
//! | `MAIL_USE_TLS` | `false` | Upgrade with STARTTLS |
//! | `MAIL_USE_SSL` | `false` | Implicit TLS (takes precedence over `MAIL_USE_TLS`) |
//! | `MAIL_USERNAME` | | SMTP username |
//! | `MAIL_PASSWORD` | | SMTP password |
//! | `MAIL_DEFAULT_SENDER` | | Sender used when a request names none |
//! | `MAIL_SUBJECT_TIMESTAMP` | `true` | Append the send time to subjects |
//! | `MAX_ATTACHMENTS` | `10` | Files per request |
//! | `MAX_ATTACHMENT_BYTES` | `10485760` | Bytes per file |
//! | `MAX_TOTAL_ATTACHMENT_BYTES` | `26214400` | Bytes of all files in one request |
//! | `MAIL_LOCAL_CAPACITY` | `100` | Messages kept by the `local` provider (oldest evicted) |
//! | `BIND_ADDR` | `127.0.0.1:10001` | HTTP listen address |
//!
//! Empty values count as unset.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use crate::address::Address;
use crate::compose::MessageDefaults;
use crate::error::MailError;
use crate::mailer::Mailer;
use crate::providers;
use crate::upload::UploadLimits;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:10001";
const DEFAULT_LOCAL_CAPACITY: usize = 100;

/// Room left in the request body limit for the `data` part and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Which transport delivers messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Smtp,
    Logger,
    LoggerFull,
    Local,
}

impl FromStr for Provider {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "logger" => Ok(Self::Logger),
            "logger_full" => Ok(Self::LoggerFull),
            "local" => Ok(Self::Local),
            other => Err(MailError::Configuration(format!(
                "Unknown MAIL_PROVIDER: {}. Valid providers are: smtp, logger, logger_full, local",
                other
            ))),
        }
    }
}

/// SMTP connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("use_ssl", &self.use_ssl)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            use_tls: false,
            use_ssl: false,
            username: None,
            password: None,
        }
    }
}

/// Everything the server needs, immutable after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub smtp: SmtpSettings,
    pub defaults: MessageDefaults,
    pub limits: UploadLimits,
    /// Messages the `local` provider keeps in memory.
    pub local_capacity: usize,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, MailError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match var("MAIL_PROVIDER") {
            Some(p) => p.trim().parse::<Provider>()?,
            None => Provider::Smtp,
        };

        let defaults_smtp = SmtpSettings::default();
        let smtp = SmtpSettings {
            host: var("MAIL_SERVER").unwrap_or(defaults_smtp.host),
            port: parse_var("MAIL_PORT", var("MAIL_PORT"), defaults_smtp.port)?,
            use_tls: parse_bool("MAIL_USE_TLS", var("MAIL_USE_TLS"), false)?,
            use_ssl: parse_bool("MAIL_USE_SSL", var("MAIL_USE_SSL"), false)?,
            username: var("MAIL_USERNAME"),
            password: var("MAIL_PASSWORD"),
        };
        if smtp.username.is_some() != smtp.password.is_some() {
            return Err(MailError::Configuration(
                "MAIL_USERNAME and MAIL_PASSWORD must be set together".into(),
            ));
        }

        let sender = var("MAIL_DEFAULT_SENDER")
            .map(|s| {
                Address::parse(s.trim()).map_err(|e| {
                    MailError::Configuration(format!("MAIL_DEFAULT_SENDER: {}", e))
                })
            })
            .transpose()?;
        let defaults = MessageDefaults {
            sender,
            stamp_subject: parse_bool("MAIL_SUBJECT_TIMESTAMP", var("MAIL_SUBJECT_TIMESTAMP"), true)?,
        };

        let default_limits = UploadLimits::default();
        let limits = UploadLimits {
            max_files: parse_var("MAX_ATTACHMENTS", var("MAX_ATTACHMENTS"), default_limits.max_files)?,
            max_file_bytes: parse_var(
                "MAX_ATTACHMENT_BYTES",
                var("MAX_ATTACHMENT_BYTES"),
                default_limits.max_file_bytes,
            )?,
            max_total_bytes: parse_var(
                "MAX_TOTAL_ATTACHMENT_BYTES",
                var("MAX_TOTAL_ATTACHMENT_BYTES"),
                default_limits.max_total_bytes,
            )?,
        };

        let local_capacity = parse_var(
            "MAIL_LOCAL_CAPACITY",
            var("MAIL_LOCAL_CAPACITY"),
            DEFAULT_LOCAL_CAPACITY,
        )?;
        if local_capacity == 0 {
            return Err(MailError::Configuration(
                "MAIL_LOCAL_CAPACITY must be at least 1".into(),
            ));
        }

        let bind_addr = parse_var(
            "BIND_ADDR",
            var("BIND_ADDR"),
            DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| MailError::Internal("invalid default bind address".into()))?,
        )?;

        Ok(Self {
            provider,
            smtp,
            defaults,
            limits,
            local_capacity,
            bind_addr,
        })
    }

    /// Largest request body the server accepts.
    pub fn max_request_bytes(&self) -> usize {
        self.limits.max_total_bytes.saturating_add(FORM_OVERHEAD_BYTES)
    }

    /// Build the configured transport.
    pub fn mailer(&self) -> Result<Arc<dyn Mailer>, MailError> {
        match self.provider {
            #[cfg(feature = "smtp")]
            Provider::Smtp => {
                let tls = if self.smtp.use_ssl {
                    providers::TlsMode::Tls
                } else if self.smtp.use_tls {
                    providers::TlsMode::StartTls
                } else {
                    providers::TlsMode::None
                };

                let mut builder = providers::SmtpMailer::new(&self.smtp.host, self.smtp.port).tls(tls);
                if let (Some(username), Some(password)) = (&self.smtp.username, &self.smtp.password) {
                    builder = builder.credentials(username, password);
                }
                Ok(Arc::new(builder.build()?))
            }
            #[cfg(not(feature = "smtp"))]
            Provider::Smtp => Err(MailError::Configuration(
                "MAIL_PROVIDER=smtp but 'smtp' feature is not enabled. \
                Add `features = [\"smtp\"]` to Cargo.toml"
                    .into(),
            )),

            #[cfg(feature = "local")]
            Provider::Local => {
                let storage = crate::storage::MemoryStorage::with_capacity(self.local_capacity);
                tracing::warn!(
                    capacity = storage.capacity(),
                    "Local provider selected; messages are kept in memory and not sent"
                );
                Ok(Arc::new(providers::LocalMailer::with_storage(Arc::new(storage))))
            }
            #[cfg(not(feature = "local"))]
            Provider::Local => Err(MailError::Configuration(
                "MAIL_PROVIDER=local but 'local' feature is not enabled. \
                Add `features = [\"local\"]` to Cargo.toml"
                    .into(),
            )),

            Provider::Logger => Ok(Arc::new(providers::LoggerMailer::new())),
            Provider::LoggerFull => Ok(Arc::new(providers::LoggerMailer::full())),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, MailError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| MailError::Configuration(format!("{} has an invalid value: {}", key, v))),
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, MailError> {
    match value.map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(MailError::Configuration(format!(
                "{} must be true or false, got: {}",
                key, v
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, MailError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.provider, Provider::Smtp);
        assert_eq!(config.smtp, SmtpSettings::default());
        assert_eq!(config.defaults.sender, None);
        assert!(config.defaults.stamp_subject);
        assert_eq!(config.limits, UploadLimits::default());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:10001");
    }

    #[test]
    fn test_full_smtp() {
        let config = config(&[
            ("MAIL_SERVER", "smtp.example.com"),
            ("MAIL_PORT", "587"),
            ("MAIL_USE_TLS", "True"),
            ("MAIL_USERNAME", "user"),
            ("MAIL_PASSWORD", "secret"),
            ("MAIL_DEFAULT_SENDER", "noreply@example.com"),
        ])
        .unwrap();

        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, 587);
        assert!(config.smtp.use_tls);
        assert!(!config.smtp.use_ssl);
        assert_eq!(config.smtp.username.as_deref(), Some("user"));
        assert_eq!(
            config.defaults.sender,
            Some(Address::new("noreply@example.com"))
        );
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config(&[("MAIL_PORT", ""), ("MAIL_DEFAULT_SENDER", "  ")]).unwrap();
        assert_eq!(config.smtp.port, 25);
        assert_eq!(config.defaults.sender, None);
    }

    #[test]
    fn test_password_is_redacted() {
        let config = config(&[("MAIL_USERNAME", "user"), ("MAIL_PASSWORD", "hunter2")]).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_values() {
        for vars in [
            vec![("MAIL_PORT", "not-a-port")],
            vec![("MAIL_USE_TLS", "maybe")],
            vec![("MAIL_PROVIDER", "carrier-pigeon")],
            vec![("MAIL_DEFAULT_SENDER", "not-an-email")],
            vec![("MAIL_USERNAME", "user")],
            vec![("MAX_ATTACHMENTS", "-1")],
            vec![("BIND_ADDR", "nowhere")],
            vec![("MAIL_LOCAL_CAPACITY", "0")],
        ] {
            let result = config(&vars);
            assert!(
                matches!(result, Err(MailError::Configuration(_))),
                "expected {:?} to be rejected",
                vars
            );
        }
    }

    #[test]
    fn test_limits_and_flags() {
        let config = config(&[
            ("MAX_ATTACHMENTS", "2"),
            ("MAX_ATTACHMENT_BYTES", "100"),
            ("MAX_TOTAL_ATTACHMENT_BYTES", "150"),
            ("MAIL_SUBJECT_TIMESTAMP", "off"),
            ("MAIL_LOCAL_CAPACITY", "5"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ])
        .unwrap();

        assert_eq!(config.local_capacity, 5);

        assert_eq!(
            config.limits,
            UploadLimits {
                max_files: 2,
                max_file_bytes: 100,
                max_total_bytes: 150,
            }
        );
        assert!(!config.defaults.stamp_subject);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_request_bytes(), 150 + 1024 * 1024);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("SMTP".parse::<Provider>().unwrap(), Provider::Smtp);
        assert_eq!("logger_full".parse::<Provider>().unwrap(), Provider::LoggerFull);
        assert_eq!("local".parse::<Provider>().unwrap(), Provider::Local);
    }

    #[test]
    fn test_logger_mailer() {
        let config = config(&[("MAIL_PROVIDER", "logger")]).unwrap();
        assert_eq!(config.mailer().unwrap().provider_name(), "logger");
    }

    #[cfg(feature = "local")]
    #[test]
    fn test_local_mailer() {
        let config = config(&[("MAIL_PROVIDER", "local")]).unwrap();
        assert_eq!(config.local_capacity, 100);
        assert_eq!(config.mailer().unwrap().provider_name(), "local");
    }

    #[cfg(feature = "smtp")]
    #[test]
    fn test_smtp_mailer() {
        let config = config(&[("MAIL_SERVER", "127.0.0.1"), ("MAIL_PORT", "2525")]).unwrap();
        assert_eq!(config.mailer().unwrap().provider_name(), "smtp");
    }
}
