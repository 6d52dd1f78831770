//! Email address type with optional display name.

use crate::error::MailError;
use email_address::{EmailAddress, Options};
use std::fmt;

/// An email address with an optional display name.
///
/// # Examples
///
/// ```
/// use mailgate::Address;
///
/// let addr: Address = "user@example.com".into();
/// assert_eq!(addr.email, "user@example.com");
/// assert_eq!(addr.name, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Optional display name (e.g., "Alice Smith")
    pub name: Option<String>,
    /// Email address (e.g., "alice@example.com")
    pub email: String,
}

impl Address {
    /// Create a new address with just an email.
    ///
    /// No validation happens here beyond a logged warning for obviously
    /// broken input. Request data must go through [`Address::parse`].
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();

        if !Self::basic_sanity_check(&email) {
            tracing::warn!(
                email = %email,
                "Creating address with potentially invalid email. Use Address::parse() for strict validation."
            );
        }

        Self { name: None, email }
    }

    fn basic_sanity_check(email: &str) -> bool {
        !email.is_empty() && email.contains('@')
    }

    /// Parse and validate an email address.
    ///
    /// Accepts a bare `local@domain` only: display names, quoted local parts
    /// and domain literals are rejected, as is anything the SMTP transport
    /// could not put on an envelope.
    ///
    /// ```
    /// use mailgate::Address;
    ///
    /// assert!(Address::parse("user@example.com").is_ok());
    /// assert!(Address::parse("not-an-email").is_err());
    /// assert!(Address::parse("Alice <alice@example.com>").is_err());
    /// assert!(Address::parse("").is_err());
    /// ```
    pub fn parse(email: &str) -> Result<Self, MailError> {
        let invalid = || MailError::InvalidAddress(format!("'{}' is not a valid email address", email));

        let options = Options::default()
            .without_display_text()
            .without_domain_literal();
        let parsed = EmailAddress::parse_with_options(email, options).map_err(|_| invalid())?;
        if parsed.local_part().starts_with('"') {
            return Err(invalid());
        }

        let addr = Self {
            name: None,
            email: email.to_string(),
        };

        #[cfg(feature = "smtp")]
        addr.to_ascii()
            .ok()
            .and_then(|ascii| ascii.parse::<lettre::Address>().ok())
            .ok_or_else(invalid)?;

        Ok(addr)
    }

    /// Convert the domain part of the address to ASCII (Punycode).
    ///
    /// SMTP relays expect ASCII domains; the local part is kept as-is.
    ///
    /// ```
    /// use mailgate::Address;
    ///
    /// let addr = Address::new("user@例え.jp");
    /// assert_eq!(addr.to_ascii().unwrap(), "user@xn--r8jz45g.jp");
    /// ```
    pub fn to_ascii(&self) -> Result<String, MailError> {
        let (local_part, domain) = self.email.split_once('@').ok_or_else(|| {
            MailError::InvalidAddress(format!("'{}' is missing @ symbol", self.email))
        })?;

        let ascii_domain = idna::domain_to_ascii(domain).map_err(|e| {
            MailError::InvalidAddress(format!(
                "Failed to convert domain '{}' to ASCII: {:?}",
                domain, e
            ))
        })?;

        Ok(format!("{}@{}", local_part, ascii_domain))
    }

    /// Format as "Name <email>" or just "email" if no name.
    pub fn formatted(&self) -> String {
        match &self.name {
            Some(name) if name.is_empty() => self.email.clone(),
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

/// Trait for types that can be converted to an email address.
///
/// Lets the [`Email`](crate::Email) builder take plain strings as well as
/// already-parsed [`Address`] values.
pub trait ToAddress {
    fn to_address(&self) -> Address;
}

impl<T: ToAddress + ?Sized> ToAddress for &T {
    fn to_address(&self) -> Address {
        (*self).to_address()
    }
}

impl ToAddress for Address {
    fn to_address(&self) -> Address {
        self.clone()
    }
}

impl ToAddress for str {
    fn to_address(&self) -> Address {
        Address::new(self)
    }
}

impl ToAddress for String {
    fn to_address(&self) -> Address {
        Address::new(self)
    }
}
