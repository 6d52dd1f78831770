//! Validation of incoming send requests.
//!
//! Turns a decoded JSON value into an [`EmailRequest`], or reports every
//! field-level problem at once so callers can fix them in one round trip.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::address::Address;

/// A validated send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub subject: String,
    /// Plain text body
    pub body: String,
    pub sender: Option<Address>,
    /// Never empty
    pub recipients: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
}

/// One problem with one field of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name; list entries are reported as `field.N`
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All violations found in a payload, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-error list.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a decoded JSON payload.
///
/// Unknown fields are ignored. `cco` is accepted as an alias of `bcc`.
///
/// ```
/// use mailgate::request::validate;
/// use serde_json::json;
///
/// let request = validate(&json!({
///     "subject": "Hi",
///     "body": "Hello",
///     "recipients": ["a@x.com"],
/// }))
/// .unwrap();
/// assert_eq!(request.recipients.len(), 1);
///
/// let errors = validate(&json!({"subject": "Hi", "body": "Hello"})).unwrap_err();
/// assert_eq!(errors.errors()[0].field, "recipients");
/// ```
pub fn validate(payload: &Value) -> Result<EmailRequest, ValidationErrors> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationErrors::single("__root__", "expected a JSON object"));
    };

    let mut errors = ValidationErrors::new();

    let subject = required_string(object, "subject", &mut errors);
    let body = required_string(object, "body", &mut errors);
    let sender = optional_address(object, "sender", &mut errors);
    let recipients = address_list(object, "recipients", true, &mut errors);
    let cc = address_list(object, "cc", false, &mut errors);
    let bcc_field = if object.contains_key("bcc") { "bcc" } else { "cco" };
    let bcc = address_list(object, bcc_field, false, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    // Every None above pushed an error, so these are all present here.
    match (subject, body, recipients, cc, bcc) {
        (Some(subject), Some(body), Some(recipients), Some(cc), Some(bcc)) => Ok(EmailRequest {
            subject,
            body,
            sender,
            recipients,
            cc,
            bcc,
        }),
        _ => Err(ValidationErrors::single("__root__", "invalid payload")),
    }
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.push(field, "field required");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
    }
}

fn optional_address(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<Address> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => match Address::parse(s) {
            Ok(addr) => Some(addr),
            Err(_) => {
                errors.push(field, invalid_address_message(s));
                None
            }
        },
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
    }
}

/// Returns `None` only after recording at least one error.
fn address_list(
    object: &Map<String, Value>,
    field: &str,
    required: bool,
    errors: &mut ValidationErrors,
) -> Option<Vec<Address>> {
    let items = match object.get(field) {
        None | Some(Value::Null) if required => {
            errors.push(field, "field required");
            return None;
        }
        None | Some(Value::Null) => return Some(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(field, "must be a list of email addresses");
            return None;
        }
    };

    if required && items.is_empty() {
        errors.push(field, "must contain at least one email address");
        return None;
    }

    let before = errors.errors().len();
    let mut addresses = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let entry = format!("{}.{}", field, idx);
        match item {
            Value::String(s) => match Address::parse(s) {
                Ok(addr) => addresses.push(addr),
                Err(_) => errors.push(entry, invalid_address_message(s)),
            },
            _ => errors.push(entry, "must be a string"),
        }
    }

    (errors.errors().len() == before).then_some(addresses)
}

fn invalid_address_message(value: &str) -> String {
    format!("'{}' is not a valid email address", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(errors: &ValidationErrors) -> Vec<&str> {
        errors.errors().iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_minimal_payload() {
        let request = validate(&json!({
            "subject": "Hi",
            "body": "Hello",
            "recipients": ["a@x.com"],
        }))
        .unwrap();

        assert_eq!(request.subject, "Hi");
        assert_eq!(request.body, "Hello");
        assert_eq!(request.sender, None);
        assert_eq!(request.recipients, vec![Address::new("a@x.com")]);
        assert!(request.cc.is_empty());
        assert!(request.bcc.is_empty());
    }

    #[test]
    fn test_full_payload() {
        let request = validate(&json!({
            "subject": "Report",
            "body": "See attached",
            "sender": "from@example.com",
            "recipients": ["a@example.com", "b@example.com"],
            "cc": ["c@example.com"],
            "bcc": ["d@example.com"],
        }))
        .unwrap();

        assert_eq!(request.sender, Some(Address::new("from@example.com")));
        assert_eq!(request.recipients.len(), 2);
        assert_eq!(request.cc[0].email, "c@example.com");
        assert_eq!(request.bcc[0].email, "d@example.com");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let request = validate(&json!({
            "subject": "Hi",
            "body": "Hello",
            "recipients": ["a@x.com"],
            "priority": "high",
        }));
        assert!(request.is_ok());
    }

    #[test]
    fn test_null_optionals_are_absent() {
        let request = validate(&json!({
            "subject": "Hi",
            "body": "Hello",
            "recipients": ["a@x.com"],
            "sender": null,
            "cc": null,
            "bcc": null,
        }))
        .unwrap();
        assert_eq!(request.sender, None);
        assert!(request.cc.is_empty());
    }

    #[test]
    fn test_cco_alias() {
        let request = validate(&json!({
            "subject": "Hi",
            "body": "Hello",
            "recipients": ["a@x.com"],
            "cco": ["hidden@x.com"],
        }))
        .unwrap();
        assert_eq!(request.bcc, vec![Address::new("hidden@x.com")]);

        let request = validate(&json!({
            "subject": "Hi",
            "body": "Hello",
            "recipients": ["a@x.com"],
            "bcc": ["wins@x.com"],
            "cco": ["ignored@x.com"],
        }))
        .unwrap();
        assert_eq!(request.bcc, vec![Address::new("wins@x.com")]);
    }

    #[test]
    fn test_not_an_object() {
        let errors = validate(&json!(["a@x.com"])).unwrap_err();
        assert_eq!(fields(&errors), vec!["__root__"]);
    }

    #[test]
    fn test_missing_recipients() {
        let errors = validate(&json!({"subject": "Hi", "body": "Hello"})).unwrap_err();
        assert_eq!(fields(&errors), vec!["recipients"]);
        assert_eq!(errors.errors()[0].message, "field required");
    }

    #[test]
    fn test_empty_recipients() {
        let errors =
            validate(&json!({"subject": "Hi", "body": "Hello", "recipients": []})).unwrap_err();
        assert_eq!(fields(&errors), vec!["recipients"]);
    }

    #[test]
    fn test_invalid_entries_are_indexed() {
        let errors = validate(&json!({
            "subject": "Hi",
            "body": "Hello",
            "recipients": ["ok@x.com", "nope", 7],
        }))
        .unwrap_err();

        assert_eq!(fields(&errors), vec!["recipients.1", "recipients.2"]);
        assert_eq!(errors.errors()[0].message, "'nope' is not a valid email address");
        assert_eq!(errors.errors()[1].message, "must be a string");
    }

    #[test]
    fn test_all_violations_reported_in_order() {
        let errors = validate(&json!({
            "subject": 1,
            "sender": "bad sender",
            "recipients": "a@x.com",
            "cc": ["bad-cc"],
            "bcc": ["bad-bcc"],
        }))
        .unwrap_err();

        assert_eq!(
            fields(&errors),
            vec!["subject", "body", "sender", "recipients", "cc.0", "bcc.0"]
        );
    }

    #[test]
    fn test_undeliverable_address_forms_rejected() {
        let odd = ["Alice <a@x.com>", "\"a b\"@x.com", "user@[127.0.0.1]"];

        for address in odd {
            let errors = validate(&json!({
                "subject": "Hi",
                "body": "Hello",
                "sender": address,
                "recipients": [address],
                "cc": [address],
                "bcc": [address],
            }))
            .unwrap_err();

            assert_eq!(
                fields(&errors),
                vec!["sender", "recipients.0", "cc.0", "bcc.0"],
                "address: {}",
                address
            );
        }
    }

    #[test]
    fn test_display() {
        let mut errors = ValidationErrors::new();
        errors.push("subject", "field required");
        errors.push("cc.0", "'x' is not a valid email address");
        assert_eq!(
            errors.to_string(),
            "subject: field required; cc.0: 'x' is not a valid email address"
        );
    }
}
