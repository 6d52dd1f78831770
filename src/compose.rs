//! Assembly of the outbound message from a validated request.

use chrono::{DateTime, Local};

use crate::address::Address;
use crate::attachment::Attachment;
use crate::email::Email;
use crate::error::MailError;
use crate::request::EmailRequest;

/// Format of the timestamp appended to subjects.
pub const SUBJECT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server-side defaults applied to every outgoing message.
///
/// Both endpoints share these, so a request with attachments gets the same
/// sender fallback and subject treatment as one without.
#[derive(Debug, Clone)]
pub struct MessageDefaults {
    /// Used when the request names no sender.
    pub sender: Option<Address>,
    /// Append `" - YYYY-MM-DD HH:MM:SS"` to the subject.
    pub stamp_subject: bool,
}

impl Default for MessageDefaults {
    fn default() -> Self {
        Self {
            sender: None,
            stamp_subject: true,
        }
    }
}

/// Build the message for a validated request.
///
/// `html` is the rendered body; `sent_at` is the local time used for the
/// subject stamp. Fails with `MissingField("sender")` when neither the request
/// nor the defaults provide a sender.
pub fn compose(
    request: EmailRequest,
    html: String,
    attachments: Vec<Attachment>,
    defaults: &MessageDefaults,
    sent_at: DateTime<Local>,
) -> Result<Email, MailError> {
    let from = request
        .sender
        .or_else(|| defaults.sender.clone())
        .ok_or(MailError::MissingField("sender"))?;

    let subject = if defaults.stamp_subject {
        stamped_subject(&request.subject, sent_at)
    } else {
        request.subject
    };

    let email = attachments.into_iter().fold(
        Email::new()
            .from(from)
            .put_to(request.recipients)
            .put_cc(request.cc)
            .put_bcc(request.bcc)
            .subject(subject)
            .text_body(request.body)
            .html_body(html),
        Email::attachment,
    );

    Ok(email)
}

/// `"{subject} - {YYYY-MM-DD HH:MM:SS}"`
pub fn stamped_subject(subject: &str, sent_at: DateTime<Local>) -> String {
    format!("{} - {}", subject, sent_at.format(SUBJECT_TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> EmailRequest {
        EmailRequest {
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
            sender: None,
            recipients: vec![Address::new("a@x.com")],
            cc: vec![Address::new("c@x.com")],
            bcc: vec![Address::new("b@x.com")],
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    fn defaults() -> MessageDefaults {
        MessageDefaults {
            sender: Some(Address::new("noreply@x.com")),
            stamp_subject: true,
        }
    }

    #[test]
    fn test_stamped_subject() {
        assert_eq!(stamped_subject("Hi", at()), "Hi - 2024-03-09 07:05:01");
    }

    #[test]
    fn test_compose_fields() {
        let email = compose(request(), "<p>Hello</p>".into(), Vec::new(), &defaults(), at()).unwrap();

        assert_eq!(email.from, Some(Address::new("noreply@x.com")));
        assert_eq!(email.to, vec![Address::new("a@x.com")]);
        assert_eq!(email.cc, vec![Address::new("c@x.com")]);
        assert_eq!(email.bcc, vec![Address::new("b@x.com")]);
        assert_eq!(email.subject, "Hi - 2024-03-09 07:05:01");
        assert_eq!(email.text_body.as_deref(), Some("Hello"));
        assert_eq!(email.html_body.as_deref(), Some("<p>Hello</p>"));
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn test_request_sender_wins() {
        let mut req = request();
        req.sender = Some(Address::new("me@x.com"));

        let email = compose(req, String::new(), Vec::new(), &defaults(), at()).unwrap();
        assert_eq!(email.from, Some(Address::new("me@x.com")));
    }

    #[test]
    fn test_missing_sender() {
        let defaults = MessageDefaults::default();
        let err = compose(request(), String::new(), Vec::new(), &defaults, at()).unwrap_err();
        assert!(matches!(err, MailError::MissingField("sender")));
    }

    #[test]
    fn test_stamp_disabled() {
        let defaults = MessageDefaults {
            stamp_subject: false,
            ..defaults()
        };
        let email = compose(request(), String::new(), Vec::new(), &defaults, at()).unwrap();
        assert_eq!(email.subject, "Hi");
    }

    #[test]
    fn test_attachments_in_order() {
        let attachments = vec![
            Attachment::from_bytes("one.txt", b"1".to_vec()),
            Attachment::from_bytes("two.bin", vec![0, 255]),
        ];
        let email = compose(request(), String::new(), attachments, &defaults(), at()).unwrap();

        assert_eq!(email.attachments.len(), 2);
        assert_eq!(email.attachments[0].filename, "one.txt");
        assert_eq!(email.attachments[1].data, vec![0, 255]);
    }
}
