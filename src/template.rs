//! HTML rendering of the message body.
//!
//! The markup is a fixed constant; only the escaped body varies. Callers
//! cannot supply templates.

/// Render the plain-text body into the HTML part of the message.
///
/// ```
/// use mailgate::template::render_body;
///
/// assert_eq!(
///     render_body("Hello"),
///     "<h2>Mensaje automatico,</h2><p>Hello</p>"
/// );
/// ```
pub fn render_body(body: &str) -> String {
    format!("<h2>Mensaje automatico,</h2><p>{}</p>", escape_html(body))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
