//! Helpers for putting caller-supplied text into log records.

use std::borrow::Cow;

/// Escapes control characters so caller text cannot break a log record across lines.
///
/// Printable text, including non-ASCII letters, is returned unchanged without allocating.
pub fn sanitise_for_log(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }

    let mut cleaned = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if c.is_control() {
            cleaned.extend(c.escape_default());
        } else {
            cleaned.push(c);
        }
    }
    Cow::Owned(cleaned)
}
