//! Escaping for text interpolated into rendered markup.
//!
//! Every name, description, goal or error string that reaches a fragment goes
//! through one of these two functions.

use std::borrow::Cow;

/// Escape text for an element body.
pub fn text(value: &str) -> Cow<'_, str> {
    html_escape::encode_safe(value)
}

/// Escape text for a double-quoted attribute value.
pub fn attr(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}
