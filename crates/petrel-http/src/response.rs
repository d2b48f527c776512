//! Parsed HTTP response.

use std::collections::HashMap;

/// A fully received HTTP response.
///
/// Header names are stored exactly as they appeared on the wire
/// (case-sensitive); a repeated header keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Numeric status code; 0 when the status line did not parse.
    pub status_code: u16,
    /// Reason phrase; empty when the status line did not parse.
    pub status_text: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Decoded response body.
    pub body: String,
}

impl Response {
    /// Get a header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Check if the response is a success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
