//! Content-type helpers
//!
//! Functions for parsing Content-Type headers and driving the response
//! normalizer's structural-parsing policy.

use mime::Mime;

/// Default content type when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Parse a Content-Type header into its `type/subtype` essence, dropping
/// parameters such as `charset`.
pub fn essence(header: &str) -> String {
    match header.parse::<Mime>() {
        Ok(m) => format!("{}/{}", m.type_(), m.subtype()),
        Err(_) => header.trim().to_string(),
    }
}

/// Whether a Content-Type header denotes a JSON payload.
///
/// Matches `application/json` and any `*+json` structured-syntax suffix.
pub fn is_json(header: &str) -> bool {
    match header.parse::<Mime>() {
        Ok(m) => {
            (m.type_() == mime::APPLICATION && m.subtype() == mime::JSON)
                || m.suffix().map(|s| s == mime::JSON).unwrap_or(false)
        }
        Err(_) => {
            let lower = header.to_ascii_lowercase();
            lower.contains("application/json") || lower.contains("+json")
        }
    }
}

/// Guess a content type from a file name
pub fn guess_from_file_name(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name).first().map(|m| m.to_string())
}
