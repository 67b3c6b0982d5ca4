//! Response normalization
//!
//! Turns a raw transport response into a canonical, encoding-aware view:
//! ordered original-case headers plus a lower-cased index, UTF-8 text
//! decoding, content-type-driven structural parsing, and size/elapsed
//! measurement. Parsing never mutates the raw bytes; the parsed view is
//! always re-derivable from rawBody + content-type + responseFormat.

use std::borrow::Cow;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::client::RawResponse;
use crate::errors::{RestmanError, Result};
use crate::input::ResponseFormat;
use crate::mime;

/// Maximum characters of body preview carried by an HTTP status error
const ERROR_PREVIEW_CHARS: usize = 500;

/// Structural interpretation of the response body
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(JsonValue),
    Text(String),
    Binary(Vec<u8>),
}

impl ParsedBody {
    /// JSON view for scripts and output composition. Binary bodies are not
    /// representable in JSON and surface as base64 text.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ParsedBody::Json(value) => value.clone(),
            ParsedBody::Text(text) => JsonValue::String(text.clone()),
            ParsedBody::Binary(bytes) => {
                use base64::Engine;
                JsonValue::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }

    /// Byte-level view, re-encoding text/structured forms
    pub fn as_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            ParsedBody::Json(value) => {
                Cow::Owned(serde_json::to_vec(value).unwrap_or_default())
            }
            ParsedBody::Text(text) => Cow::Borrowed(text.as_bytes()),
            ParsedBody::Binary(bytes) => Cow::Borrowed(bytes),
        }
    }

    fn preview(&self, max_chars: usize) -> String {
        let full = match self {
            ParsedBody::Json(value) => serde_json::to_string(value).unwrap_or_default(),
            ParsedBody::Text(text) => text.clone(),
            ParsedBody::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        };
        full.chars().take(max_chars).collect()
    }
}

/// Canonical view of an HTTP response
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    pub status_code: u16,
    pub status_message: Option<String>,
    /// Insertion-ordered, original case; duplicate names comma-joined
    pub headers: IndexMap<String, String>,
    headers_lower: HashMap<String, String>,
    /// Raw Set-Cookie values, one per header occurrence
    pub set_cookie: Vec<String>,
    pub raw_body: Vec<u8>,
    pub parsed: ParsedBody,
    pub elapsed_ms: u64,
    /// Byte length of the raw body, independent of the parsed view
    pub size_bytes: usize,
}

impl NormalizedResponse {
    /// Normalize a raw transport response.
    ///
    /// `fallback_content_type` is consulted when the response carries no
    /// content-type header (the request's own content-type, matching the
    /// original node's behavior).
    pub fn from_raw(
        raw: RawResponse,
        format: ResponseFormat,
        fallback_content_type: Option<&str>,
        elapsed_ms: u64,
    ) -> Self {
        let mut headers: IndexMap<String, String> = IndexMap::new();
        let mut set_cookie = Vec::new();
        for (name, value) in &raw.headers {
            if name.eq_ignore_ascii_case("set-cookie") {
                set_cookie.push(value.clone());
            }
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some((_, existing)) => {
                    existing.push_str(", ");
                    existing.push_str(value);
                }
                None => {
                    headers.insert(name.clone(), value.clone());
                }
            }
        }
        let headers_lower: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();

        let content_type = headers_lower
            .get("content-type")
            .map(String::as_str)
            .or(fallback_content_type);

        let size_bytes = raw.body.len();
        let parsed = parse_body(&raw.body, format, content_type);

        Self {
            status_code: raw.status,
            status_message: raw.status_message,
            headers,
            headers_lower,
            set_cookie,
            raw_body: raw.body,
            parsed,
            elapsed_ms,
            size_bytes,
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers_lower
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Headers as a JSON object (original case, wire order)
    pub fn headers_json(&self) -> JsonValue {
        JsonValue::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect(),
        )
    }

    /// Raise `HttpStatus` for status >= 400 under failOnError. Runs strictly
    /// after parsing so the error can carry a stringified body preview.
    pub fn check_status(&self, fail_on_error: bool) -> Result<()> {
        if fail_on_error && self.status_code >= 400 {
            return Err(RestmanError::HttpStatus {
                status: self.status_code,
                preview: self.parsed.preview(ERROR_PREVIEW_CHARS),
            });
        }
        Ok(())
    }
}

fn parse_body(body: &[u8], format: ResponseFormat, content_type: Option<&str>) -> ParsedBody {
    let text = || String::from_utf8_lossy(body).into_owned();
    match format {
        ResponseFormat::Binary => ParsedBody::Binary(body.to_vec()),
        ResponseFormat::Text => ParsedBody::Text(text()),
        ResponseFormat::Json => try_json(&text()),
        ResponseFormat::Auto => {
            if content_type.map(mime::is_json).unwrap_or(false) {
                try_json(&text())
            } else {
                ParsedBody::Text(text())
            }
        }
    }
}

/// JSON parse with silent fallback to the raw text
fn try_json(text: &str) -> ParsedBody {
    match serde_json::from_str(text) {
        Ok(value) => ParsedBody::Json(value),
        Err(_) => ParsedBody::Text(text.to_string()),
    }
}
