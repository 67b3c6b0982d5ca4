//! Request descriptor assembly
//!
//! Merges method, URL, query, headers, body, and transport options into one
//! immutable request descriptor. Merge precedence is fixed: base options,
//! then body-implied headers, then authentication (applied last by the
//! runner so auth can override body-set headers).

pub mod body;

pub use body::RequestBody;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::http::Method;
use crate::input::{to_key_value, ItemParameters};

/// A fully-built request, ready for dispatch
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub query: IndexMap<String, String>,
    /// Case-preserving on write; read through [`RequestDescriptor::header`]
    pub headers: IndexMap<String, String>,
    pub body: RequestBody,
    pub follow_redirect: bool,
    pub max_redirects: u32,
    pub timeout_ms: u64,
    pub proxy: Option<String>,
    pub gzip: bool,
    pub decompress: bool,
    pub use_cookie_jar: bool,
}

impl RequestDescriptor {
    /// Assemble a descriptor from item parameters and a built body.
    ///
    /// The body's implied content-type overrides any user-set content-type
    /// header; for multipart this is required since only the builder knows
    /// the boundary.
    pub fn assemble(params: &ItemParameters, body: RequestBody) -> Self {
        let mut descriptor = Self {
            method: params.method,
            url: params.url.clone(),
            query: to_key_value(&params.query_parameters),
            headers: to_key_value(&params.headers),
            body,
            follow_redirect: params.options.follow_redirect,
            max_redirects: params.options.max_redirects,
            timeout_ms: params.options.timeout,
            proxy: params.options.proxy.clone(),
            gzip: params.options.gzip,
            decompress: params.options.decompress,
            use_cookie_jar: params.options.use_cookie_jar,
        };

        if let Some(content_type) = descriptor.body.content_type() {
            descriptor.set_header("Content-Type", content_type);
        }

        descriptor
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Insert a header, replacing any existing value under a
    /// case-insensitively equal name. The given casing is preserved.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.into());
    }

    /// Headers as a JSON object for script introspection
    pub fn headers_json(&self) -> JsonValue {
        JsonValue::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect(),
        )
    }

    /// Query parameters as a JSON object for script introspection
    pub fn query_json(&self) -> JsonValue {
        JsonValue::Object(
            self.query
                .iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect(),
        )
    }
}
