//! Per-item parameters consumed from the host workflow runtime
//!
//! The host hands the runner one [`ItemParameters`] per input item. The
//! shapes mirror the node's user-facing configuration: collections of
//! key/value rows with optional `disabled` flags, a body-mode selector with
//! mode-specific fields, and an options record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::http::Method;

/// A user-edited key/value row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyValueRow {
    pub name: String,
    pub value: String,
    pub disabled: bool,
}

impl KeyValueRow {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            disabled: false,
        }
    }
}

/// Convert user-edited rows into a plain mapping.
///
/// Disabled rows and rows without a name are skipped entirely; duplicate
/// names resolve to the last enabled occurrence.
pub fn to_key_value(rows: &[KeyValueRow]) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for row in rows {
        if row.disabled || row.name.is_empty() {
            continue;
        }
        out.insert(row.name.clone(), row.value.clone());
    }
    out
}

/// Discriminator selecting the request-body encoding strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyMode {
    #[default]
    None,
    FormUrlEncoded,
    Multipart,
    Raw,
    Graphql,
    Binary,
}

/// Kind of a declared multipart part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    #[default]
    Text,
    Binary,
}

/// One declared part of a multipart body.
///
/// For `kind == Binary` the `value` names a binary property on the current
/// input item; for `kind == Text` it is the literal field value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MultipartPart {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub disabled: bool,
}

/// Policy governing how raw response bytes are structurally interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Auto,
    Json,
    Text,
    Binary,
}

/// Request options collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOptions {
    pub use_cookie_jar: bool,
    pub follow_redirect: bool,
    pub max_redirects: u32,
    /// Request timeout in milliseconds
    pub timeout: u64,
    pub proxy: Option<String>,
    pub decompress: bool,
    pub gzip: bool,
    pub response_format: ResponseFormat,
    pub full_response: bool,
    pub fail_on_error: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            use_cookie_jar: false,
            follow_redirect: true,
            max_redirects: 5,
            timeout: 30_000,
            proxy: None,
            decompress: true,
            gzip: true,
            response_format: ResponseFormat::Auto,
            full_response: false,
            fail_on_error: true,
        }
    }
}

/// Everything the host supplies for one item's request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemParameters {
    pub method: Method,
    pub url: String,
    pub query_parameters: Vec<KeyValueRow>,
    pub headers: Vec<KeyValueRow>,
    pub body_mode: BodyMode,
    pub form_fields: Vec<KeyValueRow>,
    pub multipart: Vec<MultipartPart>,
    pub raw_body: String,
    pub raw_content_type: Option<String>,
    pub gql_query: String,
    pub gql_variables: String,
    pub binary_property: String,
    pub options: RequestOptions,
    pub enable_assertions: bool,
    pub assertions: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_key_value_skips_disabled_and_unnamed() {
        let rows = vec![
            KeyValueRow::new("a", "1"),
            KeyValueRow {
                disabled: true,
                ..KeyValueRow::new("b", "2")
            },
            KeyValueRow::new("", "orphan"),
            KeyValueRow::new("c", "3"),
        ];

        let map = to_key_value(&rows);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&"1".to_string()));
        assert!(!map.contains_key("b"));
        assert!(!map.contains_key(""));
    }

    #[test]
    fn test_to_key_value_last_write_wins() {
        let rows = vec![
            KeyValueRow::new("key", "first"),
            KeyValueRow::new("key", "second"),
        ];

        let map = to_key_value(&rows);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("key"), Some(&"second".to_string()));
    }

    #[test]
    fn test_options_defaults() {
        let options: RequestOptions = serde_json::from_str("{}").unwrap();
        assert!(options.follow_redirect);
        assert_eq!(options.max_redirects, 5);
        assert_eq!(options.timeout, 30_000);
        assert!(options.fail_on_error);
        assert!(!options.full_response);
        assert_eq!(options.response_format, ResponseFormat::Auto);
    }

    #[test]
    fn test_parameters_from_host_json() {
        let params: ItemParameters = serde_json::from_value(serde_json::json!({
            "method": "POST",
            "url": "https://api.example.com/x",
            "bodyMode": "formUrlEncoded",
            "formFields": [{"name": "a", "value": "1"}],
            "options": {"timeout": 5000},
        }))
        .unwrap();

        assert_eq!(params.method, Method::Post);
        assert_eq!(params.body_mode, BodyMode::FormUrlEncoded);
        assert_eq!(params.form_fields.len(), 1);
        assert_eq!(params.options.timeout, 5000);
        assert!(!params.enable_assertions);
    }

    #[test]
    fn test_multipart_part_type_field() {
        let part: MultipartPart = serde_json::from_value(serde_json::json!({
            "name": "file",
            "value": "data",
            "type": "binary",
        }))
        .unwrap();
        assert_eq!(part.kind, PartKind::Binary);
    }
}
