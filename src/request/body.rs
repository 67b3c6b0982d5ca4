//! Request body building
//!
//! Constructs the wire body for each body mode as a closed sum type, so a
//! descriptor can never mix fields from different modes. Every variant can
//! reproduce its wire bytes, its implied content-type, and a metadata record
//! describing the original user input for script introspection.

use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};

use crate::errors::{RestmanError, Result};
use crate::host::BinaryStore;
use crate::input::{to_key_value, BodyMode, ItemParameters, PartKind};
use crate::mime::OCTET_STREAM;

/// One encoded part of a multipart body
#[derive(Debug, Clone)]
struct EncodedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Request body variants, one per body mode
#[derive(Debug, Clone)]
pub enum RequestBody {
    None,
    Form {
        fields: IndexMap<String, String>,
    },
    Multipart {
        boundary: String,
        body: Vec<u8>,
    },
    Raw {
        content: String,
        content_type: String,
    },
    GraphQl {
        query: String,
        variables: JsonValue,
    },
    Binary {
        data: Vec<u8>,
        content_type: String,
        property: String,
        file_name: Option<String>,
    },
}

impl RequestBody {
    /// Build the body for one item from its parameters.
    ///
    /// Binary properties are resolved through the host's binary store and
    /// fail with `MissingBinaryData` when absent. GraphQL variables must
    /// parse as JSON; this is checked here, before the request is ever sent.
    pub fn build(
        params: &ItemParameters,
        item_index: usize,
        binary: &dyn BinaryStore,
    ) -> Result<Self> {
        match params.body_mode {
            BodyMode::None => Ok(RequestBody::None),
            BodyMode::FormUrlEncoded => Ok(RequestBody::Form {
                fields: to_key_value(&params.form_fields),
            }),
            BodyMode::Multipart => {
                let mut parts = Vec::new();
                for part in &params.multipart {
                    if part.disabled || part.name.is_empty() {
                        continue;
                    }
                    match part.kind {
                        PartKind::Binary => {
                            let payload = binary.read(item_index, &part.value)?;
                            let file_name = part.file_name.clone().or(payload.file_name);
                            let content_type = part
                                .content_type
                                .clone()
                                .or(payload.mime_type)
                                .or_else(|| {
                                    file_name.as_deref().and_then(crate::mime::guess_from_file_name)
                                });
                            parts.push(EncodedPart {
                                name: part.name.clone(),
                                file_name,
                                content_type,
                                data: payload.data,
                            });
                        }
                        PartKind::Text => {
                            parts.push(EncodedPart {
                                name: part.name.clone(),
                                file_name: part.file_name.clone(),
                                content_type: part.content_type.clone(),
                                data: part.value.clone().into_bytes(),
                            });
                        }
                    }
                }
                let boundary = generate_boundary();
                let body = encode_multipart(&boundary, &parts);
                Ok(RequestBody::Multipart { boundary, body })
            }
            BodyMode::Raw => Ok(RequestBody::Raw {
                content: params.raw_body.clone(),
                content_type: params
                    .raw_content_type
                    .clone()
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or_else(|| OCTET_STREAM.to_string()),
            }),
            BodyMode::Graphql => {
                let variables = if params.gql_variables.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&params.gql_variables).map_err(|e| {
                        RestmanError::InvalidJson {
                            context: "GraphQL variables".to_string(),
                            message: e.to_string(),
                        }
                    })?
                };
                Ok(RequestBody::GraphQl {
                    query: params.gql_query.clone(),
                    variables,
                })
            }
            BodyMode::Binary => {
                let payload = binary.read(item_index, &params.binary_property)?;
                let content_type = payload
                    .mime_type
                    .clone()
                    .or_else(|| {
                        payload
                            .file_name
                            .as_deref()
                            .and_then(crate::mime::guess_from_file_name)
                    })
                    .unwrap_or_else(|| OCTET_STREAM.to_string());
                Ok(RequestBody::Binary {
                    content_type,
                    file_name: payload.file_name,
                    data: payload.data,
                    property: params.binary_property.clone(),
                })
            }
        }
    }

    /// The content-type implied by this body, if any
    pub fn content_type(&self) -> Option<String> {
        match self {
            RequestBody::None => None,
            RequestBody::Form { .. } => {
                Some("application/x-www-form-urlencoded".to_string())
            }
            RequestBody::Multipart { boundary, .. } => {
                Some(format!("multipart/form-data; boundary={}", boundary))
            }
            RequestBody::Raw { content_type, .. } => Some(content_type.clone()),
            RequestBody::GraphQl { .. } => Some("application/json".to_string()),
            RequestBody::Binary { content_type, .. } => Some(content_type.clone()),
        }
    }

    /// Serialize to the bytes that go on the wire
    pub fn wire_bytes(&self) -> Result<Option<Vec<u8>>> {
        match self {
            RequestBody::None => Ok(None),
            RequestBody::Form { fields } => {
                let encoded = serde_urlencoded::to_string(fields)
                    .map_err(|e| RestmanError::Parse(format!("form encoding: {}", e)))?;
                Ok(Some(encoded.into_bytes()))
            }
            RequestBody::Multipart { body, .. } => Ok(Some(body.clone())),
            RequestBody::Raw { content, .. } => Ok(Some(content.clone().into_bytes())),
            RequestBody::GraphQl { query, variables } => {
                let envelope = json!({ "query": query, "variables": variables });
                Ok(Some(serde_json::to_vec(&envelope)?))
            }
            RequestBody::Binary { data, .. } => Ok(Some(data.clone())),
        }
    }

    /// Metadata record describing the original user input, exposed to
    /// assertion scripts as `pm.request.body`.
    pub fn meta(&self) -> JsonValue {
        match self {
            RequestBody::None => json!({ "mode": "none" }),
            RequestBody::Form { fields } => json!({ "mode": "formUrlEncoded", "form": fields }),
            RequestBody::Multipart { .. } => json!({ "mode": "multipart" }),
            RequestBody::Raw { content, content_type } => {
                json!({ "mode": "raw", "raw": content, "contentType": content_type })
            }
            RequestBody::GraphQl { query, variables } => {
                json!({ "mode": "graphql", "graphql": { "query": query, "variables": variables } })
            }
            RequestBody::Binary { property, file_name, content_type, .. } => json!({
                "mode": "binary",
                "propertyName": property,
                "fileName": file_name,
                "mimeType": content_type,
            }),
        }
    }
}

/// Generate a fresh multipart boundary. The builder is the sole owner of
/// this value; it must appear both in the content-type header and the body.
fn generate_boundary() -> String {
    format!("----restman{}", nanoid::nanoid!(24))
}

fn encode_multipart(boundary: &str, parts: &[EncodedPart]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = &part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        disposition.push_str("\r\n");
        out.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = &part.content_type {
            out.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&part.data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BinaryPayload, MemoryBinaryStore};
    use crate::input::{KeyValueRow, MultipartPart};

    fn params_with_mode(mode: BodyMode) -> ItemParameters {
        ItemParameters {
            body_mode: mode,
            ..ItemParameters::default()
        }
    }

    #[test]
    fn test_form_roundtrip() {
        let mut params = params_with_mode(BodyMode::FormUrlEncoded);
        params.form_fields = vec![
            KeyValueRow::new("name", "John Doe"),
            KeyValueRow::new("q", "a&b=c"),
            KeyValueRow {
                disabled: true,
                ..KeyValueRow::new("skip", "me")
            },
        ];

        let body = RequestBody::build(&params, 0, &MemoryBinaryStore::new()).unwrap();
        let bytes = body.wire_bytes().unwrap().unwrap();
        let decoded: Vec<(String, String)> =
            serde_urlencoded::from_bytes(&bytes).unwrap();
        assert_eq!(
            decoded,
            vec![
                ("name".to_string(), "John Doe".to_string()),
                ("q".to_string(), "a&b=c".to_string()),
            ]
        );
        assert_eq!(
            body.content_type().as_deref(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_raw_preserves_bytes_and_defaults_content_type() {
        let mut params = params_with_mode(BodyMode::Raw);
        params.raw_body = "hello".to_string();

        let body = RequestBody::build(&params, 0, &MemoryBinaryStore::new()).unwrap();
        assert_eq!(body.wire_bytes().unwrap().unwrap(), b"hello");
        assert_eq!(body.content_type().as_deref(), Some(OCTET_STREAM));

        params.raw_content_type = Some("text/plain".to_string());
        let body = RequestBody::build(&params, 0, &MemoryBinaryStore::new()).unwrap();
        assert_eq!(body.content_type().as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_graphql_envelope() {
        let mut params = params_with_mode(BodyMode::Graphql);
        params.gql_query = "{ hero { name } }".to_string();
        params.gql_variables = r#"{"id": 7}"#.to_string();

        let body = RequestBody::build(&params, 0, &MemoryBinaryStore::new()).unwrap();
        let bytes = body.wire_bytes().unwrap().unwrap();
        let envelope: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope["query"], "{ hero { name } }");
        assert_eq!(envelope["variables"]["id"], 7);
        assert_eq!(body.content_type().as_deref(), Some("application/json"));
    }

    #[test]
    fn test_graphql_invalid_variables() {
        let mut params = params_with_mode(BodyMode::Graphql);
        params.gql_query = "{ hero }".to_string();
        params.gql_variables = "{not json".to_string();

        let err = RequestBody::build(&params, 0, &MemoryBinaryStore::new()).unwrap_err();
        assert!(matches!(err, RestmanError::InvalidJson { .. }));
    }

    #[test]
    fn test_graphql_empty_variables_default() {
        let mut params = params_with_mode(BodyMode::Graphql);
        params.gql_query = "{ hero }".to_string();

        let body = RequestBody::build(&params, 0, &MemoryBinaryStore::new()).unwrap();
        match body {
            RequestBody::GraphQl { variables, .. } => assert_eq!(variables, json!({})),
            other => panic!("expected graphql body, got {:?}", other),
        }
    }

    #[test]
    fn test_multipart_encoding() {
        let mut store = MemoryBinaryStore::new();
        store.attach(
            0,
            "upload",
            BinaryPayload {
                data: b"\x00\x01binary".to_vec(),
                mime_type: Some("application/pdf".to_string()),
                file_name: Some("doc.pdf".to_string()),
            },
        );

        let mut params = params_with_mode(BodyMode::Multipart);
        params.multipart = vec![
            MultipartPart {
                name: "field".to_string(),
                value: "text value".to_string(),
                ..MultipartPart::default()
            },
            MultipartPart {
                name: "file".to_string(),
                value: "upload".to_string(),
                kind: PartKind::Binary,
                ..MultipartPart::default()
            },
            MultipartPart {
                name: "dropped".to_string(),
                value: "x".to_string(),
                disabled: true,
                ..MultipartPart::default()
            },
        ];

        let body = RequestBody::build(&params, 0, &store).unwrap();
        let content_type = body.content_type().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let boundary = match &body {
            RequestBody::Multipart { boundary, .. } => boundary.clone(),
            other => panic!("expected multipart body, got {:?}", other),
        };
        assert!(content_type.ends_with(&boundary));

        let bytes = body.wire_bytes().unwrap().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("name=\"field\""));
        assert!(text.contains("text value"));
        assert!(text.contains("name=\"file\"; filename=\"doc.pdf\""));
        assert!(text.contains("Content-Type: application/pdf"));
        assert!(!text.contains("dropped"));
        assert!(text.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn test_multipart_missing_binary() {
        let mut params = params_with_mode(BodyMode::Multipart);
        params.multipart = vec![MultipartPart {
            name: "file".to_string(),
            value: "nope".to_string(),
            kind: PartKind::Binary,
            ..MultipartPart::default()
        }];

        let err = RequestBody::build(&params, 0, &MemoryBinaryStore::new()).unwrap_err();
        assert!(matches!(err, RestmanError::MissingBinaryData { .. }));
    }

    #[test]
    fn test_binary_body_from_item_property() {
        let mut store = MemoryBinaryStore::new();
        store.attach(
            2,
            "data",
            BinaryPayload {
                data: b"payload".to_vec(),
                mime_type: Some("image/png".to_string()),
                file_name: None,
            },
        );

        let mut params = params_with_mode(BodyMode::Binary);
        params.binary_property = "data".to_string();

        let body = RequestBody::build(&params, 2, &store).unwrap();
        assert_eq!(body.wire_bytes().unwrap().unwrap(), b"payload");
        assert_eq!(body.content_type().as_deref(), Some("image/png"));

        let err = RequestBody::build(&params, 0, &store).unwrap_err();
        assert!(matches!(err, RestmanError::MissingBinaryData { item_index: 0, .. }));
    }

    #[test]
    fn test_body_meta_shapes() {
        assert_eq!(RequestBody::None.meta()["mode"], "none");

        let raw = RequestBody::Raw {
            content: "hi".to_string(),
            content_type: "text/plain".to_string(),
        };
        assert_eq!(raw.meta()["raw"], "hi");
        assert_eq!(raw.meta()["contentType"], "text/plain");

        let gql = RequestBody::GraphQl {
            query: "{ q }".to_string(),
            variables: json!({"a": 1}),
        };
        assert_eq!(gql.meta()["graphql"]["variables"]["a"], 1);
    }
}
