//! Output composition
//!
//! Shapes the final per-item payload from the normalized response, the
//! assertion summary, and the response-format/full-response options. Three
//! mutually exclusive shapes exist; see [`compose`].

use serde_json::{json, Map, Value as JsonValue};

use crate::errors::Result;
use crate::host::{BinaryHandle, BinaryStore};
use crate::input::{RequestOptions, ResponseFormat};
use crate::mime;
use crate::response::NormalizedResponse;
use crate::scripting::TestSummary;

/// Property key under which binary response bodies are persisted
const BINARY_OUTPUT_PROPERTY: &str = "data";

/// One composed output item
#[derive(Debug, Clone)]
pub struct OutputItem {
    pub json: JsonValue,
    pub binary: Option<BinaryHandle>,
    /// Index of the input item this output originates from
    pub item_index: usize,
}

/// Compose the output payload for one item.
///
/// Shape selection:
/// - `responseFormat = binary`: structured data carries only the test
///   summary; the body becomes a binary attachment with the detected mime
///   type.
/// - `fullResponse = true`: `{body, statusCode, headers, responseTime}`.
/// - default: a structured object body is spread at the top level (else
///   wrapped as `{body}`), with `__meta: {statusCode, headers, responseTime}`.
///
/// `__tests` is attached to every shape when an assertion run happened.
pub fn compose(
    options: &RequestOptions,
    response: &NormalizedResponse,
    summary: Option<&TestSummary>,
    item_index: usize,
    store: &dyn BinaryStore,
) -> Result<OutputItem> {
    let tests = summary.map(serde_json::to_value).transpose()?;

    if options.response_format == ResponseFormat::Binary {
        let mime_type = response
            .content_type()
            .map(mime::essence)
            .unwrap_or_else(|| mime::OCTET_STREAM.to_string());
        let handle = store.write(
            response.parsed.as_bytes().into_owned(),
            BINARY_OUTPUT_PROPERTY,
            &mime_type,
        )?;

        let mut object = Map::new();
        if let Some(tests) = tests {
            object.insert("__tests".to_string(), tests);
        }
        return Ok(OutputItem {
            json: JsonValue::Object(object),
            binary: Some(handle),
            item_index,
        });
    }

    let json = if options.full_response {
        let mut object = Map::new();
        object.insert("body".to_string(), response.parsed.to_json());
        object.insert("statusCode".to_string(), json!(response.status_code));
        object.insert("headers".to_string(), response.headers_json());
        object.insert("responseTime".to_string(), json!(response.elapsed_ms));
        if let Some(tests) = tests {
            object.insert("__tests".to_string(), tests);
        }
        JsonValue::Object(object)
    } else {
        let mut object = match response.parsed.to_json() {
            JsonValue::Object(fields) => fields,
            other => {
                let mut wrapped = Map::new();
                wrapped.insert("body".to_string(), other);
                wrapped
            }
        };
        object.insert(
            "__meta".to_string(),
            json!({
                "statusCode": response.status_code,
                "headers": response.headers_json(),
                "responseTime": response.elapsed_ms,
            }),
        );
        if let Some(tests) = tests {
            object.insert("__tests".to_string(), tests);
        }
        JsonValue::Object(object)
    };

    Ok(OutputItem {
        json,
        binary: None,
        item_index,
    })
}

/// Convert a per-item failure into a captured error output
pub fn error_item(error: &crate::errors::RestmanError, item_index: usize) -> OutputItem {
    OutputItem {
        json: json!({
            "error": error.to_string(),
            "stack": format!("{:?}", error),
        }),
        binary: None,
        item_index,
    }
}
