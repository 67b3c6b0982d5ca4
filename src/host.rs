//! Interfaces to the host workflow runtime
//!
//! The host owns credential storage and binary-data persistence; this crate
//! consumes them through narrow traits. In-memory implementations are
//! provided for embedding and tests.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::errors::{RestmanError, Result};

/// Logical name of the request authentication credential
pub const POSTMAN_AUTH_CREDENTIAL: &str = "postmanAuthApi";

/// Logical name of the credential handed opaquely to the OAuth2 dispatch path
pub const OAUTH2_CREDENTIAL: &str = "oAuth2Api";

/// A byte buffer stored on an input item
#[derive(Debug, Clone, Default)]
pub struct BinaryPayload {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

/// Opaque handle to a byte buffer persisted as binary output
#[derive(Debug, Clone)]
pub struct BinaryHandle {
    pub property_key: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Credential lookup by logical name.
///
/// `None` means the credential is not configured; lookup failures are never
/// surfaced as errors.
pub trait CredentialProvider {
    fn get(&self, name: &str) -> Option<JsonValue>;
}

/// Binary-data persistence facility of the host
pub trait BinaryStore {
    /// Read a named binary property of the given input item
    fn read(&self, item_index: usize, property: &str) -> Result<BinaryPayload>;

    /// Persist a byte buffer as binary output with the given mime type
    fn write(&self, data: Vec<u8>, property_key: &str, mime_type: &str) -> Result<BinaryHandle>;
}

/// Credential provider with nothing configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn get(&self, _name: &str) -> Option<JsonValue> {
        None
    }
}

/// In-memory credential provider
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentials {
    credentials: HashMap<String, JsonValue>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, payload: JsonValue) {
        self.credentials.insert(name.into(), payload);
    }
}

impl CredentialProvider for MemoryCredentials {
    fn get(&self, name: &str) -> Option<JsonValue> {
        self.credentials.get(name).cloned()
    }
}

/// In-memory binary store keyed by item index and property name
#[derive(Debug, Clone, Default)]
pub struct MemoryBinaryStore {
    items: Vec<HashMap<String, BinaryPayload>>,
}

impl MemoryBinaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a binary payload to an item, growing the item list as needed
    pub fn attach(&mut self, item_index: usize, property: impl Into<String>, payload: BinaryPayload) {
        if self.items.len() <= item_index {
            self.items.resize_with(item_index + 1, HashMap::new);
        }
        self.items[item_index].insert(property.into(), payload);
    }
}

impl BinaryStore for MemoryBinaryStore {
    fn read(&self, item_index: usize, property: &str) -> Result<BinaryPayload> {
        self.items
            .get(item_index)
            .and_then(|item| item.get(property))
            .cloned()
            .ok_or_else(|| RestmanError::MissingBinaryData {
                item_index,
                property: property.to_string(),
            })
    }

    fn write(&self, data: Vec<u8>, property_key: &str, mime_type: &str) -> Result<BinaryHandle> {
        Ok(BinaryHandle {
            property_key: property_key.to_string(),
            mime_type: mime_type.to_string(),
            data,
        })
    }
}
