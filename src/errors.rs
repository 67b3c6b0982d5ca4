//! Error types for Restman

use thiserror::Error;

/// Main error type for Restman
#[derive(Error, Debug)]
pub enum RestmanError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid JSON in {context}: {message}")]
    InvalidJson { context: String, message: String },

    #[error("No binary data property \"{property}\" exists on item {item_index}")]
    MissingBinaryData { item_index: usize, property: String },

    #[error("HTTP {status}: {preview}")]
    HttpStatus { status: u16, preview: String },

    #[error("Assertions failed: {0}")]
    AssertionsFailed(usize),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<rquickjs::Error> for RestmanError {
    fn from(err: rquickjs::Error) -> Self {
        RestmanError::Script(format!("JavaScript error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, RestmanError>;
