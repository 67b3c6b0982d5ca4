//! HTTP method enum and utilities

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RestmanError;

/// The HTTP methods the runner can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

/// All supported methods
pub const SUPPORTED_METHODS: &[Method] = &[
    Method::Get,
    Method::Post,
    Method::Put,
    Method::Patch,
    Method::Delete,
    Method::Head,
    Method::Options,
];

impl Method {
    /// The canonical uppercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method conventionally carry a body
    pub fn allows_body(&self) -> bool {
        !matches!(self, Method::Get | Method::Head | Method::Options)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RestmanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED_METHODS
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RestmanError::Parse(format!("Invalid HTTP method: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn test_roundtrip() {
        for method in SUPPORTED_METHODS {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), *method);
        }
    }

    #[test]
    fn test_allows_body() {
        assert!(Method::Post.allows_body());
        assert!(Method::Put.allows_body());
        assert!(!Method::Get.allows_body());
        assert!(!Method::Head.allows_body());
    }

    #[test]
    fn test_serde_uppercase() {
        let m: Method = serde_json::from_str("\"DELETE\"").unwrap();
        assert_eq!(m, Method::Delete);
        assert_eq!(serde_json::to_string(&Method::Get).unwrap(), "\"GET\"");
    }
}
