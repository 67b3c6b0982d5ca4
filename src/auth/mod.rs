//! Request authentication
//!
//! Authentication via enum variants rather than trait objects: a sum type
//! for the finite set of mechanisms the node supports. At most one mechanism
//! applies per request; it mutates the descriptor's headers or query before
//! dispatch. OAuth2 is never applied locally; the runner hands the whole
//! descriptor to the transport's OAuth2-aware dispatch path.

use base64::Engine;
use serde_json::Value as JsonValue;

use crate::request::RequestDescriptor;

/// HTTP Basic Authentication (RFC 7617)
#[derive(Debug, Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn apply(&self, descriptor: &mut RequestDescriptor) {
        let credentials = format!("{}:{}", self.username, self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        descriptor.set_header("Authorization", format!("Basic {}", encoded));
    }
}

/// Bearer token authentication (RFC 6750)
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    fn apply(&self, descriptor: &mut RequestDescriptor) {
        descriptor.set_header("Authorization", format!("Bearer {}", self.token));
    }
}

/// Where an API key is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// API key authentication via a named header or query parameter
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    location: ApiKeyLocation,
    name: String,
    value: String,
}

impl ApiKeyAuth {
    pub fn new(
        location: ApiKeyLocation,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            location,
            name: name.into(),
            value: value.into(),
        }
    }

    fn apply(&self, descriptor: &mut RequestDescriptor) {
        match self.location {
            ApiKeyLocation::Header => descriptor.set_header(&self.name, self.value.clone()),
            ApiKeyLocation::Query => {
                descriptor.query.insert(self.name.clone(), self.value.clone());
            }
        }
    }
}

/// Authentication context resolved from the `postmanAuthApi` credential
#[derive(Debug, Clone, Default)]
pub enum AuthContext {
    #[default]
    None,
    Basic(BasicAuth),
    Bearer(BearerAuth),
    ApiKey(ApiKeyAuth),
    /// Delegated whole to the transport's OAuth2-aware dispatch path
    OAuth2,
}

impl AuthContext {
    /// Resolve the context from a credential payload.
    ///
    /// A missing credential, an unknown authType, or `authType=none` all
    /// resolve to `None`; credential problems never abort the item.
    pub fn from_credential(credential: Option<JsonValue>) -> Self {
        let Some(cred) = credential else {
            return AuthContext::None;
        };

        let field = |name: &str| {
            cred.get(name)
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match cred.get("authType").and_then(JsonValue::as_str) {
            Some("basic") => {
                AuthContext::Basic(BasicAuth::new(field("username"), field("password")))
            }
            Some("bearer") => AuthContext::Bearer(BearerAuth::new(field("token"))),
            Some("apikey") => {
                let location = match cred.get("apiKeyLocation").and_then(JsonValue::as_str) {
                    Some("query") => ApiKeyLocation::Query,
                    _ => ApiKeyLocation::Header,
                };
                AuthContext::ApiKey(ApiKeyAuth::new(
                    location,
                    field("apiKeyName"),
                    field("apiKeyValue"),
                ))
            }
            Some("oauth2") => AuthContext::OAuth2,
            _ => AuthContext::None,
        }
    }

    /// Whether dispatch must go through the OAuth2 path
    pub fn is_oauth2(&self) -> bool {
        matches!(self, AuthContext::OAuth2)
    }

    /// Mutate the descriptor's headers/query for this mechanism
    pub fn apply(&self, descriptor: &mut RequestDescriptor) {
        match self {
            AuthContext::None | AuthContext::OAuth2 => {}
            AuthContext::Basic(auth) => auth.apply(descriptor),
            AuthContext::Bearer(auth) => auth.apply(descriptor),
            AuthContext::ApiKey(auth) => auth.apply(descriptor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ItemParameters;
    use crate::request::RequestBody;
    use serde_json::json;

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::assemble(&ItemParameters::default(), RequestBody::None)
    }

    #[test]
    fn test_missing_credential_is_none() {
        assert!(matches!(AuthContext::from_credential(None), AuthContext::None));
        let ctx = AuthContext::from_credential(Some(json!({"authType": "none"})));
        assert!(matches!(ctx, AuthContext::None));
    }

    #[test]
    fn test_basic_auth_header() {
        let ctx = AuthContext::from_credential(Some(json!({
            "authType": "basic",
            "username": "user",
            "password": "pass",
        })));
        let mut d = descriptor();
        ctx.apply(&mut d);
        // base64("user:pass")
        assert_eq!(d.header("Authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_bearer_auth_header() {
        let ctx = AuthContext::from_credential(Some(json!({
            "authType": "bearer",
            "token": "tok123",
        })));
        let mut d = descriptor();
        ctx.apply(&mut d);
        assert_eq!(d.header("authorization"), Some("Bearer tok123"));
    }

    #[test]
    fn test_api_key_locations() {
        let header_ctx = AuthContext::from_credential(Some(json!({
            "authType": "apikey",
            "apiKeyLocation": "header",
            "apiKeyName": "X-Api-Key",
            "apiKeyValue": "secret",
        })));
        let mut d = descriptor();
        header_ctx.apply(&mut d);
        assert_eq!(d.header("X-Api-Key"), Some("secret"));

        let query_ctx = AuthContext::from_credential(Some(json!({
            "authType": "apikey",
            "apiKeyLocation": "query",
            "apiKeyName": "api_key",
            "apiKeyValue": "secret",
        })));
        let mut d = descriptor();
        query_ctx.apply(&mut d);
        assert_eq!(d.query.get("api_key"), Some(&"secret".to_string()));
        assert_eq!(d.header("api_key"), None);
    }

    #[test]
    fn test_oauth2_is_delegated() {
        let ctx = AuthContext::from_credential(Some(json!({"authType": "oauth2"})));
        assert!(ctx.is_oauth2());
        let mut d = descriptor();
        ctx.apply(&mut d);
        assert!(d.headers.is_empty());
    }

    #[test]
    fn test_auth_overrides_existing_authorization() {
        let ctx = AuthContext::from_credential(Some(json!({
            "authType": "bearer",
            "token": "fresh",
        })));
        let mut d = descriptor();
        d.set_header("Authorization", "Basic stale");
        ctx.apply(&mut d);
        assert_eq!(d.header("Authorization"), Some("Bearer fresh"));
    }
}
