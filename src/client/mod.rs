//! HTTP transport
//!
//! The runner consumes transport through the [`Transport`] trait so hosts
//! can substitute their own dispatch path (notably for OAuth2 token
//! management). [`HttpTransport`] is the bundled reqwest implementation.
//! Dispatch never fails on 4xx/5xx; status inspection is the caller's
//! responsibility.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::errors::{RestmanError, Result};
use crate::request::RequestDescriptor;

/// Raw transport response, before normalization
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_message: Option<String>,
    /// In wire order, duplicates preserved
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Perform an HTTP request given a fully-built request descriptor
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn dispatch(&self, descriptor: &RequestDescriptor) -> Result<RawResponse>;

    /// Dispatch through an OAuth2-aware path with the opaque `oAuth2Api`
    /// credential payload
    async fn dispatch_oauth2(
        &self,
        credential: &JsonValue,
        descriptor: &RequestDescriptor,
    ) -> Result<RawResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }

    /// Redirects, timeout, proxy, and compression vary per descriptor, so a
    /// client is built per dispatch.
    fn build_client(&self, descriptor: &RequestDescriptor) -> Result<Client> {
        let redirect = if descriptor.follow_redirect {
            Policy::limited(descriptor.max_redirects as usize)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .redirect(redirect)
            .timeout(Duration::from_millis(descriptor.timeout_ms))
            .cookie_store(descriptor.use_cookie_jar);

        if let Some(proxy) = &descriptor.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        if !descriptor.gzip || !descriptor.decompress {
            builder = builder.no_gzip().no_deflate().no_brotli();
        }

        Ok(builder.build()?)
    }

    fn build_headers(&self, descriptor: &RequestDescriptor) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &descriptor.headers {
            let header_name = HeaderName::try_from(name.as_str()).map_err(|e| {
                RestmanError::Parse(format!("Invalid header name '{}': {}", name, e))
            })?;
            let header_value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                RestmanError::Parse(format!("Invalid header value '{}': {}", value, e))
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

impl Transport for HttpTransport {
    async fn dispatch(&self, descriptor: &RequestDescriptor) -> Result<RawResponse> {
        let client = self.build_client(descriptor)?;
        let url = url::Url::parse(&descriptor.url)?;

        let method: reqwest::Method = descriptor
            .method
            .as_str()
            .parse()
            .map_err(|_| RestmanError::Parse(format!("Invalid HTTP method: {}", descriptor.method)))?;

        let mut request = client
            .request(method, url)
            .headers(self.build_headers(descriptor)?);

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }

        if descriptor.method.allows_body() {
            if let Some(bytes) = descriptor.body.wire_bytes()? {
                request = request.body(bytes);
            }
        }

        debug!(method = %descriptor.method, url = %descriptor.url, "dispatching request");
        let response = request.send().await?;

        let status = response.status();
        let status_message = status.canonical_reason().map(str::to_string);
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(RawResponse {
            status: status.as_u16(),
            status_message,
            headers,
            body,
        })
    }

    /// Minimal delegated path: inject the credential's current access token
    /// as a bearer header. Hosts that refresh tokens implement [`Transport`]
    /// themselves and route this through their own OAuth2 machinery.
    async fn dispatch_oauth2(
        &self,
        credential: &JsonValue,
        descriptor: &RequestDescriptor,
    ) -> Result<RawResponse> {
        let token = credential
            .get("accessToken")
            .and_then(JsonValue::as_str)
            .or_else(|| {
                credential
                    .pointer("/oauthTokenData/access_token")
                    .and_then(JsonValue::as_str)
            })
            .ok_or_else(|| {
                RestmanError::Config("oAuth2Api credential carries no access token".to_string())
            })?;

        let mut authorized = descriptor.clone();
        authorized.set_header("Authorization", format!("Bearer {}", token));
        self.dispatch(&authorized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ItemParameters;
    use crate::request::RequestBody;

    #[test]
    fn test_build_client_rejects_bad_proxy() {
        let mut descriptor =
            RequestDescriptor::assemble(&ItemParameters::default(), RequestBody::None);
        descriptor.proxy = Some("::not a proxy::".to_string());
        assert!(HttpTransport::new().build_client(&descriptor).is_err());
    }

    #[test]
    fn test_build_headers_rejects_invalid_name() {
        let mut descriptor =
            RequestDescriptor::assemble(&ItemParameters::default(), RequestBody::None);
        descriptor.headers.insert("bad header".to_string(), "v".to_string());
        let err = HttpTransport::new().build_headers(&descriptor).unwrap_err();
        assert!(matches!(err, RestmanError::Parse(_)));
    }
}
