//! Request key extraction.

use http::header::HeaderName;
use http::Request;

/// Default header carrying the client identity.
pub const DEFAULT_CLIENT_HEADER: &str = "x-forwarded-for";

/// The pair of keys a request is rate limited under.
///
/// Both keys are taken verbatim from the request. The client key is whatever
/// the transport in front of us put into the client header; no parsing or
/// validation happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKeys {
    /// Identifies the caller
    pub client: String,
    /// Identifies the route, matched exactly against configured limits
    pub endpoint: String,
}

impl RequestKeys {
    pub fn new(client: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Derive keys from an HTTP request.
    ///
    /// A missing or non-UTF-8 client header yields an empty client key.
    pub fn from_request<B>(request: &Request<B>, client_header: &HeaderName) -> Self {
        let client = request
            .headers()
            .get(client_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        Self::new(client, request.uri().path())
    }
}

impl std::fmt::Display for RequestKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.client, self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn client_header() -> HeaderName {
        HeaderName::from_static(DEFAULT_CLIENT_HEADER)
    }

    #[test]
    fn test_keys_from_request() {
        let request = Request::builder()
            .uri("/api/user?verbose=1")
            .header("X-Forwarded-For", "10.0.0.7")
            .body(())
            .unwrap();

        let keys = RequestKeys::from_request(&request, &client_header());

        assert_eq!(keys.client, "10.0.0.7");
        assert_eq!(keys.endpoint, "/api/user");
    }

    #[test]
    fn test_missing_header_gives_empty_client() {
        let request = Request::builder().uri("/api/user").body(()).unwrap();

        let keys = RequestKeys::from_request(&request, &client_header());

        assert_eq!(keys.client, "");
    }

    #[test]
    fn test_header_value_used_verbatim() {
        let request = Request::builder()
            .uri("/api/user")
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap();

        let keys = RequestKeys::from_request(&request, &client_header());
        assert_eq!(keys.client, "203.0.113.9, 10.0.0.1");
    }

    #[test]
    fn test_non_utf8_header_gives_empty_client() {
        let mut request = Request::builder().uri("/api/user").body(()).unwrap();
        request.headers_mut().insert(
            client_header(),
            HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap(),
        );

        let keys = RequestKeys::from_request(&request, &client_header());
        assert_eq!(keys.client, "");
    }

    #[test]
    fn test_custom_client_header() {
        let request = Request::builder()
            .uri("/api/profile")
            .header("X-Api-Key", "key-123")
            .header("X-Forwarded-For", "10.0.0.7")
            .body(())
            .unwrap();

        let keys = RequestKeys::from_request(&request, &HeaderName::from_static("x-api-key"));
        assert_eq!(keys, RequestKeys::new("key-123", "/api/profile"));
    }

    #[test]
    fn test_keys_display() {
        let keys = RequestKeys::new("c1", "/e1");
        assert_eq!(keys.to_string(), "c1@/e1");
    }
}
