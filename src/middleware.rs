//! Rate limiting middleware for HTTP services.
//!
//! [`RateLimitLayer`] wraps any `tower` service that speaks `axum` responses.
//! It holds no rate limit state of its own: each request is reduced to a
//! client key and an endpoint key, handed to the algorithm, and either
//! forwarded untouched or answered with `429 Too Many Requests`.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use futures::future::{self, Either, Ready};
use http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use http::{Request, StatusCode};
use tower::{Layer, Service};
use tracing::debug;

use crate::ratelimit::{Decision, RateLimitAlgorithm, RequestKeys, DEFAULT_CLIENT_HEADER};

/// Body of every rejection response.
pub const RATE_LIMITED_BODY: &str = "Rate limit exceeded";

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Layer that applies rate limiting to the wrapped service.
#[derive(Clone)]
pub struct RateLimitLayer {
    algorithm: Arc<dyn RateLimitAlgorithm>,
    client_header: HeaderName,
}

impl RateLimitLayer {
    /// Create a layer deciding with the given algorithm.
    ///
    /// Clients are identified by the `X-Forwarded-For` header unless
    /// [`client_header`](Self::client_header) says otherwise.
    pub fn new(algorithm: Arc<dyn RateLimitAlgorithm>) -> Self {
        Self {
            algorithm,
            client_header: HeaderName::from_static(DEFAULT_CLIENT_HEADER),
        }
    }

    /// Use a different header as the client key.
    pub fn client_header(mut self, header: HeaderName) -> Self {
        self.client_header = header;
        self
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            algorithm: self.algorithm.clone(),
            client_header: self.client_header.clone(),
        }
    }
}

/// Service produced by [`RateLimitLayer`].
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    algorithm: Arc<dyn RateLimitAlgorithm>,
    client_header: HeaderName,
}

impl<S, B> Service<Request<B>> for RateLimitService<S>
where
    S: Service<Request<B>, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Response, S::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let keys = RequestKeys::from_request(&request, &self.client_header);
        let decision = self.algorithm.evaluate(&keys.client, &keys.endpoint);

        if decision.is_allowed() {
            return Either::Right(self.inner.call(request));
        }

        debug!(
            client = %keys.client,
            endpoint = %keys.endpoint,
            method = %request.method(),
            "Rejecting request"
        );
        Either::Left(future::ready(Ok(rate_limited_response(&decision))))
    }
}

/// Build the rejection response for a denied decision.
fn rate_limited_response(decision: &Decision) -> Response {
    let mut response = (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_BODY).into_response();
    let headers = response.headers_mut();

    if let Some(reset_after) = decision.reset_after {
        // Round up so a client retrying on time never hits a still-full window
        let secs = reset_after.as_secs() + u64::from(reset_after.subsec_nanos() > 0);
        headers.insert(RETRY_AFTER, HeaderValue::from(secs));
    }
    if let Some(limit) = decision.limit {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    }
    if let Some(remaining) = decision.remaining {
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    }

    response
}
