//! HTTP server hosting the rate limited demo handler.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use http::header::HeaderName;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Result;
use crate::middleware::RateLimitLayer;
use crate::ratelimit::{RateLimitAlgorithm, DEFAULT_CLIENT_HEADER};

/// Body returned by the demo handler.
pub const GREETING: &str = "Hello, world!";

/// HTTP server that puts every request through the rate limiter.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limit algorithm instance
    algorithm: Arc<dyn RateLimitAlgorithm>,
    /// Header the client key is read from
    client_header: HeaderName,
}

impl HttpServer {
    /// Create a new server deciding with the given algorithm.
    pub fn new(addr: SocketAddr, algorithm: Arc<dyn RateLimitAlgorithm>) -> Self {
        Self {
            addr,
            algorithm,
            client_header: HeaderName::from_static(DEFAULT_CLIENT_HEADER),
        }
    }

    pub fn client_header(mut self, header: HeaderName) -> Self {
        self.client_header = header;
        self
    }

    /// Build the router: a greeting on every path, behind the rate limiter.
    pub fn router(&self) -> Router {
        let layer =
            RateLimitLayer::new(self.algorithm.clone()).client_header(self.client_header.clone());

        Router::new().fallback(greet).layer(layer)
    }

    /// Bind the configured address and serve until the signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            e
        })?;

        self.serve_on(listener, signal).await
    }

    /// Serve on an already bound listener until the signal resolves.
    pub async fn serve_on<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            addr = %listener.local_addr()?,
            client_header = %self.client_header,
            "Starting HTTP server with graceful shutdown"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                e.into()
            })
    }
}

async fn greet() -> &'static str {
    GREETING
}
