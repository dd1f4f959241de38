//! Rate limit algorithm trait for abstracting interchangeable strategies.

use std::time::Duration;

use crate::error::Result;

/// The outcome of evaluating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// The configured limit, if the endpoint is restricted
    pub limit: Option<u64>,
    /// Requests still available in the current window
    pub remaining: Option<u64>,
    /// Time until the oldest counted request leaves the window
    pub reset_after: Option<Duration>,
}

impl Decision {
    /// Decision for an endpoint with no configured limit.
    pub fn unrestricted() -> Self {
        Self {
            allowed: true,
            limit: None,
            remaining: None,
            reset_after: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Trait for rate limit algorithm implementations.
///
/// Implementations own all of their state and are shared behind an `Arc`, so
/// every method takes `&self` and must be safe to call from many tasks at
/// once. The middleware only ever talks to an algorithm through this trait.
pub trait RateLimitAlgorithm: Send + Sync {
    /// Register or overwrite the per-window limit for an endpoint.
    ///
    /// Takes effect for the next decision. Fails for a limit of zero.
    fn set_endpoint_limit(&self, endpoint: &str, limit: u64) -> Result<()>;

    /// Remove the limit for an endpoint, making it unrestricted again.
    ///
    /// Returns the limit that was configured, if any.
    fn clear_endpoint_limit(&self, endpoint: &str) -> Option<u64>;

    /// Get the limit configured for an endpoint.
    fn endpoint_limit(&self, endpoint: &str) -> Option<u64>;

    /// Decide whether a client may call an endpoint, recording the request
    /// if it is allowed.
    ///
    /// Pruning, the limit comparison and the append happen without releasing
    /// exclusive access to the client's ledger in between.
    fn evaluate(&self, client_key: &str, endpoint: &str) -> Decision;

    /// Number of requests from a client to an endpoint still inside the window.
    fn request_count(&self, client_key: &str, endpoint: &str) -> usize;

    /// Drop expired timestamps everywhere and evict clients with nothing left.
    ///
    /// Returns the number of evicted (endpoint, client) entries.
    fn sweep(&self) -> usize;

    /// Number of (endpoint, client) entries currently held.
    fn tracked_clients(&self) -> usize;
}
