//! Sliding-window log rate limiter.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::algorithm::{Decision, RateLimitAlgorithm};
use super::clock::{Clock, MonotonicClock};
use crate::error::{Result, WardenError};

/// Window used by [`SlidingWindowAlgorithm::default`].
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Smallest step past the window at which a timestamp counts as expired.
const EXPIRY_TICK: Duration = Duration::from_nanos(1);

/// Timestamps of counted requests, oldest first.
type RequestLog = VecDeque<Instant>;

/// Everything the algorithm knows, guarded by one lock.
#[derive(Debug, Default)]
struct WindowState {
    /// Endpoint -> maximum requests per window
    limits: HashMap<String, u64>,
    /// Endpoint -> client -> request log
    ledger: HashMap<String, HashMap<String, RequestLog>>,
}

/// A rate limiter that keeps a log of request timestamps per client and
/// endpoint, and counts the ones younger than the window.
///
/// Unlike fixed buckets, a client cannot get twice the limit through by
/// straddling a bucket edge. Memory per active client is bounded by the
/// endpoint's limit.
pub struct SlidingWindowAlgorithm<C: Clock = MonotonicClock> {
    window: Duration,
    clock: C,
    state: Mutex<WindowState>,
}

impl SlidingWindowAlgorithm<MonotonicClock> {
    /// Create a new sliding-window limiter using the system monotonic clock.
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, MonotonicClock)
    }
}

impl<C: Clock> SlidingWindowAlgorithm<C> {
    /// Create a new sliding-window limiter driven by the given clock.
    pub fn with_clock(window: Duration, clock: C) -> Self {
        Self {
            window,
            clock,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// The trailing interval requests are counted over.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Drop every timestamp that has left the window.
    ///
    /// Logs are append-ordered, so expired entries always form a prefix.
    fn prune(&self, log: &mut RequestLog, now: Instant) {
        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) > self.window {
                log.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until the request holding the next free slot leaves the window.
    ///
    /// With `limit` or more entries that is `log[len - limit]`, since every
    /// entry before it must expire too. Expiry is strict, so the slot frees
    /// one tick after `t + window`.
    fn reset_after(&self, log: &RequestLog, limit: u64, now: Instant) -> Option<Duration> {
        let index = (log.len() as u64).saturating_sub(limit) as usize;
        log.get(index).map(|&t| {
            (t + self.window + EXPIRY_TICK).saturating_duration_since(now)
        })
    }
}

impl Default for SlidingWindowAlgorithm<MonotonicClock> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl<C: Clock> RateLimitAlgorithm for SlidingWindowAlgorithm<C> {
    fn set_endpoint_limit(&self, endpoint: &str, limit: u64) -> Result<()> {
        if limit == 0 {
            warn!(endpoint = %endpoint, "Rejecting zero rate limit");
            return Err(WardenError::InvalidLimit {
                endpoint: endpoint.to_string(),
                limit,
            });
        }

        let previous = self.state.lock().limits.insert(endpoint.to_string(), limit);

        debug!(
            endpoint = %endpoint,
            limit = limit,
            previous = ?previous,
            "Endpoint limit set"
        );
        Ok(())
    }

    fn clear_endpoint_limit(&self, endpoint: &str) -> Option<u64> {
        let mut state = self.state.lock();
        let previous = state.limits.remove(endpoint);
        state.ledger.remove(endpoint);
        drop(state);

        debug!(endpoint = %endpoint, previous = ?previous, "Endpoint limit cleared");
        previous
    }

    fn endpoint_limit(&self, endpoint: &str) -> Option<u64> {
        self.state.lock().limits.get(endpoint).copied()
    }

    fn evaluate(&self, client_key: &str, endpoint: &str) -> Decision {
        let mut state = self.state.lock();
        // Read under the lock so appends stay in timestamp order
        let now = self.clock.now();
        let WindowState { limits, ledger } = &mut *state;

        let Some(&limit) = limits.get(endpoint) else {
            trace!(endpoint = %endpoint, "No limit configured, allowing");
            return Decision::unrestricted();
        };

        let clients = match ledger.get_mut(endpoint) {
            Some(clients) => clients,
            None => ledger.entry(endpoint.to_string()).or_default(),
        };
        let log = match clients.get_mut(client_key) {
            Some(log) => log,
            None => clients.entry(client_key.to_string()).or_default(),
        };

        self.prune(log, now);

        let count = log.len() as u64;
        let allowed = count < limit;
        if allowed {
            log.push_back(now);
        }

        let decision = Decision {
            allowed,
            limit: Some(limit),
            remaining: Some(limit.saturating_sub(log.len() as u64)),
            reset_after: self.reset_after(log, limit, now),
        };
        drop(state);

        if allowed {
            trace!(
                client = %client_key,
                endpoint = %endpoint,
                remaining = ?decision.remaining,
                "Request allowed"
            );
        } else {
            debug!(
                client = %client_key,
                endpoint = %endpoint,
                limit = limit,
                "Rate limit exceeded"
            );
        }

        decision
    }

    fn request_count(&self, client_key: &str, endpoint: &str) -> usize {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let Some(clients) = state.ledger.get_mut(endpoint) else {
            return 0;
        };
        let Some(log) = clients.get_mut(client_key) else {
            return 0;
        };

        self.prune(log, now);
        let count = log.len();
        if count == 0 {
            clients.remove(client_key);
            if clients.is_empty() {
                state.ledger.remove(endpoint);
            }
        }
        count
    }

    fn sweep(&self) -> usize {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let mut evicted = 0;

        state.ledger.retain(|_, clients| {
            clients.retain(|_, log| {
                self.prune(log, now);
                let keep = !log.is_empty();
                if !keep {
                    evicted += 1;
                }
                keep
            });
            !clients.is_empty()
        });

        evicted
    }

    fn tracked_clients(&self) -> usize {
        self.state.lock().ledger.values().map(HashMap::len).sum()
    }
}
