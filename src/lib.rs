//! Warden - HTTP Admission Control
//!
//! This crate decides, per client and per endpoint, whether an incoming HTTP
//! request may reach its handler. Decisions come from a pluggable rate limit
//! algorithm; the bundled one keeps a sliding-window log of request
//! timestamps and evaluates and records each request in one critical section.

pub mod config;
pub mod error;
pub mod middleware;
pub mod ratelimit;
pub mod server;

pub use middleware::{RateLimitLayer, RateLimitService};
pub use ratelimit::{Decision, RateLimitAlgorithm, SlidingWindowAlgorithm};
