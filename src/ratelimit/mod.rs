//! Rate limiting logic and state management.

mod algorithm;
mod clock;
mod key;
mod sliding_window;
mod sweeper;

pub use algorithm::{Decision, RateLimitAlgorithm};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use key::{RequestKeys, DEFAULT_CLIENT_HEADER};
pub use sliding_window::{SlidingWindowAlgorithm, DEFAULT_WINDOW};
pub use sweeper::{spawn_sweeper, MIN_SWEEP_INTERVAL};
