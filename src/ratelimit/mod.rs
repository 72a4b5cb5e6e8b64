//! Rate limiting logic and state management.

mod key;
mod limiter;
mod registry;

pub use key::{KeyPolicy, RoutingKey};
pub use limiter::{RateLimiter, RateWindow, MAX_BURST, WINDOW};
pub use registry::LimiterRegistry;
