//! Deduplicating, rate-limited work queue: the single serialization point
//! between the controller's event sources and its dispatch loop.

mod rate_limiter;
mod work_queue;

pub use rate_limiter::*;
pub use work_queue::*;
