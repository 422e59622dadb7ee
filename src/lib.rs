//! A client-side watch cache and reconciliation engine.
//!
//! Watches typed, versioned, namespaced objects in a remote resource store
//! through per-type list/watch sessions, keeps an indexed local cache for
//! low-latency reads, and delivers change events to reconciliation handlers
//! through a deduplicating, rate-limited work queue.

mod cache;
mod client;
mod config;
mod controller;
mod errors;
mod event;
mod metrics;
mod queue;
mod resource;
mod source;
mod store;

pub use cache::*;
pub use client::*;
pub use config::*;
pub use controller::*;
pub use errors::*;
pub use event::*;
pub use metrics::*;
pub use queue::*;
pub use resource::*;
pub use source::*;
pub use store::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
