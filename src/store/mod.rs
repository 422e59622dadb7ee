//! Local read-through cache: a per-type indexed store plus the selector
//! types used to filter list reads.

mod indexed_store;
mod selector;

pub use indexed_store::*;
pub use selector::*;

#[cfg(test)]
mod indexed_store_test;
