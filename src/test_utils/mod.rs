//! Shared test components: an in-memory fake remote store that implements
//! the engine's collaborator contracts end to end, plus object builders.

mod builders;
mod fake_cluster;

pub use builders::*;
pub use fake_cluster::*;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

pub fn enable_logger() {
    once_cell::sync::Lazy::force(&LOGGER_INIT);
}
