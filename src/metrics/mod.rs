use lazy_static::lazy_static;
use prometheus::GaugeVec;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    pub static ref QUEUE_DEPTH: GaugeVec = GaugeVec::new(
        Opts::new("work_queue_depth", "Items pending in the work queue"),
        &["queue"]
    )
    .expect("metric can not be created");

    pub static ref QUEUE_ADDS: IntCounterVec = IntCounterVec::new(
        Opts::new("work_queue_adds_total", "Items added to the work queue"),
        &["queue"]
    )
    .expect("metric can not be created");

    pub static ref QUEUE_RETRIES: IntCounterVec = IntCounterVec::new(
        Opts::new("work_queue_retries_total", "Rate-limited re-adds"),
        &["queue"]
    )
    .expect("metric can not be created");

    pub static ref DISPATCHED_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("dispatched_events_total", "Events handed to the handler"),
        &["controller", "kind"]
    )
    .expect("metric can not be created");

    pub static ref SESSIONS_SYNCED: GaugeVec = GaugeVec::new(
        Opts::new("watch_sessions_synced", "Watch sessions past initial sync"),
        &["type_key"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

/// Registers every engine metric with the crate registry. Idempotent per
/// process; a second call returns the registry's AlreadyReg error, which
/// callers may ignore.
pub fn register_engine_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(QUEUE_DEPTH.clone()))?;
    REGISTRY.register(Box::new(QUEUE_ADDS.clone()))?;
    REGISTRY.register(Box::new(QUEUE_RETRIES.clone()))?;
    REGISTRY.register(Box::new(DISPATCHED_EVENTS.clone()))?;
    REGISTRY.register(Box::new(SESSIONS_SYNCED.clone()))?;
    Ok(())
}

/// Text-encodes the engine metrics for whatever endpoint the embedding
/// process exposes. The engine itself serves nothing.
pub fn gather_metrics() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("could not encode engine metrics: {:?}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
