//! Prometheus Metrics for the cache
//!
//! - Per-tier lookup/insert/eviction counters
//! - Entry gauges per tier
//! - Write-behind persistence outcomes
//! - HTTP memoization hits/misses

use lazy_static::lazy_static;
use prometheus::{
    Encoder, IntCounterVec, IntGaugeVec, TextEncoder, register_int_counter_vec,
    register_int_gauge_vec,
};

lazy_static! {
    /// Cache operations by tier, operation and result (hit, miss, ok, evicted)
    pub static ref CACHE_OPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tiercache_operations_total",
        "Total number of cache operations by tier",
        &["tier", "operation", "result"]
    ).unwrap();

    /// Current number of entries per tier
    pub static ref CACHE_ENTRIES: IntGaugeVec = register_int_gauge_vec!(
        "tiercache_entries",
        "Current number of entries held by each tier",
        &["tier"]
    ).unwrap();

    /// Write-behind disk operations by kind and status
    pub static ref PERSIST_OPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tiercache_persist_total",
        "L2 write-behind disk operations",
        &["operation", "status"]
    ).unwrap();

    /// Memoized HTTP responses served or stored
    pub static ref MEMOIZE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tiercache_http_memoize_total",
        "HTTP response memoization lookups",
        &["result"]
    ).unwrap();
}

/// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a cache operation
pub fn record_cache_op(tier: &str, operation: &str, result: &str) {
    CACHE_OPS_TOTAL
        .with_label_values(&[tier, operation, result])
        .inc();
}

/// Update entry gauges
pub fn set_entries(tier: &str, entries: usize) {
    CACHE_ENTRIES.with_label_values(&[tier]).set(entries as i64);
}

/// Record a write-behind disk operation
pub fn record_persist_op(operation: &str, status: &str) {
    PERSIST_OPS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

/// Record a memoization lookup
pub fn record_memoize(result: &str) {
    MEMOIZE_TOTAL.with_label_values(&[result]).inc();
}

/// Force registration so every family shows up on the first scrape
pub fn init_metrics() {
    let _ = &*CACHE_OPS_TOTAL;
    let _ = &*CACHE_ENTRIES;
    let _ = &*PERSIST_OPS_TOTAL;
    let _ = &*MEMOIZE_TOTAL;

    tracing::info!("Prometheus metrics initialized (4 metric families registered)");
}
