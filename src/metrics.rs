/// Metrics and telemetry for the OID directory toolkit
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Object cache hit/miss rates
/// - Cache evictions and dropped admissions
/// - Cache population per object kind
/// - Codec failures

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge_vec, Encoder, IntCounterVec, IntGaugeVec,
    TextEncoder,
};

lazy_static! {
    // ========== Cache Metrics ==========

    /// Cache hits by object kind
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "oiddir_cache_hits_total",
        "Total number of object cache hits",
        &["kind"]
    )
    .unwrap();

    /// Cache misses by object kind (absent or expired)
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "oiddir_cache_misses_total",
        "Total number of object cache misses",
        &["kind"]
    )
    .unwrap();

    /// Entries purged by object kind and reason
    pub static ref CACHE_EVICTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "oiddir_cache_evictions_total",
        "Total number of object cache evictions",
        &["kind", "reason"]
    )
    .unwrap();

    /// Adds dropped because the admission threshold was reached
    pub static ref CACHE_ADMISSIONS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "oiddir_cache_admissions_dropped_total",
        "Total number of cache adds dropped by the admission threshold",
        &["kind"]
    )
    .unwrap();

    /// Current number of entries by object kind
    pub static ref CACHE_ENTRIES: IntGaugeVec = register_int_gauge_vec!(
        "oiddir_cache_entries",
        "Number of entries in the object cache",
        &["kind"]
    )
    .unwrap();

    // ========== Codec Metrics ==========

    /// Codec failures by codec
    pub static ref CODEC_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "oiddir_codec_errors_total",
        "Total number of notation, time and subtree codec failures",
        &["codec", "error_type"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a cache access
pub fn record_cache_access(kind: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[kind]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[kind]).inc();
    }
}

/// Record purged entries
pub fn record_cache_eviction(kind: &str, reason: &str, count: usize) {
    CACHE_EVICTIONS_TOTAL
        .with_label_values(&[kind, reason])
        .inc_by(count as u64);
}

/// Record an add dropped by the admission threshold
pub fn record_admission_dropped(kind: &str) {
    CACHE_ADMISSIONS_DROPPED_TOTAL
        .with_label_values(&[kind])
        .inc();
}

/// Publish the current entry count for a kind
pub fn set_cache_entries(kind: &str, count: usize) {
    CACHE_ENTRIES.with_label_values(&[kind]).set(count as i64);
}

/// Record a codec failure
pub fn record_codec_error(codec: &str, error_type: &str) {
    CODEC_ERRORS_TOTAL
        .with_label_values(&[codec, error_type])
        .inc();
}
