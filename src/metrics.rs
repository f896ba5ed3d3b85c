use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, GaugeVec, Histogram, register_counter, register_counter_vec,
    register_gauge_vec, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("bridge_requests_total", "Total number of requests")
            .expect("register bridge_requests_total");
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("bridge_rate_limited_total", "Requests rejected by the rate limiter")
            .expect("register bridge_rate_limited_total");
    pub static ref AUTH_FAILURES_TOTAL: Counter =
        register_counter!("bridge_auth_failures_total", "Requests rejected for a bad bearer token")
            .expect("register bridge_auth_failures_total");
    pub static ref CACHE_HITS: CounterVec = register_counter_vec!(
        "bridge_cache_hits_total",
        "Total cache hits",
        &["cache"]
    )
    .expect("register bridge_cache_hits_total");
    pub static ref CACHE_MISSES: CounterVec = register_counter_vec!(
        "bridge_cache_misses_total",
        "Total cache misses",
        &["cache"]
    )
    .expect("register bridge_cache_misses_total");
    pub static ref CACHE_SIZE: GaugeVec = register_gauge_vec!(
        "bridge_cache_size",
        "Current number of items in cache",
        &["cache"]
    )
    .expect("register bridge_cache_size");
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "bridge_request_latency_seconds",
        "Request latency in seconds"
    )
    .expect("register bridge_request_latency_seconds");
}
