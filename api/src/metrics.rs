use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bowl_api_requests_total",
        "Total requests handled by the event endpoints"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bowl_api_store_failures_total",
        "Total failed or timed out event store queries"
    ))
    .unwrap();
    pub static ref MALFORMED_RECORDS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bowl_api_malformed_records_total",
        "Total stored events skipped because they could not be parsed"
    ))
    .unwrap();
    pub static ref STORE_QUERY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "bowl_api_store_query_seconds",
            "Time taken by event store queries"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MALFORMED_RECORDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_QUERY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_registered_metrics() {
        // Registration is process-wide; a second call from another test is fine.
        let _ = init_metrics();
        REQUESTS_TOTAL.inc();

        let output = gather_metrics();
        assert!(output.contains("bowl_api_requests_total"));
        assert!(output.contains("bowl_api_store_query_seconds"));
    }
}
