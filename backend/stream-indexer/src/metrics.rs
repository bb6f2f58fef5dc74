use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, TextEncoder};

use crate::models::CycleTally;

static STREAMS_STORED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "stream_indexer_streams_stored_total",
        "Streams written to Elasticsearch",
    )
    .expect("failed to create stream_indexer_streams_stored_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register stream_indexer_streams_stored_total");
    counter
});

static STREAMS_SKIPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "stream_indexer_streams_skipped_total",
        "Streams skipped for being under the viewer threshold",
    )
    .expect("failed to create stream_indexer_streams_skipped_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register stream_indexer_streams_skipped_total");
    counter
});

static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("stream_indexer_cycles_total", "Poll cycles by outcome"),
        &["outcome"],
    )
    .expect("failed to create stream_indexer_cycles_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register stream_indexer_cycles_total");
    counter
});

static CYCLE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            "stream_indexer_cycle_duration_seconds",
            "Wall time of one poll cycle",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("failed to create stream_indexer_cycle_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register stream_indexer_cycle_duration_seconds");
    histogram
});

pub fn record_stored() {
    STREAMS_STORED_TOTAL.inc();
}

pub fn record_skipped() {
    STREAMS_SKIPPED_TOTAL.inc();
}

/// `outcome` is `ok`, `error` or `fatal`.
pub fn observe_cycle(outcome: &str, elapsed: Duration) {
    CYCLES_TOTAL.with_label_values(&[outcome]).inc();
    CYCLE_DURATION_SECONDS.observe(elapsed.as_secs_f64());
}

pub fn cycle_outcome(result: &crate::error::Result<CycleTally>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) if e.is_fatal() => "fatal",
        Err(_) => "error",
    }
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
