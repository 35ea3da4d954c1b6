//! Process-wide Prometheus metrics (default registry).

use once_cell::sync::Lazy;
use prometheus::{Counter, Encoder, Histogram, TextEncoder};

pub static EVENTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("pulse_events_total", "Total synthetic events committed").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static ANOMALIES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new(
        "pulse_anomalies_total",
        "Total events the classifier flagged as anomalous",
    )
    .unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static CLASSIFIER_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new(
        "pulse_classifier_failures_total",
        "Classifier invocations that failed and defaulted to normal",
    )
    .unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static SNAPSHOTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("pulse_snapshots_total", "Total snapshots served").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static TICK_DURATION: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(prometheus::HistogramOpts::new(
        "pulse_tick_duration_seconds",
        "Time spent generating, classifying and committing one batch",
    ))
    .unwrap();
    prometheus::register(Box::new(h.clone())).unwrap();
    h
});

/// Force registration so every series shows up on the first scrape.
pub fn init() {
    let _ = &*EVENTS_TOTAL;
    let _ = &*ANOMALIES_TOTAL;
    let _ = &*CLASSIFIER_FAILURES_TOTAL;
    let _ = &*SNAPSHOTS_TOTAL;
    let _ = &*TICK_DURATION;
}

/// Text exposition of the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
