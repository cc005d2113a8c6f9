//! Métricas Prometheus del servicio de despacho

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref DISPATCH_CREATED: IntCounter = register(
        IntCounter::new("dispatch_created_total", "Dispatches created with vehicle and crew")
            .expect("valid metric definition"),
    );

    pub static ref DISPATCH_REJECTED: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new("dispatch_rejected_total", "Dispatch requests without available resources"),
            &["reason"],
        )
        .expect("valid metric definition"),
    );

    pub static ref DISPATCH_CONCLUDED: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new("dispatch_concluded_total", "Dispatches concluded by outcome"),
            &["outcome"],
        )
        .expect("valid metric definition"),
    );

    pub static ref TRAVEL_TIME_FALLBACK: IntCounter = register(
        IntCounter::new(
            "travel_time_fallback_total",
            "Travel time estimates served by the local formula",
        )
        .expect("valid metric definition"),
    );

    pub static ref OUTBOX_DELIVERY_FAILURES: IntCounter = register(
        IntCounter::new(
            "outbox_delivery_failures_total",
            "Failed attempts to publish an outbox event",
        )
        .expect("valid metric definition"),
    );
}

fn register<M: prometheus::core::Collector + Clone + 'static>(metric: M) -> M {
    if let Err(e) = REGISTRY.register(Box::new(metric.clone())) {
        tracing::warn!("⚠️ Metric registration failed: {}", e);
    }
    metric
}

/// Exposición en formato texto de Prometheus
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("⚠️ Metrics encoding failed: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        DISPATCH_CREATED.inc();
        DISPATCH_REJECTED.with_label_values(&["no_vehicle"]).inc();
        let text = render();
        assert!(text.contains("dispatch_created_total"));
        assert!(text.contains("dispatch_rejected_total{reason=\"no_vehicle\"}"));
    }
}
