//! Métricas Prometheus
//!
//! Registro global con los contadores del núcleo, expuesto en `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Distancias resueltas por la vía degradada (tabla o valor por defecto)
    pub static ref MAPPING_FALLBACKS: IntCounterVec = register(
        "freight_mapping_fallback_total",
        "Distance lookups answered without the mapping provider",
        &["source"],
    );

    pub static ref SAGA_STEPS: IntCounterVec = register(
        "freight_saga_steps_total",
        "Saga step executions by step and outcome",
        &["step", "outcome"],
    );

    pub static ref ROUTE_CANDIDATES: IntCounterVec = register(
        "freight_route_candidates_total",
        "Tentative routes generated by strategy",
        &["strategy"],
    );

    pub static ref LEG_TRANSITIONS: IntCounterVec = register(
        "freight_leg_transitions_total",
        "Leg state transitions by target status",
        &["status"],
    );
}

fn register(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)
        .unwrap_or_else(|e| panic!("invalid metric definition {}: {}", name, e));
    if let Err(e) = REGISTRY.register(Box::new(counter.clone())) {
        tracing::warn!("⚠️ Métrica {} no registrada: {}", name, e);
    }
    counter
}

/// Exposición en formato texto de Prometheus
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("❌ Error codificando métricas: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
