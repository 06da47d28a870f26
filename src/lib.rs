//! Planificación de rutas de carga y ciclo de vida de tramos
//!
//! Genera rutas candidatas (directas o por depósitos), las asigna a una
//! solicitud, materializa sus tramos y dispara la saga de envío contra el
//! registro de solicitudes y facturación.

pub mod cache;
pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{http::header, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_middleware_with_origins;
use crate::state::AppState;

/// Router completo del API
pub fn build_router(state: AppState) -> Router {
    let cors = cors_middleware_with_origins(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api/routes", routes::route_routes::create_route_router())
        .nest("/api/legs", routes::leg_routes::create_leg_router())
        .nest("/api/vehicles", routes::fleet_routes::create_vehicle_router())
        .nest("/api/drivers", routes::fleet_routes::create_driver_router())
        .nest("/api/deposits", routes::fleet_routes::create_deposit_router())
        .nest("/api/saga", routes::saga_routes::create_saga_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "freight-logistics",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather(),
    )
}
