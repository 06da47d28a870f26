//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: los servicios del núcleo ya cableados con
//! sus repositorios y colaboradores.

use sqlx::PgPool;
use std::sync::Arc;

use crate::cache::redis_client::RedisClient;
use crate::clients::{BillingService, MappingProvider, RequestRegistry};
use crate::config::environment::EnvironmentConfig;
use crate::repositories::{
    DepositRepository, FleetRepository, InMemoryStore, LegRepository, OutboxRepository, PgDepositRepository,
    PgFleetRepository, PgLegRepository, PgOutboxRepository, PgRouteRepository, RouteRepository,
};
use crate::services::distance_estimator::DistanceEstimator;
use crate::services::leg_lifecycle::LegLifecycle;
use crate::services::route_lifecycle::RouteLifecycle;
use crate::services::route_planner::{PlannerSettings, RoutePlanner};
use crate::services::shipment_saga::ShipmentSaga;

/// Repositorios del núcleo detrás de sus traits
#[derive(Clone)]
pub struct Repositories {
    pub routes: Arc<dyn RouteRepository>,
    pub legs: Arc<dyn LegRepository>,
    pub fleet: Arc<dyn FleetRepository>,
    pub deposits: Arc<dyn DepositRepository>,
    pub outbox: Arc<dyn OutboxRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            routes: Arc::new(PgRouteRepository::new(pool.clone())),
            legs: Arc::new(PgLegRepository::new(pool.clone())),
            fleet: Arc::new(PgFleetRepository::new(pool.clone())),
            deposits: Arc::new(PgDepositRepository::new(pool.clone())),
            outbox: Arc::new(PgOutboxRepository::new(pool)),
        }
    }

    /// Todos los traits servidos por el mismo store en memoria
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            routes: store.clone(),
            legs: store.clone(),
            fleet: store.clone(),
            deposits: store.clone(),
            outbox: store,
        }
    }
}

/// Colaboradores externos
#[derive(Clone)]
pub struct Collaborators {
    pub mapping: Arc<dyn MappingProvider>,
    pub registry: Arc<dyn RequestRegistry>,
    pub billing: Arc<dyn BillingService>,
    pub distance_cache: Option<RedisClient>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub planner: RoutePlanner,
    pub routes: RouteLifecycle,
    pub legs: LegLifecycle,
    pub saga: ShipmentSaga,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, repos: Repositories, collaborators: Collaborators) -> Self {
        let estimator = DistanceEstimator::new(collaborators.mapping, collaborators.distance_cache);

        let planner = RoutePlanner::new(
            estimator,
            repos.deposits.clone(),
            repos.routes.clone(),
            PlannerSettings {
                rate_per_km: config.planning_rate_per_km,
                deposit_stop_hours: config.deposit_stop_hours,
            },
        );

        let saga = ShipmentSaga::new(
            repos.outbox.clone(),
            repos.legs.clone(),
            collaborators.registry.clone(),
            collaborators.billing,
            config.outbox_max_attempts,
        );

        let legs = LegLifecycle::new(
            repos.legs.clone(),
            repos.fleet.clone(),
            repos.deposits.clone(),
            collaborators.registry,
            saga.clone(),
            config.settlement_rate_per_km,
        );

        Self {
            routes: RouteLifecycle::new(repos.routes, repos.deposits),
            planner,
            legs,
            saga,
            config,
        }
    }
}
