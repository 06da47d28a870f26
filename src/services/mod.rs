//! Services module
//!
//! Este módulo contiene la lógica de negocio del núcleo logístico:
//! estimación de distancias, selección de depósitos, planificación de rutas,
//! ciclos de vida de rutas y tramos, y la saga de envío.

pub mod deposit_selector;
pub mod distance_estimator;
pub mod geo;
pub mod leg_lifecycle;
pub mod route_lifecycle;
pub mod route_planner;
pub mod shipment_saga;

#[cfg(test)]
pub(crate) mod test_support;

pub use distance_estimator::{DistanceEstimate, DistanceEstimator, DistanceSource};
pub use leg_lifecycle::{LegFilter, LegLifecycle};
pub use route_lifecycle::RouteLifecycle;
pub use route_planner::{CandidateRequest, PlannerSettings, RoutePlanner};
pub use shipment_saga::{spawn_dispatcher, DispatchReport, ShipmentSaga};
