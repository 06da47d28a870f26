//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio y las filas que mapean
//! al schema PostgreSQL (ver `migrations/`).

pub mod deposit;
pub mod driver;
pub mod leg;
pub mod outbox;
pub mod route;
pub mod vehicle;

pub use deposit::{Coordinates, Deposit, DepositStatus};
pub use driver::{Driver, DriverStatus};
pub use leg::{Endpoint, EndpointKind, Leg, LegKind, LegStatus};
pub use outbox::{OutboxMessage, OutboxStatus, SagaStep};
pub use route::{Route, RouteEstimate, RoutePlan, RouteStatus, RouteStrategy};
pub use vehicle::{Vehicle, VehicleStatus};
