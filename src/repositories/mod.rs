//! Repositorios
//!
//! Traits de persistencia del núcleo. Hay una implementación PostgreSQL por
//! agregado y un `InMemoryStore` que implementa todos los traits para tests
//! y para `STORAGE_BACKEND=memory`.

pub mod deposit_repository;
pub mod fleet_repository;
pub mod leg_repository;
pub mod memory;
pub mod outbox_repository;
pub mod route_repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Deposit, Driver, DriverStatus, Leg, LegStatus, OutboxMessage, Route, Vehicle, VehicleStatus,
};
use crate::utils::AppResult;

pub use deposit_repository::PgDepositRepository;
pub use fleet_repository::PgFleetRepository;
pub use leg_repository::PgLegRepository;
pub use memory::InMemoryStore;
pub use outbox_repository::PgOutboxRepository;
pub use route_repository::PgRouteRepository;

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn insert(&self, route: &Route) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Route>>;

    async fn find_by_request(&self, request_id: i64) -> AppResult<Vec<Route>>;

    async fn list_all(&self) -> AppResult<Vec<Route>>;

    /// Asignar la ruta, cancelar las demás TENTATIVE de la solicitud e
    /// insertar los tramos en una sola unidad atómica. Devuelve `false` si la
    /// ruta ya no estaba TENTATIVE.
    async fn commit_assignment(&self, route_id: Uuid, assigned_at: DateTime<Utc>, legs: &[Leg]) -> AppResult<bool>;
}

/// Cierre de la ruta cuando finaliza su último tramo
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCompletion {
    pub route_id: Uuid,
    pub actual_cost: Decimal,
    pub actual_hours: f64,
    pub completed_at: DateTime<Utc>,
}

/// Cambio de estado de un tramo junto con sus efectos. Se aplica todo o
/// nada: estado del tramo, vehículo, transportista, cierre de la ruta y los
/// mensajes del outbox.
#[derive(Debug, Clone)]
pub struct LegTransition {
    pub leg: Leg,
    pub expected: LegStatus,
    pub vehicle: Option<(Uuid, VehicleStatus, Option<String>)>,
    pub driver: Option<(Uuid, DriverStatus)>,
    pub completion: Option<RouteCompletion>,
    pub messages: Vec<OutboxMessage>,
}

#[async_trait]
pub trait LegRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Leg>>;

    /// Tramos de una solicitud ordenados por secuencia
    async fn find_by_request(&self, request_id: i64) -> AppResult<Vec<Leg>>;

    async fn find_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Leg>>;

    async fn find_by_driver(&self, driver_id: Uuid) -> AppResult<Vec<Leg>>;

    async fn list_all(&self) -> AppResult<Vec<Leg>>;

    /// Aplicar la transición sólo si el tramo sigue en `expected`. Devuelve
    /// `None` si el tramo cambió antes, o los ids de los mensajes insertados
    /// (las claves ya existentes se omiten).
    async fn apply_transition(&self, change: &LegTransition) -> AppResult<Option<Vec<Uuid>>>;

    async fn set_dwell_record(&self, leg_id: Uuid, dwell_record_id: i64) -> AppResult<()>;

    async fn mark_dwell_closed(&self, leg_id: Uuid, closed_at: DateTime<Utc>) -> AppResult<()>;
}

/// Resultado de la reserva atómica de vehículo, transportista y tramo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Reserved,
    LegNotPending,
    VehicleUnavailable,
    DriverUnavailable,
}

#[async_trait]
pub trait FleetRepository: Send + Sync {
    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>>;

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>>;

    /// Vehículos AVAILABLE con capacidad suficiente
    async fn list_available_vehicles(&self, weight_kg: f64, volume_m3: f64) -> AppResult<Vec<Vehicle>>;

    async fn list_drivers(&self) -> AppResult<Vec<Driver>>;

    /// vehículo AVAILABLE→ASSIGNED, transportista AVAILABLE→IN_USE y tramo
    /// PENDING→ASSIGNED, todo o nada
    async fn reserve(&self, leg_id: Uuid, vehicle_id: Uuid, driver_id: Uuid) -> AppResult<Reservation>;
}

#[async_trait]
pub trait DepositRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Deposit>>;

    /// Depósitos ACTIVE en orden estable
    async fn find_active(&self) -> AppResult<Vec<Deposit>>;

    async fn list_all(&self) -> AppResult<Vec<Deposit>>;
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Insertar el mensaje; `false` si la clave de idempotencia ya existe
    async fn enqueue(&self, message: &OutboxMessage) -> AppResult<bool>;

    async fn find_by_key(&self, idempotency_key: &str) -> AppResult<Option<OutboxMessage>>;

    /// Tomar un mensaje PENDING vencido, corriendo su próximo intento a
    /// `lease_until` para que otro despachador no lo ejecute en paralelo
    async fn claim(&self, id: Uuid, now: DateTime<Utc>, lease_until: DateTime<Utc>) -> AppResult<Option<OutboxMessage>>;

    /// Igual que `claim` para hasta `limit` mensajes vencidos, los más viejos primero
    async fn claim_due(&self, now: DateTime<Utc>, lease_until: DateTime<Utc>, limit: i64) -> AppResult<Vec<OutboxMessage>>;

    async fn mark_done(&self, id: Uuid, attempts: i32, completed_at: DateTime<Utc>) -> AppResult<()>;

    async fn mark_retry(&self, id: Uuid, attempts: i32, error: &str, next_attempt_at: DateTime<Utc>) -> AppResult<()>;

    async fn mark_failed(&self, id: Uuid, attempts: i32, error: &str) -> AppResult<()>;

    async fn list_by_request(&self, request_id: i64) -> AppResult<Vec<OutboxMessage>>;
}
