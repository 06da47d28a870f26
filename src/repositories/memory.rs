//! Almacenamiento en memoria
//!
//! Implementa todos los traits de repositorio sobre un único
//! `tokio::sync::RwLock`, de modo que las operaciones condicionales
//! (asignación de ruta, reserva, transiciones) son atómicas igual que en SQL.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    DepositRepository, FleetRepository, LegRepository, LegTransition, OutboxRepository, Reservation,
    RouteRepository,
};
use crate::models::{
    Deposit, DepositStatus, Driver, DriverStatus, Leg, LegStatus, OutboxMessage, OutboxStatus, Route,
    RouteStatus, Vehicle, VehicleStatus,
};
use crate::utils::AppResult;

#[derive(Default)]
struct Tables {
    routes: HashMap<Uuid, Route>,
    legs: HashMap<Uuid, Leg>,
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: HashMap<Uuid, Driver>,
    deposits: Vec<Deposit>,
    outbox: Vec<OutboxMessage>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store con los mismos depósitos, camiones y transportistas que la migración inicial
    pub fn seeded() -> Self {
        let now = Utc::now();
        let mut tables = Tables::default();

        for (n, name, address, lat, lon, capacity, daily_cost) in SEED_DEPOSITS {
            tables.deposits.push(Deposit {
                id: seed_id(1, *n),
                name: name.to_string(),
                address: address.to_string(),
                latitude: Some(*lat),
                longitude: Some(*lon),
                max_capacity_m3: Some(*capacity),
                daily_cost: Decimal::from(*daily_cost),
                status: DepositStatus::Active,
                created_at: now,
            });
        }

        for (n, full_name, license_type, (y, m, d), phone) in SEED_DRIVERS {
            let driver = Driver {
                id: seed_id(2, *n),
                full_name: full_name.to_string(),
                license_type: license_type.to_string(),
                license_expires_on: NaiveDate::from_ymd_opt(*y, *m, *d),
                phone: Some(phone.to_string()),
                status: DriverStatus::Available,
                created_at: now,
            };
            tables.drivers.insert(driver.id, driver);
        }

        for (n, plate, brand, model, kg, m3, fuel, cost, status, location) in SEED_VEHICLES {
            let vehicle = Vehicle {
                id: seed_id(3, *n),
                license_plate: plate.to_string(),
                brand: Some(brand.to_string()),
                model: Some(model.to_string()),
                capacity_kg: *kg,
                capacity_m3: *m3,
                fuel_consumption_l_km: *fuel,
                cost_per_km: Decimal::from(*cost),
                status: *status,
                current_location: Some(location.to_string()),
                created_at: now,
            };
            tables.vehicles.insert(vehicle.id, vehicle);
        }

        Self {
            tables: RwLock::new(tables),
        }
    }
}

/// Ids deterministas de los datos semilla (mismos que la migración)
pub fn seed_id(group: u16, n: u64) -> Uuid {
    Uuid::from_u128(0x6a1f7c2e_0000_4c1a_9d1e_000000000000 | ((group as u128) << 80) | n as u128)
}

const SEED_DEPOSITS: &[(u64, &str, &str, f64, f64, f64, i64)] = &[
    (1, "Depósito Central Córdoba", "Av. Circunvalación km 10, Córdoba", -31.3713, -64.2478, 500.0, 1500),
    (2, "Depósito Rosario Norte", "Parque Industrial Alvear, Rosario", -32.92, -60.68, 400.0, 1300),
    (3, "Depósito Buenos Aires Sur", "Av. Gral. Paz km 12, Buenos Aires", -34.7, -58.5, 600.0, 2000),
    (4, "Depósito Mendoza Centro", "Ruta 40 km 15, Mendoza", -32.85, -68.82, 450.0, 1400),
];

const SEED_DRIVERS: &[(u64, &str, &str, (i32, u32, u32), &str)] = &[
    (1, "Roberto Gomez", "PROFESIONAL_C1", (2026, 12, 31), "5493515551111"),
    (2, "Laura Fernandez", "PROFESIONAL_C2", (2027, 6, 30), "5491144442222"),
    (3, "Carlos Martinez", "PROFESIONAL_C1", (2027, 12, 31), "5493415553333"),
];

#[allow(clippy::type_complexity)]
const SEED_VEHICLES: &[(u64, &str, &str, &str, f64, f64, f64, i64, VehicleStatus, &str)] = &[
    (1, "AB123CD", "Mercedes-Benz", "Atego 1726", 8000.0, 45.0, 0.35, 150, VehicleStatus::Available, "Córdoba, Argentina"),
    (2, "EF456GH", "Iveco", "Tector 170E28", 10000.0, 55.0, 0.40, 180, VehicleStatus::Available, "Rosario, Argentina"),
    (3, "IJ789KL", "Scania", "P320", 15000.0, 75.0, 0.38, 200, VehicleStatus::Available, "Buenos Aires, Argentina"),
    (4, "MN012OP", "Volkswagen", "Constellation 17.280", 12000.0, 60.0, 0.42, 170, VehicleStatus::InUse, "Mendoza, Argentina"),
];

fn sorted_legs<'a>(legs: impl Iterator<Item = &'a Leg>) -> Vec<Leg> {
    let mut result: Vec<Leg> = legs.cloned().collect();
    result.sort_by(|a, b| {
        a.request_id
            .cmp(&b.request_id)
            .then(a.sequence.cmp(&b.sequence))
            .then(a.created_at.cmp(&b.created_at))
    });
    result
}

#[async_trait]
impl RouteRepository for InMemoryStore {
    async fn insert(&self, route: &Route) -> AppResult<()> {
        self.tables.write().await.routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Route>> {
        Ok(self.tables.read().await.routes.get(&id).cloned())
    }

    async fn find_by_request(&self, request_id: i64) -> AppResult<Vec<Route>> {
        let tables = self.tables.read().await;
        let mut routes: Vec<Route> = tables
            .routes
            .values()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect();
        routes.sort_by_key(|r| r.created_at);
        Ok(routes)
    }

    async fn list_all(&self) -> AppResult<Vec<Route>> {
        let mut routes: Vec<Route> = self.tables.read().await.routes.values().cloned().collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes)
    }

    async fn commit_assignment(&self, route_id: Uuid, assigned_at: DateTime<Utc>, legs: &[Leg]) -> AppResult<bool> {
        let mut tables = self.tables.write().await;

        let request_id = match tables.routes.get(&route_id) {
            Some(route) if route.status == RouteStatus::Tentative => route.request_id,
            _ => return Ok(false),
        };

        for route in tables.routes.values_mut() {
            if route.request_id != request_id || route.status != RouteStatus::Tentative {
                continue;
            }
            if route.id == route_id {
                route.status = RouteStatus::Assigned;
                route.assigned_at = Some(assigned_at);
            } else {
                route.status = RouteStatus::Cancelled;
            }
        }

        for leg in legs {
            tables.legs.insert(leg.id, leg.clone());
        }
        Ok(true)
    }
}

#[async_trait]
impl LegRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Leg>> {
        Ok(self.tables.read().await.legs.get(&id).cloned())
    }

    async fn find_by_request(&self, request_id: i64) -> AppResult<Vec<Leg>> {
        let tables = self.tables.read().await;
        Ok(sorted_legs(tables.legs.values().filter(|l| l.request_id == request_id)))
    }

    async fn find_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Leg>> {
        let tables = self.tables.read().await;
        Ok(sorted_legs(tables.legs.values().filter(|l| l.vehicle_id == Some(vehicle_id))))
    }

    async fn find_by_driver(&self, driver_id: Uuid) -> AppResult<Vec<Leg>> {
        let tables = self.tables.read().await;
        Ok(sorted_legs(tables.legs.values().filter(|l| l.driver_id == Some(driver_id))))
    }

    async fn list_all(&self) -> AppResult<Vec<Leg>> {
        let tables = self.tables.read().await;
        Ok(sorted_legs(tables.legs.values()))
    }

    async fn apply_transition(&self, change: &LegTransition) -> AppResult<Option<Vec<Uuid>>> {
        let mut tables = self.tables.write().await;
        let leg = &change.leg;
        match tables.legs.get_mut(&leg.id) {
            Some(stored) if stored.status == change.expected => {
                stored.status = leg.status;
                stored.started_at = leg.started_at;
                stored.finished_at = leg.finished_at;
                stored.updated_at = leg.updated_at;
            }
            _ => return Ok(None),
        }

        if let Some((vehicle_id, status, location)) = &change.vehicle {
            if let Some(vehicle) = tables.vehicles.get_mut(vehicle_id) {
                vehicle.status = *status;
                if let Some(location) = location {
                    vehicle.current_location = Some(location.clone());
                }
            }
        }
        if let Some((driver_id, status)) = &change.driver {
            if let Some(driver) = tables.drivers.get_mut(driver_id) {
                driver.status = *status;
            }
        }
        if let Some(completion) = &change.completion {
            match tables.routes.get_mut(&completion.route_id) {
                Some(route) if route.status == RouteStatus::Assigned => {
                    route.status = RouteStatus::Completed;
                    route.actual_cost = Some(completion.actual_cost);
                    route.actual_hours = Some(completion.actual_hours);
                    route.completed_at = Some(completion.completed_at);
                }
                _ => warn!("⚠️ La ruta {} no estaba ASSIGNED al completarse", completion.route_id),
            }
        }

        let mut inserted = Vec::with_capacity(change.messages.len());
        for message in &change.messages {
            if !tables.outbox.iter().any(|m| m.idempotency_key == message.idempotency_key) {
                tables.outbox.push(message.clone());
                inserted.push(message.id);
            }
        }
        Ok(Some(inserted))
    }

    async fn set_dwell_record(&self, leg_id: Uuid, dwell_record_id: i64) -> AppResult<()> {
        if let Some(leg) = self.tables.write().await.legs.get_mut(&leg_id) {
            leg.dwell_record_id = Some(dwell_record_id);
            leg.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_dwell_closed(&self, leg_id: Uuid, closed_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(leg) = self.tables.write().await.legs.get_mut(&leg_id) {
            leg.dwell_closed_at = Some(closed_at);
            leg.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl FleetRepository for InMemoryStore {
    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.tables.read().await.vehicles.get(&id).cloned())
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        Ok(self.tables.read().await.drivers.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.tables.read().await.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(vehicles)
    }

    async fn list_available_vehicles(&self, weight_kg: f64, volume_m3: f64) -> AppResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self
            .tables
            .read()
            .await
            .vehicles
            .values()
            .filter(|v| v.status == VehicleStatus::Available && v.fits(weight_kg, volume_m3))
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.capacity_kg.total_cmp(&b.capacity_kg));
        Ok(vehicles)
    }

    async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        let mut drivers: Vec<Driver> = self.tables.read().await.drivers.values().cloned().collect();
        drivers.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(drivers)
    }

    async fn reserve(&self, leg_id: Uuid, vehicle_id: Uuid, driver_id: Uuid) -> AppResult<Reservation> {
        let mut tables = self.tables.write().await;

        if tables.legs.get(&leg_id).map(|l| l.status) != Some(LegStatus::Pending) {
            return Ok(Reservation::LegNotPending);
        }
        if tables.vehicles.get(&vehicle_id).map(|v| v.status) != Some(VehicleStatus::Available) {
            return Ok(Reservation::VehicleUnavailable);
        }
        if tables.drivers.get(&driver_id).map(|d| d.status) != Some(DriverStatus::Available) {
            return Ok(Reservation::DriverUnavailable);
        }

        let now = Utc::now();
        if let Some(leg) = tables.legs.get_mut(&leg_id) {
            leg.status = LegStatus::Assigned;
            leg.vehicle_id = Some(vehicle_id);
            leg.driver_id = Some(driver_id);
            leg.updated_at = now;
        }
        if let Some(vehicle) = tables.vehicles.get_mut(&vehicle_id) {
            vehicle.status = VehicleStatus::Assigned;
        }
        if let Some(driver) = tables.drivers.get_mut(&driver_id) {
            driver.status = DriverStatus::InUse;
        }
        Ok(Reservation::Reserved)
    }
}

#[async_trait]
impl DepositRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Deposit>> {
        Ok(self.tables.read().await.deposits.iter().find(|d| d.id == id).cloned())
    }

    async fn find_active(&self) -> AppResult<Vec<Deposit>> {
        Ok(self
            .tables
            .read()
            .await
            .deposits
            .iter()
            .filter(|d| d.status == DepositStatus::Active)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> AppResult<Vec<Deposit>> {
        Ok(self.tables.read().await.deposits.clone())
    }
}

#[async_trait]
impl OutboxRepository for InMemoryStore {
    async fn enqueue(&self, message: &OutboxMessage) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.outbox.iter().any(|m| m.idempotency_key == message.idempotency_key) {
            return Ok(false);
        }
        tables.outbox.push(message.clone());
        Ok(true)
    }

    async fn find_by_key(&self, idempotency_key: &str) -> AppResult<Option<OutboxMessage>> {
        Ok(self
            .tables
            .read()
            .await
            .outbox
            .iter()
            .find(|m| m.idempotency_key == idempotency_key)
            .cloned())
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>, lease_until: DateTime<Utc>) -> AppResult<Option<OutboxMessage>> {
        let mut tables = self.tables.write().await;
        match tables.outbox.iter_mut().find(|m| m.id == id) {
            Some(message) if message.status == OutboxStatus::Pending && message.next_attempt_at <= now => {
                message.next_attempt_at = lease_until;
                Ok(Some(message.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn claim_due(&self, now: DateTime<Utc>, lease_until: DateTime<Utc>, limit: i64) -> AppResult<Vec<OutboxMessage>> {
        let mut tables = self.tables.write().await;
        let mut due: Vec<&mut OutboxMessage> = tables
            .outbox
            .iter_mut()
            .filter(|m| m.status == OutboxStatus::Pending && m.next_attempt_at <= now)
            .collect();
        due.sort_by_key(|m| m.created_at);

        Ok(due
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|message| {
                message.next_attempt_at = lease_until;
                message.clone()
            })
            .collect())
    }

    async fn mark_done(&self, id: Uuid, attempts: i32, completed_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(message) = self.tables.write().await.outbox.iter_mut().find(|m| m.id == id) {
            message.status = OutboxStatus::Done;
            message.attempts = attempts;
            message.completed_at = Some(completed_at);
        }
        Ok(())
    }

    async fn mark_retry(&self, id: Uuid, attempts: i32, error: &str, next_attempt_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(message) = self.tables.write().await.outbox.iter_mut().find(|m| m.id == id) {
            message.attempts = attempts;
            message.last_error = Some(error.to_string());
            message.next_attempt_at = next_attempt_at;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, attempts: i32, error: &str) -> AppResult<()> {
        if let Some(message) = self.tables.write().await.outbox.iter_mut().find(|m| m.id == id) {
            message.status = OutboxStatus::Failed;
            message.attempts = attempts;
            message.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn list_by_request(&self, request_id: i64) -> AppResult<Vec<OutboxMessage>> {
        let tables = self.tables.read().await;
        let mut messages: Vec<OutboxMessage> = tables
            .outbox
            .iter()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, LegKind, SagaStep};

    #[test]
    fn test_seed_ids_match_migration() {
        assert_eq!(seed_id(1, 1).to_string(), "6a1f7c2e-0001-4c1a-9d1e-000000000001");
        assert_eq!(seed_id(3, 4).to_string(), "6a1f7c2e-0003-4c1a-9d1e-000000000004");
    }

    #[tokio::test]
    async fn test_seeded_store_contents() {
        let store = InMemoryStore::seeded();
        assert_eq!(DepositRepository::list_all(&store).await.unwrap().len(), 4);
        assert_eq!(store.list_drivers().await.unwrap().len(), 3);

        // El camión de 12000 kg está IN_USE
        let available = store.list_available_vehicles(11_000.0, 10.0).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].license_plate, "IJ789KL");
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let store = InMemoryStore::seeded();
        let leg = Leg::pending(1, Uuid::new_v4(), Endpoint::customer("A"), Endpoint::customer("B"), LegKind::Direct, 10.0, 1);
        store.tables.write().await.legs.insert(leg.id, leg.clone());

        let busy_truck = seed_id(3, 4);
        let outcome = store.reserve(leg.id, busy_truck, seed_id(2, 1)).await.unwrap();
        assert_eq!(outcome, Reservation::VehicleUnavailable);

        let stored = LegRepository::find_by_id(&store, leg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LegStatus::Pending);
        let driver = store.find_driver(seed_id(2, 1)).await.unwrap().unwrap();
        assert_eq!(driver.status, DriverStatus::Available);
    }

    #[tokio::test]
    async fn test_enqueue_same_key_is_noop() {
        let store = InMemoryStore::new();
        let first = OutboxMessage::new(9, SagaStep::MarkInTransit);
        let second = OutboxMessage::new(9, SagaStep::MarkInTransit);

        assert!(store.enqueue(&first).await.unwrap());
        assert!(!store.enqueue(&second).await.unwrap());
        assert_eq!(store.list_by_request(9).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_leases_message() {
        let store = InMemoryStore::new();
        let message = OutboxMessage::new(3, SagaStep::GenerateInvoice);
        store.enqueue(&message).await.unwrap();

        let now = Utc::now();
        let lease = now + chrono::Duration::seconds(60);
        assert!(store.claim(message.id, now, lease).await.unwrap().is_some());
        assert!(store.claim(message.id, now, lease).await.unwrap().is_none());
        assert!(store.claim_due(now, lease, 10).await.unwrap().is_empty());
    }
}
