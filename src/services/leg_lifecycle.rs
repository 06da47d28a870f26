//! Ciclo de vida de tramos
//!
//! PENDING → ASSIGNED → STARTED → FINISHED. Cada transición se persiste de
//! forma condicional junto con la flota, el cierre de la ruta y los pasos de
//! la saga en una sola unidad atómica. Los pasos se ejecutan una vez en línea
//! y un fallo de la saga nunca revierte el tramo.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clients::{ClientError, RequestRegistry};
use crate::metrics::LEG_TRANSITIONS;
use crate::models::{
    Deposit, Driver, DriverStatus, Endpoint, Leg, LegStatus, OutboxMessage, SagaStep, Vehicle, VehicleStatus,
};
use crate::repositories::{
    DepositRepository, FleetRepository, LegRepository, LegTransition, Reservation, RouteCompletion,
};
use crate::services::shipment_saga::ShipmentSaga;
use crate::utils::errors::not_found_error;
use crate::utils::money::{cost_for_distance, round2};
use crate::utils::{AppError, AppResult};

/// Filtros opcionales para listar tramos
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegFilter {
    pub request_id: Option<i64>,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct LegLifecycle {
    legs: Arc<dyn LegRepository>,
    fleet: Arc<dyn FleetRepository>,
    deposits: Arc<dyn DepositRepository>,
    registry: Arc<dyn RequestRegistry>,
    saga: ShipmentSaga,
    settlement_rate_per_km: Decimal,
}

impl LegLifecycle {
    pub fn new(
        legs: Arc<dyn LegRepository>,
        fleet: Arc<dyn FleetRepository>,
        deposits: Arc<dyn DepositRepository>,
        registry: Arc<dyn RequestRegistry>,
        saga: ShipmentSaga,
        settlement_rate_per_km: Decimal,
    ) -> Self {
        Self {
            legs,
            fleet,
            deposits,
            registry,
            saga,
            settlement_rate_per_km,
        }
    }

    pub async fn get(&self, leg_id: Uuid) -> AppResult<Leg> {
        self.legs
            .find_by_id(leg_id)
            .await?
            .ok_or_else(|| not_found_error("Leg", leg_id))
    }

    /// Listar tramos; los filtros presentes se combinan
    pub async fn list(&self, filter: &LegFilter) -> AppResult<Vec<Leg>> {
        let mut legs = if let Some(request_id) = filter.request_id {
            self.legs.find_by_request(request_id).await?
        } else if let Some(vehicle_id) = filter.vehicle_id {
            self.legs.find_by_vehicle(vehicle_id).await?
        } else if let Some(driver_id) = filter.driver_id {
            self.legs.find_by_driver(driver_id).await?
        } else {
            self.legs.list_all().await?
        };

        if let Some(vehicle_id) = filter.vehicle_id {
            legs.retain(|l| l.vehicle_id == Some(vehicle_id));
        }
        if let Some(driver_id) = filter.driver_id {
            legs.retain(|l| l.driver_id == Some(driver_id));
        }
        Ok(legs)
    }

    pub async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        self.fleet.list_vehicles().await
    }

    pub async fn list_available_vehicles(&self, weight_kg: f64, volume_m3: f64) -> AppResult<Vec<Vehicle>> {
        if weight_kg < 0.0 || volume_m3 < 0.0 {
            return Err(AppError::InvalidArgument(
                "weightKg and volumeM3 must not be negative".to_string(),
            ));
        }
        self.fleet.list_available_vehicles(weight_kg, volume_m3).await
    }

    pub async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        self.fleet.list_drivers().await
    }

    pub async fn list_deposits(&self) -> AppResult<Vec<Deposit>> {
        self.deposits.list_all().await
    }

    /// Asignar vehículo y transportista a un tramo PENDING
    pub async fn assign_resources(&self, leg_id: Uuid, vehicle_id: Uuid, driver_id: Uuid) -> AppResult<Leg> {
        info!("🚚 Asignando vehículo {} y transportista {} al tramo {}", vehicle_id, driver_id, leg_id);

        let leg = self.get(leg_id).await?;
        if leg.status != LegStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "only PENDING legs can be assigned, leg {} is {:?}",
                leg_id, leg.status
            )));
        }

        let request = self.registry.fetch_request(leg.request_id).await.map_err(|e| match e {
            ClientError::NotFound(_) => not_found_error("Request", leg.request_id),
            other => AppError::Upstream(format!("request registry: {}", other)),
        })?;
        let container = request.container.ok_or_else(|| {
            AppError::InvalidArgument(format!("request {} has no container", leg.request_id))
        })?;

        let vehicle = self
            .fleet
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;
        let driver = self
            .fleet
            .find_driver(driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver", driver_id))?;

        if vehicle.status != VehicleStatus::Available {
            return Err(AppError::ResourceUnavailable(format!(
                "vehicle {} is not available ({:?})",
                vehicle.license_plate, vehicle.status
            )));
        }
        if driver.status != DriverStatus::Available {
            return Err(AppError::ResourceUnavailable(format!(
                "driver {} is not available ({:?})",
                driver.full_name, driver.status
            )));
        }

        if container.weight_kg > vehicle.capacity_kg {
            return Err(AppError::CapacityExceeded(format!(
                "cargo weight {} kg exceeds vehicle capacity {} kg",
                container.weight_kg, vehicle.capacity_kg
            )));
        }
        if container.volume_m3 > vehicle.capacity_m3 {
            return Err(AppError::CapacityExceeded(format!(
                "cargo volume {} m3 exceeds vehicle capacity {} m3",
                container.volume_m3, vehicle.capacity_m3
            )));
        }

        match self.fleet.reserve(leg_id, vehicle_id, driver_id).await? {
            Reservation::Reserved => {}
            Reservation::LegNotPending => {
                return Err(AppError::InvalidState(format!("leg {} was assigned concurrently", leg_id)))
            }
            Reservation::VehicleUnavailable => {
                return Err(AppError::ResourceUnavailable(format!(
                    "vehicle {} was taken concurrently",
                    vehicle.license_plate
                )))
            }
            Reservation::DriverUnavailable => {
                return Err(AppError::ResourceUnavailable(format!(
                    "driver {} was taken concurrently",
                    driver.full_name
                )))
            }
        }

        LEG_TRANSITIONS.with_label_values(&["ASSIGNED"]).inc();
        info!(
            "✅ Tramo {} asignado a {} / {}",
            leg_id, vehicle.license_plate, driver.full_name
        );
        self.get(leg_id).await
    }

    /// Iniciar un tramo ASSIGNED
    pub async fn start(&self, leg_id: Uuid) -> AppResult<Leg> {
        let leg = self.get(leg_id).await?;
        let vehicle_id = match (leg.status, leg.vehicle_id, leg.driver_id) {
            (LegStatus::Assigned, Some(vehicle_id), Some(_)) => vehicle_id,
            (LegStatus::Assigned, _, _) => {
                return Err(AppError::InvalidState(format!(
                    "leg {} has no vehicle and driver assigned",
                    leg_id
                )))
            }
            (status, _, _) => {
                return Err(AppError::InvalidState(format!(
                    "only ASSIGNED legs can be started, leg {} is {:?}",
                    leg_id, status
                )))
            }
        };

        let siblings = self.legs.find_by_request(leg.request_id).await?;
        let first_started = siblings.iter().all(|l| l.id == leg.id || l.started_at.is_none());

        let now = Utc::now();
        let started = Leg {
            status: LegStatus::Started,
            started_at: Some(now),
            updated_at: now,
            ..leg
        };

        let mut steps = Vec::new();
        if let Endpoint::Deposit { .. } = started.origin {
            match siblings.iter().find(|l| l.sequence == started.sequence - 1) {
                Some(inbound) => steps.push(SagaStep::DepositCheckOut {
                    leg_id: started.id,
                    inbound_leg_id: inbound.id,
                }),
                None => warn!("⚠️ Tramo {} sale de un depósito sin tramo de llegada", leg_id),
            }
        }
        if first_started {
            steps.push(SagaStep::MarkInTransit);
        }

        let change = LegTransition {
            vehicle: Some((vehicle_id, VehicleStatus::InUse, None)),
            driver: None,
            completion: None,
            messages: outbox_messages(started.request_id, steps),
            expected: LegStatus::Assigned,
            leg: started,
        };
        let inserted = self.commit(&change).await?;

        LEG_TRANSITIONS.with_label_values(&["STARTED"]).inc();
        info!(
            "▶️ Tramo {} iniciado ({} → {})",
            leg_id,
            change.leg.origin.address(),
            change.leg.destination.address()
        );
        self.saga.dispatch_ids(&inserted).await;

        Ok(change.leg)
    }

    /// Finalizar un tramo STARTED
    pub async fn finish(&self, leg_id: Uuid) -> AppResult<Leg> {
        let leg = self.get(leg_id).await?;
        if leg.status != LegStatus::Started {
            return Err(AppError::InvalidState(format!(
                "only STARTED legs can be finished, leg {} is {:?}",
                leg_id, leg.status
            )));
        }

        let now = Utc::now();
        let finished = Leg {
            status: LegStatus::Finished,
            finished_at: Some(now),
            updated_at: now,
            ..leg
        };

        let mut steps = Vec::new();
        if let Endpoint::Deposit { deposit_id, .. } = &finished.destination {
            match self.deposits.find_by_id(*deposit_id).await? {
                Some(deposit) => steps.push(SagaStep::DepositCheckIn {
                    leg_id: finished.id,
                    deposit_id: deposit.id,
                    daily_cost: deposit.daily_cost,
                }),
                None => error!("❌ Depósito {} del tramo {} no existe, sin estadía", deposit_id, leg_id),
            }
        }

        let siblings = self.legs.find_by_request(finished.request_id).await?;
        let completion = self.completion_for(&finished, &siblings);
        if let Some(completion) = &completion {
            steps.push(SagaStep::CompleteShipment {
                real_cost: completion.actual_cost,
                real_hours: completion.actual_hours,
            });
        }

        let change = LegTransition {
            vehicle: finished
                .vehicle_id
                .map(|id| (id, VehicleStatus::Available, Some(finished.destination.address().to_string()))),
            driver: finished.driver_id.map(|id| (id, DriverStatus::Available)),
            completion,
            messages: outbox_messages(finished.request_id, steps),
            expected: LegStatus::Started,
            leg: finished,
        };
        let inserted = self.commit(&change).await?;

        LEG_TRANSITIONS.with_label_values(&["FINISHED"]).inc();
        info!("⏹️ Tramo {} finalizado en {}", leg_id, change.leg.destination.address());
        if let Some(completion) = &change.completion {
            info!(
                "🏁 Todos los tramos de la solicitud {} finalizados. Costo real: ${}, Tiempo real: {} horas",
                change.leg.request_id, completion.actual_cost, completion.actual_hours
            );
        }
        self.saga.dispatch_ids(&inserted).await;

        Ok(change.leg)
    }

    /// Cierre de la ruta si con este tramo terminan todos los de la solicitud
    fn completion_for(&self, finished: &Leg, siblings: &[Leg]) -> Option<RouteCompletion> {
        let legs: Vec<&Leg> = siblings
            .iter()
            .map(|l| if l.id == finished.id { finished } else { l })
            .collect();
        if legs.is_empty() || legs.iter().any(|l| l.status != LegStatus::Finished) {
            return None;
        }

        let total_km: f64 = legs.iter().map(|l| l.distance_km).sum();
        Some(RouteCompletion {
            route_id: finished.route_id,
            actual_cost: cost_for_distance(total_km, self.settlement_rate_per_km),
            actual_hours: round2(legs.iter().map(|l| l.duration_hours()).sum()),
            completed_at: finished.updated_at,
        })
    }

    /// Aplicar la transición con sus efectos; los mensajes quedan en el
    /// outbox aunque el despacho en línea falle
    async fn commit(&self, change: &LegTransition) -> AppResult<Vec<Uuid>> {
        self.legs.apply_transition(change).await?.ok_or_else(|| {
            AppError::InvalidState(format!("leg {} changed state concurrently", change.leg.id))
        })
    }
}

fn outbox_messages(request_id: i64, steps: Vec<SagaStep>) -> Vec<OutboxMessage> {
    steps
        .into_iter()
        .map(|step| OutboxMessage::new(request_id, step))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutboxStatus, Route, RouteEstimate, RoutePlan, RouteStatus};
    use crate::repositories::memory::seed_id;
    use crate::repositories::{InMemoryStore, OutboxRepository, RouteRepository};
    use crate::services::route_lifecycle::RouteLifecycle;
    use crate::services::test_support::{FakeBilling, FakeRegistry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const REQUEST: i64 = 42;

    /// Depósitos que fallan mientras `down` está activo
    struct FlakyDeposits {
        inner: Arc<InMemoryStore>,
        down: AtomicBool,
    }

    #[async_trait]
    impl DepositRepository for FlakyDeposits {
        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Deposit>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(AppError::Database("connection reset".to_string()));
            }
            DepositRepository::find_by_id(self.inner.as_ref(), id).await
        }

        async fn find_active(&self) -> AppResult<Vec<Deposit>> {
            self.inner.find_active().await
        }

        async fn list_all(&self) -> AppResult<Vec<Deposit>> {
            DepositRepository::list_all(self.inner.as_ref()).await
        }
    }

    struct Harness {
        store: Arc<InMemoryStore>,
        registry: Arc<FakeRegistry>,
        billing: Arc<FakeBilling>,
        legs: LegLifecycle,
    }

    async fn harness(weight_kg: f64) -> Harness {
        let store = Arc::new(InMemoryStore::seeded());
        let registry = Arc::new(FakeRegistry::default());
        registry.add_request(REQUEST, 900, weight_kg, 30.0).await;
        let billing = Arc::new(FakeBilling::default());
        let saga = ShipmentSaga::new(store.clone(), store.clone(), registry.clone(), billing.clone(), 8);
        let legs = LegLifecycle::new(
            store.clone(),
            store.clone(),
            store.clone(),
            registry.clone(),
            saga,
            Decimal::from(10_000),
        );
        Harness {
            store,
            registry,
            billing,
            legs,
        }
    }

    /// Asignar una ruta con los depósitos indicados y devolver sus tramos
    async fn assigned_route(h: &Harness, deposit_ids: Vec<Uuid>, km: f64) -> Vec<Leg> {
        let route = Route::tentative(
            REQUEST,
            "Buenos Aires",
            "Mendoza",
            RouteEstimate {
                plan: RoutePlan::with_deposits(deposit_ids),
                total_distance_km: km,
                estimated_cost: Decimal::from(1000),
                estimated_hours: 10.0,
                notes: None,
            },
        );
        RouteRepository::insert(h.store.as_ref(), &route).await.unwrap();
        let lifecycle = RouteLifecycle::new(h.store.clone(), h.store.clone());
        lifecycle.assign(route.id, REQUEST).await.unwrap().1
    }

    #[tokio::test]
    async fn test_finish_requires_started() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![], 100.0).await;

        let err = h.legs.finish(legs[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        h.legs.assign_resources(legs[0].id, seed_id(3, 1), seed_id(2, 1)).await.unwrap();
        let err = h.legs.finish(legs[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_start_requires_assignment() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![], 100.0).await;

        let err = h.legs.start(legs[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_capacity_exceeded_leaves_vehicle_untouched() {
        let h = harness(12_000.0).await;
        let legs = assigned_route(&h, vec![], 100.0).await;

        let err = h
            .legs
            .assign_resources(legs[0].id, seed_id(3, 1), seed_id(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));

        let vehicle = h.store.find_vehicle(seed_id(3, 1)).await.unwrap().unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Available);
        assert_eq!(h.legs.get(legs[0].id).await.unwrap().status, LegStatus::Pending);
    }

    #[tokio::test]
    async fn test_busy_resources_are_unavailable() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![], 100.0).await;

        let err = h
            .legs
            .assign_resources(legs[0].id, seed_id(3, 4), seed_id(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceUnavailable(_)));

        let err = h
            .legs
            .assign_resources(legs[0].id, Uuid::new_v4(), seed_id(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_registry_failures() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![], 100.0).await;

        h.registry.unreachable.store(true, Ordering::SeqCst);
        let err = h
            .legs
            .assign_resources(legs[0].id, seed_id(3, 1), seed_id(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_vehicle_follows_leg() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![], 100.0).await;
        let leg_id = legs[0].id;
        let (truck, driver) = (seed_id(3, 1), seed_id(2, 1));

        h.legs.assign_resources(leg_id, truck, driver).await.unwrap();
        assert_eq!(h.store.find_vehicle(truck).await.unwrap().unwrap().status, VehicleStatus::Assigned);
        assert_eq!(h.store.find_driver(driver).await.unwrap().unwrap().status, DriverStatus::InUse);

        h.legs.start(leg_id).await.unwrap();
        assert_eq!(h.store.find_vehicle(truck).await.unwrap().unwrap().status, VehicleStatus::InUse);
        assert_eq!(
            *h.registry.status_updates.lock().await,
            vec![(REQUEST, "IN_TRANSIT".to_string())]
        );

        let finished = h.legs.finish(leg_id).await.unwrap();
        assert_eq!(finished.status, LegStatus::Finished);
        let vehicle = h.store.find_vehicle(truck).await.unwrap().unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Available);
        assert_eq!(vehicle.current_location.as_deref(), Some("Mendoza"));
        assert_eq!(h.store.find_driver(driver).await.unwrap().unwrap().status, DriverStatus::Available);

        let route = RouteRepository::find_by_id(h.store.as_ref(), finished.route_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(route.status, RouteStatus::Completed);
        assert_eq!(route.actual_cost, Some(Decimal::from(1_000_000)));
        assert_eq!(*h.billing.invoices.lock().await, vec![REQUEST]);
    }

    #[tokio::test]
    async fn test_deposit_route_saga() {
        let h = harness(5000.0).await;
        let rosario = seed_id(1, 2);
        let legs = assigned_route(&h, vec![rosario], 600.0).await;
        let (truck, driver) = (seed_id(3, 2), seed_id(2, 2));

        h.legs.assign_resources(legs[0].id, truck, driver).await.unwrap();
        h.legs.start(legs[0].id).await.unwrap();
        h.legs.finish(legs[0].id).await.unwrap();

        let opened = h.billing.opened.lock().await.clone();
        assert_eq!(opened.len(), 1);
        assert_eq!((opened[0].container_id, opened[0].deposit_id), (900, rosario));
        assert_eq!(opened[0].daily_cost, Decimal::from(1300));

        h.legs.assign_resources(legs[1].id, truck, driver).await.unwrap();
        h.legs.start(legs[1].id).await.unwrap();
        assert_eq!(*h.billing.closed.lock().await, vec![100]);
        // IN_TRANSIT sólo con el primer tramo
        assert_eq!(h.registry.status_updates.lock().await.len(), 1);

        h.legs.finish(legs[1].id).await.unwrap();
        assert_eq!(h.registry.completions.lock().await.len(), 1);
        assert_eq!(*h.billing.invoices.lock().await, vec![REQUEST]);
    }

    #[tokio::test]
    async fn test_failed_finish_commits_nothing_and_can_be_retried() {
        let h = harness(5000.0).await;
        let rosario = seed_id(1, 2);
        let legs = assigned_route(&h, vec![rosario], 600.0).await;
        let (truck, driver) = (seed_id(3, 2), seed_id(2, 2));

        let deposits = Arc::new(FlakyDeposits {
            inner: h.store.clone(),
            down: AtomicBool::new(false),
        });
        let saga = ShipmentSaga::new(h.store.clone(), h.store.clone(), h.registry.clone(), h.billing.clone(), 8);
        let lifecycle = LegLifecycle::new(
            h.store.clone(),
            h.store.clone(),
            deposits.clone(),
            h.registry.clone(),
            saga,
            Decimal::from(10_000),
        );

        lifecycle.assign_resources(legs[0].id, truck, driver).await.unwrap();
        lifecycle.start(legs[0].id).await.unwrap();

        deposits.down.store(true, Ordering::SeqCst);
        let err = lifecycle.finish(legs[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        assert_eq!(h.legs.get(legs[0].id).await.unwrap().status, LegStatus::Started);
        assert_eq!(h.store.find_vehicle(truck).await.unwrap().unwrap().status, VehicleStatus::InUse);
        assert_eq!(h.store.find_driver(driver).await.unwrap().unwrap().status, DriverStatus::InUse);
        let checkin_key = format!("checkin:{}", legs[0].id);
        assert!(h.store.find_by_key(&checkin_key).await.unwrap().is_none());

        deposits.down.store(false, Ordering::SeqCst);
        let finished = lifecycle.finish(legs[0].id).await.unwrap();
        assert_eq!(finished.status, LegStatus::Finished);
        assert_eq!(h.store.find_vehicle(truck).await.unwrap().unwrap().status, VehicleStatus::Available);

        let checkin = h.store.find_by_key(&checkin_key).await.unwrap().unwrap();
        assert_eq!(checkin.status, OutboxStatus::Done);
        assert_eq!(h.billing.opened.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_last_leg_closes_route_with_completion_step() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![], 250.0).await;
        let leg_id = legs[0].id;

        h.legs.assign_resources(leg_id, seed_id(3, 1), seed_id(2, 1)).await.unwrap();
        h.legs.start(leg_id).await.unwrap();
        h.registry.unreachable.store(true, Ordering::SeqCst);
        let finished = h.legs.finish(leg_id).await.unwrap();

        let route = RouteRepository::find_by_id(h.store.as_ref(), finished.route_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(route.status, RouteStatus::Completed);
        assert_eq!(route.actual_cost, Some(Decimal::from(2_500_000)));

        let complete = h.store.find_by_key(&format!("complete:{}", REQUEST)).await.unwrap().unwrap();
        assert_eq!((complete.status, complete.attempts), (OutboxStatus::Pending, 1));
        assert!(matches!(complete.step, SagaStep::CompleteShipment { .. }));
    }

    #[tokio::test]
    async fn test_billing_failure_does_not_block_finish() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![], 100.0).await;
        let leg_id = legs[0].id;

        h.legs.assign_resources(leg_id, seed_id(3, 1), seed_id(2, 1)).await.unwrap();
        h.legs.start(leg_id).await.unwrap();

        h.billing.unreachable.store(true, Ordering::SeqCst);
        let finished = h.legs.finish(leg_id).await.unwrap();
        assert_eq!(finished.status, LegStatus::Finished);

        let complete = h.store.find_by_key(&format!("complete:{}", REQUEST)).await.unwrap().unwrap();
        assert_eq!(complete.status, OutboxStatus::Done);
        let invoice = h.store.find_by_key(&format!("invoice:{}", REQUEST)).await.unwrap().unwrap();
        assert_eq!((invoice.status, invoice.attempts), (OutboxStatus::Pending, 1));
    }

    #[tokio::test]
    async fn test_list_filters_combine() {
        let h = harness(5000.0).await;
        let legs = assigned_route(&h, vec![seed_id(1, 2)], 600.0).await;
        h.legs.assign_resources(legs[0].id, seed_id(3, 1), seed_id(2, 1)).await.unwrap();

        let by_request = h
            .legs
            .list(&LegFilter {
                request_id: Some(REQUEST),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_request.iter().map(|l| l.sequence).collect::<Vec<_>>(), vec![1, 2]);

        let by_vehicle = h
            .legs
            .list(&LegFilter {
                request_id: Some(REQUEST),
                vehicle_id: Some(seed_id(3, 1)),
                driver_id: None,
            })
            .await
            .unwrap();
        assert_eq!(by_vehicle.len(), 1);
        assert_eq!(by_vehicle[0].id, legs[0].id);
    }
}
