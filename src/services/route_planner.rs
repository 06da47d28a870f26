//! Planificador de rutas
//!
//! Genera la ruta DIRECT y, según la distancia directa, una candidata que
//! pasa por 1, 2 o 3 depósitos. Todas se persisten como TENTATIVE.

use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics::ROUTE_CANDIDATES;
use crate::models::{Deposit, Route, RouteEstimate, RoutePlan};
use crate::repositories::{DepositRepository, RouteRepository};
use crate::services::deposit_selector::select_deposits;
use crate::services::distance_estimator::{estimated_hours, DistanceEstimator};
use crate::utils::money::{cost_for_distance, round2};
use crate::utils::{AppError, AppResult};

/// Datos de la solicitud necesarios para planificar
#[derive(Debug, Clone)]
pub struct CandidateRequest {
    pub request_id: i64,
    pub origin_address: String,
    pub destination_address: String,
    pub weight_kg: f64,
    pub volume_m3: f64,
}

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub rate_per_km: Decimal,
    pub deposit_stop_hours: f64,
}

/// Cantidad de depósitos según la banda de distancia directa
pub fn deposit_count_for(direct_km: f64) -> Option<usize> {
    if direct_km > 1500.0 {
        Some(3)
    } else if direct_km > 1000.0 {
        Some(2)
    } else if direct_km > 500.0 {
        Some(1)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct RoutePlanner {
    estimator: DistanceEstimator,
    deposits: Arc<dyn DepositRepository>,
    routes: Arc<dyn RouteRepository>,
    settings: PlannerSettings,
}

impl RoutePlanner {
    pub fn new(
        estimator: DistanceEstimator,
        deposits: Arc<dyn DepositRepository>,
        routes: Arc<dyn RouteRepository>,
        settings: PlannerSettings,
    ) -> Self {
        Self {
            estimator,
            deposits,
            routes,
            settings,
        }
    }

    /// Generar y persistir las rutas candidatas: [DIRECT, depósitos?]
    pub async fn generate_candidates(&self, request: &CandidateRequest) -> AppResult<Vec<Route>> {
        validate(request)?;

        info!(
            "🔍 Calculando rutas tentativas para solicitud {} ({} kg, {} m³)",
            request.request_id, request.weight_kg, request.volume_m3
        );

        let direct = self.direct_estimate(request).await;
        let direct_km = direct.total_distance_km;
        let mut candidates = vec![direct];

        if let Some(count) = deposit_count_for(direct_km) {
            info!("📍 Distancia {}km → estrategia con {} depósito(s)", direct_km, count);
            match self.deposit_estimate(request, count).await? {
                Some(estimate) => candidates.push(estimate),
                None => warn!(
                    "⚠️ Sin candidata con depósitos para la solicitud {}; sólo ruta directa",
                    request.request_id
                ),
            }
        }

        let mut routes = Vec::with_capacity(candidates.len());
        for estimate in candidates {
            let route = Route::tentative(
                request.request_id,
                &request.origin_address,
                &request.destination_address,
                estimate,
            );
            self.routes.insert(&route).await?;
            ROUTE_CANDIDATES
                .with_label_values(&[route.plan.strategy().as_str()])
                .inc();
            info!(
                "✅ Ruta {}: {}km, ${}, {}hs",
                route.plan.strategy().as_str(),
                route.total_distance_km,
                route.estimated_cost,
                route.estimated_hours
            );
            routes.push(route);
        }

        info!("📊 Total de rutas tentativas generadas: {}", routes.len());
        Ok(routes)
    }

    async fn direct_estimate(&self, request: &CandidateRequest) -> RouteEstimate {
        let distance = self
            .estimator
            .distance(&request.origin_address, &request.destination_address)
            .await;

        RouteEstimate {
            plan: RoutePlan::Direct,
            total_distance_km: distance,
            estimated_cost: cost_for_distance(distance, self.settings.rate_per_km),
            estimated_hours: estimated_hours(distance),
            notes: Some("Ruta directa sin paradas".to_string()),
        }
    }

    async fn deposit_estimate(&self, request: &CandidateRequest, count: usize) -> AppResult<Option<RouteEstimate>> {
        let active = self.deposits.find_active().await?;
        if active.len() < count {
            warn!(
                "⚠️ No hay suficientes depósitos activos ({} requeridos, {} disponibles)",
                count,
                active.len()
            );
            return Ok(None);
        }

        let (origin, destination) = futures::join!(
            self.estimator.geocode(&request.origin_address),
            self.estimator.geocode(&request.destination_address)
        );
        let (Some(origin), Some(destination)) = (origin, destination) else {
            warn!("⚠️ No se pudieron obtener coordenadas de origen/destino");
            return Ok(None);
        };

        // Fase 1: elegir depósitos por haversine
        let Some(selected) = select_deposits(&active, &origin, &destination, count) else {
            warn!("⚠️ No se pudieron seleccionar {} depósitos", count);
            return Ok(None);
        };

        // Fase 2: distancias reales de cada tramo
        let stops = stop_addresses(request, &selected);
        let hops = join_all(
            stops
                .windows(2)
                .map(|pair| self.estimator.distance(&pair[0], &pair[1])),
        )
        .await;

        for (i, km) in hops.iter().enumerate() {
            info!("  📍 Tramo {}: {} → {} = {}km", i + 1, stops[i], stops[i + 1], km);
        }

        let total = round2(hops.iter().sum());
        let deposit_costs: Decimal = selected.iter().map(|d| d.daily_cost).sum();
        let names: Vec<&str> = selected.iter().map(|d| d.name.as_str()).collect();

        Ok(Some(RouteEstimate {
            plan: RoutePlan::with_deposits(selected.iter().map(|d| d.id).collect()),
            total_distance_km: total,
            estimated_cost: (cost_for_distance(total, self.settings.rate_per_km) + deposit_costs).round_dp(2),
            estimated_hours: round2(estimated_hours(total) + count as f64 * self.settings.deposit_stop_hours),
            notes: Some(format!("Ruta con {} parada(s): {}", count, names.join(", "))),
        }))
    }
}

fn stop_addresses(request: &CandidateRequest, deposits: &[Deposit]) -> Vec<String> {
    std::iter::once(request.origin_address.clone())
        .chain(deposits.iter().map(|d| d.address.clone()))
        .chain(std::iter::once(request.destination_address.clone()))
        .collect()
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate(request: &CandidateRequest) -> AppResult<()> {
    if request.origin_address.trim().is_empty() || request.destination_address.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "origin and destination addresses are required".to_string(),
        ));
    }
    if !is_positive(request.weight_kg) || !is_positive(request.volume_m3) {
        return Err(AppError::InvalidArgument(
            "weight and volume must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RouteStatus, RouteStrategy};
    use crate::repositories::InMemoryStore;
    use crate::services::test_support::FixedDistanceMapping;

    fn planner(store: &Arc<InMemoryStore>, km: f64) -> RoutePlanner {
        RoutePlanner::new(
            DistanceEstimator::new(Arc::new(FixedDistanceMapping::new(km)), None),
            store.clone(),
            store.clone(),
            PlannerSettings {
                rate_per_km: Decimal::from(150),
                deposit_stop_hours: 4.0,
            },
        )
    }

    fn request() -> CandidateRequest {
        CandidateRequest {
            request_id: 42,
            origin_address: "Buenos Aires, Argentina".to_string(),
            destination_address: "Mendoza, Argentina".to_string(),
            weight_kg: 5000.0,
            volume_m3: 20.0,
        }
    }

    #[test]
    fn test_distance_bands() {
        assert_eq!(deposit_count_for(300.0), None);
        assert_eq!(deposit_count_for(500.0), None);
        assert_eq!(deposit_count_for(500.01), Some(1));
        assert_eq!(deposit_count_for(1000.0), Some(1));
        assert_eq!(deposit_count_for(1050.0), Some(2));
        assert_eq!(deposit_count_for(1500.0), Some(2));
        assert_eq!(deposit_count_for(1650.0), Some(3));
    }

    #[tokio::test]
    async fn test_short_distance_only_direct() {
        let store = Arc::new(InMemoryStore::seeded());
        let routes = planner(&store, 300.0).generate_candidates(&request()).await.unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].plan, RoutePlan::Direct);
        assert_eq!(routes[0].estimated_cost, Decimal::from(45_000));
        assert_eq!(routes[0].estimated_hours, 3.75);
        assert_eq!(routes[0].status, RouteStatus::Tentative);
    }

    #[tokio::test]
    async fn test_each_band_adds_deposit_candidate() {
        for (km, strategy, deposits) in [
            (800.0, RouteStrategy::OneDeposit, 1),
            (1050.0, RouteStrategy::MultiDeposit, 2),
            (1650.0, RouteStrategy::MultiDeposit, 3),
        ] {
            let store = Arc::new(InMemoryStore::seeded());
            let routes = planner(&store, km).generate_candidates(&request()).await.unwrap();

            assert_eq!(routes.len(), 2, "band {}", km);
            assert_eq!(routes[0].plan, RoutePlan::Direct);
            assert_eq!(routes[1].plan.strategy(), strategy);
            assert_eq!(routes[1].plan.deposit_ids().len(), deposits);
            assert_eq!(routes[1].leg_count(), deposits + 1);
        }
    }

    #[tokio::test]
    async fn test_deposit_candidate_costs() {
        let store = Arc::new(InMemoryStore::seeded());
        let routes = planner(&store, 1050.0).generate_candidates(&request()).await.unwrap();
        let candidate = &routes[1];

        // 3 tramos de 1050 km cada uno con el proveedor fijo
        assert_eq!(candidate.total_distance_km, 3150.0);
        // Buenos Aires Sur (2000) + Rosario (1300)
        assert_eq!(candidate.estimated_cost, Decimal::from(3150 * 150 + 2000 + 1300));
        assert_eq!(candidate.estimated_hours, round2(3150.0 / 80.0 + 8.0));
        assert_eq!(
            candidate.notes.as_deref(),
            Some("Ruta con 2 parada(s): Depósito Buenos Aires Sur, Depósito Rosario Norte")
        );
    }

    #[tokio::test]
    async fn test_candidates_are_persisted() {
        let store = Arc::new(InMemoryStore::seeded());
        let routes = planner(&store, 1050.0).generate_candidates(&request()).await.unwrap();
        let stored = RouteRepository::find_by_request(store.as_ref(), 42).await.unwrap();
        assert_eq!(stored.len(), routes.len());
    }

    #[tokio::test]
    async fn test_ungeocodable_address_keeps_only_direct() {
        let store = Arc::new(InMemoryStore::seeded());
        let mut req = request();
        req.destination_address = "Ushuaia".to_string();
        let routes = planner(&store, 1050.0).generate_candidates(&req).await.unwrap();
        assert_eq!(routes.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_cargo() {
        let store = Arc::new(InMemoryStore::seeded());
        let mut req = request();
        req.weight_kg = 0.0;
        let result = planner(&store, 300.0).generate_candidates(&req).await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }
}
