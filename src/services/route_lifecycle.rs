//! Ciclo de vida de rutas
//!
//! TENTATIVE → ASSIGNED (o CANCELLED para las hermanas). Al asignar se
//! materializan los tramos encadenados Cliente → Depósito… → Cliente.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Deposit, Endpoint, Leg, LegKind, Route, RoutePlan, RouteStatus};
use crate::repositories::{DepositRepository, RouteRepository};
use crate::utils::errors::not_found_error;
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct RouteLifecycle {
    routes: Arc<dyn RouteRepository>,
    deposits: Arc<dyn DepositRepository>,
}

impl RouteLifecycle {
    pub fn new(routes: Arc<dyn RouteRepository>, deposits: Arc<dyn DepositRepository>) -> Self {
        Self { routes, deposits }
    }

    pub async fn get(&self, route_id: Uuid) -> AppResult<Route> {
        self.routes
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", route_id))
    }

    pub async fn list_by_request(&self, request_id: i64) -> AppResult<Vec<Route>> {
        self.routes.find_by_request(request_id).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Route>> {
        self.routes.list_all().await
    }

    /// Asignar una ruta candidata a su solicitud
    pub async fn assign(&self, route_id: Uuid, request_id: i64) -> AppResult<(Route, Vec<Leg>)> {
        info!("📌 Asignando ruta {} a solicitud {}", route_id, request_id);

        let route = self.get(route_id).await?;
        if route.request_id != request_id {
            return Err(AppError::InvalidArgument(format!(
                "route {} does not belong to request {}",
                route_id, request_id
            )));
        }
        if route.status != RouteStatus::Tentative {
            return Err(AppError::InvalidState(format!(
                "only TENTATIVE routes can be assigned, route {} is {:?}",
                route_id, route.status
            )));
        }

        let mut stops = Vec::with_capacity(route.plan.deposit_ids().len());
        for deposit_id in route.plan.deposit_ids() {
            let deposit = self
                .deposits
                .find_by_id(*deposit_id)
                .await?
                .ok_or_else(|| not_found_error("Deposit", deposit_id))?;
            stops.push(deposit);
        }

        let legs = materialize_legs(&route, &stops);
        let assigned_at = Utc::now();

        if !self.routes.commit_assignment(route.id, assigned_at, &legs).await? {
            return Err(AppError::InvalidState(format!(
                "route {} was assigned or cancelled concurrently",
                route_id
            )));
        }

        info!(
            "✅ Ruta {} asignada. Estrategia: {}, {} tramos creados",
            route_id,
            route.plan.strategy().as_str(),
            legs.len()
        );

        let route = Route {
            status: RouteStatus::Assigned,
            assigned_at: Some(assigned_at),
            ..route
        };
        Ok((route, legs))
    }
}

/// Construir los tramos PENDING de una ruta. La distancia total se reparte en
/// partes iguales entre los tramos, aunque el planificador haya calculado
/// distancias distintas para cada uno.
pub fn materialize_legs(route: &Route, deposits: &[Deposit]) -> Vec<Leg> {
    let leg_count = route.leg_count();
    let distance = route.total_distance_km / leg_count as f64;
    let kind = match route.plan {
        RoutePlan::Direct => LegKind::Direct,
        RoutePlan::OneDeposit(_) | RoutePlan::MultiDeposit(_) => LegKind::Deposit,
    };

    let endpoints: Vec<Endpoint> = std::iter::once(Endpoint::customer(route.origin_address.as_str()))
        .chain(deposits.iter().map(|d| Endpoint::deposit(d.id, d.address.as_str())))
        .chain(std::iter::once(Endpoint::customer(route.destination_address.as_str())))
        .collect();

    let legs: Vec<Leg> = endpoints
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            Leg::pending(
                route.request_id,
                route.id,
                pair[0].clone(),
                pair[1].clone(),
                kind,
                distance,
                i as i32 + 1,
            )
        })
        .collect();

    debug!(
        "🚛 {} tramos para ruta {}: {}",
        legs.len(),
        route.id,
        endpoints.iter().map(|e| e.address()).collect::<Vec<_>>().join(" → ")
    );
    legs
}
