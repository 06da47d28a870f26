//! Modelo de Route
//!
//! Una ruta es un plan candidato (o asignado) que conecta el origen y el
//! destino de una solicitud, opcionalmente pasando por depósitos.
//! La estrategia y los depósitos intermedios viven en un único `RoutePlan`
//! para que no existan combinaciones inválidas.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado de la ruta - mapea al ENUM route_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "route_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Tentative,
    Assigned,
    Completed,
    Cancelled,
}

/// Estrategia de la ruta - mapea al ENUM route_strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "route_strategy", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStrategy {
    Direct,
    OneDeposit,
    MultiDeposit,
}

impl RouteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStrategy::Direct => "DIRECT",
            RouteStrategy::OneDeposit => "ONE_DEPOSIT",
            RouteStrategy::MultiDeposit => "MULTI_DEPOSIT",
        }
    }
}

/// Plan de paradas de la ruta. En JSON se expone plano como
/// `{strategy, legCount, depositIds}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PlanView", try_from = "PlanView")]
pub enum RoutePlan {
    Direct,
    OneDeposit(Uuid),
    MultiDeposit(Vec<Uuid>),
}

impl RoutePlan {
    /// Construir el plan a partir de los depósitos elegidos, en orden
    pub fn with_deposits(mut deposit_ids: Vec<Uuid>) -> Self {
        match deposit_ids.len() {
            0 => RoutePlan::Direct,
            1 => RoutePlan::OneDeposit(deposit_ids.remove(0)),
            _ => RoutePlan::MultiDeposit(deposit_ids),
        }
    }

    /// Reconstruir el plan desde las columnas persistidas
    pub fn from_parts(strategy: RouteStrategy, deposit_ids: Vec<Uuid>) -> Result<Self, String> {
        match (strategy, deposit_ids.len()) {
            (RouteStrategy::Direct, 0) => Ok(RoutePlan::Direct),
            (RouteStrategy::OneDeposit, 1) => Ok(RoutePlan::OneDeposit(deposit_ids[0])),
            (RouteStrategy::MultiDeposit, n) if n >= 2 => Ok(RoutePlan::MultiDeposit(deposit_ids)),
            (strategy, n) => Err(format!(
                "strategy {:?} cannot have {} intermediate deposits",
                strategy, n
            )),
        }
    }

    pub fn strategy(&self) -> RouteStrategy {
        match self {
            RoutePlan::Direct => RouteStrategy::Direct,
            RoutePlan::OneDeposit(_) => RouteStrategy::OneDeposit,
            RoutePlan::MultiDeposit(_) => RouteStrategy::MultiDeposit,
        }
    }

    /// Depósitos intermedios en orden de visita
    pub fn deposit_ids(&self) -> &[Uuid] {
        match self {
            RoutePlan::Direct => &[],
            RoutePlan::OneDeposit(id) => std::slice::from_ref(id),
            RoutePlan::MultiDeposit(ids) => ids,
        }
    }

    /// Cantidad de tramos = depósitos + 1
    pub fn leg_count(&self) -> usize {
        self.deposit_ids().len() + 1
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanView {
    strategy: RouteStrategy,
    leg_count: usize,
    deposit_ids: Vec<Uuid>,
}

impl From<RoutePlan> for PlanView {
    fn from(plan: RoutePlan) -> Self {
        Self {
            strategy: plan.strategy(),
            leg_count: plan.leg_count(),
            deposit_ids: plan.deposit_ids().to_vec(),
        }
    }
}

impl TryFrom<PlanView> for RoutePlan {
    type Error = String;

    fn try_from(view: PlanView) -> Result<Self, Self::Error> {
        let plan = RoutePlan::from_parts(view.strategy, view.deposit_ids)?;
        if plan.leg_count() != view.leg_count {
            return Err(format!("legCount {} does not match {} legs", view.leg_count, plan.leg_count()));
        }
        Ok(plan)
    }
}

/// Route principal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub request_id: i64,
    pub status: RouteStatus,
    #[serde(flatten)]
    pub plan: RoutePlan,
    pub origin_address: String,
    pub destination_address: String,
    pub total_distance_km: f64,
    pub estimated_cost: Decimal,
    pub estimated_hours: f64,
    pub actual_cost: Option<Decimal>,
    pub actual_hours: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Datos calculados por el planificador para un candidato
#[derive(Debug, Clone)]
pub struct RouteEstimate {
    pub plan: RoutePlan,
    pub total_distance_km: f64,
    pub estimated_cost: Decimal,
    pub estimated_hours: f64,
    pub notes: Option<String>,
}

impl Route {
    /// Nueva ruta candidata en estado TENTATIVE
    pub fn tentative(
        request_id: i64,
        origin_address: &str,
        destination_address: &str,
        estimate: RouteEstimate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            status: RouteStatus::Tentative,
            plan: estimate.plan,
            origin_address: origin_address.to_string(),
            destination_address: destination_address.to_string(),
            total_distance_km: estimate.total_distance_km,
            estimated_cost: estimate.estimated_cost,
            estimated_hours: estimate.estimated_hours,
            actual_cost: None,
            actual_hours: None,
            notes: estimate.notes,
            created_at: Utc::now(),
            assigned_at: None,
            completed_at: None,
        }
    }

    pub fn leg_count(&self) -> usize {
        self.plan.leg_count()
    }
}

/// Fila de la tabla routes
#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
    pub id: Uuid,
    pub request_id: i64,
    pub status: RouteStatus,
    pub strategy: RouteStrategy,
    pub deposit_ids: Vec<Uuid>,
    pub leg_count: i32,
    pub origin_address: String,
    pub destination_address: String,
    pub total_distance_km: f64,
    pub estimated_cost: Decimal,
    pub estimated_hours: f64,
    pub actual_cost: Option<Decimal>,
    pub actual_hours: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RouteRow> for Route {
    type Error = String;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        let plan = RoutePlan::from_parts(row.strategy, row.deposit_ids)?;
        if plan.leg_count() != row.leg_count as usize {
            return Err(format!(
                "route {} stores leg_count {} but its plan has {} legs",
                row.id,
                row.leg_count,
                plan.leg_count()
            ));
        }

        Ok(Self {
            id: row.id,
            request_id: row.request_id,
            status: row.status,
            plan,
            origin_address: row.origin_address,
            destination_address: row.destination_address,
            total_distance_km: row.total_distance_km,
            estimated_cost: row.estimated_cost,
            estimated_hours: row.estimated_hours,
            actual_cost: row.actual_cost,
            actual_hours: row.actual_hours,
            notes: row.notes,
            created_at: row.created_at,
            assigned_at: row.assigned_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_from_deposit_count() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(RoutePlan::with_deposits(vec![]), RoutePlan::Direct);
        assert_eq!(RoutePlan::with_deposits(vec![a]), RoutePlan::OneDeposit(a));
        assert_eq!(RoutePlan::with_deposits(vec![a, b]).strategy(), RouteStrategy::MultiDeposit);
        assert_eq!(RoutePlan::with_deposits(vec![a, b]).leg_count(), 3);
    }

    #[test]
    fn test_plan_rejects_invalid_combinations() {
        let a = Uuid::new_v4();
        assert!(RoutePlan::from_parts(RouteStrategy::Direct, vec![a]).is_err());
        assert!(RoutePlan::from_parts(RouteStrategy::OneDeposit, vec![]).is_err());
        assert!(RoutePlan::from_parts(RouteStrategy::MultiDeposit, vec![a]).is_err());
        assert_eq!(
            RoutePlan::from_parts(RouteStrategy::OneDeposit, vec![a]),
            Ok(RoutePlan::OneDeposit(a))
        );
    }

    #[test]
    fn test_plan_serializes_flat() {
        let a = Uuid::nil();
        let json = serde_json::to_value(RoutePlan::OneDeposit(a)).unwrap();
        assert_eq!(json["strategy"], "ONE_DEPOSIT");
        assert_eq!(json["legCount"], 2);
        assert_eq!(json["depositIds"], serde_json::json!([a.to_string()]));

        let json = serde_json::to_value(RoutePlan::Direct).unwrap();
        assert_eq!(json["strategy"], "DIRECT");
        assert_eq!(json["legCount"], 1);
        assert_eq!(json["depositIds"], serde_json::json!([]));
    }

    #[test]
    fn test_route_json_carries_plan_fields() {
        let route = Route::tentative(
            7,
            "Buenos Aires",
            "Mendoza",
            RouteEstimate {
                plan: RoutePlan::with_deposits(vec![Uuid::new_v4(), Uuid::new_v4()]),
                total_distance_km: 1050.0,
                estimated_cost: Decimal::from(160_000),
                estimated_hours: 21.13,
                notes: None,
            },
        );
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["strategy"], "MULTI_DEPOSIT");
        assert_eq!(json["legCount"], 3);
        assert_eq!(json["depositIds"].as_array().unwrap().len(), 2);
        assert!(json.get("plan").is_none());

        let back: Route = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back.plan, route.plan);

        let mut broken = json;
        broken["legCount"] = serde_json::json!(2);
        assert!(serde_json::from_value::<Route>(broken).is_err());
    }
}
