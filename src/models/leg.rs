//! Modelo de Leg (tramo)
//!
//! Un tramo es el segmento operado por un vehículo entre dos extremos
//! (cliente o depósito). Se materializa al asignar una ruta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del tramo - mapea al ENUM leg_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "leg_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegStatus {
    Pending,
    Assigned,
    Started,
    Finished,
}

/// Tipo de tramo - mapea al ENUM leg_kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "leg_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegKind {
    Direct,
    Deposit,
}

/// Tipo de extremo - mapea al ENUM endpoint_kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "endpoint_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointKind {
    Customer,
    Deposit,
}

/// Extremo de un tramo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Endpoint {
    Customer {
        address: String,
    },
    Deposit {
        #[serde(rename = "id")]
        deposit_id: Uuid,
        address: String,
    },
}

impl Endpoint {
    pub fn customer(address: impl Into<String>) -> Self {
        Endpoint::Customer { address: address.into() }
    }

    pub fn deposit(deposit_id: Uuid, address: impl Into<String>) -> Self {
        Endpoint::Deposit {
            deposit_id,
            address: address.into(),
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            Endpoint::Customer { .. } => EndpointKind::Customer,
            Endpoint::Deposit { .. } => EndpointKind::Deposit,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Endpoint::Customer { address } | Endpoint::Deposit { address, .. } => address,
        }
    }

    pub fn deposit_id(&self) -> Option<Uuid> {
        match self {
            Endpoint::Deposit { deposit_id, .. } => Some(*deposit_id),
            Endpoint::Customer { .. } => None,
        }
    }

    fn from_columns(kind: EndpointKind, deposit_id: Option<Uuid>, address: String) -> Result<Self, String> {
        match (kind, deposit_id) {
            (EndpointKind::Customer, _) => Ok(Endpoint::Customer { address }),
            (EndpointKind::Deposit, Some(deposit_id)) => Ok(Endpoint::Deposit { deposit_id, address }),
            (EndpointKind::Deposit, None) => Err("deposit endpoint without deposit id".to_string()),
        }
    }
}

/// Leg principal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub id: Uuid,
    pub request_id: i64,
    pub route_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub origin: Endpoint,
    pub destination: Endpoint,
    pub kind: LegKind,
    pub distance_km: f64,
    pub sequence: i32,
    pub status: LegStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Estadía abierta al llegar a un depósito (solo tramos con destino depósito)
    pub dwell_record_id: Option<i64>,
    pub dwell_closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Leg {
    /// Nuevo tramo PENDING
    pub fn pending(
        request_id: i64,
        route_id: Uuid,
        origin: Endpoint,
        destination: Endpoint,
        kind: LegKind,
        distance_km: f64,
        sequence: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id,
            route_id,
            vehicle_id: None,
            driver_id: None,
            origin,
            destination,
            kind,
            distance_km,
            sequence,
            status: LegStatus::Pending,
            started_at: None,
            finished_at: None,
            dwell_record_id: None,
            dwell_closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Duración real del tramo en horas (0 si no tiene inicio y fin)
    pub fn duration_hours(&self) -> f64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_minutes() as f64 / 60.0,
            _ => 0.0,
        }
    }
}

/// Fila de la tabla legs
#[derive(Debug, Clone, FromRow)]
pub struct LegRow {
    pub id: Uuid,
    pub request_id: i64,
    pub route_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub origin_kind: EndpointKind,
    pub origin_deposit_id: Option<Uuid>,
    pub origin_address: String,
    pub destination_kind: EndpointKind,
    pub destination_deposit_id: Option<Uuid>,
    pub destination_address: String,
    pub kind: LegKind,
    pub distance_km: f64,
    pub sequence: i32,
    pub status: LegStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dwell_record_id: Option<i64>,
    pub dwell_closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LegRow> for Leg {
    type Error = String;

    fn try_from(row: LegRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            request_id: row.request_id,
            route_id: row.route_id,
            vehicle_id: row.vehicle_id,
            driver_id: row.driver_id,
            origin: Endpoint::from_columns(row.origin_kind, row.origin_deposit_id, row.origin_address)?,
            destination: Endpoint::from_columns(
                row.destination_kind,
                row.destination_deposit_id,
                row.destination_address,
            )?,
            kind: row.kind,
            distance_km: row.distance_km,
            sequence: row.sequence,
            status: row.status,
            started_at: row.started_at,
            finished_at: row.finished_at,
            dwell_record_id: row.dwell_record_id,
            dwell_closed_at: row.dwell_closed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_endpoint_accessors() {
        let id = Uuid::new_v4();
        let deposit = Endpoint::deposit(id, "Ruta 40 km 15, Mendoza");
        assert_eq!(deposit.kind(), EndpointKind::Deposit);
        assert_eq!(deposit.deposit_id(), Some(id));
        assert_eq!(deposit.address(), "Ruta 40 km 15, Mendoza");

        let customer = Endpoint::customer("Buenos Aires");
        assert_eq!(customer.kind(), EndpointKind::Customer);
        assert_eq!(customer.deposit_id(), None);
    }

    #[test]
    fn test_duration_hours() {
        let mut leg = Leg::pending(
            1,
            Uuid::new_v4(),
            Endpoint::customer("A"),
            Endpoint::customer("B"),
            LegKind::Direct,
            100.0,
            1,
        );
        assert_eq!(leg.duration_hours(), 0.0);

        let start = Utc::now();
        leg.started_at = Some(start);
        leg.finished_at = Some(start + Duration::minutes(90));
        assert_eq!(leg.duration_hours(), 1.5);
    }
}
