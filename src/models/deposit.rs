//! Modelo de Deposit
//!
//! Depósito intermedio donde la carga puede quedar en estadía. Cobra un costo
//! diario mientras el contenedor permanece allí.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del depósito - mapea al ENUM deposit_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "deposit_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    Active,
    Inactive,
}

/// Par latitud/longitud en grados decimales
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Coordenadas finitas y dentro de rango
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_capacity_m3: Option<f64>,
    pub daily_cost: Decimal,
    pub status: DepositStatus,
    pub created_at: DateTime<Utc>,
}

impl Deposit {
    /// Coordenadas válidas del depósito, si las tiene
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)).filter(Coordinates::is_valid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(lat: Option<f64>, lon: Option<f64>) -> Deposit {
        Deposit {
            id: Uuid::new_v4(),
            name: "Depósito".to_string(),
            address: "Dirección".to_string(),
            latitude: lat,
            longitude: lon,
            max_capacity_m3: None,
            daily_cost: Decimal::from(1000),
            status: DepositStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_coordinates_require_both_values() {
        assert!(deposit(Some(-31.37), Some(-64.24)).coordinates().is_some());
        assert!(deposit(None, Some(-64.24)).coordinates().is_none());
        assert!(deposit(Some(-31.37), None).coordinates().is_none());
    }

    #[test]
    fn test_coordinates_out_of_range_are_rejected() {
        assert!(deposit(Some(120.0), Some(10.0)).coordinates().is_none());
        assert!(deposit(Some(f64::NAN), Some(10.0)).coordinates().is_none());
    }
}
