//! Modelo de Vehicle
//!
//! Registro de solo lectura para el núcleo: el estado sólo cambia como efecto
//! de asignar, iniciar o finalizar un tramo.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Available,
    Assigned,
    InUse,
}

/// Vehicle principal - mapea exactamente a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub capacity_kg: f64,
    pub capacity_m3: f64,
    pub fuel_consumption_l_km: f64,
    pub cost_per_km: Decimal,
    pub status: VehicleStatus,
    pub current_location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// ¿Puede cargar este peso y volumen?
    pub fn fits(&self, weight_kg: f64, volume_m3: f64) -> bool {
        weight_kg <= self.capacity_kg && volume_m3 <= self.capacity_m3
    }
}
