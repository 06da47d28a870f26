//! Modelo de Driver (transportista)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del transportista - mapea al ENUM driver_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "driver_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Available,
    InUse,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub full_name: String,
    pub license_type: String,
    pub license_expires_on: Option<NaiveDate>,
    pub phone: Option<String>,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
}
