use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{FleetRepository, Reservation};
use crate::models::{Driver, DriverStatus, LegStatus, Vehicle, VehicleStatus};
use crate::utils::AppResult;

const VEHICLE_COLUMNS: &str = r#"
    id, license_plate, brand, model, capacity_kg, capacity_m3, fuel_consumption_l_km,
    cost_per_km, status, current_location, created_at
"#;

const DRIVER_COLUMNS: &str = "id, full_name, license_type, license_expires_on, phone, status, created_at";

pub struct PgFleetRepository {
    pool: PgPool,
}

impl PgFleetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FleetRepository for PgFleetRepository {
    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!("SELECT {} FROM vehicles WHERE id = $1", VEHICLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>(&format!("SELECT {} FROM drivers WHERE id = $1", DRIVER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(driver)
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles ORDER BY license_plate",
            VEHICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn list_available_vehicles(&self, weight_kg: f64, volume_m3: f64) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            r#"
            SELECT {} FROM vehicles
            WHERE status = 'AVAILABLE' AND capacity_kg >= $1 AND capacity_m3 >= $2
            ORDER BY capacity_kg
            "#,
            VEHICLE_COLUMNS
        ))
        .bind(weight_kg)
        .bind(volume_m3)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        let drivers = sqlx::query_as::<_, Driver>(&format!("SELECT {} FROM drivers ORDER BY full_name", DRIVER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        Ok(drivers)
    }

    async fn reserve(&self, leg_id: Uuid, vehicle_id: Uuid, driver_id: Uuid) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let leg = sqlx::query(
            r#"
            UPDATE legs SET status = $4, vehicle_id = $2, driver_id = $3, updated_at = NOW()
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(leg_id)
        .bind(vehicle_id)
        .bind(driver_id)
        .bind(LegStatus::Assigned)
        .bind(LegStatus::Pending)
        .execute(&mut *tx)
        .await?;
        if leg.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Reservation::LegNotPending);
        }

        let vehicle = sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1 AND status = $3")
        .bind(vehicle_id)
        .bind(VehicleStatus::Assigned)
        .bind(VehicleStatus::Available)
        .execute(&mut *tx)
        .await?;
        if vehicle.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Reservation::VehicleUnavailable);
        }

        let driver = sqlx::query("UPDATE drivers SET status = $2 WHERE id = $1 AND status = $3")
            .bind(driver_id)
            .bind(DriverStatus::InUse)
            .bind(DriverStatus::Available)
            .execute(&mut *tx)
            .await?;
        if driver.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Reservation::DriverUnavailable);
        }

        tx.commit().await?;
        Ok(Reservation::Reserved)
    }
}

