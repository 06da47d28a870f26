use crate::dto::fleet_dto::AvailableVehiclesQuery;
use crate::dto::ApiResponse;
use crate::models::{Deposit, Driver, Vehicle};
use crate::services::LegLifecycle;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Lecturas de flota y depósitos
pub struct FleetController {
    lifecycle: LegLifecycle,
}

impl FleetController {
    pub fn new(state: &AppState) -> Self {
        Self {
            lifecycle: state.legs.clone(),
        }
    }

    pub async fn list_vehicles(&self) -> Result<ApiResponse<Vec<Vehicle>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.list_vehicles().await?))
    }

    pub async fn list_available_vehicles(
        &self,
        query: AvailableVehiclesQuery,
    ) -> Result<ApiResponse<Vec<Vehicle>>, AppError> {
        let vehicles = self
            .lifecycle
            .list_available_vehicles(query.weight_kg, query.volume_m3)
            .await?;
        Ok(ApiResponse::success(vehicles))
    }

    pub async fn list_drivers(&self) -> Result<ApiResponse<Vec<Driver>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.list_drivers().await?))
    }

    pub async fn list_deposits(&self) -> Result<ApiResponse<Vec<Deposit>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.list_deposits().await?))
    }
}
