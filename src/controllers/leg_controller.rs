use uuid::Uuid;

use crate::dto::leg_dto::AssignResourcesRequest;
use crate::dto::ApiResponse;
use crate::models::Leg;
use crate::services::{LegFilter, LegLifecycle};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct LegController {
    lifecycle: LegLifecycle,
}

impl LegController {
    pub fn new(state: &AppState) -> Self {
        Self {
            lifecycle: state.legs.clone(),
        }
    }

    pub async fn list(&self, filter: LegFilter) -> Result<ApiResponse<Vec<Leg>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.list(&filter).await?))
    }

    pub async fn get(&self, leg_id: Uuid) -> Result<ApiResponse<Leg>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.get(leg_id).await?))
    }

    pub async fn assign_resources(
        &self,
        leg_id: Uuid,
        request: AssignResourcesRequest,
    ) -> Result<ApiResponse<Leg>, AppError> {
        let leg = self
            .lifecycle
            .assign_resources(leg_id, request.vehicle_id, request.driver_id)
            .await?;
        Ok(ApiResponse::success_with_message(leg, "Vehículo y transportista asignados"))
    }

    pub async fn start(&self, leg_id: Uuid) -> Result<ApiResponse<Leg>, AppError> {
        let leg = self.lifecycle.start(leg_id).await?;
        Ok(ApiResponse::success_with_message(leg, "Tramo iniciado"))
    }

    pub async fn finish(&self, leg_id: Uuid) -> Result<ApiResponse<Leg>, AppError> {
        let leg = self.lifecycle.finish(leg_id).await?;
        Ok(ApiResponse::success_with_message(leg, "Tramo finalizado"))
    }
}
