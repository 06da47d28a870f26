use crate::dto::ApiResponse;
use crate::models::OutboxMessage;
use crate::services::{DispatchReport, ShipmentSaga};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct SagaController {
    saga: ShipmentSaga,
}

impl SagaController {
    pub fn new(state: &AppState) -> Self {
        Self {
            saga: state.saga.clone(),
        }
    }

    pub async fn list_by_request(&self, request_id: i64) -> Result<ApiResponse<Vec<OutboxMessage>>, AppError> {
        Ok(ApiResponse::success(self.saga.list_by_request(request_id).await?))
    }

    /// Ejecutar una pasada del despachador a demanda
    pub async fn dispatch(&self) -> Result<ApiResponse<DispatchReport>, AppError> {
        let report = self.saga.dispatch_pending().await?;
        Ok(ApiResponse::success_with_message(report, "Pasada del outbox ejecutada"))
    }
}
