use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::saga_controller::SagaController;
use crate::dto::ApiResponse;
use crate::models::OutboxMessage;
use crate::services::DispatchReport;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_saga_router() -> Router<AppState> {
    Router::new()
        .route("/request/:request_id", get(list_messages))
        .route("/dispatch", post(dispatch))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<OutboxMessage>>>, AppError> {
    let controller = SagaController::new(&state);
    Ok(Json(controller.list_by_request(request_id).await?))
}

async fn dispatch(State(state): State<AppState>) -> Result<Json<ApiResponse<DispatchReport>>, AppError> {
    let controller = SagaController::new(&state);
    Ok(Json(controller.dispatch().await?))
}
