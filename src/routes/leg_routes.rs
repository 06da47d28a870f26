use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::leg_controller::LegController;
use crate::dto::leg_dto::AssignResourcesRequest;
use crate::dto::ApiResponse;
use crate::models::Leg;
use crate::services::LegFilter;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_leg_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_legs))
        .route("/:id", get(get_leg))
        .route("/:id/assign", post(assign_resources))
        .route("/:id/start", patch(start_leg))
        .route("/:id/finish", patch(finish_leg))
}

async fn list_legs(
    State(state): State<AppState>,
    Query(filter): Query<LegFilter>,
) -> Result<Json<ApiResponse<Vec<Leg>>>, AppError> {
    let controller = LegController::new(&state);
    Ok(Json(controller.list(filter).await?))
}

async fn get_leg(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Leg>>, AppError> {
    let controller = LegController::new(&state);
    Ok(Json(controller.get(id).await?))
}

async fn assign_resources(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignResourcesRequest>,
) -> Result<Json<ApiResponse<Leg>>, AppError> {
    let controller = LegController::new(&state);
    let response = controller.assign_resources(id, request).await?;
    Ok(Json(response))
}

async fn start_leg(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Leg>>, AppError> {
    let controller = LegController::new(&state);
    Ok(Json(controller.start(id).await?))
}

async fn finish_leg(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Leg>>, AppError> {
    let controller = LegController::new(&state);
    Ok(Json(controller.finish(id).await?))
}
