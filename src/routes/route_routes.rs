use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::route_controller::RouteController;
use crate::dto::route_dto::{AssignRouteRequest, AssignedRouteResponse, GenerateCandidatesRequest};
use crate::dto::ApiResponse;
use crate::models::Route;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes))
        .route("/candidates", post(generate_candidates))
        .route("/request/:request_id", get(list_routes_by_request))
        .route("/:id", get(get_route))
        .route("/:id/assign", post(assign_route))
}

async fn generate_candidates(
    State(state): State<AppState>,
    Json(request): Json<GenerateCandidatesRequest>,
) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    let controller = RouteController::new(&state);
    let response = controller.generate_candidates(request).await?;
    Ok(Json(response))
}

async fn assign_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignRouteRequest>,
) -> Result<Json<ApiResponse<AssignedRouteResponse>>, AppError> {
    let controller = RouteController::new(&state);
    let response = controller.assign(id, request).await?;
    Ok(Json(response))
}

async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let controller = RouteController::new(&state);
    Ok(Json(controller.get(id).await?))
}

async fn list_routes(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    let controller = RouteController::new(&state);
    Ok(Json(controller.list_all().await?))
}

async fn list_routes_by_request(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    let controller = RouteController::new(&state);
    Ok(Json(controller.list_by_request(request_id).await?))
}
