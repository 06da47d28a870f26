use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::fleet_controller::FleetController;
use crate::dto::fleet_dto::AvailableVehiclesQuery;
use crate::dto::ApiResponse;
use crate::models::{Deposit, Driver, Vehicle};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles))
        .route("/available", get(list_available_vehicles))
}

pub fn create_driver_router() -> Router<AppState> {
    Router::new().route("/", get(list_drivers))
}

pub fn create_deposit_router() -> Router<AppState> {
    Router::new().route("/", get(list_deposits))
}

async fn list_vehicles(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let controller = FleetController::new(&state);
    Ok(Json(controller.list_vehicles().await?))
}

async fn list_available_vehicles(
    State(state): State<AppState>,
    Query(query): Query<AvailableVehiclesQuery>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let controller = FleetController::new(&state);
    Ok(Json(controller.list_available_vehicles(query).await?))
}

async fn list_drivers(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Driver>>>, AppError> {
    let controller = FleetController::new(&state);
    Ok(Json(controller.list_drivers().await?))
}

async fn list_deposits(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Deposit>>>, AppError> {
    let controller = FleetController::new(&state);
    Ok(Json(controller.list_deposits().await?))
}
