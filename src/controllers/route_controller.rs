use uuid::Uuid;
use validator::Validate;

use crate::dto::route_dto::{AssignRouteRequest, AssignedRouteResponse, GenerateCandidatesRequest};
use crate::dto::ApiResponse;
use crate::models::Route;
use crate::services::{CandidateRequest, RouteLifecycle, RoutePlanner};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct RouteController {
    planner: RoutePlanner,
    lifecycle: RouteLifecycle,
}

impl RouteController {
    pub fn new(state: &AppState) -> Self {
        Self {
            planner: state.planner.clone(),
            lifecycle: state.routes.clone(),
        }
    }

    pub async fn generate_candidates(
        &self,
        request: GenerateCandidatesRequest,
    ) -> Result<ApiResponse<Vec<Route>>, AppError> {
        request.validate()?;

        let candidate: CandidateRequest = request.into();
        let candidates = self.planner.generate_candidates(&candidate).await?;
        let message = format!("{} rutas tentativas calculadas", candidates.len());
        Ok(ApiResponse::success_with_message(candidates, message))
    }

    pub async fn assign(
        &self,
        route_id: Uuid,
        request: AssignRouteRequest,
    ) -> Result<ApiResponse<AssignedRouteResponse>, AppError> {
        request.validate()?;

        let (route, legs) = self.lifecycle.assign(route_id, request.request_id).await?;
        Ok(ApiResponse::success_with_message(
            AssignedRouteResponse { route, legs },
            "Ruta asignada exitosamente",
        ))
    }

    pub async fn get(&self, route_id: Uuid) -> Result<ApiResponse<Route>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.get(route_id).await?))
    }

    pub async fn list_all(&self) -> Result<ApiResponse<Vec<Route>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.list_all().await?))
    }

    pub async fn list_by_request(&self, request_id: i64) -> Result<ApiResponse<Vec<Route>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.list_by_request(request_id).await?))
    }
}
