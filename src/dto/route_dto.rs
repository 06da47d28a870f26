use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Leg, Route};
use crate::services::route_planner::CandidateRequest;

// Request para calcular rutas tentativas de una solicitud
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCandidatesRequest {
    #[validate(range(min = 1))]
    pub request_id: i64,

    #[validate(length(min = 1, max = 500))]
    pub origin_address: String,

    #[validate(length(min = 1, max = 500))]
    pub destination_address: String,

    // > 0 lo valida el planificador
    pub weight_kg: f64,

    pub volume_m3: f64,
}

impl From<GenerateCandidatesRequest> for CandidateRequest {
    fn from(request: GenerateCandidatesRequest) -> Self {
        Self {
            request_id: request.request_id,
            origin_address: request.origin_address.trim().to_string(),
            destination_address: request.destination_address.trim().to_string(),
            weight_kg: request.weight_kg,
            volume_m3: request.volume_m3,
        }
    }
}

// Request para asignar una ruta candidata
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRouteRequest {
    #[validate(range(min = 1))]
    pub request_id: i64,
}

// Ruta asignada con sus tramos materializados
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedRouteResponse {
    pub route: Route,
    pub legs: Vec<Leg>,
}
