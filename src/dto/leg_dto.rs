use serde::Deserialize;
use uuid::Uuid;

// Request para asignar vehículo y transportista a un tramo
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignResourcesRequest {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
}
