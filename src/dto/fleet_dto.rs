use serde::Deserialize;

// Query de vehículos disponibles con capacidad suficiente
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVehiclesQuery {
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub volume_m3: f64,
}
