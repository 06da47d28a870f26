//! Proveedor de mapas
//!
//! `GoogleMapsClient` consulta Distance Matrix y Geocoding. `OfflineMapping`
//! no sale a la red: las distancias quedan "no disponibles" (el estimador
//! usa su tabla) y la geocodificación responde desde un nomenclátor fijo.

use async_trait::async_trait;
use serde::Deserialize;

use super::{error_for_status, ClientError, ClientResult, MappingProvider};
use crate::models::Coordinates;
use crate::utils::money::round2;

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    #[serde(default)]
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    distance: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
    value: u64, // metros
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

/// Cliente de Google Maps (Distance Matrix + Geocoding)
pub struct GoogleMapsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleMapsClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl MappingProvider for GoogleMapsClient {
    async fn distance_km(&self, origin: &str, destination: &str) -> ClientResult<f64> {
        log::info!("🗺️ Distance Matrix: {} → {}", origin, destination);

        let url = format!(
            "{}/maps/api/distancematrix/json?origins={}&destinations={}&units=metric&key={}",
            self.base_url,
            urlencoding::encode(origin),
            urlencoding::encode(destination),
            urlencoding::encode(&self.api_key)
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(response, "distancematrix").await);
        }

        let body: DistanceMatrixResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if body.status != "OK" {
            return Err(ClientError::Unavailable(format!(
                "status {} ({})",
                body.status,
                body.error_message.unwrap_or_default()
            )));
        }

        let element = body
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(|| ClientError::Decode("respuesta sin filas ni elementos".to_string()))?;

        if element.status != "OK" {
            return Err(ClientError::Unavailable(format!("element status {}", element.status)));
        }

        let distance = element
            .distance
            .as_ref()
            .ok_or_else(|| ClientError::Decode("elemento sin distancia".to_string()))?;

        let km = round2(distance.value as f64 / 1000.0);
        log::info!("✅ Distancia de Google Maps: {} km ({})", km, distance.text);
        Ok(km)
    }

    async fn geocode(&self, address: &str) -> ClientResult<Option<Coordinates>> {
        log::info!("🗺️ Geocoding address: {}", address);

        let url = format!(
            "{}/maps/api/geocode/json?address={}&key={}",
            self.base_url,
            urlencoding::encode(address),
            urlencoding::encode(&self.api_key)
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(response, "geocode").await);
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        match body.status.as_str() {
            "OK" => Ok(body.results.first().map(|r| {
                Coordinates::new(r.geometry.location.lat, r.geometry.location.lng)
            })),
            "ZERO_RESULTS" => {
                log::warn!("⚠️ Sin resultados de geocoding para: {}", address);
                Ok(None)
            }
            other => Err(ClientError::Unavailable(format!(
                "geocode status {} ({})",
                other,
                body.error_message.unwrap_or_default()
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "google_maps"
    }
}

/// Nomenclátor de las ciudades de la tabla de distancias
const GAZETTEER: &[(&str, f64, f64)] = &[
    ("buenos aires", -34.6037, -58.3816),
    ("cordoba", -31.4201, -64.1888),
    ("rosario", -32.9442, -60.6505),
    ("mendoza", -32.8895, -68.8458),
    ("salta", -24.7821, -65.4232),
    ("bariloche", -41.1335, -71.3103),
    ("neuquen", -38.9516, -68.0591),
];

/// Proveedor sin red, usado cuando no hay API key configurada
#[derive(Debug, Default, Clone)]
pub struct OfflineMapping;

#[async_trait]
impl MappingProvider for OfflineMapping {
    async fn distance_km(&self, _origin: &str, _destination: &str) -> ClientResult<f64> {
        Err(ClientError::Unavailable("sin proveedor de mapas configurado".to_string()))
    }

    async fn geocode(&self, address: &str) -> ClientResult<Option<Coordinates>> {
        let normalized = normalize_place(address);
        Ok(GAZETTEER
            .iter()
            .find(|(city, _, _)| normalized.contains(city))
            .map(|(_, lat, lon)| Coordinates::new(*lat, *lon)))
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

/// Normalizar un nombre de lugar: minúsculas, sin acentos, sin ", argentina"
/// y con espacios colapsados
pub fn normalize_place(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect();

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .strip_suffix(", argentina")
        .or_else(|| collapsed.strip_suffix(" argentina"))
        .unwrap_or(&collapsed)
        .trim_end_matches(',')
        .trim()
        .to_string()
}
