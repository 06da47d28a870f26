//! Clients - HTTP clients para los colaboradores externos
//!
//! El núcleo sólo conoce estos traits. Las implementaciones HTTP viven en los
//! submódulos; los tests usan dobles en memoria.

pub mod billing_client;
pub mod maps_client;
pub mod request_registry_client;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Coordinates;

pub use billing_client::HttpBillingClient;
pub use maps_client::{GoogleMapsClient, OfflineMapping};
pub use request_registry_client::HttpRequestRegistry;

/// Errores de un colaborador externo
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Proveedor de distancias y geocodificación
#[async_trait]
pub trait MappingProvider: Send + Sync {
    /// Distancia por carretera en km (ya redondeada a 2 decimales)
    async fn distance_km(&self, origin: &str, destination: &str) -> ClientResult<f64>;

    /// Coordenadas de una dirección, `None` si no hay resultado
    async fn geocode(&self, address: &str) -> ClientResult<Option<Coordinates>>;

    fn name(&self) -> &'static str;
}

/// Registro de solicitudes de envío
#[async_trait]
pub trait RequestRegistry: Send + Sync {
    async fn fetch_request(&self, request_id: i64) -> ClientResult<ShipmentRequest>;

    async fn update_status(&self, request_id: i64, status: &str, idempotency_key: &str) -> ClientResult<()>;

    async fn complete_request(
        &self,
        request_id: i64,
        completion: &CompletionReport,
        idempotency_key: &str,
    ) -> ClientResult<()>;
}

/// Servicio de facturación: estadías en depósito y facturas
#[async_trait]
pub trait BillingService: Send + Sync {
    async fn open_dwell(&self, request: &DwellRecordRequest, idempotency_key: &str) -> ClientResult<DwellRecord>;

    async fn close_dwell(&self, dwell_record_id: i64, idempotency_key: &str) -> ClientResult<DwellRecord>;

    async fn generate_invoice(&self, request_id: i64, idempotency_key: &str) -> ClientResult<Invoice>;
}

/// Solicitud de envío tal como la expone el registro
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRequest {
    pub id: i64,
    pub origin_address: Option<String>,
    pub destination_address: Option<String>,
    pub status: Option<String>,
    pub container: Option<Container>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: i64,
    pub weight_kg: f64,
    pub volume_m3: f64,
}

/// Costo y tiempo reales informados al completar la solicitud
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub real_cost: Decimal,
    pub real_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DwellRecordRequest {
    pub container_id: i64,
    pub deposit_id: Uuid,
    pub daily_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DwellRecord {
    pub id: i64,
    #[serde(default)]
    pub container_id: Option<i64>,
    #[serde(default)]
    pub deposit_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    #[serde(default)]
    pub request_id: Option<i64>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Construir el cliente reqwest compartido por los colaboradores
pub fn build_http_client(timeout_secs: u64) -> ClientResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(concat!("freight-logistics/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Convertir una respuesta no exitosa en `ClientError`
pub(crate) async fn error_for_status(response: reqwest::Response, resource: &str) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        ClientError::NotFound(resource.to_string())
    } else {
        ClientError::Status {
            status: status.as_u16(),
            body,
        }
    }
}
