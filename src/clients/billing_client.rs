//! Cliente HTTP del servicio de facturación

use async_trait::async_trait;

use super::{
    error_for_status, BillingService, ClientError, ClientResult, DwellRecord, DwellRecordRequest, Invoice,
};

pub struct HttpBillingClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBillingClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response, resource: &str) -> ClientResult<T> {
        if !response.status().is_success() {
            return Err(error_for_status(response, resource).await);
        }
        response.json::<T>().await.map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BillingService for HttpBillingClient {
    async fn open_dwell(&self, request: &DwellRecordRequest, idempotency_key: &str) -> ClientResult<DwellRecord> {
        log::info!(
            "📦 Registrando entrada del contenedor {} al depósito {}",
            request.container_id,
            request.deposit_id
        );

        let response = self
            .client
            .post(self.url("/api/dwell-records"))
            .header("Idempotency-Key", idempotency_key)
            .json(request)
            .send()
            .await?;

        Self::decode(response, "dwell-records").await
    }

    async fn close_dwell(&self, dwell_record_id: i64, idempotency_key: &str) -> ClientResult<DwellRecord> {
        log::info!("📦 Registrando salida de la estadía {}", dwell_record_id);

        let response = self
            .client
            .post(self.url(&format!("/api/dwell-records/{}/close", dwell_record_id)))
            .header("Idempotency-Key", idempotency_key)
            .send()
            .await?;

        Self::decode(response, &format!("dwell-record {}", dwell_record_id)).await
    }

    async fn generate_invoice(&self, request_id: i64, idempotency_key: &str) -> ClientResult<Invoice> {
        log::info!("🧾 Solicitando factura para la solicitud {}", request_id);

        let response = self
            .client
            .post(self.url(&format!("/api/invoices/generate?requestId={}", request_id)))
            .header("Idempotency-Key", idempotency_key)
            .send()
            .await?;

        Self::decode(response, &format!("invoice for request {}", request_id)).await
    }
}
