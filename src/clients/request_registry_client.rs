//! Cliente HTTP del registro de solicitudes

use async_trait::async_trait;
use serde_json::json;

use super::{error_for_status, ClientError, ClientResult, CompletionReport, RequestRegistry, ShipmentRequest};

pub struct HttpRequestRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRequestRegistry {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RequestRegistry for HttpRequestRegistry {
    async fn fetch_request(&self, request_id: i64) -> ClientResult<ShipmentRequest> {
        log::debug!("📥 Consultando solicitud {} en el registro", request_id);

        let response = self
            .client
            .get(self.url(&format!("/api/requests/{}", request_id)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("request {}", request_id)).await);
        }

        response
            .json::<ShipmentRequest>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn update_status(&self, request_id: i64, status: &str, idempotency_key: &str) -> ClientResult<()> {
        log::info!("📤 Solicitud {} → {}", request_id, status);

        let response = self
            .client
            .post(self.url(&format!("/api/requests/{}/status", request_id)))
            .header("Idempotency-Key", idempotency_key)
            .json(&json!({ "status": status }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("request {}", request_id)).await);
        }
        Ok(())
    }

    async fn complete_request(
        &self,
        request_id: i64,
        completion: &CompletionReport,
        idempotency_key: &str,
    ) -> ClientResult<()> {
        log::info!(
            "🏁 Completando solicitud {}: costo real {} / {} hs",
            request_id,
            completion.real_cost,
            completion.real_hours
        );

        let response = self
            .client
            .post(self.url(&format!("/api/requests/{}/complete", request_id)))
            .header("Idempotency-Key", idempotency_key)
            .json(completion)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("request {}", request_id)).await);
        }
        Ok(())
    }
}
