//! Dobles de colaboradores para los tests de servicios

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::Mutex;

use crate::clients::{
    BillingService, ClientError, ClientResult, CompletionReport, Container, DwellRecord, DwellRecordRequest,
    Invoice, MappingProvider, OfflineMapping, RequestRegistry, ShipmentRequest,
};
use crate::models::Coordinates;

/// Misma distancia para cualquier par; geocodifica con el nomenclátor offline
pub struct FixedDistanceMapping {
    km: f64,
}

impl FixedDistanceMapping {
    pub fn new(km: f64) -> Self {
        Self { km }
    }
}

#[async_trait]
impl MappingProvider for FixedDistanceMapping {
    async fn distance_km(&self, _origin: &str, _destination: &str) -> ClientResult<f64> {
        Ok(self.km)
    }

    async fn geocode(&self, address: &str) -> ClientResult<Option<Coordinates>> {
        OfflineMapping.geocode(address).await
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    requests: Mutex<HashMap<i64, ShipmentRequest>>,
    pub status_updates: Mutex<Vec<(i64, String)>>,
    pub completions: Mutex<Vec<(i64, CompletionReport)>>,
    pub unreachable: AtomicBool,
}

impl FakeRegistry {
    pub async fn add_request(&self, id: i64, container_id: i64, weight_kg: f64, volume_m3: f64) {
        self.requests.lock().await.insert(
            id,
            ShipmentRequest {
                id,
                origin_address: Some("Buenos Aires".to_string()),
                destination_address: Some("Mendoza".to_string()),
                status: Some("PROGRAMADA".to_string()),
                container: Some(Container {
                    id: container_id,
                    weight_kg,
                    volume_m3,
                }),
            },
        );
    }

    fn check_reachable(&self) -> ClientResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("registry down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RequestRegistry for FakeRegistry {
    async fn fetch_request(&self, request_id: i64) -> ClientResult<ShipmentRequest> {
        self.check_reachable()?;
        self.requests
            .lock()
            .await
            .get(&request_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("request {}", request_id)))
    }

    async fn update_status(&self, request_id: i64, status: &str, _idempotency_key: &str) -> ClientResult<()> {
        self.check_reachable()?;
        self.status_updates.lock().await.push((request_id, status.to_string()));
        Ok(())
    }

    async fn complete_request(
        &self,
        request_id: i64,
        completion: &CompletionReport,
        _idempotency_key: &str,
    ) -> ClientResult<()> {
        self.check_reachable()?;
        self.completions.lock().await.push((request_id, completion.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBilling {
    next_id: AtomicI64,
    pub opened: Mutex<Vec<DwellRecordRequest>>,
    pub closed: Mutex<Vec<i64>>,
    pub invoices: Mutex<Vec<i64>>,
    pub unreachable: AtomicBool,
}

impl FakeBilling {
    fn check_reachable(&self) -> ClientResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 503,
                body: "billing down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BillingService for FakeBilling {
    async fn open_dwell(&self, request: &DwellRecordRequest, _idempotency_key: &str) -> ClientResult<DwellRecord> {
        self.check_reachable()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 100;
        self.opened.lock().await.push(request.clone());
        Ok(DwellRecord {
            id,
            container_id: Some(request.container_id),
            deposit_id: Some(request.deposit_id),
            status: Some("OPEN".to_string()),
        })
    }

    async fn close_dwell(&self, dwell_record_id: i64, _idempotency_key: &str) -> ClientResult<DwellRecord> {
        self.check_reachable()?;
        self.closed.lock().await.push(dwell_record_id);
        Ok(DwellRecord {
            id: dwell_record_id,
            container_id: None,
            deposit_id: None,
            status: Some("CLOSED".to_string()),
        })
    }

    async fn generate_invoice(&self, request_id: i64, _idempotency_key: &str) -> ClientResult<Invoice> {
        self.check_reachable()?;
        self.invoices.lock().await.push(request_id);
        Ok(Invoice {
            id: request_id * 10,
            request_id: Some(request_id),
            invoice_number: Some(format!("F-{}", request_id)),
            total: None,
            status: Some("PENDIENTE".to_string()),
        })
    }
}
