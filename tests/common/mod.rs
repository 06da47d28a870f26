//! Utilidades compartidas por los tests de integración

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

use freight_logistics::build_router;
use freight_logistics::clients::{
    BillingService, ClientError, ClientResult, CompletionReport, Container, DwellRecord, DwellRecordRequest, Invoice,
    OfflineMapping, RequestRegistry, ShipmentRequest,
};
use freight_logistics::config::EnvironmentConfig;
use freight_logistics::repositories::InMemoryStore;
use freight_logistics::state::{AppState, Collaborators, Repositories};

#[derive(Default)]
pub struct StubRegistry {
    requests: Mutex<HashMap<i64, ShipmentRequest>>,
    pub status_updates: Mutex<Vec<(i64, String)>>,
    pub completions: Mutex<Vec<(i64, CompletionReport)>>,
    pub unreachable: AtomicBool,
}

impl StubRegistry {
    pub async fn add_request(&self, id: i64, weight_kg: f64, volume_m3: f64) {
        self.requests.lock().await.insert(
            id,
            ShipmentRequest {
                id,
                origin_address: Some("Buenos Aires".to_string()),
                destination_address: Some("Mendoza".to_string()),
                status: Some("PROGRAMADA".to_string()),
                container: Some(Container {
                    id: id * 100,
                    weight_kg,
                    volume_m3,
                }),
            },
        );
    }

    fn check(&self) -> ClientResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("registry down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RequestRegistry for StubRegistry {
    async fn fetch_request(&self, request_id: i64) -> ClientResult<ShipmentRequest> {
        self.check()?;
        self.requests
            .lock()
            .await
            .get(&request_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("request {}", request_id)))
    }

    async fn update_status(&self, request_id: i64, status: &str, _idempotency_key: &str) -> ClientResult<()> {
        self.check()?;
        self.status_updates.lock().await.push((request_id, status.to_string()));
        Ok(())
    }

    async fn complete_request(
        &self,
        request_id: i64,
        completion: &CompletionReport,
        _idempotency_key: &str,
    ) -> ClientResult<()> {
        self.check()?;
        self.completions.lock().await.push((request_id, completion.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct StubBilling {
    next_id: AtomicI64,
    pub closed: Mutex<Vec<i64>>,
    pub invoices: Mutex<Vec<i64>>,
    pub unreachable: AtomicBool,
}

impl StubBilling {
    fn check(&self) -> ClientResult<()> {
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
impl BillingService for StubBilling {
    async fn open_dwell(&self, request: &DwellRecordRequest, _idempotency_key: &str) -> ClientResult<DwellRecord> {
        self.check()?;
        Ok(DwellRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            container_id: Some(request.container_id),
            deposit_id: Some(request.deposit_id),
            status: Some("OPEN".to_string()),
        })
    }

    async fn close_dwell(&self, dwell_record_id: i64, _idempotency_key: &str) -> ClientResult<DwellRecord> {
        self.check()?;
        self.closed.lock().await.push(dwell_record_id);
        Ok(DwellRecord {
            id: dwell_record_id,
            container_id: None,
            deposit_id: None,
            status: Some("CLOSED".to_string()),
        })
    }

    async fn generate_invoice(&self, request_id: i64, _idempotency_key: &str) -> ClientResult<Invoice> {
        self.check()?;
        self.invoices.lock().await.push(request_id);
        Ok(Invoice {
            id: request_id,
            request_id: Some(request_id),
            invoice_number: Some(format!("F-{:05}", request_id)),
            total: None,
            status: Some("PENDIENTE".to_string()),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub registry: Arc<StubRegistry>,
    pub billing: Arc<StubBilling>,
}

/// App completa sobre el store sembrado y el proveedor de mapas offline
pub fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::seeded());
    let registry = Arc::new(StubRegistry::default());
    let billing = Arc::new(StubBilling::default());

    let state = AppState::new(
        EnvironmentConfig::default(),
        Repositories::in_memory(store.clone()),
        Collaborators {
            mapping: Arc::new(OfflineMapping),
            registry: registry.clone(),
            billing: billing.clone(),
            distance_cache: None,
        },
    );

    TestApp {
        router: build_router(state),
        store,
        registry,
        billing,
    }
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
