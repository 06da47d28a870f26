//! Saga de envío sobre un outbox durable
//!
//! Las transiciones de tramo encolan pasos con clave de idempotencia. Cada
//! paso se ejecuta una vez en línea y, si falla, el despachador en segundo
//! plano lo reintenta con backoff exponencial hasta agotar los intentos.
//! Ningún fallo de la saga revierte ni bloquea la transición que lo originó.

use chrono::{Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::{BillingService, ClientError, CompletionReport, DwellRecordRequest, RequestRegistry};
use crate::metrics::SAGA_STEPS;
use crate::models::{OutboxMessage, SagaStep};
use crate::repositories::{LegRepository, OutboxRepository};
use crate::utils::AppError;

const BACKOFF_BASE_SECS: f64 = 5.0;
const BACKOFF_CAP_SECS: f64 = 600.0;
const BACKOFF_JITTER: f64 = 0.2;
const CLAIM_LEASE_SECS: i64 = 60;
const DISPATCH_BATCH: i64 = 50;

/// Estado de la solicitud informado al iniciar el primer tramo
pub const IN_TRANSIT_STATUS: &str = "IN_TRANSIT";

#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] AppError),

    #[error("{0}")]
    NotReady(String),
}

/// Resultado de una pasada del despachador
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub done: usize,
    pub retried: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.done += other.done;
        self.retried += other.retried;
        self.failed += other.failed;
    }
}

#[derive(Clone)]
pub struct ShipmentSaga {
    outbox: Arc<dyn OutboxRepository>,
    legs: Arc<dyn LegRepository>,
    registry: Arc<dyn RequestRegistry>,
    billing: Arc<dyn BillingService>,
    max_attempts: i32,
}

impl ShipmentSaga {
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        legs: Arc<dyn LegRepository>,
        registry: Arc<dyn RequestRegistry>,
        billing: Arc<dyn BillingService>,
        max_attempts: i32,
    ) -> Self {
        Self {
            outbox,
            legs,
            registry,
            billing,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Encolar un paso. Devuelve el id si se insertó, `None` si la clave ya existía.
    pub async fn enqueue(&self, request_id: i64, step: SagaStep) -> Result<Option<Uuid>, AppError> {
        let message = OutboxMessage::new(request_id, step);
        if self.outbox.enqueue(&message).await? {
            debug!("📨 Paso {} encolado ({})", message.step.name(), message.idempotency_key);
            Ok(Some(message.id))
        } else {
            debug!("↩️ Paso ya encolado: {}", message.idempotency_key);
            Ok(None)
        }
    }

    pub async fn list_by_request(&self, request_id: i64) -> Result<Vec<OutboxMessage>, AppError> {
        self.outbox.list_by_request(request_id).await
    }

    /// Ejecutar en línea los mensajes recién encolados
    pub async fn dispatch_ids(&self, ids: &[Uuid]) -> DispatchReport {
        let mut queue: VecDeque<Uuid> = ids.iter().copied().collect();
        let mut report = DispatchReport::default();

        while let Some(id) = queue.pop_front() {
            let now = Utc::now();
            match self.outbox.claim(id, now, now + Duration::seconds(CLAIM_LEASE_SECS)).await {
                Ok(Some(message)) => {
                    let (outcome, follow_up) = self.execute(message).await;
                    report.merge(outcome);
                    queue.extend(follow_up);
                }
                Ok(None) => debug!("Mensaje {} tomado por otro despachador", id),
                Err(e) => error!("❌ No se pudo tomar el mensaje {}: {}", id, e),
            }
        }
        report
    }

    /// Una pasada sobre los mensajes vencidos
    pub async fn dispatch_pending(&self) -> Result<DispatchReport, AppError> {
        let now = Utc::now();
        let due = self
            .outbox
            .claim_due(now, now + Duration::seconds(CLAIM_LEASE_SECS), DISPATCH_BATCH)
            .await?;

        let mut report = DispatchReport::default();
        let mut follow_ups = Vec::new();
        for message in due {
            let (outcome, follow_up) = self.execute(message).await;
            report.merge(outcome);
            follow_ups.extend(follow_up);
        }
        report.merge(self.dispatch_ids(&follow_ups).await);

        if report != DispatchReport::default() {
            info!(
                "📬 Outbox: {} completados, {} reintentos, {} fallidos",
                report.done, report.retried, report.failed
            );
        }
        Ok(report)
    }

    async fn execute(&self, message: OutboxMessage) -> (DispatchReport, Vec<Uuid>) {
        let attempts = message.attempts + 1;
        let step_name = message.step.name();
        let mut report = DispatchReport::default();

        match self.run_step(&message).await {
            Ok(follow_up) => {
                SAGA_STEPS.with_label_values(&[step_name, "done"]).inc();
                info!("✅ Paso {} completado ({})", step_name, message.idempotency_key);
                if let Err(e) = self.outbox.mark_done(message.id, attempts, Utc::now()).await {
                    error!("❌ No se pudo cerrar el mensaje {}: {}", message.id, e);
                }
                report.done = 1;

                let mut ids = Vec::new();
                if let Some(step) = follow_up {
                    match self.enqueue(message.request_id, step).await {
                        Ok(Some(id)) => ids.push(id),
                        Ok(None) => {}
                        Err(e) => error!("❌ No se pudo encolar el paso siguiente: {}", e),
                    }
                }
                (report, ids)
            }
            Err(e) if attempts >= self.max_attempts => {
                SAGA_STEPS.with_label_values(&[step_name, "failed"]).inc();
                error!(
                    "💀 Paso {} descartado tras {} intentos ({}): {}",
                    step_name, attempts, message.idempotency_key, e
                );
                if let Err(store) = self.outbox.mark_failed(message.id, attempts, &e.to_string()).await {
                    error!("❌ No se pudo marcar el mensaje {}: {}", message.id, store);
                }
                report.failed = 1;
                (report, Vec::new())
            }
            Err(e) => {
                SAGA_STEPS.with_label_values(&[step_name, "retry"]).inc();
                let next_attempt_at = Utc::now() + backoff_delay(attempts);
                warn!(
                    "⚠️ Paso {} falló (intento {}/{}), reintento a las {}: {}",
                    step_name, attempts, self.max_attempts, next_attempt_at, e
                );
                if let Err(store) = self
                    .outbox
                    .mark_retry(message.id, attempts, &e.to_string(), next_attempt_at)
                    .await
                {
                    error!("❌ No se pudo reprogramar el mensaje {}: {}", message.id, store);
                }
                report.retried = 1;
                (report, Vec::new())
            }
        }
    }

    /// Ejecutar el efecto remoto; devuelve el paso siguiente si lo hay
    async fn run_step(&self, message: &OutboxMessage) -> Result<Option<SagaStep>, StepError> {
        let key = message.idempotency_key.as_str();
        let request_id = message.request_id;

        match &message.step {
            SagaStep::MarkInTransit => {
                self.registry.update_status(request_id, IN_TRANSIT_STATUS, key).await?;
                Ok(None)
            }
            SagaStep::DepositCheckIn {
                leg_id,
                deposit_id,
                daily_cost,
            } => {
                let leg = self
                    .legs
                    .find_by_id(*leg_id)
                    .await?
                    .ok_or_else(|| StepError::NotReady(format!("leg {} not found", leg_id)))?;
                if leg.dwell_record_id.is_some() {
                    return Ok(None);
                }

                let container_id = self.container_id(request_id).await?;
                info!("📥 Registrando ENTRADA a depósito {} para contenedor {}", deposit_id, container_id);
                let dwell = self
                    .billing
                    .open_dwell(
                        &DwellRecordRequest {
                            container_id,
                            deposit_id: *deposit_id,
                            daily_cost: *daily_cost,
                        },
                        key,
                    )
                    .await?;
                self.legs.set_dwell_record(*leg_id, dwell.id).await?;
                info!("✅ Estadía {} abierta en el tramo {}", dwell.id, leg_id);
                Ok(None)
            }
            SagaStep::DepositCheckOut { leg_id, inbound_leg_id } => {
                let inbound = self
                    .legs
                    .find_by_id(*inbound_leg_id)
                    .await?
                    .ok_or_else(|| StepError::NotReady(format!("inbound leg {} not found", inbound_leg_id)))?;
                if inbound.dwell_closed_at.is_some() {
                    return Ok(None);
                }
                let dwell_record_id = inbound.dwell_record_id.ok_or_else(|| {
                    StepError::NotReady(format!("no open dwell record on leg {} yet", inbound_leg_id))
                })?;

                info!("📤 Registrando SALIDA de la estadía {} (tramo {})", dwell_record_id, leg_id);
                self.billing.close_dwell(dwell_record_id, key).await?;
                self.legs.mark_dwell_closed(*inbound_leg_id, Utc::now()).await?;
                Ok(None)
            }
            SagaStep::CompleteShipment { real_cost, real_hours } => {
                let report = CompletionReport {
                    real_cost: *real_cost,
                    real_hours: *real_hours,
                };
                self.registry.complete_request(request_id, &report, key).await?;
                info!(
                    "✅ Solicitud {} finalizada. Costo real: ${}, Tiempo real: {} horas",
                    request_id, real_cost, real_hours
                );
                Ok(Some(SagaStep::GenerateInvoice))
            }
            SagaStep::GenerateInvoice => {
                let invoice = self.billing.generate_invoice(request_id, key).await?;
                info!(
                    "💰 Factura generada para solicitud {}: {}",
                    request_id,
                    invoice.invoice_number.as_deref().unwrap_or("-")
                );
                Ok(None)
            }
        }
    }

    async fn container_id(&self, request_id: i64) -> Result<i64, StepError> {
        let request = self.registry.fetch_request(request_id).await?;
        request
            .container
            .map(|c| c.id)
            .ok_or_else(|| StepError::NotReady(format!("request {} has no container", request_id)))
    }
}

/// Demora base antes del intento `attempts + 1`: 5 s, 10 s, 20 s… hasta 10 min
pub fn base_backoff_secs(attempts: i32) -> f64 {
    let exponent = (attempts.max(1) - 1).min(16);
    (BACKOFF_BASE_SECS * 2f64.powi(exponent)).min(BACKOFF_CAP_SECS)
}

/// Demora con ±20% de jitter
pub fn backoff_delay(attempts: i32) -> Duration {
    let jitter = rand::thread_rng().gen_range(1.0 - BACKOFF_JITTER..=1.0 + BACKOFF_JITTER);
    Duration::milliseconds((base_backoff_secs(attempts) * jitter * 1000.0) as i64)
}

/// Despachador en segundo plano del outbox
pub fn spawn_dispatcher(saga: ShipmentSaga, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("📬 Despachador del outbox cada {:?}", every);
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = saga.dispatch_pending().await {
                error!("❌ Error en la pasada del outbox: {}", e);
            }
        }
    })
}
