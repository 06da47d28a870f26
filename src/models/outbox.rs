//! Modelo del outbox de la saga
//!
//! Cada efecto secundario de una transición de tramo se persiste como un
//! mensaje con clave de idempotencia. El despachador lo ejecuta y reintenta
//! hasta completarlo o agotar los intentos.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del mensaje - mapea al ENUM outbox_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "outbox_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    Pending,
    Done,
    Failed,
}

/// Paso de la saga a ejecutar contra un colaborador
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum SagaStep {
    /// Primer tramo iniciado: la solicitud pasa a IN_TRANSIT
    MarkInTransit,
    /// Tramo finalizado en un depósito: abrir estadía
    DepositCheckIn {
        leg_id: Uuid,
        deposit_id: Uuid,
        daily_cost: Decimal,
    },
    /// Tramo iniciado desde un depósito: cerrar la estadía abierta por el tramo anterior
    DepositCheckOut { leg_id: Uuid, inbound_leg_id: Uuid },
    /// Todos los tramos finalizados: informar costo y tiempo reales
    CompleteShipment { real_cost: Decimal, real_hours: f64 },
    /// Solicitar la factura una vez completada la solicitud
    GenerateInvoice,
}

impl SagaStep {
    /// Clave determinística: el mismo efecto nunca se encola dos veces
    pub fn idempotency_key(&self, request_id: i64) -> String {
        match self {
            SagaStep::MarkInTransit => format!("in-transit:{}", request_id),
            SagaStep::DepositCheckIn { leg_id, .. } => format!("checkin:{}", leg_id),
            SagaStep::DepositCheckOut { leg_id, .. } => format!("checkout:{}", leg_id),
            SagaStep::CompleteShipment { .. } => format!("complete:{}", request_id),
            SagaStep::GenerateInvoice => format!("invoice:{}", request_id),
        }
    }

    /// Nombre corto para logs y métricas
    pub fn name(&self) -> &'static str {
        match self {
            SagaStep::MarkInTransit => "mark_in_transit",
            SagaStep::DepositCheckIn { .. } => "deposit_check_in",
            SagaStep::DepositCheckOut { .. } => "deposit_check_out",
            SagaStep::CompleteShipment { .. } => "complete_shipment",
            SagaStep::GenerateInvoice => "generate_invoice",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxMessage {
    pub id: Uuid,
    pub idempotency_key: String,
    pub request_id: i64,
    pub step: SagaStep,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    pub fn new(request_id: i64, step: SagaStep) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            idempotency_key: step.idempotency_key(request_id),
            request_id,
            step,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: now,
            created_at: now,
            completed_at: None,
        }
    }
}

/// Fila de la tabla saga_outbox
#[derive(Debug, Clone, FromRow)]
pub struct OutboxRow {
    pub id: Uuid,
    pub idempotency_key: String,
    pub request_id: i64,
    pub step: Json<SagaStep>,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for OutboxMessage {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: row.id,
            idempotency_key: row.idempotency_key,
            request_id: row.request_id,
            step: row.step.0,
            status: row.status,
            attempts: row.attempts,
            last_error: row.last_error,
            next_attempt_at: row.next_attempt_at,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_keys() {
        let leg_id = Uuid::nil();
        assert_eq!(SagaStep::MarkInTransit.idempotency_key(7), "in-transit:7");
        assert_eq!(SagaStep::GenerateInvoice.idempotency_key(7), "invoice:7");
        assert_eq!(
            SagaStep::DepositCheckOut { leg_id, inbound_leg_id: leg_id }.idempotency_key(7),
            format!("checkout:{}", leg_id)
        );
    }

    #[test]
    fn test_step_json_shape() {
        let step = SagaStep::CompleteShipment {
            real_cost: Decimal::from(100),
            real_hours: 2.5,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "COMPLETE_SHIPMENT");
        assert_eq!(json["realHours"], 2.5);

        let back: SagaStep = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }
}
