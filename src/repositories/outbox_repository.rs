use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::OutboxRepository;
use crate::models::outbox::OutboxRow;
use crate::models::OutboxMessage;
use crate::utils::AppResult;

const OUTBOX_COLUMNS: &str = r#"
    id, idempotency_key, request_id, step, status, attempts, last_error,
    next_attempt_at, created_at, completed_at
"#;

pub struct PgOutboxRepository {
    pool: PgPool,
}

impl PgOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insertar un mensaje con el ejecutor dado (pool o transacción abierta).
/// `false` si la clave de idempotencia ya existía.
pub(crate) async fn insert_message<'e, E>(executor: E, message: &OutboxMessage) -> AppResult<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO saga_outbox (id, idempotency_key, request_id, step, status, attempts,
                                 next_attempt_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (idempotency_key) DO NOTHING
        "#,
    )
    .bind(message.id)
    .bind(&message.idempotency_key)
    .bind(message.request_id)
    .bind(Json(message.step.clone()))
    .bind(message.status)
    .bind(message.attempts)
    .bind(message.next_attempt_at)
    .bind(message.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl OutboxRepository for PgOutboxRepository {
    async fn enqueue(&self, message: &OutboxMessage) -> AppResult<bool> {
        insert_message(&self.pool, message).await
    }

    async fn find_by_key(&self, idempotency_key: &str) -> AppResult<Option<OutboxMessage>> {
        let row = sqlx::query_as::<_, OutboxRow>(&format!(
            "SELECT {} FROM saga_outbox WHERE idempotency_key = $1",
            OUTBOX_COLUMNS
        ))
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OutboxMessage::from))
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>, lease_until: DateTime<Utc>) -> AppResult<Option<OutboxMessage>> {
        let row = sqlx::query_as::<_, OutboxRow>(&format!(
            r#"
            UPDATE saga_outbox SET next_attempt_at = $3
            WHERE id = $1 AND status = 'PENDING' AND next_attempt_at <= $2
            RETURNING {}
            "#,
            OUTBOX_COLUMNS
        ))
        .bind(id)
        .bind(now)
        .bind(lease_until)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OutboxMessage::from))
    }

    async fn claim_due(&self, now: DateTime<Utc>, lease_until: DateTime<Utc>, limit: i64) -> AppResult<Vec<OutboxMessage>> {
        let rows = sqlx::query_as::<_, OutboxRow>(&format!(
            r#"
            UPDATE saga_outbox SET next_attempt_at = $2
            WHERE id IN (
                SELECT id FROM saga_outbox
                WHERE status = 'PENDING' AND next_attempt_at <= $1
                ORDER BY created_at
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            OUTBOX_COLUMNS
        ))
        .bind(now)
        .bind(lease_until)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<OutboxMessage> = rows.into_iter().map(OutboxMessage::from).collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn mark_done(&self, id: Uuid, attempts: i32, completed_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE saga_outbox SET status = 'DONE', attempts = $2, completed_at = $3, last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(attempts)
        .bind(completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_retry(&self, id: Uuid, attempts: i32, error: &str, next_attempt_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE saga_outbox SET attempts = $2, last_error = $3, next_attempt_at = $4 WHERE id = $1")
            .bind(id)
            .bind(attempts)
            .bind(error)
            .bind(next_attempt_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, attempts: i32, error: &str) -> AppResult<()> {
        sqlx::query("UPDATE saga_outbox SET status = 'FAILED', attempts = $2, last_error = $3 WHERE id = $1")
            .bind(id)
            .bind(attempts)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_request(&self, request_id: i64) -> AppResult<Vec<OutboxMessage>> {
        let rows = sqlx::query_as::<_, OutboxRow>(&format!(
            "SELECT {} FROM saga_outbox WHERE request_id = $1 ORDER BY created_at",
            OUTBOX_COLUMNS
        ))
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OutboxMessage::from).collect())
    }
}
