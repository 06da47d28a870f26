use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use super::outbox_repository::insert_message;
use super::{LegRepository, LegTransition};
use crate::models::leg::LegRow;
use crate::models::Leg;
use crate::utils::{AppError, AppResult};

const LEG_COLUMNS: &str = r#"
    id, request_id, route_id, vehicle_id, driver_id,
    origin_kind, origin_deposit_id, origin_address,
    destination_kind, destination_deposit_id, destination_address,
    kind, distance_km, sequence, status, started_at, finished_at,
    dwell_record_id, dwell_closed_at, created_at, updated_at
"#;

pub struct PgLegRepository {
    pool: PgPool,
}

impl PgLegRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, filter: &str, id: Option<Uuid>) -> AppResult<Vec<Leg>> {
        let sql = format!(
            "SELECT {} FROM legs {} ORDER BY request_id, sequence, created_at",
            LEG_COLUMNS, filter
        );
        let mut query = sqlx::query_as::<_, LegRow>(&sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(into_leg).collect()
    }
}

fn into_leg(row: LegRow) -> AppResult<Leg> {
    Leg::try_from(row).map_err(AppError::Internal)
}

/// Insertar un tramo dentro de una transacción abierta
pub(crate) async fn insert_leg(tx: &mut Transaction<'_, Postgres>, leg: &Leg) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO legs (id, request_id, route_id, vehicle_id, driver_id,
                          origin_kind, origin_deposit_id, origin_address,
                          destination_kind, destination_deposit_id, destination_address,
                          kind, distance_km, sequence, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(leg.id)
    .bind(leg.request_id)
    .bind(leg.route_id)
    .bind(leg.vehicle_id)
    .bind(leg.driver_id)
    .bind(leg.origin.kind())
    .bind(leg.origin.deposit_id())
    .bind(leg.origin.address())
    .bind(leg.destination.kind())
    .bind(leg.destination.deposit_id())
    .bind(leg.destination.address())
    .bind(leg.kind)
    .bind(leg.distance_km)
    .bind(leg.sequence)
    .bind(leg.status)
    .bind(leg.created_at)
    .bind(leg.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl LegRepository for PgLegRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Leg>> {
        let row = sqlx::query_as::<_, LegRow>(&format!("SELECT {} FROM legs WHERE id = $1", LEG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(into_leg).transpose()
    }

    async fn find_by_request(&self, request_id: i64) -> AppResult<Vec<Leg>> {
        let rows = sqlx::query_as::<_, LegRow>(&format!(
            "SELECT {} FROM legs WHERE request_id = $1 ORDER BY sequence",
            LEG_COLUMNS
        ))
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_leg).collect()
    }

    async fn find_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Leg>> {
        self.fetch_where("WHERE vehicle_id = $1", Some(vehicle_id)).await
    }

    async fn find_by_driver(&self, driver_id: Uuid) -> AppResult<Vec<Leg>> {
        self.fetch_where("WHERE driver_id = $1", Some(driver_id)).await
    }

    async fn list_all(&self) -> AppResult<Vec<Leg>> {
        self.fetch_where("", None).await
    }

    async fn apply_transition(&self, change: &LegTransition) -> AppResult<Option<Vec<Uuid>>> {
        let leg = &change.leg;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE legs
            SET status = $2, started_at = $3, finished_at = $4, updated_at = $5
            WHERE id = $1 AND status = $6
            "#,
        )
        .bind(leg.id)
        .bind(leg.status)
        .bind(leg.started_at)
        .bind(leg.finished_at)
        .bind(leg.updated_at)
        .bind(change.expected)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some((vehicle_id, status, location)) = &change.vehicle {
            sqlx::query(
                "UPDATE vehicles SET status = $2, current_location = COALESCE($3, current_location) WHERE id = $1",
            )
            .bind(*vehicle_id)
            .bind(*status)
            .bind(location.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        if let Some((driver_id, status)) = &change.driver {
            sqlx::query("UPDATE drivers SET status = $2 WHERE id = $1")
                .bind(*driver_id)
                .bind(*status)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(completion) = &change.completion {
            let completed = sqlx::query(
                r#"
                UPDATE routes
                SET status = 'COMPLETED', actual_cost = $2, actual_hours = $3, completed_at = $4
                WHERE id = $1 AND status = 'ASSIGNED'
                "#,
            )
            .bind(completion.route_id)
            .bind(completion.actual_cost)
            .bind(completion.actual_hours)
            .bind(completion.completed_at)
            .execute(&mut *tx)
            .await?;
            if completed.rows_affected() != 1 {
                warn!("⚠️ La ruta {} no estaba ASSIGNED al completarse", completion.route_id);
            }
        }

        let mut inserted = Vec::with_capacity(change.messages.len());
        for message in &change.messages {
            if insert_message(&mut *tx, message).await? {
                inserted.push(message.id);
            }
        }

        tx.commit().await?;
        Ok(Some(inserted))
    }

    async fn set_dwell_record(&self, leg_id: Uuid, dwell_record_id: i64) -> AppResult<()> {
        sqlx::query("UPDATE legs SET dwell_record_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(leg_id)
            .bind(dwell_record_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_dwell_closed(&self, leg_id: Uuid, closed_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE legs SET dwell_closed_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(leg_id)
            .bind(closed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
