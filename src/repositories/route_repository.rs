use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::leg_repository::insert_leg;
use super::RouteRepository;
use crate::models::route::RouteRow;
use crate::models::{Leg, Route};
use crate::utils::{AppError, AppResult};

const ROUTE_COLUMNS: &str = r#"
    id, request_id, status, strategy, deposit_ids, leg_count, origin_address,
    destination_address, total_distance_km, estimated_cost, estimated_hours,
    actual_cost, actual_hours, notes, created_at, assigned_at, completed_at
"#;

pub struct PgRouteRepository {
    pool: PgPool,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_route(row: RouteRow) -> AppResult<Route> {
    Route::try_from(row).map_err(AppError::Internal)
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn insert(&self, route: &Route) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO routes (id, request_id, status, strategy, deposit_ids, leg_count, origin_address,
                                destination_address, total_distance_km, estimated_cost, estimated_hours,
                                notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(route.id)
        .bind(route.request_id)
        .bind(route.status)
        .bind(route.plan.strategy())
        .bind(route.plan.deposit_ids().to_vec())
        .bind(route.leg_count() as i32)
        .bind(&route.origin_address)
        .bind(&route.destination_address)
        .bind(route.total_distance_km)
        .bind(route.estimated_cost)
        .bind(route.estimated_hours)
        .bind(&route.notes)
        .bind(route.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>(&format!("SELECT {} FROM routes WHERE id = $1", ROUTE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(into_route).transpose()
    }

    async fn find_by_request(&self, request_id: i64) -> AppResult<Vec<Route>> {
        let rows = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM routes WHERE request_id = $1 ORDER BY created_at",
            ROUTE_COLUMNS
        ))
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_route).collect()
    }

    async fn list_all(&self) -> AppResult<Vec<Route>> {
        let rows = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM routes ORDER BY created_at DESC",
            ROUTE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_route).collect()
    }

    async fn commit_assignment(&self, route_id: Uuid, assigned_at: DateTime<Utc>, legs: &[Leg]) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let assigned: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE routes SET status = 'ASSIGNED', assigned_at = $2
            WHERE id = $1 AND status = 'TENTATIVE'
            RETURNING request_id
            "#,
        )
        .bind(route_id)
        .bind(assigned_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((request_id,)) = assigned else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query(
            "UPDATE routes SET status = 'CANCELLED' WHERE request_id = $1 AND id <> $2 AND status = 'TENTATIVE'",
        )
        .bind(request_id)
        .bind(route_id)
        .execute(&mut *tx)
        .await?;

        for leg in legs {
            insert_leg(&mut tx, leg).await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

