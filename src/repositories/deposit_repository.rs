use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::DepositRepository;
use crate::models::Deposit;
use crate::utils::AppResult;

const DEPOSIT_COLUMNS: &str =
    "id, name, address, latitude, longitude, max_capacity_m3, daily_cost, status, created_at";

pub struct PgDepositRepository {
    pool: PgPool,
}

impl PgDepositRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepositRepository for PgDepositRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Deposit>> {
        let deposit = sqlx::query_as::<_, Deposit>(&format!("SELECT {} FROM deposits WHERE id = $1", DEPOSIT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(deposit)
    }

    async fn find_active(&self) -> AppResult<Vec<Deposit>> {
        let deposits = sqlx::query_as::<_, Deposit>(&format!(
            "SELECT {} FROM deposits WHERE status = 'ACTIVE' ORDER BY created_at, id",
            DEPOSIT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(deposits)
    }

    async fn list_all(&self) -> AppResult<Vec<Deposit>> {
        let deposits = sqlx::query_as::<_, Deposit>(&format!(
            "SELECT {} FROM deposits ORDER BY created_at, id",
            DEPOSIT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(deposits)
    }
}
