use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    model::JobPayload,
    queue::{Delivery, JobQueue, RetryPolicy},
};

use super::error::DatabaseError;

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: i64,
    job_id: i64,
    url: String,
    job_type: String,
    attempts: i32,
    max_attempts: i32,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Delivery {
            id: row.id,
            payload: JobPayload {
                job_id: row.job_id,
                url: row.url,
                job_type: row.job_type,
            },
            attempts: row.attempts,
            max_attempts: row.max_attempts,
        }
    }
}

/// Queue stored in the `job_queue` table.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    policy: RetryPolicy,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    #[tracing::instrument(name = "enqueue job", skip(self), fields(job_id = payload.job_id))]
    async fn enqueue(&self, payload: &JobPayload) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO job_queue
                (job_id, url, job_type, max_attempts)
            VALUES
                ($1, $2, $3, $4);
        "#,
        )
        .bind(payload.job_id)
        .bind(&payload.url)
        .bind(&payload.job_type)
        .bind(self.policy.max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, DatabaseError> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            r#"
            UPDATE job_queue
            SET
                status = 'active',
                attempts = attempts + 1
            WHERE id = (
                SELECT id
                FROM job_queue
                WHERE status = 'waiting'
                  AND available_at <= NOW()
                ORDER BY available_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, job_id, url, job_type, attempts, max_attempts;
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Delivery::from))
    }

    #[tracing::instrument(name = "complete delivery", skip(self), fields(delivery_id = delivery.id))]
    async fn complete(&self, delivery: &Delivery) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            DELETE FROM job_queue
            WHERE id = $1;
        "#,
        )
        .bind(delivery.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "retry delivery", skip(self), fields(delivery_id = delivery.id))]
    async fn retry(
        &self,
        delivery: &Delivery,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE job_queue
            SET
                status = 'waiting',
                available_at = $1,
                last_error = $2
            WHERE id = $3;
        "#,
        )
        .bind(available_at)
        .bind(error)
        .bind(delivery.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "bury delivery", skip(self), fields(delivery_id = delivery.id))]
    async fn bury(&self, delivery: &Delivery, error: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE job_queue
            SET
                status = 'dead',
                available_at = NOW(),
                last_error = $1
            WHERE id = $2;
        "#,
        )
        .bind(error)
        .bind(delivery.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "requeue stalled deliveries", skip(self))]
    async fn requeue_stalled(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'waiting', available_at = NOW()
            WHERE status = 'active';
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "prune dead deliveries", skip(self))]
    async fn prune_dead(&self, before: DateTime<Utc>) -> Result<u64, DatabaseError> {
        // A buried row's available_at is the time it was buried.
        let result = sqlx::query(
            r#"
            DELETE FROM job_queue
            WHERE status = 'dead'
              AND available_at < $1;
        "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
