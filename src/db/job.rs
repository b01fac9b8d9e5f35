use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::model::{Job, JobStatus};

use super::error::DatabaseError;

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    url: String,
    job_type: String,
    status: String,
    is_complete: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = DatabaseError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|e| DatabaseError::DatabaseError(sqlx::Error::Decode(e.into())))?;

        Ok(Job {
            id: row.id,
            url: row.url,
            job_type: row.job_type,
            status,
            is_complete: row.is_complete,
            created_at: row.created_at,
        })
    }
}

fn into_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>, DatabaseError> {
    rows.into_iter().map(Job::try_from).collect()
}

#[tracing::instrument(name = "create job", skip(pool))]
pub async fn create_job(pool: &PgPool, url: &str, job_type: &str) -> Result<Job, DatabaseError> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (url, job_type, status, is_complete)
        VALUES
            ($1, $2, $3, FALSE)
        RETURNING
            id, url, job_type, status, is_complete, created_at;
    "#,
    )
    .bind(url)
    .bind(job_type)
    .bind(JobStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;

    row.try_into()
}

#[tracing::instrument(name = "get job", skip(pool))]
pub async fn get_job(pool: &PgPool, job_id: i64) -> Result<Job, DatabaseError> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT
            id, url, job_type, status, is_complete, created_at
        FROM
            jobs
        WHERE
            id = $1;
    "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DatabaseError::NotFound)?;

    row.try_into()
}

#[tracing::instrument(name = "list jobs", skip_all)]
pub async fn list_jobs(pool: &PgPool) -> Result<Vec<Job>, DatabaseError> {
    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT
            id, url, job_type, status, is_complete, created_at
        FROM
            jobs
        ORDER BY created_at DESC, id DESC;
    "#,
    )
    .fetch_all(pool)
    .await?;

    into_jobs(rows)
}

#[tracing::instrument(name = "count ongoing jobs", skip_all)]
pub async fn count_ongoing_jobs(pool: &PgPool) -> Result<i64, DatabaseError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM jobs WHERE is_complete = FALSE;
    "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[tracing::instrument(name = "list jobs by status", skip(pool))]
pub async fn list_jobs_by_status(
    pool: &PgPool,
    status: JobStatus,
) -> Result<Vec<Job>, DatabaseError> {
    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT
            id, url, job_type, status, is_complete, created_at
        FROM
            jobs
        WHERE
            status = $1
        ORDER BY id;
    "#,
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    into_jobs(rows)
}

#[tracing::instrument(name = "update job status", skip(pool))]
pub async fn update_job_status(
    pool: &PgPool,
    job_id: i64,
    is_complete: bool,
    status: JobStatus,
) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET
            is_complete = $1,
            status = $2
        WHERE
            id = $3;
    "#,
    )
    .bind(is_complete)
    .bind(status.as_str())
    .bind(job_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound);
    }

    Ok(())
}

#[tracing::instrument(name = "restore interrupted refreshes", skip_all)]
pub async fn restore_interrupted_refreshes(pool: &PgPool) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET
            is_complete = TRUE,
            status = $1
        WHERE
            status = $2
            AND is_complete = FALSE;
    "#,
    )
    .bind(JobStatus::Complete.as_str())
    .bind(JobStatus::Updated.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
