//! Job submission interface used by the HTTP layer.

use std::sync::Arc;

use chrono_tz::Tz;

use crate::{
    db::error::DatabaseError,
    model::{Job, JobList, JobPayload, JobStatus},
    notification::Notifier,
    queue::JobQueue,
    repository::Store,
    util::format_local_timestamp,
};

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
    notifier: Arc<dyn Notifier>,
    timezone: Tz,
}

impl JobService {
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<dyn JobQueue>,
        notifier: Arc<dyn Notifier>,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            queue,
            notifier,
            timezone,
        }
    }

    /// Persists a pending job, queues it and announces it.
    ///
    /// A URL that was already submitted is a [`DatabaseError::Conflict`].
    #[tracing::instrument(name = "submit job", skip(self))]
    pub async fn submit_job(&self, url: &str, job_type: &str) -> Result<Job, DatabaseError> {
        let job = self.store.create_job(url, job_type).await?;
        self.queue.enqueue(&JobPayload::from(&job)).await?;

        self.notifier
            .send_message(&format!(
                "New job created: {} - {}\n\n{}",
                job.url,
                job.id,
                format_local_timestamp(job.created_at, self.timezone)
            ))
            .await;

        Ok(job)
    }

    #[tracing::instrument(name = "list jobs", skip(self))]
    pub async fn list_jobs(&self) -> Result<JobList, DatabaseError> {
        let jobs = self.store.list_jobs().await?;
        let on_going_jobs_count = self.store.count_ongoing_jobs().await?;

        Ok(JobList {
            jobs,
            on_going_jobs_count,
        })
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Job, DatabaseError> {
        self.store.get_job(job_id).await
    }

    /// Resubmits an existing job from scratch.
    #[tracing::instrument(name = "retry job", skip(self))]
    pub async fn retry_job(&self, job_id: i64) -> Result<Job, DatabaseError> {
        self.store
            .update_job_status(job_id, false, JobStatus::Pending)
            .await?;
        let job = self.store.get_job(job_id).await?;
        self.queue.enqueue(&JobPayload::from(&job)).await?;

        self.notifier
            .send_message(&format!("Job resubmitted: {} - {}", job.url, job.id))
            .await;

        Ok(job)
    }
}
