//! Daily refresh of every completed job.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;

use crate::{
    db::error::DatabaseError,
    model::{JobPayload, JobStatus},
    notification::Notifier,
    repository::Store,
};

use super::processor::JobProcessor;

pub struct Scheduler {
    store: Arc<dyn Store>,
    processor: Arc<JobProcessor>,
    notifier: Arc<dyn Notifier>,
    run_at: NaiveTime,
    timezone: Tz,
}

/// First instant strictly after `now` whose wall-clock time in `timezone` is `run_at`.
pub fn next_run_after(now: DateTime<Utc>, run_at: NaiveTime, timezone: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&timezone).date_naive();

    // Three days cover a skipped local time on a DST switch.
    for offset in 0..3 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let candidate = timezone.from_local_datetime(&date.and_time(run_at)).earliest();
        if let Some(candidate) = candidate.map(|c| c.with_timezone(&Utc)) {
            if candidate > now {
                return candidate;
            }
        }
    }

    now + chrono::Duration::days(1)
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Store>,
        processor: Arc<JobProcessor>,
        notifier: Arc<dyn Notifier>,
        run_at: NaiveTime,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            processor,
            notifier,
            run_at,
            timezone,
        }
    }

    /// Re-runs each `complete` job in turn, never two at once.
    ///
    /// Each job is marked `updated` first and keeps whatever status its run
    /// records. Stops before the next job once `shutdown` is set. Returns how
    /// many jobs were refreshed.
    #[tracing::instrument(name = "refresh completed jobs", skip_all)]
    pub async fn refresh_completed_jobs(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<usize, DatabaseError> {
        tracing::info!("Checking for updates");
        self.notifier.send_message("Checking for updates...").await;

        let jobs = self.store.list_jobs_by_status(JobStatus::Complete).await?;
        let mut refreshed = 0;

        for job in jobs {
            if *shutdown.borrow() {
                tracing::info!(refreshed, "Shutdown requested, stopping refresh");
                break;
            }

            if let Err(e) = self
                .store
                .update_job_status(job.id, false, JobStatus::Updated)
                .await
            {
                tracing::error!(job_id = job.id, error = ?e, "Failed to mark job as updated");
                continue;
            }

            tracing::info!(job_id = job.id, url = %job.url, "Processing job");
            self.notifier
                .send_message(&format!("Processing job for URL: {}", job.url))
                .await;

            if let Err(e) = self.processor.process(&JobPayload::from(&job)).await {
                tracing::error!(job_id = job.id, error = ?e, "Scheduled refresh failed");
            }
            refreshed += 1;
        }

        Ok(refreshed)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.run_at, self.timezone);
            tracing::info!(next_run = %next, "Scheduler waiting");

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(e) = self.refresh_completed_jobs(&shutdown).await {
                tracing::error!(error = ?e, "Scheduled refresh aborted");
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
