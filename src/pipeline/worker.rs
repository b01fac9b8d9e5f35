use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::watch;

use crate::{
    db::error::DatabaseError,
    queue::{Delivery, JobQueue, RetryPolicy},
};

use super::processor::{JobOutcome, JobProcessor};

/// Single consumer of the job queue. One job at a time.
pub struct QueueWorker {
    queue: Arc<dyn JobQueue>,
    processor: Arc<JobProcessor>,
    policy: RetryPolicy,
    poll_interval: Duration,
}

impl QueueWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        processor: Arc<JobProcessor>,
        policy: RetryPolicy,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            processor,
            policy,
            poll_interval,
        }
    }

    /// Handles at most one delivery. `Ok(false)` when the queue was empty.
    pub async fn process_next(&self) -> Result<bool, DatabaseError> {
        let Some(delivery) = self.queue.dequeue().await? else {
            return Ok(false);
        };

        tracing::info!(
            delivery_id = delivery.id,
            job_id = delivery.payload.job_id,
            attempt = delivery.attempts,
            "Processing delivery"
        );

        match self.processor.process(&delivery.payload).await {
            Ok(JobOutcome::Complete(_)) | Ok(JobOutcome::Failed(_)) => {
                self.queue.complete(&delivery).await?;
            }
            Err(e) => self.reschedule(&delivery, &e.to_string()).await?,
        }

        Ok(true)
    }

    async fn reschedule(&self, delivery: &Delivery, error: &str) -> Result<(), DatabaseError> {
        if delivery.can_retry() {
            let available_at = self.policy.next_attempt_at(Utc::now(), delivery.attempts);
            tracing::warn!(
                delivery_id = delivery.id,
                %available_at,
                error,
                "Delivery failed, retrying"
            );
            self.queue.retry(delivery, available_at, error).await
        } else {
            tracing::error!(
                delivery_id = delivery.id,
                attempts = delivery.attempts,
                error,
                "Delivery failed, giving up"
            );
            self.queue.bury(delivery, error).await
        }
    }

    /// Polls until `shutdown` flips to `true`. The current job always finishes first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Queue worker started");

        while !*shutdown.borrow() {
            let idle = match self.process_next().await {
                Ok(handled) => !handled,
                Err(e) => {
                    tracing::error!(error = ?e, "Queue worker error");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Queue worker stopped");
    }
}
