use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{db::error::DatabaseError, model::JobPayload};

/// One dequeued copy of a job. `attempts` already counts this delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: i64,
    pub payload: JobPayload,
    pub attempts: i32,
    pub max_attempts: i32,
}

impl Delivery {
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

/// At-least-once delivery of scrape jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, payload: &JobPayload) -> Result<(), DatabaseError>;

    /// Claims the oldest waiting delivery whose backoff has elapsed.
    async fn dequeue(&self) -> Result<Option<Delivery>, DatabaseError>;

    /// Acknowledges a delivery; it leaves the queue.
    async fn complete(&self, delivery: &Delivery) -> Result<(), DatabaseError>;

    async fn retry(
        &self,
        delivery: &Delivery,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), DatabaseError>;

    /// Gives up on a delivery that used all its attempts. The row is kept
    /// with its last error until [`JobQueue::prune_dead`] removes it.
    async fn bury(&self, delivery: &Delivery, error: &str) -> Result<(), DatabaseError>;

    /// Deletes dead deliveries buried before `before`.
    async fn prune_dead(&self, before: DateTime<Utc>) -> Result<u64, DatabaseError>;

    /// Puts deliveries claimed by a process that died back in line.
    async fn requeue_stalled(&self) -> Result<u64, DatabaseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &crate::configuration::Queue) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: config.backoff_base(),
        }
    }

    /// Exponential: base, 2 * base, 4 * base, ...
    pub fn backoff(&self, attempt: i32) -> Duration {
        let exponent = attempt.saturating_sub(1).clamp(0, 16) as u32;
        self.base_backoff.saturating_mul(2u32.pow(exponent))
    }

    pub fn next_attempt_at(&self, now: DateTime<Utc>, attempt: i32) -> DateTime<Utc> {
        let delay = chrono::Duration::from_std(self.backoff(attempt))
            .unwrap_or_else(|_| chrono::Duration::seconds(0));
        now + delay
    }
}
