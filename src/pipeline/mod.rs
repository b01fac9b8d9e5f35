//! Scrape job pipeline: reconciliation, the per-job orchestrator, the queue
//! worker that feeds it and the daily refresh scheduler.

pub mod processor;
pub mod reconcile;
pub mod scheduler;
pub mod worker;

pub use processor::{JobOutcome, JobProcessor, JobSummary, PipelineError};
pub use scheduler::Scheduler;
pub use worker::QueueWorker;
