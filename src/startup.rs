use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use chrono::Utc;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};

use crate::{
    browser::{BrowserLauncher, ChromeLauncher},
    configuration::{Config, Database},
    db::{PgStore, queue::PgJobQueue},
    jobs::JobService,
    notification,
    pipeline::{JobProcessor, QueueWorker, Scheduler},
    queue::{JobQueue, RetryPolicy},
    repository::Store,
    routes::init_router,
    sites::ScraperRegistry,
    state::AppState,
    storage::{self, ImageTransfer, ImageUploader},
};

pub struct Application {
    port: u16,
    host: String,
    listener: TcpListener,
    router: Router,
    worker: QueueWorker,
    scheduler: Option<Scheduler>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, anyhow::Error> {
        let pool = get_connection_pool(&config.database);

        if config.application.run_migration {
            tracing::warn!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
        }

        let timezone = config.application.timezone()?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
        let policy = RetryPolicy::from_config(&config.queue);
        let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool, policy));

        let requeued = queue
            .requeue_stalled()
            .await
            .context("Failed to requeue stalled deliveries")?;
        if requeued > 0 {
            tracing::warn!(requeued, "Requeued deliveries left active by a previous run");
        }

        let pruned = queue
            .prune_dead(config.queue.dead_cutoff(Utc::now()))
            .await
            .context("Failed to prune dead deliveries")?;
        if pruned > 0 {
            tracing::info!(pruned, "Pruned dead deliveries");
        }

        let restored = store
            .restore_interrupted_refreshes()
            .await
            .context("Failed to restore interrupted refreshes")?;
        if restored > 0 {
            tracing::warn!(restored, "Restored jobs left mid-refresh by a previous run");
        }

        let notifier = notification::from_config(&config.notification, http_client.clone());
        let object_storage = storage::from_config(&config.storage, http_client.clone())?;
        let images: Arc<dyn ImageTransfer> =
            Arc::new(ImageUploader::new(http_client, object_storage));
        let browser: Arc<dyn BrowserLauncher> =
            Arc::new(ChromeLauncher::new(config.browser.clone()));
        let scrapers = Arc::new(ScraperRegistry::with_default_sites());

        let processor = Arc::new(JobProcessor::new(
            store.clone(),
            scrapers.clone(),
            browser,
            images,
            notifier.clone(),
            config.pipeline.upload_concurrency,
        ));

        let worker = QueueWorker::new(
            queue.clone(),
            processor.clone(),
            policy,
            config.queue.poll_interval(),
        );

        let scheduler = if config.scheduler.enabled {
            Some(Scheduler::new(
                store.clone(),
                processor,
                notifier.clone(),
                config.scheduler.run_at()?,
                timezone,
            ))
        } else {
            tracing::info!("Scheduler disabled");
            None
        };

        let jobs = JobService::new(store.clone(), queue, notifier, timezone);
        let router = init_router(AppState {
            store,
            jobs,
            scrapers,
        });

        let listener = TcpListener::bind(config.application.get_address())
            .await
            .context("Unable opening port")?;
        let address = listener.local_addr()?;

        Ok(Application {
            port: address.port(),
            host: address.ip().to_string(),
            listener,
            router,
            worker,
            scheduler,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> String {
        self.host.clone()
    }

    /// Serves HTTP and runs the background loops until Ctrl-C.
    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks: Vec<JoinHandle<()>> = vec![tokio::spawn(self.worker.run(shutdown_rx.clone()))];
        if let Some(scheduler) = self.scheduler {
            tasks.push(tokio::spawn(scheduler.run(shutdown_rx)));
        }

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped, waiting for background tasks");
        let _ = shutdown_tx.send(true);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task panicked");
            }
        }

        Ok(())
    }
}

pub fn get_connection_pool(database: &Database) -> PgPool {
    PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        .connect_lazy_with(database.with_db())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
