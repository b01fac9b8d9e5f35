use std::sync::Arc;

use futures::{StreamExt, stream};

use crate::{
    browser::{BrowserError, BrowserLauncher, BrowserSession},
    db::error::DatabaseError,
    error::error_chain_fmt,
    model::{Chapter, JobPayload, JobStatus, Manga, NewPage, ScrapedManga},
    notification::Notifier,
    repository::Store,
    sites::{ScrapeError, ScraperRegistry, SiteScraper},
    storage::{ImageTransfer, StorageError},
};

use super::reconcile;

#[derive(thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid job data: {0}")]
    Validation(String),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl std::fmt::Debug for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub title: String,
    pub total_chapters: usize,
    pub new_chapters: usize,
    pub pages: usize,
    pub created: bool,
}

/// How a run ended. Failures are already recorded on the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Complete(JobSummary),
    Failed(String),
}

pub struct JobProcessor {
    store: Arc<dyn Store>,
    scrapers: Arc<ScraperRegistry>,
    browser: Arc<dyn BrowserLauncher>,
    images: Arc<dyn ImageTransfer>,
    notifier: Arc<dyn Notifier>,
    upload_concurrency: usize,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn Store>,
        scrapers: Arc<ScraperRegistry>,
        browser: Arc<dyn BrowserLauncher>,
        images: Arc<dyn ImageTransfer>,
        notifier: Arc<dyn Notifier>,
        upload_concurrency: usize,
    ) -> Self {
        Self {
            store,
            scrapers,
            browser,
            images,
            notifier,
            upload_concurrency: upload_concurrency.max(1),
        }
    }

    /// Runs one job end to end and records its terminal status.
    ///
    /// Scrape, browser, storage and database failures become a `failed` job
    /// and `Ok(JobOutcome::Failed)`. `Err` means the status itself could not
    /// be written.
    #[tracing::instrument(
        name = "process job",
        skip(self, job),
        fields(job_id = job.job_id, job_type = %job.job_type, url = %job.url)
    )]
    pub async fn process(&self, job: &JobPayload) -> Result<JobOutcome, PipelineError> {
        let scraper = match self.validate(job) {
            Ok(scraper) => scraper,
            Err(e) => return self.fail(job, e).await,
        };

        let session = match self.browser.launch().await {
            Ok(session) => session,
            Err(e) => return self.fail(job, e.into()).await,
        };

        let recorded = match self.run(session.as_ref(), scraper.as_ref(), job).await {
            Ok(summary) => self.complete(job, summary).await,
            Err(e) => self.fail(job, e).await,
        };

        self.close_browser(session).await;

        recorded
    }

    fn validate(&self, job: &JobPayload) -> Result<Arc<dyn SiteScraper>, PipelineError> {
        if job.url.trim().is_empty() {
            return Err(PipelineError::Validation("URL is missing".to_string()));
        }
        if job.job_type.trim().is_empty() {
            return Err(PipelineError::Validation("jobType is missing".to_string()));
        }

        Ok(self.scrapers.resolve(&job.job_type)?)
    }

    async fn run(
        &self,
        session: &dyn BrowserSession,
        scraper: &dyn SiteScraper,
        job: &JobPayload,
    ) -> Result<JobSummary, PipelineError> {
        let mut scraped = self.scrape_manga(session, scraper, &job.url).await?;

        let dropped = reconcile::dedupe_chapters(&mut scraped.chapters);
        if dropped > 0 {
            tracing::warn!(dropped, "Site listed repeated chapters");
        }

        match self.store.find_manga_by_slug(&scraped.title_slug).await? {
            Some(existing) => self.update_existing(session, scraper, &scraped, existing).await,
            None => self.save_new(session, scraper, &scraped).await,
        }
    }

    async fn scrape_manga(
        &self,
        session: &dyn BrowserSession,
        scraper: &dyn SiteScraper,
        url: &str,
    ) -> Result<ScrapedManga, PipelineError> {
        let page = session.new_page().await?;
        let scraped = scraper.scrape_manga(page.as_ref(), url).await;
        if let Err(e) = page.close().await {
            tracing::warn!(error = %e, "Failed to close page");
        }

        Ok(scraped?)
    }

    #[tracing::instrument(name = "save new manga", skip_all, fields(slug = %scraped.title_slug))]
    async fn save_new(
        &self,
        session: &dyn BrowserSession,
        scraper: &dyn SiteScraper,
        scraped: &ScrapedManga,
    ) -> Result<JobSummary, PipelineError> {
        tracing::info!("New manga, saving");

        let cover_image_url = self
            .images
            .upload(&scraped.cover_image_url, &scraped.title, "cover")
            .await?;

        let plan = reconcile::plan_new_manga(scraped, cover_image_url);
        let manga = self.store.create_manga(&plan).await?;

        self.notify(&format!("New manga saved: {}", manga.title)).await;

        let mut pages = 0;
        for chapter in &manga.chapters {
            pages += self
                .transfer_chapter(session, scraper, &scraped.title, chapter)
                .await?;
        }

        Ok(JobSummary {
            title: scraped.title.clone(),
            total_chapters: scraped.chapters.len(),
            new_chapters: manga.chapters.len(),
            pages,
            created: true,
        })
    }

    #[tracing::instrument(name = "update existing manga", skip_all, fields(manga_id = existing.id))]
    async fn update_existing(
        &self,
        session: &dyn BrowserSession,
        scraper: &dyn SiteScraper,
        scraped: &ScrapedManga,
        existing: Manga,
    ) -> Result<JobSummary, PipelineError> {
        self.notify(&format!("Manga {} already exists.", scraped.title))
            .await;

        let fresh = reconcile::new_chapters(scraped, &existing);
        tracing::info!(count = fresh.len(), "Found new chapters");
        self.notify(&format!("Found {} new chapters", fresh.len()))
            .await;

        if fresh.is_empty() {
            self.notify(&format!("No new chapters found for {}.", scraped.title))
                .await;
        }

        let mut pages = 0;
        for new_chapter in &fresh {
            let chapter = self.store.create_chapter(existing.id, new_chapter).await?;
            pages += self
                .transfer_chapter(session, scraper, &scraped.title, &chapter)
                .await?;
        }

        Ok(JobSummary {
            title: scraped.title.clone(),
            total_chapters: scraped.chapters.len(),
            new_chapters: fresh.len(),
            pages,
            created: false,
        })
    }

    /// Scrapes a chapter's images and stores them, returning how many pages were saved.
    ///
    /// A failed image or an empty reader is logged and skipped; failing to load
    /// the chapter page at all is fatal.
    #[tracing::instrument(name = "transfer chapter", skip_all, fields(slug = %chapter.slug))]
    async fn transfer_chapter(
        &self,
        session: &dyn BrowserSession,
        scraper: &dyn SiteScraper,
        manga_title: &str,
        chapter: &Chapter,
    ) -> Result<usize, PipelineError> {
        let page = session.new_page().await?;
        let images = scraper
            .scrape_chapter_images(page.as_ref(), &chapter.url_scrape)
            .await;
        if let Err(e) = page.close().await {
            tracing::warn!(error = %e, "Failed to close page");
        }
        let images = images?;
        if images.is_empty() {
            tracing::warn!(url = %chapter.url_scrape, "Chapter has no images");
            return Ok(0);
        }

        let stored = stream::iter(images.into_iter().zip(1..))
            .map(|(source_url, page_number)| {
                self.store_page(manga_title, chapter, source_url, page_number)
            })
            .buffer_unordered(self.upload_concurrency)
            .filter(|saved| futures::future::ready(*saved))
            .count()
            .await;

        Ok(stored)
    }

    async fn store_page(
        &self,
        manga_title: &str,
        chapter: &Chapter,
        source_url: String,
        page_number: i32,
    ) -> bool {
        let subtitle = if chapter.title.trim().is_empty() {
            format!("page-{}", page_number)
        } else {
            chapter.title.clone()
        };

        let image_url = match self.images.upload(&source_url, manga_title, &subtitle).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, %source_url, page_number, "Failed to upload image");
                return false;
            }
        };

        let page = NewPage {
            chapter_id: chapter.id,
            image_url,
            page_number,
        };
        match self.store.create_page(&page).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, page_number, "Failed to save page");
                false
            }
        }
    }

    async fn complete(
        &self,
        job: &JobPayload,
        summary: JobSummary,
    ) -> Result<JobOutcome, PipelineError> {
        self.store
            .update_job_status(job.job_id, true, JobStatus::Complete)
            .await?;
        self.notify(&format!(
            "Job completed: {} - total {} chapters",
            summary.title, summary.total_chapters
        ))
        .await;

        tracing::info!(
            new_chapters = summary.new_chapters,
            pages = summary.pages,
            "Job completed"
        );
        Ok(JobOutcome::Complete(summary))
    }

    async fn fail(&self, job: &JobPayload, error: PipelineError) -> Result<JobOutcome, PipelineError> {
        tracing::error!(error = ?error, "Job failed");

        let message = error.to_string();
        self.notify(&format!("Error processing job: {}", message))
            .await;
        self.store
            .update_job_status(job.job_id, true, JobStatus::Failed)
            .await?;

        Ok(JobOutcome::Failed(message))
    }

    async fn close_browser(&self, session: Box<dyn BrowserSession>) {
        match session.close().await {
            Ok(()) => self.notify("Browser closed.").await,
            Err(e) => tracing::error!(error = %e, "Failed to close browser"),
        }
    }

    async fn notify(&self, text: &str) {
        self.notifier.send_message(text).await;
    }
}
