//! Site adapters. One strategy per source site, selected by the job type tag.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    browser::{BrowserError, BrowserPage},
    model::ScrapedManga,
};

pub mod go_manga;
pub mod html;
pub mod layout;
pub mod makima;
pub mod reapertrans;

pub use go_manga::GoMangaScraper;
pub use makima::MakimaScraper;
pub use reapertrans::ReaperTransScraper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScraperKind {
    Makima,
    GoManga,
    ReaperTrans,
}

impl ScraperKind {
    pub const ALL: [ScraperKind; 3] = [
        ScraperKind::Makima,
        ScraperKind::GoManga,
        ScraperKind::ReaperTrans,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScraperKind::Makima => "makima",
            ScraperKind::GoManga => "go-manga",
            ScraperKind::ReaperTrans => "reapertrans",
        }
    }
}

impl std::fmt::Display for ScraperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScraperKind {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "makima" => Ok(ScraperKind::Makima),
            "go-manga" => Ok(ScraperKind::GoManga),
            "reapertrans" => Ok(ScraperKind::ReaperTrans),
            _ => Err(ScrapeError::UnknownSite(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Missing {field} on {url}")]
    MissingField { field: &'static str, url: String },

    #[error("Unknown job type: {0}")]
    UnknownSite(String),

    #[error("Invalid selector {0}")]
    Selector(String),
}

#[async_trait]
pub trait SiteScraper: Send + Sync {
    fn kind(&self) -> ScraperKind;

    /// Chapters come back in the site's own order.
    async fn scrape_manga(
        &self,
        page: &dyn BrowserPage,
        url: &str,
    ) -> Result<ScrapedManga, ScrapeError>;

    /// Image URLs in reading order.
    async fn scrape_chapter_images(
        &self,
        page: &dyn BrowserPage,
        chapter_url: &str,
    ) -> Result<Vec<String>, ScrapeError>;
}

/// Navigates and hands back the rendered document.
pub(crate) async fn load_html(page: &dyn BrowserPage, url: &str) -> Result<String, ScrapeError> {
    page.goto(url).await?;
    Ok(page.content().await?)
}

/// Adapters resolved once at start-up.
#[derive(Clone, Default)]
pub struct ScraperRegistry {
    scrapers: HashMap<ScraperKind, Arc<dyn SiteScraper>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_sites() -> Self {
        Self::new()
            .register(Arc::new(MakimaScraper))
            .register(Arc::new(GoMangaScraper))
            .register(Arc::new(ReaperTransScraper))
    }

    pub fn register(mut self, scraper: Arc<dyn SiteScraper>) -> Self {
        self.scrapers.insert(scraper.kind(), scraper);
        self
    }

    pub fn resolve(&self, job_type: &str) -> Result<Arc<dyn SiteScraper>, ScrapeError> {
        let kind: ScraperKind = job_type.parse()?;

        self.scrapers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ScrapeError::UnknownSite(job_type.to_string()))
    }

    pub fn supports(&self, job_type: &str) -> bool {
        self.resolve(job_type).is_ok()
    }
}
