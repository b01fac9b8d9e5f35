use async_trait::async_trait;

use crate::{browser::BrowserPage, model::ScrapedManga};

use super::{ScrapeError, ScraperKind, SiteScraper, layout::SiteLayout, load_html};

/// Madara theme. Metadata lives in `.post-content_item` heading/content rows.
pub const LAYOUT: SiteLayout = SiteLayout {
    title: &[".post-title h1", ".post-title h3"],
    alternative_title: &[],
    description: &[".summary__content", ".description-summary"],
    cover: &[".summary_image img"],
    info_rows: ".post-content_item",
    alternative_labels: &["Alternative"],
    author_labels: &["Author(s)", "Author", "Artist(s)"],
    serialization_labels: &["Serialization"],
    type_labels: &["Type"],
    genres: &[".genres-content a"],
    chapter_items: "li.wp-manga-chapter",
    chapter_link: "a",
    chapter_title: &[],
    chapter_images: &[".reading-content img", ".page-break img"],
};

pub struct GoMangaScraper;

#[async_trait]
impl SiteScraper for GoMangaScraper {
    fn kind(&self) -> ScraperKind {
        ScraperKind::GoManga
    }

    #[tracing::instrument(name = "scrape go-manga manga", skip(self, page))]
    async fn scrape_manga(
        &self,
        page: &dyn BrowserPage,
        url: &str,
    ) -> Result<ScrapedManga, ScrapeError> {
        let html = load_html(page, url).await?;
        LAYOUT.parse_manga(&html, url)
    }

    #[tracing::instrument(name = "scrape go-manga chapter", skip(self, page))]
    async fn scrape_chapter_images(
        &self,
        page: &dyn BrowserPage,
        chapter_url: &str,
    ) -> Result<Vec<String>, ScrapeError> {
        let html = load_html(page, chapter_url).await?;
        LAYOUT.parse_chapter_images(&html, chapter_url)
    }
}
