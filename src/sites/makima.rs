use async_trait::async_trait;

use crate::{browser::BrowserPage, model::ScrapedManga};

use super::{ScrapeError, ScraperKind, SiteScraper, layout::SiteLayout, load_html};

/// Themesia "anime-style" series page used by makima.
pub const LAYOUT: SiteLayout = SiteLayout {
    title: &[".infox h1", "h1.entry-title"],
    alternative_title: &[".alter", ".infox .alternative"],
    description: &[".desc", ".synp .entry-content", ".entry-content"],
    cover: &[".bigcover img", ".thumbook img", ".thumb img"],
    info_rows: ".tsinfo .imptdt, .spe span",
    alternative_labels: &["Alternative"],
    author_labels: &["Author", "Artist", "Studio"],
    serialization_labels: &["Serialization", "Network"],
    type_labels: &["Type"],
    genres: &[".seriestugenre a", ".genxed a"],
    chapter_items: ".eplister ul li",
    chapter_link: "a",
    chapter_title: &[".epl-num", ".epl-title"],
    chapter_images: &["#readerarea img", ".reader-area img"],
};

pub struct MakimaScraper;

#[async_trait]
impl SiteScraper for MakimaScraper {
    fn kind(&self) -> ScraperKind {
        ScraperKind::Makima
    }

    #[tracing::instrument(name = "scrape makima manga", skip(self, page))]
    async fn scrape_manga(
        &self,
        page: &dyn BrowserPage,
        url: &str,
    ) -> Result<ScrapedManga, ScrapeError> {
        let html = load_html(page, url).await?;
        LAYOUT.parse_manga(&html, url)
    }

    #[tracing::instrument(name = "scrape makima chapter", skip(self, page))]
    async fn scrape_chapter_images(
        &self,
        page: &dyn BrowserPage,
        chapter_url: &str,
    ) -> Result<Vec<String>, ScrapeError> {
        let html = load_html(page, chapter_url).await?;
        LAYOUT.parse_chapter_images(&html, chapter_url)
    }
}
