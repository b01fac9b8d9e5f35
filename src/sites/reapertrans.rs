use async_trait::async_trait;

use crate::{browser::BrowserPage, model::ScrapedManga};

use super::{ScrapeError, ScraperKind, SiteScraper, layout::SiteLayout, load_html};

/// MangaThemesia theme as served by reapertrans.
pub const LAYOUT: SiteLayout = SiteLayout {
    title: &["h1.entry-title", ".infox h1"],
    alternative_title: &[".seriestualt", ".alternative"],
    description: &[".entry-content[itemprop='description']", ".entry-content"],
    cover: &[".thumb img", ".thumbook img"],
    info_rows: ".imptdt, .fmed",
    alternative_labels: &["Alternative"],
    author_labels: &["Author", "Artist"],
    serialization_labels: &["Serialization"],
    type_labels: &["Type"],
    genres: &[".mgen a", ".seriestugenre a"],
    chapter_items: "#chapterlist li",
    chapter_link: "a",
    chapter_title: &[".chapternum"],
    chapter_images: &["#readerarea img"],
};

pub struct ReaperTransScraper;

#[async_trait]
impl SiteScraper for ReaperTransScraper {
    fn kind(&self) -> ScraperKind {
        ScraperKind::ReaperTrans
    }

    #[tracing::instrument(name = "scrape reapertrans manga", skip(self, page))]
    async fn scrape_manga(
        &self,
        page: &dyn BrowserPage,
        url: &str,
    ) -> Result<ScrapedManga, ScrapeError> {
        let html = load_html(page, url).await?;
        LAYOUT.parse_manga(&html, url)
    }

    #[tracing::instrument(name = "scrape reapertrans chapter", skip(self, page))]
    async fn scrape_chapter_images(
        &self,
        page: &dyn BrowserPage,
        chapter_url: &str,
    ) -> Result<Vec<String>, ScrapeError> {
        let html = load_html(page, chapter_url).await?;
        LAYOUT.parse_chapter_images(&html, chapter_url)
    }
}
