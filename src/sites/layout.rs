//! Selector tables for the WordPress manga themes the supported sites run on.
//!
//! Every field is a list of fallbacks tried in order, so small theme
//! revisions only need an extra selector rather than new code.

use scraper::{ElementRef, Html};

use crate::model::{ScrapedChapter, ScrapedManga, Taxonomy};

use super::{
    ScrapeError,
    html::{
        absolute_url, chapter_slug, element_text, first_image, first_text, images,
        last_path_segment, link_taxonomy, selector, taxonomy_from_text, taxonomy_links,
    },
};

#[derive(Debug, Clone, Copy)]
pub struct SiteLayout {
    pub title: &'static [&'static str],
    pub alternative_title: &'static [&'static str],
    pub description: &'static [&'static str],
    pub cover: &'static [&'static str],
    /// Rows shaped like `<label> <value>`, e.g. "Author Chugong".
    pub info_rows: &'static str,
    pub alternative_labels: &'static [&'static str],
    pub author_labels: &'static [&'static str],
    pub serialization_labels: &'static [&'static str],
    pub type_labels: &'static [&'static str],
    pub genres: &'static [&'static str],
    pub chapter_items: &'static str,
    pub chapter_link: &'static str,
    pub chapter_title: &'static [&'static str],
    pub chapter_images: &'static [&'static str],
}

fn first_text_of(document: &Html, candidates: &[&str]) -> Result<Option<String>, ScrapeError> {
    for css in candidates {
        if let Some(text) = first_text(document, css)? {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

fn first_image_of(document: &Html, candidates: &[&str]) -> Result<Option<String>, ScrapeError> {
    for css in candidates {
        if let Some(src) = first_image(document, css)? {
            return Ok(Some(src));
        }
    }
    Ok(None)
}

fn strip_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let head = text.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    Some(text[label.len()..].trim_start_matches([':', ' ']).trim())
}

impl SiteLayout {
    fn labelled_row<'a>(
        &self,
        document: &'a Html,
        labels: &[&str],
    ) -> Result<Option<(ElementRef<'a>, String)>, ScrapeError> {
        if self.info_rows.is_empty() || labels.is_empty() {
            return Ok(None);
        }
        let rows = selector(self.info_rows)?;

        for row in document.select(&rows) {
            let text = element_text(row);
            for label in labels {
                if let Some(value) = strip_label(&text, label) {
                    return Ok(Some((row, value.to_string())));
                }
            }
        }

        Ok(None)
    }

    fn labelled_value(&self, document: &Html, labels: &[&str]) -> Result<Option<String>, ScrapeError> {
        Ok(self
            .labelled_row(document, labels)?
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty() && value != "-"))
    }

    /// Links inside the labelled row, or its text split on separators.
    fn labelled_taxonomy(&self, document: &Html, labels: &[&str]) -> Result<Vec<Taxonomy>, ScrapeError> {
        let Some((row, value)) = self.labelled_row(document, labels)? else {
            return Ok(Vec::new());
        };

        let links = selector("a")?;
        let mut entries = link_taxonomy(row.select(&links));

        if entries.is_empty() {
            entries = taxonomy_from_text(&value);
        }

        Ok(entries)
    }

    fn genres(&self, document: &Html) -> Result<Vec<Taxonomy>, ScrapeError> {
        for css in self.genres {
            let entries = taxonomy_links(document, css)?;
            if !entries.is_empty() {
                return Ok(entries);
            }
        }
        Ok(Vec::new())
    }

    fn chapters(&self, document: &Html, url: &str, title_slug: &str) -> Result<Vec<ScrapedChapter>, ScrapeError> {
        let items = selector(self.chapter_items)?;
        let link = selector(self.chapter_link)?;
        let titles = self
            .chapter_title
            .iter()
            .map(|css| selector(css))
            .collect::<Result<Vec<_>, _>>()?;

        let mut chapters = Vec::new();
        for item in document.select(&items) {
            let Some(anchor) = item.select(&link).next().or_else(|| {
                (item.value().name() == "a").then_some(item)
            }) else {
                continue;
            };
            let Some(href) = anchor.value().attr("href").map(str::trim).filter(|h| !h.is_empty())
            else {
                continue;
            };
            let chapter_url = absolute_url(url, href);
            let Some(slug) = chapter_slug(title_slug, &chapter_url) else {
                continue;
            };

            let title = titles
                .iter()
                .find_map(|sel| {
                    item.select(sel)
                        .map(element_text)
                        .find(|t| !t.is_empty())
                })
                .unwrap_or_else(|| element_text(anchor));

            chapters.push(ScrapedChapter {
                title,
                slug,
                url: chapter_url,
            });
        }

        Ok(chapters)
    }

    pub fn parse_manga(&self, html: &str, url: &str) -> Result<ScrapedManga, ScrapeError> {
        let document = Html::parse_document(html);
        let missing = |field| ScrapeError::MissingField {
            field,
            url: url.to_string(),
        };

        let title_slug = last_path_segment(url).ok_or_else(|| missing("slug"))?;
        let title = first_text_of(&document, self.title)?.ok_or_else(|| missing("title"))?;
        let cover_image_url = first_image_of(&document, self.cover)?
            .map(|src| absolute_url(url, &src))
            .ok_or_else(|| missing("cover image"))?;

        let alternative_title = match first_text_of(&document, self.alternative_title)? {
            Some(alt) => Some(alt),
            None => self.labelled_value(&document, self.alternative_labels)?,
        }
        .filter(|alt| alt != &title);

        let description = first_text_of(&document, self.description)?.unwrap_or_default();
        let serialization = self.labelled_value(&document, self.serialization_labels)?;
        let authors = self.labelled_taxonomy(&document, self.author_labels)?;
        let types = self.labelled_taxonomy(&document, self.type_labels)?;
        let genres = self.genres(&document)?;
        let chapters = self.chapters(&document, url, &title_slug)?;

        Ok(ScrapedManga {
            title,
            alternative_title,
            title_slug,
            description,
            cover_image_url,
            serialization,
            authors,
            genres,
            types,
            chapters,
        })
    }

    /// Empty when the reader shows nothing, as on locked chapters.
    pub fn parse_chapter_images(&self, html: &str, url: &str) -> Result<Vec<String>, ScrapeError> {
        let document = Html::parse_document(html);

        for css in self.chapter_images {
            let found = images(&document, css)?;
            if !found.is_empty() {
                return Ok(found.into_iter().map(|src| absolute_url(url, &src)).collect());
            }
        }

        Ok(Vec::new())
    }
}
