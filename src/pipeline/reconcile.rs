//! Diffing a fresh scrape against what is already stored.
//!
//! Sites list chapters newest first. Everything here works on that native
//! order and hands back chapters in reading order, numbered.

use std::collections::HashSet;

use crate::model::{Manga, NewChapter, NewManga, ScrapedChapter, ScrapedManga};

pub fn compose_chapter_slug(manga_slug: &str, site_chapter_slug: &str) -> String {
    format!("{}{}", manga_slug, site_chapter_slug)
}

/// Drops repeated chapter entries, keeping the first one the site lists.
pub fn dedupe_chapters(chapters: &mut Vec<ScrapedChapter>) -> usize {
    let before = chapters.len();
    let mut seen = HashSet::new();
    chapters.retain(|chapter| seen.insert(chapter.slug.clone()));

    before - chapters.len()
}

fn number_chapters<'a>(
    manga_slug: &str,
    native_order: impl DoubleEndedIterator<Item = &'a ScrapedChapter>,
    first_number: i32,
) -> Vec<NewChapter> {
    native_order
        .rev()
        .zip(first_number..)
        .map(|(chapter, chapter_number)| NewChapter {
            chapter_number,
            title: chapter.title.clone(),
            slug: compose_chapter_slug(manga_slug, &chapter.slug),
            url_scrape: chapter.url.clone(),
        })
        .collect()
}

/// Full record for a manga seen for the first time, chapters numbered `1..=N`.
pub fn plan_new_manga(scraped: &ScrapedManga, cover_image_url: String) -> NewManga {
    let mut seen = HashSet::new();
    let unique: Vec<&ScrapedChapter> = scraped
        .chapters
        .iter()
        .filter(|chapter| seen.insert(chapter.slug.clone()))
        .collect();

    NewManga {
        title: scraped.title.clone(),
        alternative_title: scraped.alternative_title.clone(),
        slug: scraped.title_slug.clone(),
        description: scraped.description.clone(),
        cover_image_url,
        serialization: scraped.serialization.clone(),
        authors: scraped.authors.clone(),
        genres: scraped.genres.clone(),
        types: scraped.types.clone(),
        chapters: number_chapters(&scraped.title_slug, unique.into_iter(), 1),
    }
}

/// Chapters whose composite slug is not stored yet, numbered after the stored ones.
pub fn new_chapters(scraped: &ScrapedManga, existing: &Manga) -> Vec<NewChapter> {
    let known: HashSet<&str> = existing.chapters.iter().map(|c| c.slug.as_str()).collect();
    let mut seen = HashSet::new();

    let fresh: Vec<&ScrapedChapter> = scraped
        .chapters
        .iter()
        .filter(|chapter| {
            let slug = compose_chapter_slug(&existing.slug, &chapter.slug);
            !known.contains(slug.as_str()) && seen.insert(slug)
        })
        .collect();

    let next_number = i32::try_from(existing.chapters.len())
        .unwrap_or(i32::MAX - 1)
        .saturating_add(1);

    number_chapters(&existing.slug, fresh.into_iter(), next_number)
}
