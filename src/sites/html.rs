//! Small helpers over the `scraper` crate shared by every site adapter.

use scraper::{ElementRef, Html, Selector};

use crate::model::Taxonomy;

use super::ScrapeError;

pub fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{}: {}", css, e)))
}

/// Whitespace-collapsed text of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match, `None` when missing or blank.
pub fn first_text(document: &Html, css: &str) -> Result<Option<String>, ScrapeError> {
    let selector = selector(css)?;

    Ok(document
        .select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty()))
}

pub fn first_attr(document: &Html, css: &str, attr: &str) -> Result<Option<String>, ScrapeError> {
    let selector = selector(css)?;

    Ok(document
        .select(&selector)
        .filter_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty()))
}

/// Image source, honouring the attributes lazy loaders park the real URL in.
pub fn image_source(element: ElementRef<'_>) -> Option<String> {
    ["data-src", "data-lazy-src", "data-original", "src"]
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty() && !v.starts_with("data:"))
        .map(str::to_string)
}

pub fn first_image(document: &Html, css: &str) -> Result<Option<String>, ScrapeError> {
    let selector = selector(css)?;

    Ok(document.select(&selector).find_map(image_source))
}

pub fn images(document: &Html, css: &str) -> Result<Vec<String>, ScrapeError> {
    let selector = selector(css)?;

    Ok(document.select(&selector).filter_map(image_source).collect())
}

/// Links under `css` turned into name/slug pairs, slug taken from the href.
pub fn taxonomy_links(document: &Html, css: &str) -> Result<Vec<Taxonomy>, ScrapeError> {
    let selector = selector(css)?;

    Ok(link_taxonomy(document.select(&selector)))
}

pub fn link_taxonomy<'a>(links: impl Iterator<Item = ElementRef<'a>>) -> Vec<Taxonomy> {
    let mut entries: Vec<Taxonomy> = Vec::new();

    for link in links {
        let name = element_text(link);
        if name.is_empty() {
            continue;
        }
        let slug = link
            .value()
            .attr("href")
            .and_then(last_path_segment)
            .unwrap_or_else(|| slugify(&name));

        if !entries.iter().any(|e| e.slug == slug) {
            entries.push(Taxonomy { name, slug });
        }
    }

    entries
}

/// Splits free text like "A, B / C" into taxonomy entries.
pub fn taxonomy_from_text(text: &str) -> Vec<Taxonomy> {
    let mut entries: Vec<Taxonomy> = Vec::new();

    for name in text.split([',', '/', '|']).map(str::trim) {
        if name.is_empty() || name == "-" {
            continue;
        }
        let slug = slugify(name);
        if !slug.is_empty() && !entries.iter().any(|e| e.slug == slug) {
            entries.push(Taxonomy {
                name: name.to_string(),
                slug,
            });
        }
    }

    entries
}

pub fn last_path_segment(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
}

/// Lowercase, alphanumerics kept (any script), everything else collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Site chapter slug: the chapter URL's last segment minus the manga slug prefix.
///
/// `solo-leveling` + `.../solo-leveling-chapter-1/` gives `-chapter-1`, so the
/// composite `{manga}{chapter}` reads as the original segment.
pub fn chapter_slug(title_slug: &str, chapter_url: &str) -> Option<String> {
    let segment = last_path_segment(chapter_url)?;

    match segment.strip_prefix(title_slug) {
        Some(rest) if !rest.is_empty() => Some(rest.to_string()),
        _ => Some(format!("-{}", segment)),
    }
}

/// Resolves relative links against the page URL.
pub fn absolute_url(base: &str, href: &str) -> String {
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}
