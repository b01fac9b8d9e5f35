use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::model::{Manga, MangaSummary, NewManga};

use super::{
    chapter::{get_chapters_by_manga, insert_chapters},
    error::DatabaseError,
    taxonomy::{TaxonomyKind, connect_or_create, get_taxonomy_for_manga},
};

#[derive(sqlx::FromRow)]
struct MangaRow {
    id: i64,
    title: String,
    alternative_title: Option<String>,
    slug: String,
    description: String,
    cover_image_url: String,
    serialization: Option<String>,
    release_date: DateTime<Utc>,
    view_count: i64,
}

impl MangaRow {
    fn into_manga(self) -> Manga {
        Manga {
            id: self.id,
            title: self.title,
            alternative_title: self.alternative_title,
            slug: self.slug,
            description: self.description,
            cover_image_url: self.cover_image_url,
            serialization: self.serialization,
            release_date: self.release_date,
            view_count: self.view_count,
            authors: Vec::new(),
            genres: Vec::new(),
            types: Vec::new(),
            chapters: Vec::new(),
        }
    }
}

#[tracing::instrument(name = "get manga by slug", skip(pool))]
pub async fn get_manga_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Manga>, DatabaseError> {
    let manga_raw = sqlx::query_as::<_, MangaRow>(
        r#"
        SELECT
            id, title, alternative_title,
            slug, description, cover_image_url,
            serialization, release_date, view_count
        FROM
            manga
        WHERE
            slug = $1;
    "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    let mut manga = match manga_raw {
        Some(row) => row.into_manga(),
        None => return Ok(None),
    };

    manga.authors = get_taxonomy_for_manga(pool, TaxonomyKind::Author, manga.id).await?;
    manga.genres = get_taxonomy_for_manga(pool, TaxonomyKind::Genre, manga.id).await?;
    manga.types = get_taxonomy_for_manga(pool, TaxonomyKind::Type, manga.id).await?;
    manga.chapters = get_chapters_by_manga(pool, manga.id).await?;

    Ok(Some(manga))
}

#[tracing::instrument(name = "get manga with pagination", skip_all)]
pub async fn get_manga_with_pagination(
    pool: &PgPool,
    limit: i64,
    skip: i64,
) -> Result<Vec<MangaSummary>, DatabaseError> {
    let manga = sqlx::query_as::<_, MangaSummary>(
        r#"
        SELECT
            manga.id, manga.title, manga.slug,
            manga.cover_image_url, manga.view_count,
            COUNT(chapters.id) AS chapter_count
        FROM
            manga
        LEFT JOIN
            chapters ON chapters.manga_id = manga.id
        GROUP BY manga.id
        ORDER BY manga.id
        LIMIT $1
        OFFSET $2;
    "#,
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(manga)
}

#[tracing::instrument(name = "create manga", skip(pool, data), fields(slug = %data.slug, chapters = data.chapters.len()))]
pub async fn create_manga(pool: &PgPool, data: &NewManga) -> Result<Manga, DatabaseError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, MangaRow>(
        r#"
        INSERT INTO manga
            (title, alternative_title, slug, description, cover_image_url, serialization, release_date)
        VALUES
            ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING
            id, title, alternative_title,
            slug, description, cover_image_url,
            serialization, release_date, view_count;
    "#,
    )
    .bind(&data.title)
    .bind(&data.alternative_title)
    .bind(&data.slug)
    .bind(&data.description)
    .bind(&data.cover_image_url)
    .bind(&data.serialization)
    .fetch_one(&mut *tx)
    .await?;

    let manga_id = row.id;
    connect_or_create(&mut tx, TaxonomyKind::Author, manga_id, &data.authors).await?;
    connect_or_create(&mut tx, TaxonomyKind::Genre, manga_id, &data.genres).await?;
    connect_or_create(&mut tx, TaxonomyKind::Type, manga_id, &data.types).await?;
    let chapters = insert_chapters(&mut tx, manga_id, &data.chapters).await?;

    tx.commit().await?;

    let mut manga = row.into_manga();
    manga.authors = data.authors.clone();
    manga.genres = data.genres.clone();
    manga.types = data.types.clone();
    manga.chapters = chapters;

    Ok(manga)
}
