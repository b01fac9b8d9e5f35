use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::model::{Chapter, NewChapter, NewPage, Page};

use super::{PostgresTransaction, error::DatabaseError};

#[tracing::instrument(name = "get chapters by manga", skip(pool))]
pub async fn get_chapters_by_manga(
    pool: &PgPool,
    manga_id: i64,
) -> Result<Vec<Chapter>, DatabaseError> {
    let chapters = sqlx::query_as::<_, Chapter>(
        r#"
        SELECT
            id, manga_id, chapter_number, title, slug, url_scrape
        FROM
            chapters
        WHERE
            manga_id = $1
        ORDER BY chapter_number;
    "#,
    )
    .bind(manga_id)
    .fetch_all(pool)
    .await?;

    Ok(chapters)
}

pub async fn insert_chapters(
    tx: &mut PostgresTransaction,
    manga_id: i64,
    data: &[NewChapter],
) -> Result<Vec<Chapter>, DatabaseError> {
    let mut chapters = Vec::with_capacity(data.len());

    for batch in data.chunks(300) {
        let mut chapter_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO chapters
                (manga_id, chapter_number, title, slug, url_scrape)
        "#,
        );

        chapter_builder.push_values(batch, |mut b, chapter| {
            b.push_bind(manga_id)
                .push_bind(chapter.chapter_number)
                .push_bind(&chapter.title)
                .push_bind(&chapter.slug)
                .push_bind(&chapter.url_scrape);
        });
        chapter_builder.push(" RETURNING id, manga_id, chapter_number, title, slug, url_scrape;");

        let inserted = chapter_builder
            .build_query_as::<Chapter>()
            .fetch_all(&mut **tx)
            .await?;
        chapters.extend(inserted);
    }

    chapters.sort_by_key(|c| c.chapter_number);

    Ok(chapters)
}

#[tracing::instrument(name = "create chapter", skip(pool, chapter), fields(slug = %chapter.slug, number = chapter.chapter_number))]
pub async fn create_chapter(
    pool: &PgPool,
    manga_id: i64,
    chapter: &NewChapter,
) -> Result<Chapter, DatabaseError> {
    let chapter = sqlx::query_as::<_, Chapter>(
        r#"
        INSERT INTO chapters
            (manga_id, chapter_number, title, slug, url_scrape)
        VALUES
            ($1, $2, $3, $4, $5)
        RETURNING
            id, manga_id, chapter_number, title, slug, url_scrape;
    "#,
    )
    .bind(manga_id)
    .bind(chapter.chapter_number)
    .bind(&chapter.title)
    .bind(&chapter.slug)
    .bind(&chapter.url_scrape)
    .fetch_one(pool)
    .await?;

    Ok(chapter)
}

#[tracing::instrument(name = "create page", skip(pool, page), fields(chapter_id = page.chapter_id, page_number = page.page_number))]
pub async fn create_page(pool: &PgPool, page: &NewPage) -> Result<Page, DatabaseError> {
    let page = sqlx::query_as::<_, Page>(
        r#"
        INSERT INTO pages
            (chapter_id, image_url, page_number)
        VALUES
            ($1, $2, $3)
        RETURNING
            id, chapter_id, image_url, page_number;
    "#,
    )
    .bind(page.chapter_id)
    .bind(&page.image_url)
    .bind(page.page_number)
    .fetch_one(pool)
    .await?;

    Ok(page)
}
