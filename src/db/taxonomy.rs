use sqlx::PgPool;

use crate::model::Taxonomy;

use super::{PostgresTransaction, error::DatabaseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Author,
    Genre,
    Type,
}

impl TaxonomyKind {
    fn table(&self) -> &'static str {
        match self {
            TaxonomyKind::Author => "authors",
            TaxonomyKind::Genre => "genres",
            TaxonomyKind::Type => "types",
        }
    }

    fn link_table(&self) -> &'static str {
        match self {
            TaxonomyKind::Author => "manga_authors",
            TaxonomyKind::Genre => "manga_genres",
            TaxonomyKind::Type => "manga_types",
        }
    }

    fn link_column(&self) -> &'static str {
        match self {
            TaxonomyKind::Author => "author_id",
            TaxonomyKind::Genre => "genre_id",
            TaxonomyKind::Type => "type_id",
        }
    }
}

/// Reuses the row with the same slug or creates it, then links it to the manga.
///
/// The no-op `DO UPDATE` makes `RETURNING` yield the id on conflict as well, so
/// two jobs racing on the same slug end up pointing at one row.
pub async fn connect_or_create(
    tx: &mut PostgresTransaction,
    kind: TaxonomyKind,
    manga_id: i64,
    entries: &[Taxonomy],
) -> Result<(), DatabaseError> {
    let upsert = format!(
        r#"
        INSERT INTO {table}
            (name, slug)
        VALUES
            ($1, $2)
        ON CONFLICT (slug)
        DO UPDATE SET slug = EXCLUDED.slug
        RETURNING id;
    "#,
        table = kind.table()
    );
    let link = format!(
        r#"
        INSERT INTO {link_table}
            (manga_id, {link_column})
        VALUES
            ($1, $2)
        ON CONFLICT DO NOTHING;
    "#,
        link_table = kind.link_table(),
        link_column = kind.link_column()
    );

    for entry in entries {
        let id: i64 = sqlx::query_scalar(&upsert)
            .bind(&entry.name)
            .bind(&entry.slug)
            .fetch_one(&mut **tx)
            .await?;

        sqlx::query(&link)
            .bind(manga_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[tracing::instrument(name = "get manga taxonomy", skip(pool))]
pub async fn get_taxonomy_for_manga(
    pool: &PgPool,
    kind: TaxonomyKind,
    manga_id: i64,
) -> Result<Vec<Taxonomy>, DatabaseError> {
    let query = format!(
        r#"
        SELECT
            {table}.name, {table}.slug
        FROM
            {link_table}
        INNER JOIN
            {table} ON {link_table}.{link_column} = {table}.id
        WHERE
            {link_table}.manga_id = $1
        ORDER BY {table}.name;
    "#,
        table = kind.table(),
        link_table = kind.link_table(),
        link_column = kind.link_column()
    );

    let rows: Vec<(String, String)> = sqlx::query_as(&query)
        .bind(manga_id)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(name, slug)| Taxonomy { name, slug })
        .collect())
}
