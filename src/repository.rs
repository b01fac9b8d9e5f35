//! Persistence seams used by the pipeline and the HTTP layer.
//!
//! `PgStore` in [`crate::db`] is the production implementation. Anything that
//! implements both traits is a [`Store`].

use async_trait::async_trait;

use crate::{
    db::error::DatabaseError,
    model::{Chapter, Job, JobStatus, Manga, MangaSummary, NewChapter, NewManga, NewPage, Page},
};

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create_job(&self, url: &str, job_type: &str) -> Result<Job, DatabaseError>;

    async fn get_job(&self, job_id: i64) -> Result<Job, DatabaseError>;

    /// Newest first.
    async fn list_jobs(&self) -> Result<Vec<Job>, DatabaseError>;

    async fn count_ongoing_jobs(&self) -> Result<i64, DatabaseError>;

    async fn list_jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, DatabaseError>;

    async fn update_job_status(
        &self,
        job_id: i64,
        is_complete: bool,
        status: JobStatus,
    ) -> Result<(), DatabaseError>;

    /// Returns jobs left `updated` by an interrupted refresh to `complete`,
    /// so the next scheduled run picks them up again.
    async fn restore_interrupted_refreshes(&self) -> Result<u64, DatabaseError>;
}

#[async_trait]
pub trait MangaRepository: Send + Sync {
    /// Loads authors, genres, types and chapters (ordered by number).
    async fn find_manga_by_slug(&self, slug: &str) -> Result<Option<Manga>, DatabaseError>;

    async fn list_manga(&self, limit: i64, offset: i64) -> Result<Vec<MangaSummary>, DatabaseError>;

    /// Manga, taxonomy links and chapters in one transaction.
    async fn create_manga(&self, manga: &NewManga) -> Result<Manga, DatabaseError>;

    async fn create_chapter(
        &self,
        manga_id: i64,
        chapter: &NewChapter,
    ) -> Result<Chapter, DatabaseError>;

    async fn create_page(&self, page: &NewPage) -> Result<Page, DatabaseError>;
}

pub trait Store: JobRepository + MangaRepository {}

impl<T> Store for T where T: JobRepository + MangaRepository {}
