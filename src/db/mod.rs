use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    model::{Chapter, Job, JobStatus, Manga, MangaSummary, NewChapter, NewManga, NewPage, Page},
    repository::{JobRepository, MangaRepository},
};

use error::DatabaseError;

pub mod chapter;
pub mod error;
pub mod job;
pub mod manga;
pub mod queue;
pub mod taxonomy;

pub type PostgresTransaction = Transaction<'static, Postgres>;

/// Postgres-backed [`crate::repository::Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgStore {
    async fn create_job(&self, url: &str, job_type: &str) -> Result<Job, DatabaseError> {
        job::create_job(&self.pool, url, job_type).await
    }

    async fn get_job(&self, job_id: i64) -> Result<Job, DatabaseError> {
        job::get_job(&self.pool, job_id).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, DatabaseError> {
        job::list_jobs(&self.pool).await
    }

    async fn count_ongoing_jobs(&self) -> Result<i64, DatabaseError> {
        job::count_ongoing_jobs(&self.pool).await
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, DatabaseError> {
        job::list_jobs_by_status(&self.pool, status).await
    }

    async fn update_job_status(
        &self,
        job_id: i64,
        is_complete: bool,
        status: JobStatus,
    ) -> Result<(), DatabaseError> {
        job::update_job_status(&self.pool, job_id, is_complete, status).await
    }

    async fn restore_interrupted_refreshes(&self) -> Result<u64, DatabaseError> {
        job::restore_interrupted_refreshes(&self.pool).await
    }
}

#[async_trait]
impl MangaRepository for PgStore {
    async fn find_manga_by_slug(&self, slug: &str) -> Result<Option<Manga>, DatabaseError> {
        manga::get_manga_by_slug(&self.pool, slug).await
    }

    async fn list_manga(&self, limit: i64, offset: i64) -> Result<Vec<MangaSummary>, DatabaseError> {
        manga::get_manga_with_pagination(&self.pool, limit, offset).await
    }

    async fn create_manga(&self, data: &NewManga) -> Result<Manga, DatabaseError> {
        manga::create_manga(&self.pool, data).await
    }

    async fn create_chapter(
        &self,
        manga_id: i64,
        data: &NewChapter,
    ) -> Result<Chapter, DatabaseError> {
        chapter::create_chapter(&self.pool, manga_id, data).await
    }

    async fn create_page(&self, data: &NewPage) -> Result<Page, DatabaseError> {
        chapter::create_page(&self.pool, data).await
    }
}
