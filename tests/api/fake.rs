use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexa_crawler::{
    browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession},
    db::error::DatabaseError,
    model::{
        Chapter, Job, JobPayload, JobStatus, Manga, MangaSummary, NewChapter, NewManga, NewPage,
        Page,
    },
    notification::Notifier,
    queue::{Delivery, JobQueue},
    repository::{JobRepository, MangaRepository},
    storage::{ImageTransfer, StorageError},
};

// ---------------------------------------------------------------------------
// Store

#[derive(Default)]
struct StoreData {
    jobs: Vec<Job>,
    manga: Vec<Manga>,
    pages: Vec<Page>,
    next_id: i64,
}

impl StoreData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn chapter_slug_taken(&self, slug: &str) -> bool {
        self.manga
            .iter()
            .flat_map(|m| m.chapters.iter())
            .any(|c| c.slug == slug)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
    fail_status_updates: AtomicBool,
}

impl MemoryStore {
    pub fn fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    pub fn job(&self, job_id: i64) -> Job {
        let data = self.data.lock().unwrap();
        data.jobs.iter().find(|j| j.id == job_id).cloned().unwrap()
    }

    pub fn set_job_status(&self, job_id: i64, is_complete: bool, status: JobStatus) {
        let mut data = self.data.lock().unwrap();
        let job = data.jobs.iter_mut().find(|j| j.id == job_id).unwrap();
        job.is_complete = is_complete;
        job.status = status;
    }

    pub fn manga_count(&self) -> usize {
        self.data.lock().unwrap().manga.len()
    }

    pub fn manga(&self, slug: &str) -> Manga {
        let data = self.data.lock().unwrap();
        let mut manga = data.manga.iter().find(|m| m.slug == slug).cloned().unwrap();
        manga.chapters.sort_by_key(|c| c.chapter_number);
        manga
    }

    /// Pages of a chapter ordered by page number.
    pub fn pages(&self, chapter_id: i64) -> Vec<Page> {
        let data = self.data.lock().unwrap();
        let mut pages: Vec<Page> = data
            .pages
            .iter()
            .filter(|p| p.chapter_id == chapter_id)
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.page_number);
        pages
    }

    pub fn page_count(&self) -> usize {
        self.data.lock().unwrap().pages.len()
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn create_job(&self, url: &str, job_type: &str) -> Result<Job, DatabaseError> {
        let mut data = self.data.lock().unwrap();
        if data.jobs.iter().any(|j| j.url == url) {
            return Err(DatabaseError::Conflict(format!(
                "duplicate key value violates unique constraint \"jobs_url_key\": {}",
                url
            )));
        }

        let job = Job {
            id: data.next_id(),
            url: url.to_string(),
            job_type: job_type.to_string(),
            status: JobStatus::Pending,
            is_complete: false,
            created_at: Utc::now(),
        };
        data.jobs.push(job.clone());

        Ok(job)
    }

    async fn get_job(&self, job_id: i64) -> Result<Job, DatabaseError> {
        let data = self.data.lock().unwrap();
        data.jobs
            .iter()
            .find(|j| j.id == job_id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, DatabaseError> {
        let mut jobs = self.data.lock().unwrap().jobs.clone();
        jobs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(jobs)
    }

    async fn count_ongoing_jobs(&self) -> Result<i64, DatabaseError> {
        let data = self.data.lock().unwrap();
        Ok(data.jobs.iter().filter(|j| !j.is_complete).count() as i64)
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, DatabaseError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .jobs
            .iter()
            .filter(|j| j.status == status)
            .cloned()
            .collect())
    }

    async fn update_job_status(
        &self,
        job_id: i64,
        is_complete: bool,
        status: JobStatus,
    ) -> Result<(), DatabaseError> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(DatabaseError::DatabaseError(sqlx::Error::PoolTimedOut));
        }

        let mut data = self.data.lock().unwrap();
        let job = data
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or(DatabaseError::NotFound)?;
        job.is_complete = is_complete;
        job.status = status;

        Ok(())
    }

    async fn restore_interrupted_refreshes(&self) -> Result<u64, DatabaseError> {
        let mut data = self.data.lock().unwrap();
        let mut restored = 0;
        for job in data
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Updated && !j.is_complete)
        {
            job.status = JobStatus::Complete;
            job.is_complete = true;
            restored += 1;
        }
        Ok(restored)
    }
}

#[async_trait]
impl MangaRepository for MemoryStore {
    async fn find_manga_by_slug(&self, slug: &str) -> Result<Option<Manga>, DatabaseError> {
        let data = self.data.lock().unwrap();
        Ok(data.manga.iter().find(|m| m.slug == slug).cloned().map(|mut m| {
            m.chapters.sort_by_key(|c| c.chapter_number);
            m
        }))
    }

    async fn list_manga(&self, limit: i64, offset: i64) -> Result<Vec<MangaSummary>, DatabaseError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .manga
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|m| MangaSummary {
                id: m.id,
                title: m.title.clone(),
                slug: m.slug.clone(),
                cover_image_url: m.cover_image_url.clone(),
                view_count: m.view_count,
                chapter_count: m.chapters.len() as i64,
            })
            .collect())
    }

    async fn create_manga(&self, manga: &NewManga) -> Result<Manga, DatabaseError> {
        let mut data = self.data.lock().unwrap();
        if data.manga.iter().any(|m| m.slug == manga.slug) {
            return Err(DatabaseError::Conflict(format!(
                "manga slug {} already exists",
                manga.slug
            )));
        }
        if let Some(taken) = manga
            .chapters
            .iter()
            .find(|c| data.chapter_slug_taken(&c.slug))
        {
            return Err(DatabaseError::Conflict(format!(
                "chapter slug {} already exists",
                taken.slug
            )));
        }

        let manga_id = data.next_id();
        let mut chapters = Vec::new();
        for chapter in &manga.chapters {
            chapters.push(Chapter {
                id: data.next_id(),
                manga_id,
                chapter_number: chapter.chapter_number,
                title: chapter.title.clone(),
                slug: chapter.slug.clone(),
                url_scrape: chapter.url_scrape.clone(),
            });
        }

        let created = Manga {
            id: manga_id,
            title: manga.title.clone(),
            alternative_title: manga.alternative_title.clone(),
            slug: manga.slug.clone(),
            description: manga.description.clone(),
            cover_image_url: manga.cover_image_url.clone(),
            serialization: manga.serialization.clone(),
            release_date: Utc::now(),
            view_count: 0,
            authors: manga.authors.clone(),
            genres: manga.genres.clone(),
            types: manga.types.clone(),
            chapters,
        };
        data.manga.push(created.clone());

        Ok(created)
    }

    async fn create_chapter(
        &self,
        manga_id: i64,
        chapter: &NewChapter,
    ) -> Result<Chapter, DatabaseError> {
        let mut data = self.data.lock().unwrap();
        if data.chapter_slug_taken(&chapter.slug) {
            return Err(DatabaseError::Conflict(format!(
                "chapter slug {} already exists",
                chapter.slug
            )));
        }

        let id = data.next_id();
        let manga = data
            .manga
            .iter_mut()
            .find(|m| m.id == manga_id)
            .ok_or(DatabaseError::NotFound)?;
        let created = Chapter {
            id,
            manga_id,
            chapter_number: chapter.chapter_number,
            title: chapter.title.clone(),
            slug: chapter.slug.clone(),
            url_scrape: chapter.url_scrape.clone(),
        };
        manga.chapters.push(created.clone());

        Ok(created)
    }

    async fn create_page(&self, page: &NewPage) -> Result<Page, DatabaseError> {
        let mut data = self.data.lock().unwrap();
        let created = Page {
            id: data.next_id(),
            chapter_id: page.chapter_id,
            image_url: page.image_url.clone(),
            page_number: page.page_number,
        };
        data.pages.push(created.clone());

        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// Queue

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Waiting,
    Active,
    Dead,
}

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub delivery: Delivery,
    pub status: EntryStatus,
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

pub struct MemoryQueue {
    entries: Mutex<Vec<QueueEntry>>,
    enqueued: AtomicUsize,
    max_attempts: i32,
}

impl MemoryQueue {
    pub fn new(max_attempts: i32) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            enqueued: AtomicUsize::new(0),
            max_attempts,
        }
    }

    pub fn entries(&self) -> Vec<QueueEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn update(&self, delivery: &Delivery, change: impl FnOnce(&mut QueueEntry)) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.delivery.id == delivery.id) {
            change(entry);
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, payload: &JobPayload) -> Result<(), DatabaseError> {
        let id = self.enqueued.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        let mut entries = self.entries.lock().unwrap();
        entries.push(QueueEntry {
            delivery: Delivery {
                id,
                payload: payload.clone(),
                attempts: 0,
                max_attempts: self.max_attempts,
            },
            status: EntryStatus::Waiting,
            available_at: Utc::now(),
            last_error: None,
        });

        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, DatabaseError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();

        Ok(entries
            .iter_mut()
            .find(|e| e.status == EntryStatus::Waiting && e.available_at <= now)
            .map(|entry| {
                entry.status = EntryStatus::Active;
                entry.delivery.attempts += 1;
                entry.delivery.clone()
            }))
    }

    async fn complete(&self, delivery: &Delivery) -> Result<(), DatabaseError> {
        self.entries
            .lock()
            .unwrap()
            .retain(|e| e.delivery.id != delivery.id);
        Ok(())
    }

    async fn retry(
        &self,
        delivery: &Delivery,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), DatabaseError> {
        self.update(delivery, |e| {
            e.status = EntryStatus::Waiting;
            e.available_at = available_at;
            e.last_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn bury(&self, delivery: &Delivery, error: &str) -> Result<(), DatabaseError> {
        self.update(delivery, |e| {
            e.status = EntryStatus::Dead;
            e.available_at = Utc::now();
            e.last_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn requeue_stalled(&self) -> Result<u64, DatabaseError> {
        let mut entries = self.entries.lock().unwrap();
        let mut requeued = 0;
        for entry in entries.iter_mut().filter(|e| e.status == EntryStatus::Active) {
            entry.status = EntryStatus::Waiting;
            requeued += 1;
        }
        Ok(requeued)
    }

    async fn prune_dead(&self, before: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut entries = self.entries.lock().unwrap();
        let count = entries.len();
        entries.retain(|e| !(e.status == EntryStatus::Dead && e.available_at < before));
        Ok((count - entries.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Browser

#[derive(Default)]
pub struct BrowserStats {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    open_sessions: AtomicUsize,
    pub max_open_sessions: AtomicUsize,
}

/// Serves canned HTML by URL. Unknown URLs fail navigation.
#[derive(Default)]
pub struct FakeLauncher {
    web: Arc<Mutex<HashMap<String, String>>>,
    pub stats: Arc<BrowserStats>,
}

impl FakeLauncher {
    pub fn serve(&self, url: &str, html: String) {
        self.web.lock().unwrap().insert(url.to_string(), html);
    }

    pub fn unserve(&self, url: &str) {
        self.web.lock().unwrap().remove(url);
    }

    pub fn launches(&self) -> usize {
        self.stats.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        let open = self.stats.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_open_sessions.fetch_max(open, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            web: self.web.clone(),
            stats: self.stats.clone(),
        }))
    }
}

struct FakeSession {
    web: Arc<Mutex<HashMap<String, String>>>,
    stats: Arc<BrowserStats>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakePage {
            web: self.web.clone(),
            stats: self.stats.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.stats.open_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    web: Arc<Mutex<HashMap<String, String>>>,
    stats: Arc<BrowserStats>,
    current: Mutex<Option<String>>,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let html = self.web.lock().unwrap().get(url).cloned();
        match html {
            Some(html) => {
                *self.current.lock().unwrap() = Some(html);
                Ok(())
            }
            None => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BrowserError::Content("about:blank".to_string()))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Image transfer

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub source_url: String,
    pub title: String,
    pub subtitle: String,
}

#[derive(Default)]
pub struct FakeImageTransfer {
    uploads: Mutex<Vec<Upload>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeImageTransfer {
    pub fn fail_for(&self, source_url: &str) {
        self.failing.lock().unwrap().insert(source_url.to_string());
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageTransfer for FakeImageTransfer {
    async fn upload(
        &self,
        source_url: &str,
        title: &str,
        subtitle: &str,
    ) -> Result<String, StorageError> {
        if self.failing.lock().unwrap().contains(source_url) {
            return Err(StorageError::Status {
                url: source_url.to_string(),
                status: 404,
            });
        }

        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(Upload {
            source_url: source_url.to_string(),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
        });

        Ok(format!(
            "https://blob.test/{}/{}/{}.jpg",
            title,
            subtitle,
            uploads.len()
        ))
    }
}

// ---------------------------------------------------------------------------
// Notifier

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m == text)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}
