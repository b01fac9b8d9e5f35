use chrono::{DateTime, Utc};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Complete,
    Failed,
    Updated,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Updated => "updated",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "complete" => Ok(JobStatus::Complete),
            "failed" => Ok(JobStatus::Failed),
            "updated" => Ok(JobStatus::Updated),
            other => Err(format!("Invalid job status: {}", other)),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: i64,
    pub url: String,
    pub job_type: String,
    pub status: JobStatus,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct JobList {
    pub jobs: Vec<Job>,
    pub on_going_jobs_count: i64,
}

/// What the queue carries for one scrape request.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobPayload {
    pub job_id: i64,
    pub url: String,
    pub job_type: String,
}

impl From<&Job> for JobPayload {
    fn from(job: &Job) -> Self {
        JobPayload {
            job_id: job.id,
            url: job.url.clone(),
            job_type: job.job_type.clone(),
        }
    }
}

/// Author, genre or type. Looked up by slug, created when missing.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Taxonomy {
    pub name: String,
    pub slug: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Manga {
    pub id: i64,
    pub title: String,
    pub alternative_title: Option<String>,
    pub slug: String,
    pub description: String,
    pub cover_image_url: String,
    pub serialization: Option<String>,
    pub release_date: DateTime<Utc>,
    pub view_count: i64,
    pub authors: Vec<Taxonomy>,
    pub genres: Vec<Taxonomy>,
    pub types: Vec<Taxonomy>,
    pub chapters: Vec<Chapter>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MangaSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub cover_image_url: String,
    pub view_count: i64,
    pub chapter_count: i64,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Chapter {
    pub id: i64,
    pub manga_id: i64,
    pub chapter_number: i32,
    pub title: String,
    pub slug: String,
    pub url_scrape: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Page {
    pub id: i64,
    pub chapter_id: i64,
    pub image_url: String,
    pub page_number: i32,
}

/// Adapter output. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrapedManga {
    pub title: String,
    pub alternative_title: Option<String>,
    pub title_slug: String,
    pub description: String,
    pub cover_image_url: String,
    pub serialization: Option<String>,
    pub authors: Vec<Taxonomy>,
    pub genres: Vec<Taxonomy>,
    pub types: Vec<Taxonomy>,
    /// Site-native order, usually newest first.
    pub chapters: Vec<ScrapedChapter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedChapter {
    pub title: String,
    pub slug: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewManga {
    pub title: String,
    pub alternative_title: Option<String>,
    pub slug: String,
    pub description: String,
    pub cover_image_url: String,
    pub serialization: Option<String>,
    pub authors: Vec<Taxonomy>,
    pub genres: Vec<Taxonomy>,
    pub types: Vec<Taxonomy>,
    pub chapters: Vec<NewChapter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChapter {
    pub chapter_number: i32,
    pub title: String,
    pub slug: String,
    pub url_scrape: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub chapter_id: i64,
    pub image_url: String,
    pub page_number: i32,
}
