//! Headless browser seam used by the site adapters.
//!
//! A [`BrowserLauncher`] starts one isolated [`BrowserSession`] per job. Pages
//! opened from a session are closed by the caller; the session itself is
//! closed by value so it cannot be released twice.

use async_trait::async_trait;

pub mod chrome;

pub use chrome::ChromeLauncher;

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigates and waits for the load to finish, bounded by the navigation timeout.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Rendered HTML of the current document.
    async fn content(&self) -> Result<String, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Content extraction failed: {0}")]
    Content(String),
}
