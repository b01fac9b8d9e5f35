use std::sync::Arc;

use crate::{jobs::JobService, repository::Store, sites::ScraperRegistry};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jobs: JobService,
    pub scrapers: Arc<ScraperRegistry>,
}

pub type SharedAppState = Arc<AppState>;
