use std::{ffi::OsStr, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::{configuration, telemetry::spawn_blocking_with_tracing};

use super::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession};

/// Launches a fresh Chrome process for every session.
pub struct ChromeLauncher {
    config: configuration::Browser,
}

impl ChromeLauncher {
    pub fn new(config: configuration::Browser) -> Self {
        Self { config }
    }
}

fn launch_chrome(config: &configuration::Browser) -> Result<Browser, BrowserError> {
    let args: Vec<&OsStr> = config.args.iter().map(OsStr::new).collect();

    let options = LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(config.sandbox)
        .args(args)
        .path(config.executable.as_ref().map(PathBuf::from))
        .idle_browser_timeout(config.idle_timeout())
        .build()
        .map_err(|e| BrowserError::Launch(e.to_string()))?;

    Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    #[tracing::instrument(name = "launch browser", skip_all)]
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.config.clone();
        let browser = spawn_blocking_with_tracing(move || launch_chrome(&config))
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))??;

        Ok(Box::new(ChromeSession {
            browser: Arc::new(browser),
            navigation_timeout: self.config.navigation_timeout(),
        }))
    }
}

pub struct ChromeSession {
    browser: Arc<Browser>,
    navigation_timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let browser = Arc::clone(&self.browser);
        let timeout = self.navigation_timeout;

        let tab = spawn_blocking_with_tracing(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| BrowserError::Page(e.to_string()))?;
            tab.set_default_timeout(timeout);
            Ok::<_, BrowserError>(tab)
        })
        .await
        .map_err(|e| BrowserError::Page(e.to_string()))??;

        Ok(Box::new(ChromePage { tab }))
    }

    #[tracing::instrument(name = "close browser", skip_all)]
    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let browser = self.browser;

        // Dropping the last handle terminates the Chrome process.
        spawn_blocking_with_tracing(move || drop(browser))
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

#[async_trait]
impl BrowserPage for ChromePage {
    #[tracing::instrument(name = "navigate", skip(self))]
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();

        spawn_blocking_with_tracing(move || {
            tab.navigate_to(&target)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| BrowserError::Navigation {
                    url: target.clone(),
                    message: e.to_string(),
                })
        })
        .await
        .map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let tab = Arc::clone(&self.tab);

        spawn_blocking_with_tracing(move || {
            tab.get_content()
                .map_err(|e| BrowserError::Content(e.to_string()))
        })
        .await
        .map_err(|e| BrowserError::Content(e.to_string()))?
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let tab = Arc::clone(&self.tab);

        spawn_blocking_with_tracing(move || {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| BrowserError::Page(e.to_string()))
        })
        .await
        .map_err(|e| BrowserError::Page(e.to_string()))?
    }
}
