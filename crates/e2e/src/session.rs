//! Browser sessions: one per scenario, never shared

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::driver::Driver;
use crate::error::E2eResult;
use crate::locator::ElementLocator;
use crate::pages::LoginPage;

/// Acquires a fresh, exclusive browser for a scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn launch(&self) -> E2eResult<Arc<dyn Driver>>;
}

/// A browser session bound to the harness configuration.
///
/// Cloning shares the same browser; page objects hold a clone so that a
/// transition can hand the session to the next page.
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn Driver>,
    config: Arc<HarnessConfig>,
}

impl Session {
    pub fn new(driver: Arc<dyn Driver>, config: Arc<HarnessConfig>) -> Self {
        Self { driver, config }
    }

    /// Launch a browser through `factory`
    pub async fn start(factory: &dyn SessionFactory, config: Arc<HarnessConfig>) -> E2eResult<Self> {
        let driver = factory.launch().await?;
        debug!("Session started for {}", config.base_url);
        Ok(Self::new(driver, config))
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Locator using the configured wait policy
    pub fn locator(&self) -> ElementLocator {
        ElementLocator::new(self.driver.clone(), self.config.wait())
    }

    /// Open the application's start page
    pub async fn open_login(&self) -> E2eResult<LoginPage> {
        info!("Opening {}", self.config.base_url);
        self.driver.navigate(&self.config.base_url).await?;
        LoginPage::new(self.clone()).await
    }

    pub async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.driver.screenshot(path).await
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.driver.close().await
    }
}
