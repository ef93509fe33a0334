//! Creating users in the application under test

use async_trait::async_trait;
use ibank_common::{AccountStatus, DataGenerator, RegisteredUser};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};

/// Something that can create users the login form will recognise
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn register(&self, user: &RegisteredUser) -> E2eResult<()>;
}

/// Generate a user with `status` and register it
pub async fn register_new(
    registry: &dyn UserRegistry,
    generator: &mut DataGenerator,
    status: AccountStatus,
) -> E2eResult<RegisteredUser> {
    let user = generator.user(status);
    registry.register(&user).await?;
    Ok(user)
}

/// Registration through the application's test endpoint
pub struct HttpRegistry {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRegistry {
    pub fn new(config: &HarnessConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.url(&config.registration_path),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UserRegistry for HttpRegistry {
    async fn register(&self, user: &RegisteredUser) -> E2eResult<()> {
        debug!("POST {} for '{}'", self.endpoint, user.login);
        let resp = self.client.post(&self.endpoint).json(user).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(E2eError::Registration(format!(
                "{} returned {}: {}",
                self.endpoint, status, body
            )));
        }

        info!("Registered {} user '{}'", user.status, user.login);
        Ok(())
    }
}
