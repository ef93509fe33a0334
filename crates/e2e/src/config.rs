//! Harness configuration

use ibank_common::{BalanceMarkers, Fixtures};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::server::AppConfig;
use crate::wait::Wait;

/// Harness configuration, loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Where the application under test is served
    pub base_url: String,

    /// Test registration endpoint, relative to `base_url`
    pub registration_path: String,

    /// Polling policy for every page read
    pub wait: WaitConfig,

    /// Browser settings
    pub browser: PlaywrightConfig,

    /// Text conventions of the rendered UI
    pub texts: UiTexts,

    /// Data preloaded into the application
    pub fixtures: Fixtures,

    /// Launch the application jar before running (None = already running)
    pub app: Option<AppConfig>,

    /// Results and failure screenshots
    pub output_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9999".to_string(),
            registration_path: "/api/system/users".to_string(),
            wait: WaitConfig::default(),
            browser: PlaywrightConfig::default(),
            texts: UiTexts::default(),
            fixtures: Fixtures::default(),
            app: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub timeout_ms: u64,
    pub interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 4000,
            interval_ms: 100,
        }
    }
}

impl From<WaitConfig> for Wait {
    fn from(c: WaitConfig) -> Self {
        Wait::new(
            Duration::from_millis(c.timeout_ms),
            Duration::from_millis(c.interval_ms),
        )
    }
}

/// Rendered text conventions the page objects rely on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiTexts {
    /// Markers around the amount in a card tile
    pub balance: BalanceMarkers,

    /// Banner substring for unknown login or wrong password
    pub invalid_credentials: String,

    /// Banner substring for a blocked account
    pub user_blocked: String,

    /// Banner substring expected on a rejected transfer
    pub transfer_error: String,
}

impl Default for UiTexts {
    fn default() -> Self {
        Self {
            balance: BalanceMarkers::default(),
            invalid_credentials: "Неверно указан логин или пароль".to_string(),
            user_blocked: "Пользователь заблокирован".to_string(),
            transfer_error: "Ошибка".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_yaml::from_str(&content)?;
            debug!("Loaded harness config from {}", path.display());
            config.validate()?;
            Ok(config)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.fixtures.cards.len() < 2 {
            return Err(E2eError::Config(
                "at least two fixture cards are required for transfer scenarios".to_string(),
            ));
        }
        if self.wait.interval_ms == 0 {
            return Err(E2eError::Config("wait.interval_ms must be positive".to_string()));
        }
        if self.texts.balance.prefix.is_empty() || self.texts.balance.suffix.is_empty() {
            return Err(E2eError::Config("balance markers must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn wait(&self) -> Wait {
        self.wait.into()
    }

    /// Absolute URL for a path on the application
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
base_url: http://127.0.0.1:9090
wait:
  timeout_ms: 10000
texts:
  balance:
    prefix: "balance: "
    suffix: " rub."
"#;
        let config: HarnessConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.wait.timeout_ms, 10000);
        assert_eq!(config.wait.interval_ms, 100);
        assert_eq!(config.texts.balance, BalanceMarkers::english());
        assert_eq!(config.fixtures.cards.len(), 2);
        assert!(config.app.is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = HarnessConfig::load(Path::new("/nonexistent/ibank-e2e.yaml")).unwrap();
        assert_eq!(config.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_validate_rejects_single_card() {
        let mut config = HarnessConfig::default();
        config.fixtures.cards.truncate(1);
        assert!(matches!(config.validate(), Err(E2eError::Config(_))));
    }

    #[test]
    fn test_url_joins_paths() {
        let config = HarnessConfig {
            base_url: "http://localhost:9999/".into(),
            ..Default::default()
        };
        assert_eq!(config.url("/api/system/users"), "http://localhost:9999/api/system/users");
    }
}
