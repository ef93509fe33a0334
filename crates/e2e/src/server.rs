//! Application management - launching the bank jar and waiting for it to serve

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// How to start the application under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the application jar
    pub jar: PathBuf,

    /// Java executable
    pub java: PathBuf,

    /// Extra arguments after `-jar <jar>`
    pub args: Vec<String>,

    /// How long to wait for the start page to answer
    pub startup_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jar: PathBuf::from("artifacts/app-ibank.jar"),
            java: PathBuf::from("java"),
            args: Vec::new(),
            startup_timeout_ms: 30_000,
        }
    }
}

/// Handle to a running application process
pub struct AppHandle {
    child: Child,
    base_url: String,
}

impl AppHandle {
    /// Start the jar and wait until `base_url` responds
    pub async fn spawn(config: &AppConfig, base_url: &str) -> E2eResult<Self> {
        info!("Starting {} for {}", config.jar.display(), base_url);

        if !config.jar.exists() {
            return Err(E2eError::AppStartup(format!(
                "application jar not found: {}",
                config.jar.display()
            )));
        }

        let child = Command::new(&config.java)
            .arg("-jar")
            .arg(&config.jar)
            .args(&config.args)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                E2eError::AppStartup(format!("Failed to spawn {}: {}", config.java.display(), e))
            })?;

        let handle = AppHandle {
            child,
            base_url: base_url.to_string(),
        };

        handle
            .wait_for_healthy(Duration::from_millis(config.startup_timeout_ms))
            .await?;

        info!("Application is serving at {}", base_url);
        Ok(handle)
    }

    /// Poll the start page until it answers with a success status
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => warn!("Start page returned {}", resp.status()),
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for application to start...");
                    }
                    // Refused connections are expected until the JVM is up
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::AppHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the application, gracefully first
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        info!("Stopping application (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for AppHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_jar_is_startup_error() {
        let config = AppConfig {
            jar: PathBuf::from("/nonexistent/app-ibank.jar"),
            ..Default::default()
        };
        let result = AppHandle::spawn(&config, "http://127.0.0.1:1").await;
        assert!(matches!(result, Err(E2eError::AppStartup(_))));
    }

    #[test]
    fn test_config_from_yaml() {
        let config: AppConfig = serde_yaml::from_str("jar: app.jar\nargs: [\"-P:profile=test\"]\n").unwrap();
        assert_eq!(config.jar, PathBuf::from("app.jar"));
        assert_eq!(config.args, vec!["-P:profile=test".to_string()]);
        assert_eq!(config.startup_timeout_ms, 30_000);
    }
}
