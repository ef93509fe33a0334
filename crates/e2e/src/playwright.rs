//! Playwright browser automation
//!
//! A `node` process runs a small bridge script that owns one browser page
//! for the whole session. Commands and replies are newline-delimited JSON on
//! the child's stdin/stdout, one outstanding command at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::{Driver, ElementRef, ElementSnapshot};
use crate::error::{E2eError, E2eResult};
use crate::session::SessionFactory;

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

(async () => {
  const opts = JSON.parse(process.argv[2]);
  const browser = await playwright[opts.browser].launch({ headless: opts.headless, slowMo: opts.slow_mo_ms });
  const context = await browser.newContext({
    viewport: { width: opts.viewport_width, height: opts.viewport_height }
  });
  const page = await context.newPage();

  const locate = (t) => {
    let l = page.locator(t.selector).nth(t.index);
    if (t.descendant) l = l.locator(t.descendant).first();
    return l;
  };

  const handlers = {
    navigate: async (c) => { await page.goto(c.url); return null; },
    query: async (c) => page.$$eval(c.selector, (els) => els.map((el, index) => {
      const r = el.getBoundingClientRect();
      const s = window.getComputedStyle(el);
      const visible = r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
      const attributes = {};
      for (const a of el.attributes) attributes[a.name] = a.value;
      const text = el.innerText || el.value || '';
      return { index, text, visible, attributes };
    })),
    fill: async (c) => { await locate(c.target).fill(c.value, { timeout: c.timeout_ms }); return null; },
    click: async (c) => { await locate(c.target).click({ timeout: c.timeout_ms }); return null; },
    screenshot: async (c) => { await page.screenshot({ path: c.path, fullPage: true }); return null; },
    close: async () => { await browser.close(); return null; },
  };

  console.log(JSON.stringify({ ready: true }));

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    const cmd = JSON.parse(line);
    try {
      const result = await handlers[cmd.op](cmd);
      console.log(JSON.stringify({ id: cmd.id, ok: true, result }));
    } catch (error) {
      console.log(JSON.stringify({ id: cmd.id, ok: false, error: String((error && error.message) || error) }));
    }
    if (cmd.op === 'close') break;
  }
  process.exit(0);
})().catch((error) => {
  console.log(JSON.stringify({ ready: false, error: String((error && error.message) || error) }));
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Delay Playwright inserts between operations
    pub slow_mo_ms: u64,

    /// Playwright's own wait for fill/click; the locator has already waited
    pub action_timeout_ms: u64,

    /// Upper bound for any single bridge round trip
    pub command_timeout_ms: u64,

    /// Where `require('playwright')` is resolved from
    pub node_modules: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            slow_mo_ms: 0,
            action_timeout_ms: 2000,
            command_timeout_ms: 30_000,
            node_modules: PathBuf::from("node_modules"),
        }
    }
}

/// Bridge launch options, passed as the script's argument
#[derive(Serialize)]
struct BridgeOptions {
    browser: &'static str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    slow_mo_ms: u64,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Navigate { url: &'a str },
    Query { selector: &'a str },
    Fill { target: &'a ElementRef, value: &'a str, timeout_ms: u64 },
    Click { target: &'a ElementRef, timeout_ms: u64 },
    Screenshot { path: &'a Path },
    Close,
}

impl Request<'_> {
    fn name(&self) -> &'static str {
        match self {
            Request::Navigate { .. } => "navigate",
            Request::Query { .. } => "query",
            Request::Fill { .. } => "fill",
            Request::Click { .. } => "click",
            Request::Screenshot { .. } => "screenshot",
            Request::Close => "close",
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: &'a Request<'a>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
}

impl BridgeIo {
    /// Next JSON reply line; other output from the bridge is logged and skipped
    async fn read_reply(&mut self) -> E2eResult<Reply> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Driver("Playwright bridge exited".to_string()))?;
            match serde_json::from_str::<Reply>(&line) {
                Ok(reply) => return Ok(reply),
                Err(_) => debug!("[bridge] {}", line),
            }
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightDriver {
    io: Mutex<BridgeIo>,
    action_timeout_ms: u64,
    command_timeout: Duration,

    // Holds the bridge script for the life of the process
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    /// Start the bridge and wait until its browser is up
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let options = serde_json::to_string(&BridgeOptions {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            slow_mo_ms: config.slow_mo_ms,
        })?;

        debug!("Launching Playwright bridge: {}", script_path.display());
        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(options)
            .env("NODE_PATH", &config.node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("bridge stdout unavailable".to_string()))?;

        let mut io = BridgeIo {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            closed: false,
        };

        let command_timeout = Duration::from_millis(config.command_timeout_ms);
        let hello = tokio::time::timeout(command_timeout, io.read_reply())
            .await
            .map_err(|_| E2eError::Driver("Playwright bridge did not start in time".to_string()))??;
        if hello.ready != Some(true) {
            return Err(E2eError::Driver(format!(
                "Playwright failed to launch {}: {}",
                config.browser.as_str(),
                hello.error.unwrap_or_default()
            )));
        }

        info!("Playwright {} ready (headless: {})", config.browser.as_str(), config.headless);
        Ok(Self {
            io: Mutex::new(io),
            action_timeout_ms: config.action_timeout_ms,
            command_timeout,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn send(&self, request: Request<'_>) -> E2eResult<serde_json::Value> {
        let mut io = self.io.lock().await;
        if io.closed {
            return Err(E2eError::Driver("session closed".to_string()));
        }

        let id = io.next_id;
        io.next_id += 1;
        let mut line = serde_json::to_string(&Envelope { id, request: &request })?;
        line.push('\n');

        let exchange = async {
            io.stdin.write_all(line.as_bytes()).await?;
            io.stdin.flush().await?;
            loop {
                let reply = io.read_reply().await?;
                if reply.id == Some(id) {
                    return Ok::<_, E2eError>(reply);
                }
                warn!("Dropping stale bridge reply {:?}", reply.id);
            }
        };
        let reply = tokio::time::timeout(self.command_timeout, exchange)
            .await
            .map_err(|_| {
                E2eError::Driver(format!(
                    "{} got no reply within {:?}",
                    request.name(),
                    self.command_timeout
                ))
            })??;

        if reply.ok {
            Ok(reply.result.unwrap_or(serde_json::Value::Null))
        } else {
            Err(E2eError::Driver(format!(
                "{} failed: {}",
                request.name(),
                reply.error.unwrap_or_else(|| "unknown error".to_string())
            )))
        }
    }
}

#[async_trait]
impl Driver for PlaywrightDriver {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        self.send(Request::Navigate { url }).await.map(|_| ())
    }

    async fn query(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
        let value = self.send(Request::Query { selector }).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fill(&self, target: &ElementRef, value: &str) -> E2eResult<()> {
        self.send(Request::Fill {
            target,
            value,
            timeout_ms: self.action_timeout_ms,
        })
        .await
        .map(|_| ())
    }

    async fn click(&self, target: &ElementRef) -> E2eResult<()> {
        self.send(Request::Click {
            target,
            timeout_ms: self.action_timeout_ms,
        })
        .await
        .map(|_| ())
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.send(Request::Screenshot { path }).await.map(|_| ())
    }

    async fn close(&self) -> E2eResult<()> {
        let result = self.send(Request::Close).await.map(|_| ());
        let mut io = self.io.lock().await;
        io.closed = true;
        reap(&mut io.child, self.command_timeout).await;
        result
    }
}

/// Wait up to `grace` for the bridge to exit, then kill it.
///
/// Returns whether it exited on its own.
async fn reap(child: &mut Child, grace: Duration) -> bool {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!("Playwright bridge did not exit cleanly: {}", e);
            false
        }
        Err(_) => {
            warn!("Playwright bridge still running after {:?}, killing it", grace);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill Playwright bridge: {}", e);
            }
            false
        }
    }
}

/// Starts one Playwright bridge per scenario
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightLauncher {
    async fn launch(&self) -> E2eResult<Arc<dyn Driver>> {
        Ok(Arc::new(PlaywrightDriver::launch(&self.config).await?))
    }
}
