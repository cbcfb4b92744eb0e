//! Playwright browser automation
//!
//! Each driver is a long-lived `node` process running a generated bridge
//! script that owns one browser context. Requests and responses are
//! newline-delimited JSON over the child's stdin/stdout, so the page (and
//! its cookies) persists across steps of a scenario.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::driver::{Driver, DriverFactory};
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn parse(name: &str) -> E2eResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{other}'"))),
        }
    }
}

const BRIDGE_TEMPLATE: &str = r#"
const { chromium, firefox, webkit } = require('playwright');
const readline = require('readline');

const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const browser = await __BROWSER__.launch({ headless: __HEADLESS__ });
  const context = await browser.newContext({
    viewport: { width: __WIDTH__, height: __HEIGHT__ }
  });
  const page = await context.newPage();
  page.setDefaultTimeout(__ACTION_TIMEOUT__);
  page.setDefaultNavigationTimeout(__NAVIGATION_TIMEOUT__);

  const at = (req) => page.locator(req.selector).nth(req.nth);
  const ops = {
    goto: async (req) => { await page.goto(req.arg); return null; },
    reload: async () => { await page.reload(); return null; },
    url: async () => page.url(),
    count: async (req) => page.locator(req.selector).count(),
    is_visible: async (req) => at(req).isVisible(),
    text: async (req) => (await at(req).textContent()) || '',
    attribute: async (req) => at(req).getAttribute(req.arg),
    property: async (req) => at(req).evaluate((el, name) => el[name], req.arg),
    click: async (req) => { await at(req).click(); return null; },
    type_text: async (req) => { await at(req).pressSequentially(req.arg); return null; },
    select_option: async (req) => {
      const el = at(req);
      const byValue = await el.evaluate(
        (s, v) => Array.from(s.options).some((o) => o.value === v), req.arg);
      await el.selectOption(byValue ? { value: req.arg } : { label: req.arg });
      return el.inputValue();
    },
    check: async (req) => { await at(req).check(); return null; },
    body_text: async () => page.locator('body').innerText(),
    screenshot: async (req) => { await page.screenshot({ path: req.arg, fullPage: true }); return null; },
    close: async () => { await browser.close(); return null; },
  };

  send({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const req = JSON.parse(line);
    try {
      const op = ops[req.op];
      if (!op) throw new Error('unknown op ' + req.op);
      const value = await op(req);
      send({ id: req.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      send({ id: req.id, ok: false, error: error.message });
    }
    if (req.op === 'close') break;
  }
  process.exit(0);
})().catch((error) => {
  send({ id: 0, ok: false, error: error.message });
  process.exit(1);
});
"#;

/// One request to the bridge
#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<&'a str>,
    nth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    arg: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Configuration for Playwright; also the factory for its drivers
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Upper bound for a single click/type/select inside the browser
    pub action_timeout: Duration,

    pub navigation_timeout: Duration,

    /// `NODE_PATH` for resolving the `playwright` package
    pub node_path: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout: Duration::from_secs(4),
            navigation_timeout: Duration::from_secs(60),
            node_path: None,
        }
    }
}

impl PlaywrightConfig {
    /// Verify node can load the `playwright` package the way the bridge
    /// will: from a scratch directory, resolving only through `NODE_PATH`
    pub fn check_installed(&self) -> E2eResult<()> {
        let scratch = tempfile::tempdir()?;
        let output = Command::new("node")
            .args(["-e", "require('playwright')"])
            .env("NODE_PATH", self.resolved_node_path()?)
            .current_dir(scratch.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Render the bridge script for this configuration
    pub fn bridge_script(&self) -> String {
        BRIDGE_TEMPLATE
            .replace("__BROWSER__", self.browser.as_str())
            .replace("__HEADLESS__", if self.headless { "true" } else { "false" })
            .replace("__WIDTH__", &self.viewport_width.to_string())
            .replace("__HEIGHT__", &self.viewport_height.to_string())
            .replace("__ACTION_TIMEOUT__", &self.action_timeout.as_millis().to_string())
            .replace("__NAVIGATION_TIMEOUT__", &self.navigation_timeout.as_millis().to_string())
    }

    fn resolved_node_path(&self) -> E2eResult<PathBuf> {
        match &self.node_path {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_dir()?.join("node_modules")),
        }
    }
}

#[async_trait]
impl DriverFactory for PlaywrightConfig {
    type Driver = PlaywrightDriver;

    async fn launch(&self) -> E2eResult<PlaywrightDriver> {
        PlaywrightDriver::spawn(self).await
    }
}

/// A browser context driven through the node bridge
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    request_timeout: Duration,
    closed: bool,

    // Keeps the bridge script alive for the lifetime of the process
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    pub async fn spawn(config: &PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, config.bridge_script())?;

        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .env("NODE_PATH", config.resolved_node_path()?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Driver(format!("failed to spawn node: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("bridge stdout unavailable".into()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            request_timeout: config.navigation_timeout + Duration::from_secs(5),
            closed: false,
            _script_dir: script_dir,
        };

        // Browser launch can be slow on a cold cache
        let ready = driver.read_response(0, Duration::from_secs(60)).await?;
        info!(
            "Playwright bridge ready ({}, headless: {}, {})",
            config.browser.as_str(),
            config.headless,
            ready.as_str().unwrap_or("?")
        );
        Ok(driver)
    }

    async fn call(&mut self, op: &str, selector: Option<&str>, nth: usize, arg: Option<&str>) -> E2eResult<serde_json::Value> {
        if self.closed {
            return Err(E2eError::Driver("browser already closed".into()));
        }

        let id = self.next_id;
        self.next_id += 1;

        let request = Request { id, op, selector, nth, arg };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        self.read_response(id, self.request_timeout).await
    }

    async fn read_response(&mut self, id: u64, limit: Duration) -> E2eResult<serde_json::Value> {
        let resp = timeout(limit, self.next_response(id))
            .await
            .map_err(|_| E2eError::Timeout {
                what: format!("browser bridge response #{id}"),
                waited_ms: limit.as_millis() as u64,
            })??;

        if resp.ok {
            Ok(resp.value)
        } else {
            Err(E2eError::Driver(resp.error.unwrap_or_else(|| "unknown bridge error".into())))
        }
    }

    async fn next_response(&mut self, id: u64) -> E2eResult<Response> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Driver("browser bridge exited".into()))?;

            match serde_json::from_str::<Response>(&line) {
                Ok(resp) if resp.id == id => return Ok(resp),
                Ok(resp) => warn!("Discarding stale bridge response {}", resp.id),
                Err(_) => debug!("[bridge] {}", line),
            }
        }
    }

    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }
        let _ = self.child.start_kill();
    }
}

fn expect_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Driver for PlaywrightDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.call("goto", None, 0, Some(url)).await.map(|_| ())
    }

    async fn reload(&mut self) -> E2eResult<()> {
        self.call("reload", None, 0, None).await.map(|_| ())
    }

    async fn url(&mut self) -> E2eResult<String> {
        self.call("url", None, 0, None).await.map(expect_string)
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        let value = self.call("count", Some(selector), 0, None).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Driver(format!("count returned {value}")))
    }

    async fn is_visible(&mut self, selector: &str, nth: usize) -> E2eResult<bool> {
        let value = self.call("is_visible", Some(selector), nth, None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn text(&mut self, selector: &str, nth: usize) -> E2eResult<String> {
        self.call("text", Some(selector), nth, None).await.map(expect_string)
    }

    async fn attribute(&mut self, selector: &str, nth: usize, name: &str) -> E2eResult<Option<String>> {
        let value = self.call("attribute", Some(selector), nth, Some(name)).await?;
        Ok(value.as_str().map(String::from))
    }

    async fn property(&mut self, selector: &str, nth: usize, name: &str) -> E2eResult<serde_json::Value> {
        self.call("property", Some(selector), nth, Some(name)).await
    }

    async fn click(&mut self, selector: &str, nth: usize) -> E2eResult<()> {
        self.call("click", Some(selector), nth, None).await.map(|_| ())
    }

    async fn type_text(&mut self, selector: &str, nth: usize, text: &str) -> E2eResult<()> {
        self.call("type_text", Some(selector), nth, Some(text)).await.map(|_| ())
    }

    async fn select_option(&mut self, selector: &str, nth: usize, option: &str) -> E2eResult<String> {
        self.call("select_option", Some(selector), nth, Some(option))
            .await
            .map(expect_string)
    }

    async fn check(&mut self, selector: &str, nth: usize) -> E2eResult<()> {
        self.call("check", Some(selector), nth, None).await.map(|_| ())
    }

    async fn body_text(&mut self) -> E2eResult<String> {
        self.call("body_text", None, 0, None).await.map(expect_string)
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path = path.to_string_lossy();
        self.call("screenshot", None, 0, Some(path.as_ref())).await.map(|_| ())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.call("close", None, 0, None).await;
        self.closed = true;

        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright bridge exited: {}", status),
            _ => {
                warn!("Playwright bridge did not exit, terminating");
                self.terminate();
            }
        }
        result.map(|_| ())
    }
}

impl Drop for PlaywrightDriver {
    fn drop(&mut self) {
        if !self.closed {
            self.terminate();
        }
    }
}
