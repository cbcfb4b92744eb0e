//! Suite configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::playwright::{Browser, PlaywrightConfig};
use crate::runner::RunnerConfig;
use crate::wait::Wait;

/// Suite configuration, usually read from `e2e.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    /// Storefront under test
    pub base_url: String,

    /// Wait window for element lookups and assertions
    pub default_timeout_ms: u64,

    /// Delay between polls inside the wait window
    pub poll_interval_ms: u64,

    pub page_load_timeout_ms: u64,

    pub viewport_width: u32,
    pub viewport_height: u32,

    pub browser: Browser,
    pub headless: bool,

    pub scenarios_dir: PathBuf,
    pub fixtures_dir: PathBuf,

    /// Results and failure screenshots
    pub output_dir: PathBuf,

    pub screenshot_on_failure: bool,

    /// Check the storefront answers before any browser starts
    pub preflight: bool,
    pub preflight_timeout_ms: u64,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            base_url: "https://automationexercise.com".to_string(),
            default_timeout_ms: 4000,
            poll_interval_ms: 50,
            page_load_timeout_ms: 60_000,
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            scenarios_dir: PathBuf::from("scenarios"),
            fixtures_dir: PathBuf::from("fixtures"),
            output_dir: PathBuf::from("test-results"),
            screenshot_on_failure: true,
            preflight: true,
            preflight_timeout_ms: 30_000,
        }
    }
}

impl E2eConfig {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `E2E_BASE_URL`, `E2E_BROWSER` and `E2E_HEADLESS`
    pub fn apply_env(&mut self) -> E2eResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> E2eResult<()> {
        if let Some(url) = lookup("E2E_BASE_URL") {
            self.base_url = url;
        }
        if let Some(browser) = lookup("E2E_BROWSER") {
            self.browser = Browser::parse(&browser)?;
        }
        if let Some(headless) = lookup("E2E_HEADLESS") {
            self.headless = parse_bool("E2E_HEADLESS", &headless)?;
        }
        self.validate()
    }

    /// Resolve relative directories against `root`
    pub fn rebase(&mut self, root: &Path) {
        for dir in [&mut self.scenarios_dir, &mut self.fixtures_dir, &mut self.output_dir] {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.default_timeout_ms == 0 || self.poll_interval_ms == 0 {
            return Err(E2eError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn wait(&self) -> Wait {
        Wait::new(
            Duration::from_millis(self.default_timeout_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            wait: self.wait(),
            scenarios_dir: self.scenarios_dir.clone(),
            fixtures_dir: self.fixtures_dir.clone(),
            output_dir: self.output_dir.clone(),
            screenshot_on_failure: self.screenshot_on_failure,
            preflight: self.preflight,
            preflight_timeout: Duration::from_millis(self.preflight_timeout_ms),
        }
    }

    pub fn playwright_config(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser,
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            action_timeout: Duration::from_millis(self.default_timeout_ms),
            navigation_timeout: Duration::from_millis(self.page_load_timeout_ms),
            ..PlaywrightConfig::default()
        }
    }
}

fn parse_bool(name: &str, value: &str) -> E2eResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(E2eError::Config(format!("{name}: expected a boolean, got '{other}'"))),
    }
}
