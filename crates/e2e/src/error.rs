//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Storefront not reachable at {url} after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Unknown locator: {0}")]
    UnknownLocator(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Element not found: {locator} (waited {waited_ms} ms)")]
    ElementNotFound { locator: String, waited_ms: u64 },

    #[error("Timeout waiting for {what} after {waited_ms} ms")]
    Timeout { what: String, waited_ms: u64 },

    #[error("Assertion failed on {subject}: expected {expected}, got {actual}")]
    AssertionFailed {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether this error means a locator never matched anything.
    pub fn is_element_not_found(&self) -> bool {
        matches!(self, E2eError::ElementNotFound { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
