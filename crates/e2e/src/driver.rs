//! Browser driver seam
//!
//! A [`Driver`] performs single, immediate operations against one browser
//! context. It never waits for elements to appear; polling lives in
//! [`crate::session::Session`]. Elements are addressed by a selector in
//! `engine=expr` form plus a zero-based match index.

use std::path::Path;

use async_trait::async_trait;

use crate::error::E2eResult;

#[async_trait]
pub trait Driver: Send {
    /// Navigate to an absolute URL and wait for the load event
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    async fn reload(&mut self) -> E2eResult<()>;

    async fn url(&mut self) -> E2eResult<String>;

    /// Number of elements currently matching `selector`
    async fn count(&mut self, selector: &str) -> E2eResult<usize>;

    async fn is_visible(&mut self, selector: &str, nth: usize) -> E2eResult<bool>;

    async fn text(&mut self, selector: &str, nth: usize) -> E2eResult<String>;

    async fn attribute(&mut self, selector: &str, nth: usize, name: &str) -> E2eResult<Option<String>>;

    /// DOM property such as `value`, `checked` or `validationMessage`
    async fn property(&mut self, selector: &str, nth: usize, name: &str) -> E2eResult<serde_json::Value>;

    async fn click(&mut self, selector: &str, nth: usize) -> E2eResult<()>;

    /// Append text through simulated key presses
    async fn type_text(&mut self, selector: &str, nth: usize, text: &str) -> E2eResult<()>;

    /// Select an option by value or label; returns the resulting value
    async fn select_option(&mut self, selector: &str, nth: usize, option: &str) -> E2eResult<String>;

    async fn check(&mut self, selector: &str, nth: usize) -> E2eResult<()>;

    /// Rendered text of the whole document body
    async fn body_text(&mut self) -> E2eResult<String>;

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    async fn close(&mut self) -> E2eResult<()>;
}

/// Launches isolated drivers, one per scenario
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: Driver;

    async fn launch(&self) -> E2eResult<Self::Driver>;
}
