//! Storefront E2E Test Framework
//!
//! This crate drives a real browser against the automationexercise.com
//! storefront:
//! - Controls Playwright through a long-lived node bridge per scenario
//! - Parses declarative YAML scenario files with `${var}` templates
//! - Offers command helpers (login, cart, search, ...) on a sequential session
//! - Retries every lookup and assertion within a bounded wait window
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner<F: DriverFactory>                               │
//! │    ├── preflight() -> storefront reachable?                 │
//! │    ├── factory.launch() -> fresh Driver per scenario        │
//! │    ├── run_scenario(file, scenario) -> ScenarioResult       │
//! │    └── write_results() -> results.json                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session<D: Driver>                                         │
//! │    ├── visit / get / probe / contains / expect              │
//! │    └── login / logout / add_to_cart / search_products ...   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioFile (YAML)                                        │
//! │    ├── name, tags, fixture                                  │
//! │    ├── before_each: [Step]                                  │
//! │    └── scenarios: [{ name, steps: [Step] }]                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod locators;
pub mod playwright;
pub mod runner;
pub mod session;
pub mod spec;
pub mod target;
pub mod template;
pub mod wait;

#[cfg(test)]
mod fake;

pub use commands::LogoutOutcome;
pub use config::E2eConfig;
pub use error::{E2eError, E2eResult};
pub use locators::Locator;
pub use runner::TestRunner;
pub use session::Session;
pub use spec::{ScenarioFile, Step};
