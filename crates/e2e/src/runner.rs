//! Main test runner that orchestrates fixtures, browser contexts and scenarios

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::driver::{Driver, DriverFactory};
use crate::error::{E2eError, E2eResult};
use crate::fixture::{self, FixtureSet};
use crate::locators::Locator;
use crate::session::{Expectation, Session};
use crate::spec::{Scenario, ScenarioFile, Step};
use crate::target;
use crate::template::Vars;
use crate::wait::Wait;

/// Result of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub suite: String,
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,

    /// Innermost browser step that was running when the scenario failed
    pub failed_step: Option<String>,

    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
}

impl ScenarioResult {
    fn aborted(suite: &str, name: &str, error: &E2eError) -> Self {
        Self {
            suite: suite.to_string(),
            name: name.to_string(),
            success: false,
            duration_ms: 0,
            steps: vec![],
            failed_step: None,
            error: Some(error.to_string()),
            screenshot: None,
        }
    }
}

/// Result of running all selected scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteRunResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteRunResult {
    /// The run passes only if every executed scenario passed
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which scenarios to execute
#[derive(Debug, Clone, Default)]
pub enum Filter {
    #[default]
    All,
    /// File or scenario tag
    Tag(String),
    /// Substring of the scenario name
    Name(String),
}

impl Filter {
    fn selects(&self, file: &ScenarioFile, scenario: &Scenario) -> bool {
        match self {
            Filter::All => true,
            Filter::Tag(tag) => file.has_tag(scenario, tag),
            Filter::Name(fragment) => scenario.name.contains(fragment.as_str()),
        }
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub base_url: String,
    pub wait: Wait,
    pub scenarios_dir: PathBuf,
    pub fixtures_dir: PathBuf,
    pub output_dir: PathBuf,
    pub screenshot_on_failure: bool,

    /// Check that the storefront answers before launching browsers
    pub preflight: bool,
    pub preflight_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://automationexercise.com".to_string(),
            wait: Wait::default(),
            scenarios_dir: PathBuf::from("scenarios"),
            fixtures_dir: PathBuf::from("fixtures"),
            output_dir: PathBuf::from("test-results"),
            screenshot_on_failure: true,
            preflight: true,
            preflight_timeout: Duration::from_secs(30),
        }
    }
}

/// Main E2E test runner
pub struct TestRunner<F: DriverFactory> {
    factory: F,
    config: RunnerConfig,
    fixtures: FixtureSet,
}

impl<F: DriverFactory> TestRunner<F> {
    pub fn new(factory: F, config: RunnerConfig) -> Self {
        let fixtures = FixtureSet::new(config.fixtures_dir.clone());
        Self {
            factory,
            config,
            fixtures,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Load all scenario files from the scenarios directory
    pub fn load(&self) -> E2eResult<Vec<ScenarioFile>> {
        ScenarioFile::load_all(&self.config.scenarios_dir)
    }

    pub async fn preflight(&self) -> E2eResult<()> {
        if !self.config.preflight {
            return Ok(());
        }
        target::wait_for_reachable(&self.config.base_url, self.config.preflight_timeout).await
    }

    pub async fn run_all(&self) -> E2eResult<SuiteRunResult> {
        self.run(&Filter::All).await
    }

    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteRunResult> {
        self.run(&Filter::Tag(tag.to_string())).await
    }

    pub async fn run(&self, filter: &Filter) -> E2eResult<SuiteRunResult> {
        let files = self.load()?;
        self.preflight().await?;
        Ok(self.run_files(&files, filter).await)
    }

    /// Template variables shared by every scenario of a file
    pub fn file_vars(&self, file: &ScenarioFile) -> E2eResult<Vars> {
        let mut vars = Vars::new();
        vars.insert("base_url", self.config.base_url.trim_end_matches('/'));
        if let Some(name) = &file.fixture {
            vars.extend(self.fixtures.load_vars(name)?);
        }
        Ok(vars)
    }

    /// Run the selected scenarios of `files`; failures never abort the run
    pub async fn run_files(&self, files: &[ScenarioFile], filter: &Filter) -> SuiteRunResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut total = 0;
        let mut skipped = 0;

        for file in files {
            total += file.scenarios.len();
            let selected: Vec<&Scenario> = file
                .scenarios
                .iter()
                .filter(|s| filter.selects(file, s))
                .collect();
            skipped += file.scenarios.len() - selected.len();
            if selected.is_empty() {
                continue;
            }

            info!("{} ({} scenario(s))", file.name, selected.len());

            // Locator typos fail the file before any browser starts
            let prepared = self.file_vars(file).and_then(|vars| {
                file.check_locators(&scenario_vars(&vars, 0))?;
                Ok(vars)
            });
            let vars = match prepared {
                Ok(vars) => vars,
                Err(e) => {
                    error!("✗ {} - {}", file.name, e);
                    results.extend(selected.iter().map(|s| ScenarioResult::aborted(&file.name, &s.name, &e)));
                    continue;
                }
            };

            for scenario in selected {
                let result = self.run_scenario(file, scenario, &vars, results.len()).await;
                if result.success {
                    info!("  ✓ {} ({} ms)", result.name, result.duration_ms);
                } else {
                    error!(
                        "  ✗ {} - {} [at {}]",
                        result.name,
                        result.error.as_deref().unwrap_or("unknown error"),
                        result.failed_step.as_deref().unwrap_or("setup")
                    );
                }
                results.push(result);
            }
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        SuiteRunResult {
            total,
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Run one scenario in a fresh browser context
    pub async fn run_scenario(&self, file: &ScenarioFile, scenario: &Scenario, vars: &Vars, seq: usize) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {} / {}", file.name, scenario.name);

        let vars = scenario_vars(vars, seq);

        let driver = match self.factory.launch().await {
            Ok(driver) => driver,
            Err(e) => return ScenarioResult::aborted(&file.name, &scenario.name, &e),
        };
        let mut session = Session::new(driver, self.config.base_url.clone(), self.config.wait);

        let mut steps = Vec::new();
        let mut failure: Option<E2eError> = None;

        for step in file.before_each.iter().chain(scenario.steps.iter()) {
            let step_start = Instant::now();
            let outcome = self.execute_step(&mut session, step, &vars).await;

            steps.push(StepResult {
                name: step.name(),
                success: outcome.is_ok(),
                duration_ms: step_start.elapsed().as_millis() as u64,
                error: outcome.as_ref().err().map(|e| e.to_string()),
            });

            if let Err(e) = outcome {
                failure = Some(e);
                break; // Stop on first failure
            }
        }

        let failed_step = failure
            .as_ref()
            .and_then(|_| session.last_step().map(String::from));

        let mut screenshot = None;
        if failure.is_some() && self.config.screenshot_on_failure {
            let path = self.screenshot_path(&format!("{} -- {} (failed)", file.name, scenario.name));
            match session.screenshot(&path).await {
                Ok(()) => screenshot = Some(path),
                Err(e) => warn!("Failure screenshot not captured: {}", e),
            }
        }

        let mut driver = session.into_driver();
        if let Err(e) = driver.close().await {
            warn!("Closing browser context failed: {}", e);
        }

        ScenarioResult {
            suite: file.name.clone(),
            name: scenario.name.clone(),
            success: failure.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            failed_step,
            error: failure.map(|e| e.to_string()),
            screenshot,
        }
    }

    fn screenshot_path(&self, name: &str) -> PathBuf {
        let slug: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        self.config.output_dir.join("screenshots").join(format!("{slug}.png"))
    }

    /// Execute a single scenario step
    pub async fn execute_step(&self, session: &mut Session<F::Driver>, step: &Step, vars: &Vars) -> E2eResult<()> {
        match step {
            Step::Visit { url } => session.visit(&vars.render(url)?).await,
            Step::Reload => session.reload().await,
            Step::Login { email, password } => {
                session.login(&vars.render(email)?, &vars.render(password)?).await
            }
            Step::Logout => {
                let outcome = session.logout().await?;
                debug!("logout outcome: {:?}", outcome);
                Ok(())
            }
            Step::AddToCart { product_id } => session.add_to_cart(*product_id).await,
            Step::OpenCart => session.open_cart().await,
            Step::RemoveFirstItemFromCart => session.remove_first_item_from_cart().await,
            Step::SearchProducts { term } => session.search_products(&vars.render(term)?).await,
            Step::FilterByCategory { category, item_index } => {
                session.filter_by_category(&vars.render(category)?, *item_index).await
            }
            Step::Click { locator, nth } => {
                let locator = locator.resolve(vars)?;
                session.get(&locator).await?.nth(*nth).click().await
            }
            Step::Type { locator, text, nth } => {
                let locator = locator.resolve(vars)?;
                let text = vars.render(text)?;
                session.get(&locator).await?.nth(*nth).type_text(&text).await
            }
            Step::Select { locator, option, expect_value } => {
                let locator = locator.resolve(vars)?;
                let selected = session.get(&locator).await?.select(&vars.render(option)?).await?;
                debug!("selected value {:?}", selected);
                if let Some(expected) = expect_value {
                    session.expect(&locator).to_have_value(&vars.render(expected)?).await?;
                }
                Ok(())
            }
            Step::Check { locator, nth, expect_checked } => {
                let locator = locator.resolve(vars)?;
                session.get(&locator).await?.nth(*nth).check().await?;
                if *expect_checked {
                    session.expect(&locator).nth(*nth).to_be_checked().await?;
                }
                Ok(())
            }
            Step::Assert {
                locator,
                nth,
                exists,
                visible,
                contains,
                each_contains,
                value,
                attribute,
                checked,
                property,
                count_at_least,
            } => {
                let locator = locator.resolve(vars)?;
                let mut asserted = false;

                if let Some(exists) = exists {
                    asserted = true;
                    if *exists {
                        expect_at(session, &locator, *nth).to_exist().await?;
                    } else {
                        session.expect(&locator).not_to_exist().await?;
                    }
                }
                if *visible {
                    asserted = true;
                    expect_at(session, &locator, *nth).to_be_visible().await?;
                }
                if let Some(text) = contains {
                    asserted = true;
                    expect_at(session, &locator, *nth).to_contain_text(&vars.render(text)?).await?;
                }
                if let Some(text) = each_contains {
                    asserted = true;
                    session.expect(&locator).each_to_contain_text(&vars.render(text)?).await?;
                }
                if let Some(expected) = value {
                    asserted = true;
                    expect_at(session, &locator, *nth).to_have_value(&vars.render(expected)?).await?;
                }
                if let Some(name) = attribute {
                    asserted = true;
                    expect_at(session, &locator, *nth).to_have_attribute(name).await?;
                }
                if *checked {
                    asserted = true;
                    expect_at(session, &locator, *nth).to_be_checked().await?;
                }
                if let Some(prop) = property {
                    asserted = true;
                    if prop.not_empty {
                        expect_at(session, &locator, *nth).property_not_empty(&prop.name).await?;
                    }
                    if let Some(text) = &prop.contains {
                        let text = vars.render(text)?;
                        expect_at(session, &locator, *nth).property_to_contain(&prop.name, &text).await?;
                    }
                }
                if let Some(min) = count_at_least {
                    asserted = true;
                    session.expect(&locator).to_have_count_at_least(*min).await?;
                }

                if !asserted {
                    expect_at(session, &locator, *nth).to_exist().await?;
                }
                Ok(())
            }
            Step::AssertUrl { equals, contains } => {
                if equals.is_none() && contains.is_none() {
                    return Err(E2eError::SpecParse("assert_url needs 'equals' or 'contains'".into()));
                }
                if let Some(url) = equals {
                    session.expect_url_eq(&vars.render(url)?).await?;
                }
                if let Some(fragment) = contains {
                    session.expect_url_contains(&vars.render(fragment)?).await?;
                }
                Ok(())
            }
            Step::Screenshot { name } => {
                let path = self.screenshot_path(&vars.render(name)?);
                session.screenshot(&path).await
            }
            Step::Log { message } => {
                info!("[TEST LOG] {}", vars.render(message)?);
                Ok(())
            }
        }
    }

    /// Write results to `<output_dir>/results.json`
    pub fn write_results(&self, results: &SuiteRunResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

/// File variables plus the per-scenario `unique.email`
fn scenario_vars(vars: &Vars, seq: usize) -> Vars {
    let mut vars = vars.clone();
    if let Some(email) = vars.get("user.email").map(String::from) {
        let suffix = format!("{}{}", fixture::run_suffix(), seq);
        vars.insert("unique.email", fixture::unique_email(&email, &suffix));
    }
    vars
}

fn expect_at<'s, D: Driver>(session: &'s mut Session<D>, locator: &Locator, nth: Option<usize>) -> Expectation<'s, D> {
    let expectation = session.expect(locator);
    match nth {
        Some(nth) => expectation.nth(nth),
        None => expectation,
    }
}

pub fn write_results(output_dir: &Path, results: &SuiteRunResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
