//! Sequential command queue over one browser context
//!
//! A [`Session`] runs every step to completion before the next one starts.
//! Element lookups and assertions retry under the session's [`Wait`] policy;
//! a locator that never matches fails with `ElementNotFound`, an element
//! that exists but never satisfies the condition fails with `Timeout` or
//! `AssertionFailed`.

use std::path::Path;

use tracing::debug;

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::locators::{Locator, Strategy};
use crate::wait::Wait;

pub struct Session<D: Driver> {
    driver: D,
    base_url: String,
    wait: Wait,
    steps: Vec<String>,
}

impl<D: Driver> Session<D> {
    pub fn new(driver: D, base_url: impl Into<String>, wait: Wait) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            wait,
            steps: Vec::new(),
        }
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Every step executed so far, oldest first
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn last_step(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    pub(crate) fn record(&mut self, step: String) {
        debug!("step: {}", step);
        self.steps.push(step);
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub async fn visit(&mut self, path: &str) -> E2eResult<()> {
        let url = self.absolute_url(path);
        self.record(format!("visit {url}"));
        self.driver.goto(&url).await
    }

    pub async fn reload(&mut self) -> E2eResult<()> {
        self.record("reload".to_string());
        self.driver.reload().await
    }

    pub async fn url(&mut self) -> E2eResult<String> {
        self.driver.url().await
    }

    pub async fn body_text(&mut self) -> E2eResult<String> {
        self.driver.body_text().await
    }

    /// Wait for at least one match of `locator`
    pub async fn get(&mut self, locator: &Locator) -> E2eResult<Element<'_, D>> {
        let wait = self.wait;
        self.get_within(locator, wait).await
    }

    pub async fn get_within(&mut self, locator: &Locator, wait: Wait) -> E2eResult<Element<'_, D>> {
        self.record(format!("get {}", locator.name()));

        let selector = locator.selector();
        let deadline = wait.start();
        loop {
            if self.driver.count(&selector).await? > 0 {
                return Ok(Element::new(self, locator.clone(), wait));
            }
            if !deadline.tick().await {
                return Err(E2eError::ElementNotFound {
                    locator: locator.to_string(),
                    waited_ms: deadline.waited_ms(),
                });
            }
        }
    }

    /// Query the current DOM once; `None` when nothing matches
    pub async fn probe(&mut self, locator: &Locator) -> E2eResult<Option<Element<'_, D>>> {
        let count = self.driver.count(&locator.selector()).await?;
        debug!("probe {} -> {} match(es)", locator.name(), count);

        if count == 0 {
            return Ok(None);
        }
        Ok(Some(Element::new(self, locator.clone(), Wait::immediate())))
    }

    /// Wait for an element whose text contains `text`
    pub async fn contains(&mut self, text: &str) -> E2eResult<Element<'_, D>> {
        let locator = Locator::dynamic(format!("contains({text})"), Strategy::Text, text);
        self.get(&locator).await
    }

    /// Retrying assertions on `locator`
    pub fn expect(&mut self, locator: &Locator) -> Expectation<'_, D> {
        let wait = self.wait;
        Expectation {
            session: self,
            locator: locator.clone(),
            nth: None,
            wait,
        }
    }

    pub async fn expect_url_eq(&mut self, expected: &str) -> E2eResult<()> {
        self.expect_url(expected, |url| url == expected, "equal to").await
    }

    pub async fn expect_url_contains(&mut self, fragment: &str) -> E2eResult<()> {
        self.expect_url(fragment, |url| url.contains(fragment), "containing").await
    }

    async fn expect_url(&mut self, expected: &str, accept: impl Fn(&str) -> bool, relation: &str) -> E2eResult<()> {
        self.record(format!("expect url {relation} {expected}"));

        let deadline = self.wait.start();
        loop {
            let url = self.driver.url().await?;
            if accept(&url) {
                return Ok(());
            }
            if !deadline.tick().await {
                return Err(E2eError::AssertionFailed {
                    subject: "url".to_string(),
                    expected: format!("{relation} {expected:?}"),
                    actual: format!("{url:?}"),
                });
            }
        }
    }

    pub async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        self.record(format!("screenshot {}", path.display()));
        self.driver.screenshot(path).await
    }
}

/// A resolved element reference: locator plus match index
pub struct Element<'s, D: Driver> {
    session: &'s mut Session<D>,
    locator: Locator,
    nth: usize,
    wait: Wait,
}

impl<'s, D: Driver> Element<'s, D> {
    fn new(session: &'s mut Session<D>, locator: Locator, wait: Wait) -> Self {
        Self {
            session,
            locator,
            nth: 0,
            wait,
        }
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    pub fn nth(self, nth: usize) -> Self {
        Self { nth, ..self }
    }

    fn describe(&self) -> String {
        if self.nth == 0 {
            self.locator.to_string()
        } else {
            format!("{} [#{}]", self.locator, self.nth)
        }
    }

    /// Wait until the element exists and is visible
    async fn actionable(&mut self) -> E2eResult<String> {
        let selector = self.locator.selector();
        let deadline = self.wait.start();
        let mut seen = false;

        loop {
            let driver = &mut self.session.driver;
            if driver.count(&selector).await? > self.nth {
                seen = true;
                if driver.is_visible(&selector, self.nth).await? {
                    return Ok(selector);
                }
            }
            if !deadline.tick().await {
                let waited_ms = deadline.waited_ms();
                return Err(if seen {
                    E2eError::Timeout {
                        what: format!("{} to become visible", self.describe()),
                        waited_ms,
                    }
                } else {
                    E2eError::ElementNotFound {
                        locator: self.describe(),
                        waited_ms,
                    }
                });
            }
        }
    }

    async fn present(&mut self) -> E2eResult<String> {
        let selector = self.locator.selector();
        let deadline = self.wait.start();
        loop {
            if self.session.driver.count(&selector).await? > self.nth {
                return Ok(selector);
            }
            if !deadline.tick().await {
                return Err(E2eError::ElementNotFound {
                    locator: self.describe(),
                    waited_ms: deadline.waited_ms(),
                });
            }
        }
    }

    pub async fn click(mut self) -> E2eResult<()> {
        self.session.record(format!("click {}", self.describe()));
        let selector = self.actionable().await?;
        self.session.driver.click(&selector, self.nth).await
    }

    pub async fn type_text(mut self, text: &str) -> E2eResult<()> {
        self.session.record(format!("type into {}", self.describe()));
        let selector = self.actionable().await?;
        self.session.driver.type_text(&selector, self.nth, text).await
    }

    /// Select by value or visible label; returns the resulting value
    pub async fn select(mut self, option: &str) -> E2eResult<String> {
        self.session.record(format!("select {option:?} in {}", self.describe()));
        let selector = self.actionable().await?;
        self.session.driver.select_option(&selector, self.nth, option).await
    }

    pub async fn check(mut self) -> E2eResult<()> {
        self.session.record(format!("check {}", self.describe()));
        let selector = self.actionable().await?;
        self.session.driver.check(&selector, self.nth).await
    }

    pub async fn text(&mut self) -> E2eResult<String> {
        let selector = self.present().await?;
        self.session.driver.text(&selector, self.nth).await
    }

    pub async fn value(&mut self) -> E2eResult<String> {
        let value = self.property("value").await?;
        Ok(json_to_text(&value))
    }

    pub async fn attribute(&mut self, name: &str) -> E2eResult<Option<String>> {
        let selector = self.present().await?;
        self.session.driver.attribute(&selector, self.nth, name).await
    }

    pub async fn property(&mut self, name: &str) -> E2eResult<serde_json::Value> {
        let selector = self.present().await?;
        self.session.driver.property(&selector, self.nth, name).await
    }
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Condition checked by an [`Expectation`]
#[derive(Debug, Clone, Copy)]
enum Check<'a> {
    Exists,
    Visible,
    ContainsText(&'a str),
    EachContainsText(&'a str),
    Value(&'a str),
    HasAttribute(&'a str),
    Checked,
    PropertyNotEmpty(&'a str),
    PropertyContains(&'a str, &'a str),
    CountAtLeast(usize),
}

impl Check<'_> {
    fn describe(&self) -> String {
        match self {
            Check::Exists => "to exist".to_string(),
            Check::Visible => "to be visible".to_string(),
            Check::ContainsText(t) => format!("text containing {t:?}"),
            Check::EachContainsText(t) => format!("every match containing {t:?}"),
            Check::Value(v) => format!("value {v:?}"),
            Check::HasAttribute(name) => format!("attribute '{name}'"),
            Check::Checked => "to be checked".to_string(),
            Check::PropertyNotEmpty(name) => format!("non-empty '{name}'"),
            Check::PropertyContains(name, t) => format!("'{name}' containing {t:?}"),
            Check::CountAtLeast(n) => format!("at least {n} match(es)"),
        }
    }
}

enum Observed {
    Pass,
    Missing,
    Fail(String),
}

/// Assertions on a locator, each retried until the wait window closes
///
/// Without [`Expectation::nth`], text containment passes when any match
/// contains the text; every other check looks at the first match.
pub struct Expectation<'s, D: Driver> {
    session: &'s mut Session<D>,
    locator: Locator,
    nth: Option<usize>,
    wait: Wait,
}

impl<'s, D: Driver> Expectation<'s, D> {
    pub fn nth(self, nth: usize) -> Self {
        Self { nth: Some(nth), ..self }
    }

    pub async fn to_exist(self) -> E2eResult<()> {
        self.run(Check::Exists).await
    }

    pub async fn to_be_visible(self) -> E2eResult<()> {
        self.run(Check::Visible).await
    }

    pub async fn to_contain_text(self, expected: &str) -> E2eResult<()> {
        self.run(Check::ContainsText(expected)).await
    }

    pub async fn each_to_contain_text(self, expected: &str) -> E2eResult<()> {
        self.run(Check::EachContainsText(expected)).await
    }

    pub async fn to_have_value(self, expected: &str) -> E2eResult<()> {
        self.run(Check::Value(expected)).await
    }

    pub async fn to_have_attribute(self, name: &str) -> E2eResult<()> {
        self.run(Check::HasAttribute(name)).await
    }

    pub async fn to_be_checked(self) -> E2eResult<()> {
        self.run(Check::Checked).await
    }

    pub async fn property_not_empty(self, name: &str) -> E2eResult<()> {
        self.run(Check::PropertyNotEmpty(name)).await
    }

    pub async fn property_to_contain(self, name: &str, expected: &str) -> E2eResult<()> {
        self.run(Check::PropertyContains(name, expected)).await
    }

    pub async fn to_have_count_at_least(self, min: usize) -> E2eResult<()> {
        self.run(Check::CountAtLeast(min)).await
    }

    pub async fn not_to_exist(self) -> E2eResult<()> {
        self.session.record(format!("expect {} not to exist", self.locator.name()));

        let selector = self.locator.selector();
        let deadline = self.wait.start();
        loop {
            let count = self.session.driver.count(&selector).await?;
            if count == 0 {
                return Ok(());
            }
            if !deadline.tick().await {
                return Err(E2eError::AssertionFailed {
                    subject: self.locator.to_string(),
                    expected: "no matches".to_string(),
                    actual: format!("{count} match(es)"),
                });
            }
        }
    }

    async fn run(self, check: Check<'_>) -> E2eResult<()> {
        self.session.record(format!("expect {} {}", self.locator.name(), check.describe()));

        let selector = self.locator.selector();
        let deadline = self.wait.start();
        let mut last_failure = None;

        loop {
            match observe(&mut self.session.driver, &selector, self.nth, check).await? {
                Observed::Pass => return Ok(()),
                Observed::Missing => {}
                Observed::Fail(actual) => last_failure = Some(actual),
            }

            if !deadline.tick().await {
                let waited_ms = deadline.waited_ms();
                return Err(match last_failure {
                    Some(actual) => E2eError::AssertionFailed {
                        subject: self.locator.to_string(),
                        expected: check.describe(),
                        actual,
                    },
                    None => E2eError::ElementNotFound {
                        locator: self.locator.to_string(),
                        waited_ms,
                    },
                });
            }
        }
    }
}

async fn observe<D: Driver>(driver: &mut D, selector: &str, at: Option<usize>, check: Check<'_>) -> E2eResult<Observed> {
    let count = driver.count(selector).await?;

    if let Check::CountAtLeast(min) = check {
        return Ok(match count {
            c if c >= min => Observed::Pass,
            0 => Observed::Missing,
            c => Observed::Fail(format!("{c} match(es)")),
        });
    }
    let nth = at.unwrap_or(0);
    if count <= nth {
        return Ok(Observed::Missing);
    }

    let observed = match check {
        Check::Exists => Observed::Pass,
        Check::Visible => {
            if driver.is_visible(selector, nth).await? {
                Observed::Pass
            } else {
                Observed::Fail("hidden".to_string())
            }
        }
        Check::ContainsText(expected) if at.is_none() => {
            let mut texts = Vec::with_capacity(count);
            for i in 0..count {
                let text = driver.text(selector, i).await?;
                if text.contains(expected) {
                    return Ok(Observed::Pass);
                }
                texts.push(format!("{:?}", text.trim()));
            }
            Observed::Fail(texts.join(", "))
        }
        Check::ContainsText(expected) => {
            let text = driver.text(selector, nth).await?;
            verdict(text.contains(expected), || format!("{:?}", text.trim()))
        }
        Check::EachContainsText(expected) => {
            let mut verdict_so_far = Observed::Pass;
            for i in 0..count {
                let text = driver.text(selector, i).await?;
                if !text.contains(expected) {
                    verdict_so_far = Observed::Fail(format!("match #{i} was {:?}", text.trim()));
                    break;
                }
            }
            verdict_so_far
        }
        Check::Value(expected) => {
            let value = json_to_text(&driver.property(selector, nth, "value").await?);
            verdict(value == expected, || format!("{value:?}"))
        }
        Check::HasAttribute(name) => {
            let attr = driver.attribute(selector, nth, name).await?;
            verdict(attr.is_some(), || "attribute absent".to_string())
        }
        Check::Checked => {
            let checked = driver.property(selector, nth, "checked").await?;
            verdict(checked.as_bool() == Some(true), || format!("checked = {checked}"))
        }
        Check::PropertyNotEmpty(name) => {
            let value = json_to_text(&driver.property(selector, nth, name).await?);
            verdict(!value.is_empty(), || "empty".to_string())
        }
        Check::PropertyContains(name, expected) => {
            let value = json_to_text(&driver.property(selector, nth, name).await?);
            verdict(value.contains(expected), || format!("{value:?}"))
        }
        Check::CountAtLeast(_) => unreachable!("handled above"),
    };
    Ok(observed)
}

fn verdict(pass: bool, actual: impl FnOnce() -> String) -> Observed {
    if pass {
        Observed::Pass
    } else {
        Observed::Fail(actual())
    }
}
