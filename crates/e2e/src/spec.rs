//! Declarative YAML scenario definitions

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::locators::{self, Locator, Strategy};
use crate::template::Vars;

/// A group of scenarios sharing a fixture and setup steps, parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Group name, e.g. "login"
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags applied to every scenario in the file
    #[serde(default)]
    pub tags: Vec<String>,

    /// Fixture file stem loaded once for the group
    #[serde(default)]
    pub fixture: Option<String>,

    /// Steps run before each scenario, in a fresh browser context
    #[serde(default)]
    pub before_each: Vec<Step>,

    pub scenarios: Vec<Scenario>,
}

/// One user journey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub steps: Vec<Step>,
}

/// Reference to an element-selection rule
///
/// Either a registry name (`login.email`), a registry name with arguments
/// (`products.category_link(Women, 1)` or the map form), or a raw selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocatorRef {
    Named(String),
    Parameterized {
        name: String,
        args: Vec<serde_yaml::Value>,
    },
    Css {
        css: String,
    },
    XPath {
        xpath: String,
    },
    Text {
        text: String,
    },
}

impl LocatorRef {
    pub fn resolve(&self, vars: &Vars) -> E2eResult<Locator> {
        match self {
            LocatorRef::Named(reference) => {
                let reference = vars.render(reference)?;
                let (name, args) = split_call(&reference)?;
                locators::resolve(name, &args)
            }
            LocatorRef::Parameterized { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| vars.render(&yaml_scalar(arg)?))
                    .collect::<E2eResult<Vec<_>>>()?;
                locators::resolve(name, &args)
            }
            LocatorRef::Css { css } => Ok(raw(Strategy::Css, vars.render(css)?)),
            LocatorRef::XPath { xpath } => Ok(raw(Strategy::XPath, vars.render(xpath)?)),
            LocatorRef::Text { text } => Ok(raw(Strategy::Text, vars.render(text)?)),
        }
    }
}

fn raw(strategy: Strategy, expr: String) -> Locator {
    Locator::dynamic(format!("raw({expr})"), strategy, expr)
}

/// `name(a, b)` -> ("name", ["a", "b"]); a bare name has no arguments
fn split_call(reference: &str) -> E2eResult<(&str, Vec<String>)> {
    let Some((name, rest)) = reference.split_once('(') else {
        return Ok((reference.trim(), Vec::new()));
    };
    let inner = rest.strip_suffix(')').ok_or_else(|| {
        E2eError::SpecParse(format!("unbalanced locator reference '{reference}'"))
    })?;
    let args = inner
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    Ok((name.trim(), args))
}

fn yaml_scalar(value: &serde_yaml::Value) -> E2eResult<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(E2eError::SpecParse(format!("locator argument must be a scalar, got {other:?}"))),
    }
}

/// Checks on a DOM property such as `validationMessage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyAssertion {
    pub name: String,
    #[serde(default)]
    pub not_empty: bool,
    #[serde(default)]
    pub contains: Option<String>,
}

/// A single step in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a path (relative to the base URL) or absolute URL
    Visit {
        url: String,
    },

    Reload,

    Login {
        email: String,
        password: String,
    },

    Logout,

    AddToCart {
        #[serde(default = "default_product_id")]
        product_id: u32,
    },

    OpenCart,

    RemoveFirstItemFromCart,

    SearchProducts {
        term: String,
    },

    FilterByCategory {
        category: String,
        #[serde(default = "default_item_index")]
        item_index: u32,
    },

    Click {
        locator: LocatorRef,
        #[serde(default)]
        nth: usize,
    },

    /// Type text with keyboard simulation
    Type {
        locator: LocatorRef,
        text: String,
        #[serde(default)]
        nth: usize,
    },

    /// Select a dropdown option by value or label
    Select {
        locator: LocatorRef,
        option: String,
        #[serde(default)]
        expect_value: Option<String>,
    },

    Check {
        locator: LocatorRef,
        #[serde(default)]
        nth: usize,
        #[serde(default)]
        expect_checked: bool,
    },

    /// Assert something about an element; without `nth`, `contains`
    /// accepts any match
    Assert {
        locator: LocatorRef,
        #[serde(default)]
        nth: Option<usize>,
        #[serde(default)]
        exists: Option<bool>,
        #[serde(default)]
        visible: bool,
        #[serde(default)]
        contains: Option<String>,
        #[serde(default)]
        each_contains: Option<String>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        attribute: Option<String>,
        #[serde(default)]
        checked: bool,
        #[serde(default)]
        property: Option<PropertyAssertion>,
        #[serde(default)]
        count_at_least: Option<usize>,
    },

    AssertUrl {
        #[serde(default)]
        equals: Option<String>,
        #[serde(default)]
        contains: Option<String>,
    },

    Screenshot {
        name: String,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

fn default_product_id() -> u32 {
    1
}

fn default_item_index() -> u32 {
    1
}

impl Step {
    /// Short label used in logs and reports
    pub fn name(&self) -> String {
        match self {
            Step::Visit { url } => format!("visit:{}", url),
            Step::Reload => "reload".to_string(),
            Step::Login { .. } => "login".to_string(),
            Step::Logout => "logout".to_string(),
            Step::AddToCart { product_id } => format!("add_to_cart:{}", product_id),
            Step::OpenCart => "open_cart".to_string(),
            Step::RemoveFirstItemFromCart => "remove_first_item_from_cart".to_string(),
            Step::SearchProducts { term } => format!("search_products:{}", term),
            Step::FilterByCategory { category, item_index } => {
                format!("filter_by_category:{}/{}", category, item_index)
            }
            Step::Click { locator, .. } => format!("click:{}", locator.label()),
            Step::Type { locator, .. } => format!("type:{}", locator.label()),
            Step::Select { locator, option, .. } => format!("select:{}={}", locator.label(), option),
            Step::Check { locator, .. } => format!("check:{}", locator.label()),
            Step::Assert { locator, .. } => format!("assert:{}", locator.label()),
            Step::AssertUrl { equals, contains } => match (equals, contains) {
                (Some(url), _) => format!("assert_url:=={}", url),
                (None, Some(fragment)) => format!("assert_url:~{}", fragment),
                (None, None) => "assert_url".to_string(),
            },
            Step::Screenshot { name } => format!("screenshot:{}", name),
            Step::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
        }
    }

    fn locator_ref(&self) -> Option<&LocatorRef> {
        match self {
            Step::Click { locator, .. }
            | Step::Type { locator, .. }
            | Step::Select { locator, .. }
            | Step::Check { locator, .. }
            | Step::Assert { locator, .. } => Some(locator),
            _ => None,
        }
    }
}

impl LocatorRef {
    fn label(&self) -> String {
        match self {
            LocatorRef::Named(name) => name.clone(),
            LocatorRef::Parameterized { name, args } => {
                let args: Vec<String> = args.iter().filter_map(|a| yaml_scalar(a).ok()).collect();
                format!("{}({})", name, args.join(", "))
            }
            LocatorRef::Css { css } => css.clone(),
            LocatorRef::XPath { xpath } => xpath.clone(),
            LocatorRef::Text { text } => format!("text={}", text),
        }
    }
}

impl ScenarioFile {
    /// Parse a scenario file from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a scenario file from disk
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::SpecParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all scenario files from a directory, ordered by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Whether a scenario carries `tag`, directly or through its file
    pub fn has_tag(&self, scenario: &Scenario, tag: &str) -> bool {
        self.tags.iter().chain(scenario.tags.iter()).any(|t| t == tag)
    }

    /// Resolve every locator reference so typos surface before a browser starts
    pub fn check_locators(&self, vars: &Vars) -> E2eResult<()> {
        let steps = self
            .before_each
            .iter()
            .chain(self.scenarios.iter().flat_map(|s| s.steps.iter()));
        for step in steps {
            if let Some(locator) = step.locator_ref() {
                locator.resolve(vars)?;
            }
        }
        Ok(())
    }
}
