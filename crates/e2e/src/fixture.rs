//! Static test data loaded from JSON fixture files

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// A test identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFixture {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Fixture files under a single directory, addressed by file stem
#[derive(Debug, Clone)]
pub struct FixtureSet {
    dir: PathBuf,
}

impl FixtureSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load `<dir>/<name>.json` as `T`
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> E2eResult<T> {
        let path = self.dir.join(format!("{name}.json"));
        debug!("Loading fixture {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| {
            E2eError::Fixture(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| E2eError::Fixture(format!("{}: {}", path.display(), e)))
    }

    /// Load a fixture as template variables, `<name>.<field>` for each
    /// scalar field of the JSON object
    pub fn load_vars(&self, name: &str) -> E2eResult<BTreeMap<String, String>> {
        let value: serde_json::Value = self.load(name)?;
        let object = value.as_object().ok_or_else(|| {
            E2eError::Fixture(format!("{name}: expected a JSON object"))
        })?;

        let mut vars = BTreeMap::new();
        for (field, value) in object {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            vars.insert(format!("{name}.{field}"), rendered);
        }
        Ok(vars)
    }
}

/// Derive a per-run address from a base email: `local+<suffix>@domain`
pub fn unique_email(base: &str, suffix: &str) -> String {
    match base.split_once('@') {
        Some((local, domain)) => format!("{local}+{suffix}@{domain}"),
        None => format!("{base}+{suffix}@example.com"),
    }
}

/// Millisecond timestamp used as the uniqueness suffix
pub fn run_suffix() -> String {
    Utc::now().timestamp_millis().to_string()
}
