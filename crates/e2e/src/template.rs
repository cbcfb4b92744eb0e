//! `${name}` substitution for scenario strings

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{E2eError, E2eResult};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z0-9_.]+)\s*\}").expect("placeholder pattern is valid")
});

/// Variables visible to one scenario run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    values: BTreeMap<String, String>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = (String, String)>) {
        self.values.extend(values);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every `${name}`; unknown names are an error
    pub fn render(&self, input: &str) -> E2eResult<String> {
        let mut missing = None;
        let rendered = PLACEHOLDER.replace_all(input, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match self.values.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(E2eError::Template(format!("undefined variable '{name}' in {input:?}"))),
            None => Ok(rendered.into_owned()),
        }
    }
}
