use crate::error::{BexError, Result};
use std::collections::HashMap;

/// Name → value lookup over environment variables.
///
/// `Ok(None)` means the variable is unset, which is never an error.
pub trait Environment {
    fn var(&self, name: &str) -> Result<Option<String>>;
}

/// Reads the real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Result<Option<String>> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(BexError::Configuration(format!(
                "environment variable {} is not valid unicode",
                name
            ))),
        }
    }
}

/// In-memory environment for tests and embedders.
#[derive(Debug, Default, Clone)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Environment for MapEnvironment {
    fn var(&self, name: &str) -> Result<Option<String>> {
        Ok(self.vars.get(name).cloned())
    }
}
