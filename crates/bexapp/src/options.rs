//! # Option Schema and Effective Parameters
//!
//! Every command declares the options it understands as an [`OptionSchema`].
//! The schema is the single source of truth for all three variable tiers:
//!
//! - the **command line** (`--name` / `-x`), built into a clap parser,
//! - the **config file** (looked up by `config_key`, dotted for sections),
//! - the **environment** (looked up by `env`, if one is declared).
//!
//! Values from every tier go through [`ValueKind::parse`], so a bad timeout
//! reads the same whether it came from a flag or from `BEX_SERVER_TIMEOUT`.
//!
//! The merged outcome is [`EffectiveParameters`]: one [`OptionValue`] per key,
//! tagged with the [`Origin`] tier that supplied it.

use crate::error::{BexError, Result};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Flag,
    Text,
    Unsigned,
}

impl ValueKind {
    /// Parse a raw string (flag argument, environment value) into a typed value.
    pub fn parse(self, raw: &str) -> std::result::Result<OptionValue, String> {
        match self {
            ValueKind::Flag => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(OptionValue::Flag(true)),
                "0" | "false" | "no" | "off" => Ok(OptionValue::Flag(false)),
                other => Err(format!("expected a boolean, got '{}'", other)),
            },
            ValueKind::Text => Ok(OptionValue::Text(raw.to_string())),
            ValueKind::Unsigned => raw
                .trim()
                .parse::<u64>()
                .map(OptionValue::Unsigned)
                .map_err(|_| format!("expected an unsigned integer, got '{}'", raw)),
        }
    }

    /// Convert a config-file value, allowing strings to stand in for any kind.
    pub fn from_toml(self, value: &toml::Value) -> std::result::Result<OptionValue, String> {
        match (self, value) {
            (_, toml::Value::String(s)) => self.parse(s),
            (ValueKind::Flag, toml::Value::Boolean(b)) => Ok(OptionValue::Flag(*b)),
            (ValueKind::Unsigned, toml::Value::Integer(n)) => u64::try_from(*n)
                .map(OptionValue::Unsigned)
                .map_err(|_| format!("expected an unsigned integer, got {}", n)),
            (ValueKind::Text, toml::Value::Integer(n)) => Ok(OptionValue::Text(n.to_string())),
            (kind, other) => Err(format!(
                "expected {}, got {} '{}'",
                kind,
                other.type_str(),
                other
            )),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Flag => write!(f, "a boolean"),
            ValueKind::Text => write!(f, "a string"),
            ValueKind::Unsigned => write!(f, "an unsigned integer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag(bool),
    Text(String),
    Unsigned(u64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Flag(b) => write!(f, "{}", b),
            OptionValue::Text(s) => write!(f, "{}", s),
            OptionValue::Unsigned(n) => write!(f, "{}", n),
        }
    }
}

/// Declaration of a single option.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: ValueKind,
    pub help: &'static str,
    pub short: Option<char>,
    pub required: bool,
    pub default: Option<OptionValue>,
    pub env: Option<&'static str>,
    config_key: Option<&'static str>,
}

impl OptionSpec {
    pub fn new(name: &'static str, kind: ValueKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            help,
            short: None,
            required: false,
            default: None,
            env: None,
            config_key: None,
        }
    }

    pub fn flag(name: &'static str, help: &'static str) -> Self {
        Self::new(name, ValueKind::Flag, help)
    }

    pub fn text(name: &'static str, help: &'static str) -> Self {
        Self::new(name, ValueKind::Text, help)
    }

    pub fn unsigned(name: &'static str, help: &'static str) -> Self {
        Self::new(name, ValueKind::Unsigned, help)
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Required options never carry a default; setting one clears the other.
    pub fn required(mut self) -> Self {
        self.required = true;
        self.default = None;
        self
    }

    pub fn default_value(mut self, value: OptionValue) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }

    pub fn env(mut self, name: &'static str) -> Self {
        self.env = Some(name);
        self
    }

    pub fn config_key(mut self, key: &'static str) -> Self {
        self.config_key = Some(key);
        self
    }

    /// Key used for the config-file lookup; falls back to the option name.
    pub fn file_key(&self) -> &'static str {
        self.config_key.unwrap_or(self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    specs: Vec<OptionSpec>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, spec: OptionSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
        self.specs.iter()
    }
}

/// Which variable tier supplied a value. Ordered lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    Default,
    Environment,
    ConfigFile,
    CommandLine,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Origin::Default => "default",
            Origin::Environment => "environment",
            Origin::ConfigFile => "config-file",
            Origin::CommandLine => "command-line",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Parameter {
    value: OptionValue,
    origin: Origin,
}

/// Values produced by one tier, before merging.
pub type Tier = BTreeMap<String, OptionValue>;

/// The merged, precedence-resolved values for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveParameters {
    values: BTreeMap<String, Parameter>,
}

impl EffectiveParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay a whole tier over the current values. Callers apply tiers lowest first.
    pub fn overlay(&mut self, tier: Tier, origin: Origin) {
        for (key, value) in tier {
            self.values.insert(key, Parameter { value, origin });
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue, origin: Origin) {
        self.values.insert(key.into(), Parameter { value, origin });
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key).map(|p| &p.value)
    }

    pub fn origin(&self, key: &str) -> Option<Origin> {
        self.values.get(key).map(|p| p.origin)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(OptionValue::Text(s)) => Ok(s),
            Some(other) => Err(wrong_kind(key, ValueKind::Text, other)),
            None => Err(missing(key)),
        }
    }

    pub fn optional_text(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.text(key).map(Some),
        }
    }

    pub fn unsigned(&self, key: &str) -> Result<u64> {
        match self.get(key) {
            Some(OptionValue::Unsigned(n)) => Ok(*n),
            Some(other) => Err(wrong_kind(key, ValueKind::Unsigned, other)),
            None => Err(missing(key)),
        }
    }

    pub fn optional_unsigned(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.unsigned(key).map(Some),
        }
    }

    /// Flags that were never set read as `false`.
    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Some(OptionValue::Flag(b)) => Ok(*b),
            Some(other) => Err(wrong_kind(key, ValueKind::Flag, other)),
            None => Ok(false),
        }
    }
}

fn missing(key: &str) -> BexError {
    BexError::Validation(format!("the option '--{}' is required but missing", key))
}

fn wrong_kind(key: &str, expected: ValueKind, got: &OptionValue) -> BexError {
    BexError::Validation(format!(
        "the option '--{}' must be {}, got '{}'",
        key, expected, got
    ))
}
