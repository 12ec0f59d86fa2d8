//! Output rendering for command payloads.
//!
//! `text` prints an indented `key: value` tree (one leaf per line, array
//! elements keyed by position). `json` prints the payload as pretty JSON.
//! Both only ever write to normal output.

use crate::error::{BexError, Result};
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl FromStr for Format {
    type Err = BexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "info" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(BexError::Validation(format!(
                "unknown output format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => write!(f, "text"),
            Format::Json => write!(f, "json"),
        }
    }
}

pub fn render(value: &Value, format: Format, output: &mut dyn Write) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut *output, value)
                .map_err(|e| BexError::Internal(format!("cannot encode output: {}", e)))?;
            writeln!(output)?;
        }
        Format::Text => write_tree(value, 0, output)?,
    }
    Ok(())
}

fn write_tree(value: &Value, depth: usize, output: &mut dyn Write) -> Result<()> {
    let indent = "    ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                write_entry(key, child, depth, &indent, output)?;
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                write_entry(&i.to_string(), child, depth, &indent, output)?;
            }
        }
        leaf => writeln!(output, "{}{}", indent, scalar(leaf))?,
    }
    Ok(())
}

fn write_entry(
    key: &str,
    child: &Value,
    depth: usize,
    indent: &str,
    output: &mut dyn Write,
) -> Result<()> {
    match child {
        Value::Object(_) | Value::Array(_) => {
            writeln!(output, "{}{}:", indent, key)?;
            write_tree(child, depth + 1, output)
        }
        leaf => {
            writeln!(output, "{}{}: {}", indent, key, scalar(leaf))?;
            Ok(())
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
