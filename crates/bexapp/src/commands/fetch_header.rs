//! `fetch-header`: one block header, selected by height or by hash.
//!
//! `--height` and `--hash` are one logical selector. When both are set, the
//! one from the higher-precedence source wins, so `--height 5` on the command
//! line overrides a `BEX_HASH` in the environment. Both set by the same source
//! is an error. The server's header object is shown as-is, with a `time` field
//! added that spells out its unix `timestamp`.

use super::remote::{self, remote_options, RemoteSettings};
use crate::client::Connector;
use crate::command::Command;
use crate::error::{BexError, RemoteError, Result};
use crate::options::{EffectiveParameters, OptionSchema, OptionSpec, Origin};
use crate::render::{render, Format};
use crate::result::ConsoleResult;
use chrono::{DateTime, SecondsFormat};
use serde_json::{json, Value};
use std::io::Write;

pub const METHOD: &str = "blockchain.fetch_block_header";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Height(u64),
    Hash(String),
}

impl Selector {
    fn params(&self) -> Value {
        match self {
            Selector::Height(height) => json!({ "height": height }),
            Selector::Hash(hash) => json!({ "hash": hash }),
        }
    }
}

pub struct FetchHeader {
    connector: Connector,
    settings: Option<RemoteSettings>,
    selector: Option<Selector>,
}

impl FetchHeader {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            settings: None,
            selector: None,
        }
    }
}

impl Command for FetchHeader {
    fn options(&self) -> OptionSchema {
        remote_options()
            .with(OptionSpec::unsigned("height", "The block height").env("BEX_HEIGHT"))
            .with(OptionSpec::text("hash", "The block hash, 64 hex characters").env("BEX_HASH"))
    }

    fn configure(&mut self, params: &EffectiveParameters) -> Result<()> {
        let selector = select(params)?;
        self.settings = Some(RemoteSettings::from_params(params)?);
        self.selector = Some(selector);
        Ok(())
    }

    fn execute(&mut self, output: &mut dyn Write, error: &mut dyn Write) -> ConsoleResult {
        let (Some(settings), Some(selector)) = (&self.settings, &self.selector) else {
            return remote::not_configured(error);
        };
        let format = settings.format;
        remote::call(
            &self.connector,
            settings,
            METHOD,
            selector.params(),
            move |payload, out| write_header(payload, format, out),
            output,
            error,
        )
    }
}

fn select(params: &EffectiveParameters) -> Result<Selector> {
    let height = params.optional_unsigned("height")?;
    let hash = params.optional_text("hash")?;
    let origin = |key| params.origin(key).unwrap_or(Origin::Default);

    match (height, hash) {
        (Some(height), None) => Ok(Selector::Height(height)),
        (None, Some(hash)) => Ok(Selector::Hash(validate_hash(hash)?)),
        (Some(height), Some(hash)) => match origin("height").cmp(&origin("hash")) {
            std::cmp::Ordering::Greater => Ok(Selector::Height(height)),
            std::cmp::Ordering::Less => Ok(Selector::Hash(validate_hash(hash)?)),
            std::cmp::Ordering::Equal => Err(BexError::Validation(
                "the options '--height' and '--hash' cannot be used together".to_string(),
            )),
        },
        (None, None) => Err(BexError::Validation(
            "one of the options '--height' or '--hash' is required".to_string(),
        )),
    }
}

fn validate_hash(hash: &str) -> Result<String> {
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BexError::Validation(format!(
            "invalid block hash '{}': expected 64 hex characters",
            hash
        )));
    }
    Ok(hash.to_ascii_lowercase())
}

fn write_header(payload: Value, format: Format, output: &mut dyn Write) -> Result<()> {
    let mut header = match payload {
        Value::Object(header) => header,
        other => {
            return Err(BexError::Remote(RemoteError::Transport(format!(
                "expected a header object, got {}",
                other
            ))))
        }
    };

    let time = header
        .get("timestamp")
        .and_then(Value::as_u64)
        .and_then(|ts| i64::try_from(ts).ok())
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));
    if let Some(time) = time {
        header.insert("time".to_string(), Value::String(time));
    }

    render(&json!({ "header": header }), format, output)
}
