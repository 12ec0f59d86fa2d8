//! `fetch-balance`: total received, spent and confirmed value of one address.
//!
//! The server answers `blockchain.fetch_history` with one row per output paid
//! to the address. Rows carry the output `value`, the confirming block
//! `height` (zero while unconfirmed) and a `spent` marker that is absent,
//! `null` or `false` for outputs that are still unspent.

use super::remote::{self, remote_options, RemoteSettings};
use crate::client::Connector;
use crate::command::Command;
use crate::error::{BexError, RemoteError, Result};
use crate::options::{EffectiveParameters, OptionSchema, OptionSpec};
use crate::render::{render, Format};
use crate::result::ConsoleResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Write;

pub const METHOD: &str = "blockchain.fetch_history";

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

pub struct FetchBalance {
    connector: Connector,
    settings: Option<RemoteSettings>,
    address: String,
}

impl FetchBalance {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            settings: None,
            address: String::new(),
        }
    }
}

impl Command for FetchBalance {
    fn options(&self) -> OptionSchema {
        remote_options().with(
            OptionSpec::text("address", "The payment address")
                .short('a')
                .required()
                .env("BEX_ADDRESS")
                .config_key("wallet.address"),
        )
    }

    fn configure(&mut self, params: &EffectiveParameters) -> Result<()> {
        let address = params.text("address")?;
        validate_address(address)?;
        self.settings = Some(RemoteSettings::from_params(params)?);
        self.address = address.to_string();
        Ok(())
    }

    fn execute(&mut self, output: &mut dyn Write, error: &mut dyn Write) -> ConsoleResult {
        let Some(settings) = &self.settings else {
            return remote::not_configured(error);
        };
        let address = self.address.clone();
        let format = settings.format;
        remote::call(
            &self.connector,
            settings,
            METHOD,
            json!({ "address": address }),
            move |payload, out| write_balance(&address, payload, format, out),
            output,
            error,
        )
    }
}

fn validate_address(address: &str) -> Result<()> {
    if !(26..=35).contains(&address.len()) {
        return Err(BexError::Validation(format!(
            "invalid payment address '{}': expected 26 to 35 characters",
            address
        )));
    }
    if let Some(bad) = address.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
        return Err(BexError::Validation(format!(
            "invalid payment address '{}': '{}' is not a base58 character",
            address, bad
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    value: u64,
    #[serde(default)]
    height: u64,
    #[serde(default)]
    spent: Option<Value>,
}

impl HistoryRow {
    fn is_spent(&self) -> bool {
        !matches!(self.spent, None | Some(Value::Null) | Some(Value::Bool(false)))
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub address: String,
    pub received: u64,
    pub spent: u64,
    pub confirmed: u64,
}

/// Fold history rows into totals. `confirmed` counts unspent value in mined blocks.
pub fn summarize(address: &str, history: Value) -> Result<Balance> {
    let rows: Vec<HistoryRow> = serde_json::from_value(history).map_err(|e| {
        BexError::Remote(RemoteError::Transport(format!(
            "unexpected history payload: {}",
            e
        )))
    })?;

    let mut balance = Balance {
        address: address.to_string(),
        received: 0,
        spent: 0,
        confirmed: 0,
    };
    for row in rows {
        balance.received = balance.received.saturating_add(row.value);
        if row.is_spent() {
            balance.spent = balance.spent.saturating_add(row.value);
        } else if row.height > 0 {
            balance.confirmed = balance.confirmed.saturating_add(row.value);
        }
    }
    Ok(balance)
}

fn write_balance(address: &str, history: Value, format: Format, output: &mut dyn Write) -> Result<()> {
    let balance = summarize(address, history)?;
    let value = serde_json::to_value(&balance)
        .map_err(|e| BexError::Internal(format!("cannot encode balance: {}", e)))?;
    render(&json!({ "balance": value }), format, output)
}
