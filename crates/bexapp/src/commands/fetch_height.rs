use super::remote::{self, remote_options, RemoteSettings};
use crate::client::Connector;
use crate::command::Command;
use crate::error::{BexError, RemoteError, Result};
use crate::options::{EffectiveParameters, OptionSchema};
use crate::render::{render, Format};
use crate::result::ConsoleResult;
use serde_json::{json, Value};
use std::io::Write;

pub const METHOD: &str = "blockchain.fetch_last_height";

/// `fetch-height`: height of the server's last block.
pub struct FetchHeight {
    connector: Connector,
    settings: Option<RemoteSettings>,
}

impl FetchHeight {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            settings: None,
        }
    }
}

impl Command for FetchHeight {
    fn options(&self) -> OptionSchema {
        remote_options()
    }

    fn configure(&mut self, params: &EffectiveParameters) -> Result<()> {
        self.settings = Some(RemoteSettings::from_params(params)?);
        Ok(())
    }

    fn execute(&mut self, output: &mut dyn Write, error: &mut dyn Write) -> ConsoleResult {
        let Some(settings) = &self.settings else {
            return remote::not_configured(error);
        };
        let format = settings.format;
        remote::call(
            &self.connector,
            settings,
            METHOD,
            json!({}),
            move |payload, out| write_height(payload, format, out),
            output,
            error,
        )
    }
}

fn write_height(payload: Value, format: Format, output: &mut dyn Write) -> Result<()> {
    let height = payload.as_u64().ok_or_else(|| {
        BexError::Remote(RemoteError::Transport(format!(
            "expected a block height, got {}",
            payload
        )))
    })?;
    render(&json!({ "height": height }), format, output)
}
