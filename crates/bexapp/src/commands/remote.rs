use crate::bridge::AsyncBridge;
use crate::client::{Connector, Endpoint};
use crate::error::{BexError, Result};
use crate::options::{EffectiveParameters, OptionSchema, OptionSpec, OptionValue};
use crate::render::Format;
use crate::result::ConsoleResult;
use serde_json::Value;
use std::io::Write;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "tcp://127.0.0.1:9091";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Options every remote command accepts.
pub fn remote_options() -> OptionSchema {
    OptionSchema::new()
        .with(
            OptionSpec::text("server", "Server address, e.g. tcp://127.0.0.1:9091")
                .short('s')
                .default_value(OptionValue::Text(DEFAULT_SERVER.to_string()))
                .env("BEX_SERVER_URL")
                .config_key("server.url"),
        )
        .with(
            OptionSpec::unsigned("timeout", "Seconds to wait for the server")
                .default_value(OptionValue::Unsigned(DEFAULT_TIMEOUT_SECS))
                .env("BEX_SERVER_TIMEOUT")
                .config_key("server.timeout"),
        )
        .with(
            OptionSpec::text("format", "Output format: text or json")
                .short('f')
                .default_value(OptionValue::Text(Format::Text.to_string()))
                .env("BEX_FORMAT"),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub server: Endpoint,
    pub timeout: Duration,
    pub format: Format,
}

impl RemoteSettings {
    pub fn from_params(params: &EffectiveParameters) -> Result<Self> {
        let server = params
            .text("server")?
            .parse::<Endpoint>()
            .map_err(BexError::Validation)?;

        let secs = params.unsigned("timeout")?;
        if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
            return Err(BexError::Validation(format!(
                "timeout must be between 1 and {} seconds, got {}",
                MAX_TIMEOUT_SECS, secs
            )));
        }

        let format = params.text("format")?.parse::<Format>()?;
        Ok(Self {
            server,
            timeout: Duration::from_secs(secs),
            format,
        })
    }
}

/// Connect and perform one bridged request, reporting every failure on `error`.
pub fn call<R>(
    connector: &Connector,
    settings: &RemoteSettings,
    method: &str,
    params: Value,
    render: R,
    output: &mut dyn Write,
    error: &mut dyn Write,
) -> ConsoleResult
where
    R: FnOnce(Value, &mut dyn Write) -> Result<()>,
{
    let connected = connector(settings.timeout).and_then(|mut client| {
        client.connect(&settings.server)?;
        Ok(client)
    });
    let mut client = match connected {
        Ok(client) => client,
        Err(e) => {
            let _ = writeln!(error, "Error: {}", e);
            return ConsoleResult::Failure;
        }
    };

    AsyncBridge::new(settings.timeout).complete(
        client.as_mut(),
        method,
        params,
        render,
        output,
        error,
    )
}

pub(crate) fn not_configured(error: &mut dyn Write) -> ConsoleResult {
    let _ = writeln!(error, "Error: internal error: command was not configured");
    ConsoleResult::Failure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Origin;

    fn params(server: &str, timeout: u64, format: &str) -> EffectiveParameters {
        let mut params = EffectiveParameters::new();
        params.insert("server", OptionValue::Text(server.into()), Origin::Default);
        params.insert("timeout", OptionValue::Unsigned(timeout), Origin::Default);
        params.insert("format", OptionValue::Text(format.into()), Origin::Default);
        params
    }

    #[test]
    fn test_settings_from_valid_params() {
        let settings = RemoteSettings::from_params(&params("tcp://node:9091", 7, "json")).unwrap();
        assert_eq!(settings.server.to_string(), "tcp://node:9091");
        assert_eq!(settings.timeout, Duration::from_secs(7));
        assert_eq!(settings.format, Format::Json);
    }

    #[test]
    fn test_malformed_server_is_validation_error() {
        let err = RemoteSettings::from_params(&params("node", 5, "text")).unwrap_err();
        assert!(matches!(err, BexError::Validation(_)));
    }

    #[test]
    fn test_timeout_range_enforced() {
        for timeout in [0, MAX_TIMEOUT_SECS + 1] {
            let err = RemoteSettings::from_params(&params("tcp://node:1", timeout, "text"))
                .unwrap_err();
            assert!(matches!(err, BexError::Validation(_)));
        }
    }

    #[test]
    fn test_unknown_format_is_validation_error() {
        let err = RemoteSettings::from_params(&params("tcp://node:1", 5, "xml")).unwrap_err();
        assert!(matches!(err, BexError::Validation(_)));
    }
}
