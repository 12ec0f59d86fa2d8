use super::remote::{remote_options, RemoteSettings};
use crate::command::Command;
use crate::error::Result;
use crate::options::{EffectiveParameters, OptionSchema, OptionSpec, Origin};
use crate::render::render;
use crate::result::ConsoleResult;
use serde_json::{json, Map, Value};
use std::io::Write;

/// `settings`: print the server settings a remote command would use.
///
/// Runs the same resolution and validation as the `fetch-*` commands, so it
/// doubles as a check of the config file and environment.
#[derive(Default)]
pub struct Settings {
    resolved: Option<Resolved>,
}

struct Resolved {
    settings: RemoteSettings,
    origins: Vec<(&'static str, Origin)>,
    show_origin: bool,
}

impl Command for Settings {
    fn options(&self) -> OptionSchema {
        remote_options().with(OptionSpec::flag(
            "show-origin",
            "Show where each value came from",
        ))
    }

    fn configure(&mut self, params: &EffectiveParameters) -> Result<()> {
        let settings = RemoteSettings::from_params(params)?;
        let origins = ["format", "server", "timeout"]
            .into_iter()
            .map(|key| (key, params.origin(key).unwrap_or(Origin::Default)))
            .collect();
        self.resolved = Some(Resolved {
            settings,
            origins,
            show_origin: params.flag("show-origin")?,
        });
        Ok(())
    }

    fn execute(&mut self, output: &mut dyn Write, error: &mut dyn Write) -> ConsoleResult {
        let Some(resolved) = &self.resolved else {
            return super::remote::not_configured(error);
        };

        let settings = &resolved.settings;
        let mut table = Map::new();
        for (key, origin) in &resolved.origins {
            let value = match *key {
                "format" => json!(settings.format.to_string()),
                "server" => json!(settings.server.to_string()),
                _ => json!(settings.timeout.as_secs()),
            };
            let entry = if resolved.show_origin {
                json!({ "value": value, "origin": origin.to_string() })
            } else {
                value
            };
            table.insert(key.to_string(), entry);
        }

        match render(&json!({ "settings": Value::Object(table) }), settings.format, output) {
            Ok(()) => ConsoleResult::Success,
            Err(e) => {
                let _ = writeln!(error, "Error: {}", e);
                ConsoleResult::Failure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionValue;

    fn run(params: &EffectiveParameters) -> String {
        let mut command = Settings::default();
        command.configure(params).unwrap();
        let mut output = Vec::new();
        assert_eq!(
            command.execute(&mut output, &mut Vec::new()),
            ConsoleResult::Success
        );
        String::from_utf8(output).unwrap()
    }

    fn base() -> EffectiveParameters {
        let mut params = EffectiveParameters::new();
        params.insert("server", OptionValue::Text("tcp://node:9091".into()), Origin::ConfigFile);
        params.insert("timeout", OptionValue::Unsigned(9), Origin::Environment);
        params.insert("format", OptionValue::Text("text".into()), Origin::Default);
        params
    }

    #[test]
    fn test_prints_effective_values() {
        assert_eq!(
            run(&base()),
            "settings:\n    format: text\n    server: tcp://node:9091\n    timeout: 9\n"
        );
    }

    #[test]
    fn test_show_origin() {
        let mut params = base();
        params.insert("show-origin", OptionValue::Flag(true), Origin::CommandLine);
        let output = run(&params);
        assert!(output.contains("    server:\n        origin: config-file\n"));
        assert!(output.contains("    timeout:\n        origin: environment\n"));
        assert!(output.contains("        value: 9\n"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut params = base();
        params.insert("timeout", OptionValue::Unsigned(0), Origin::CommandLine);
        assert!(Settings::default().configure(&params).is_err());
    }
}
