//! # Variable Resolver
//!
//! Turns a command's [`OptionSchema`] plus the raw arguments into
//! [`EffectiveParameters`]. Three tiers feed in, lowest precedence first:
//!
//! 1. **Environment**: options that declare an `env` name.
//! 2. **Config file**: the TOML file located by `--config`, `BEX_CONFIG`, or
//!    the platform default (see [`crate::config`]).
//! 3. **Command line**: flags parsed by a clap parser generated from the schema.
//!
//! Schema defaults sit underneath all three.
//!
//! Each tier is loaded on its own and then merged key by key. A tier that
//! fails to parse aborts the whole load with a [`BexError::Configuration`].
//! An absent source (unset variable, no file on disk) just contributes nothing.
//! Once merged, required options are checked; a gap there is a
//! [`BexError::Validation`], which the caller can tell apart from a parse error.

use crate::command::Command;
use crate::config::{default_config_path, ConfigFile, CONFIG_ENV};
use crate::environment::{Environment, ProcessEnvironment};
use crate::error::{BexError, Result};
use crate::options::{
    EffectiveParameters, OptionSchema, OptionSpec, OptionValue, Origin, Tier, ValueKind,
};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, ColorChoice};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Argument id of the `--config` flag every command accepts.
const CONFIG_ARG: &str = "config";

/// What a load produced: either parameters to configure with, or help to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Parameters(EffectiveParameters),
    Help(String),
}

pub struct VariableResolver {
    program: String,
    environment: Box<dyn Environment>,
    default_config: Option<PathBuf>,
}

impl VariableResolver {
    pub fn new(
        program: impl Into<String>,
        environment: impl Environment + 'static,
        default_config: Option<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            environment: Box::new(environment),
            default_config,
        }
    }

    /// Resolver over the real process environment and the platform config path.
    pub fn from_process(program: impl Into<String>) -> Self {
        Self::new(program, ProcessEnvironment, default_config_path())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn load(
        &self,
        name: &str,
        summary: &str,
        command: &dyn Command,
        args: &[String],
    ) -> Result<Loaded> {
        let schema = command.options();
        let parser = self.parser(name, summary, &schema);

        let argv = std::iter::once(name.to_string()).chain(args.iter().cloned());
        let matches = match parser.try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => {
                return Ok(Loaded::Help(e.to_string()))
            }
            Err(e) => {
                let message = e.to_string();
                let message = message.trim_start_matches("error: ").trim_end();
                return Err(BexError::Configuration(message.to_string()));
            }
        };

        let command_line = command_line_tier(&schema, &matches)?;
        let environment = self.environment_tier(&schema)?;
        let configuration = match self.config_path(&matches)? {
            Some(path) => configuration_tier(&schema, &path)?,
            None => Tier::new(),
        };
        debug!(
            command = name,
            environment = environment.len(),
            configuration = configuration.len(),
            command_line = command_line.len(),
            "loaded variable tiers"
        );

        let mut params = defaults(&schema);
        params.overlay(environment, Origin::Environment);
        params.overlay(configuration, Origin::ConfigFile);
        params.overlay(command_line, Origin::CommandLine);

        validate_required(&schema, &params)?;
        Ok(Loaded::Parameters(params))
    }

    /// Rendered `--help` text for a command.
    pub fn help(&self, name: &str, summary: &str, command: &dyn Command) -> String {
        self.parser(name, summary, &command.options())
            .render_help()
            .to_string()
    }

    fn parser(&self, name: &str, summary: &str, schema: &OptionSchema) -> clap::Command {
        let mut parser = clap::Command::new(name.to_string())
            .bin_name(format!("{} {}", self.program, name))
            .about(summary.to_string())
            .color(ColorChoice::Never)
            .disable_version_flag(true)
            .args_override_self(true);

        for spec in schema.iter() {
            parser = parser.arg(to_arg(spec));
        }

        parser.arg(
            Arg::new(CONFIG_ARG)
                .long(CONFIG_ARG)
                .short('c')
                .value_name("PATH")
                .action(ArgAction::Set)
                .help("Read settings from this TOML file"),
        )
    }

    fn environment_tier(&self, schema: &OptionSchema) -> Result<Tier> {
        let mut tier = Tier::new();
        for spec in schema.iter() {
            let Some(env) = spec.env else { continue };
            let Some(raw) = self.environment.var(env)? else {
                continue;
            };
            let value = spec.kind.parse(&raw).map_err(|e| {
                BexError::Configuration(format!("invalid value in {}: {}", env, e))
            })?;
            tier.insert(spec.name.to_string(), value);
        }
        Ok(tier)
    }

    fn config_path(&self, matches: &ArgMatches) -> Result<Option<PathBuf>> {
        if let Some(path) = matches.get_one::<String>(CONFIG_ARG) {
            return Ok(Some(PathBuf::from(path)));
        }
        match self.environment.var(CONFIG_ENV)? {
            Some(path) if !path.is_empty() => Ok(Some(PathBuf::from(path))),
            _ => Ok(self.default_config.clone()),
        }
    }
}

fn to_arg(spec: &OptionSpec) -> Arg {
    let mut arg = Arg::new(spec.name).long(spec.name).help(spec.help);
    if let Some(short) = spec.short {
        arg = arg.short(short);
    }
    match spec.kind {
        ValueKind::Flag => arg.action(ArgAction::SetTrue),
        ValueKind::Text | ValueKind::Unsigned => arg
            .action(ArgAction::Set)
            .value_name(spec.name.to_uppercase()),
    }
}

fn command_line_tier(schema: &OptionSchema, matches: &ArgMatches) -> Result<Tier> {
    let mut tier = Tier::new();
    for spec in schema.iter() {
        if matches.value_source(spec.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = match spec.kind {
            ValueKind::Flag => OptionValue::Flag(matches.get_flag(spec.name)),
            ValueKind::Text | ValueKind::Unsigned => {
                let Some(raw) = matches.get_one::<String>(spec.name) else {
                    continue;
                };
                spec.kind.parse(raw).map_err(|e| {
                    BexError::Configuration(format!("invalid value for '--{}': {}", spec.name, e))
                })?
            }
        };
        tier.insert(spec.name.to_string(), value);
    }
    Ok(tier)
}

fn configuration_tier(schema: &OptionSchema, path: &Path) -> Result<Tier> {
    let mut tier = Tier::new();
    let Some(file) = ConfigFile::load(path)? else {
        debug!(path = %path.display(), "no config file");
        return Ok(tier);
    };

    for spec in schema.iter() {
        let key = spec.file_key();
        let Some(raw) = file.lookup(key) else { continue };
        let value = spec.kind.from_toml(raw).map_err(|e| {
            BexError::Configuration(format!(
                "invalid value for '{}' in {}: {}",
                key,
                file.path().display(),
                e
            ))
        })?;
        tier.insert(spec.name.to_string(), value);
    }
    Ok(tier)
}

fn defaults(schema: &OptionSchema) -> EffectiveParameters {
    let mut params = EffectiveParameters::new();
    for spec in schema.iter() {
        if let Some(default) = &spec.default {
            params.insert(spec.name, default.clone(), Origin::Default);
        }
    }
    params
}

fn validate_required(schema: &OptionSchema, params: &EffectiveParameters) -> Result<()> {
    let missing: Vec<String> = schema
        .iter()
        .filter(|spec| spec.required && !params.contains(spec.name))
        .map(|spec| match spec.env {
            Some(env) => format!("--{} (or {})", spec.name, env),
            None => format!("--{}", spec.name),
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BexError::Validation(format!(
            "missing required option: {}",
            missing.join(", ")
        )))
    }
}
