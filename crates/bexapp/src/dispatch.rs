//! # Dispatcher
//!
//! One invocation walks a fixed path:
//!
//! ```text
//! ParseArgs -> ResolveCommand -> ResolveVariables -> Configure -> Execute -> Done
//! ```
//!
//! Any step can short-circuit to `Done`:
//!
//! - no arguments, or a help token with no command after it: usage on
//!   diagnostic output, `Invalid`;
//! - unknown command name: "command not found" on diagnostic output, `Failure`;
//! - resolver or `configure` failure: the message on diagnostic output, `Failure`;
//! - `execute`: its result is passed through untouched.
//!
//! Errors are never written to normal output, so piping `bex` into another tool
//! only ever sees payload data. [`Dispatcher::dispatch`] also catches panics
//! from lower layers; whatever goes wrong, the caller gets a [`ConsoleResult`].

use crate::error::{BexError, Result};
use crate::registry::Registry;
use crate::resolver::{Loaded, VariableResolver};
use crate::result::ConsoleResult;
use std::any::Any;
use std::ffi::OsString;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Tokens that, in command position, ask for usage instead of a command.
pub const HELP_TOKENS: [&str; 3] = ["help", "-h", "--help"];

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    resolver: VariableResolver,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry, resolver: VariableResolver) -> Self {
        Self { registry, resolver }
    }

    /// Dispatch the process arguments, excluding the program name.
    pub fn dispatch<I, S>(
        &self,
        args: I,
        output: &mut dyn Write,
        error: &mut dyn Write,
    ) -> ConsoleResult
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.invoke(args, output, error)));

        let failure = match outcome {
            Ok(Ok(result)) => {
                debug!(%result, "dispatch done");
                return result;
            }
            Ok(Err(e)) => e,
            Err(payload) => BexError::Internal(panic_message(payload.as_ref())),
        };

        debug!(error = %failure, "dispatch failed");
        let _ = writeln!(error, "Error: {}", failure);
        if matches!(failure, BexError::Resolution(_)) {
            let _ = writeln!(
                error,
                "Run '{} help' to list the available commands.",
                self.resolver.program()
            );
        }
        ConsoleResult::Failure
    }

    fn invoke(
        &self,
        args: Vec<OsString>,
        output: &mut dyn Write,
        error: &mut dyn Write,
    ) -> Result<ConsoleResult> {
        let args = parse_args(args)?;
        let Some((name, rest)) = args.split_first() else {
            self.usage(error)?;
            return Ok(ConsoleResult::Invalid);
        };

        if HELP_TOKENS.contains(&name.as_str()) {
            return match rest.first() {
                Some(topic) if !HELP_TOKENS.contains(&topic.as_str()) => {
                    self.command_help(topic, output)
                }
                _ => {
                    self.usage(error)?;
                    Ok(ConsoleResult::Invalid)
                }
            };
        }

        debug!(command = %name, "resolving command");
        let descriptor = self
            .registry
            .describe(name)
            .ok_or_else(|| BexError::Resolution(name.clone()))?;
        let mut command = descriptor.instantiate();

        debug!(command = descriptor.name, "resolving variables");
        let params = match self.resolver.load(
            descriptor.name,
            descriptor.summary,
            command.as_ref(),
            rest,
        )? {
            Loaded::Parameters(params) => params,
            Loaded::Help(text) => {
                write!(output, "{}", text)?;
                return Ok(ConsoleResult::Success);
            }
        };

        debug!(command = descriptor.name, "configuring");
        command.configure(&params)?;

        debug!(command = descriptor.name, "executing");
        Ok(command.execute(output, error))
    }

    fn command_help(&self, name: &str, output: &mut dyn Write) -> Result<ConsoleResult> {
        let descriptor = self
            .registry
            .describe(name)
            .ok_or_else(|| BexError::Resolution(name.to_string()))?;
        let command = descriptor.instantiate();
        let help = self
            .resolver
            .help(descriptor.name, descriptor.summary, command.as_ref());
        write!(output, "{}", help)?;
        Ok(ConsoleResult::Success)
    }

    /// List every registered command, in registration order.
    pub fn usage(&self, sink: &mut dyn Write) -> Result<()> {
        let program = self.resolver.program();
        writeln!(sink, "Usage: {} COMMAND [OPTIONS]", program)?;
        writeln!(sink)?;
        writeln!(sink, "Commands:")?;

        let width = self
            .registry
            .list()
            .iter()
            .map(|d| d.name.len())
            .max()
            .unwrap_or(0);
        for descriptor in self.registry.list() {
            write!(
                sink,
                "  {:width$}  {}",
                descriptor.name,
                descriptor.summary,
                width = width
            )?;
            if !descriptor.aliases.is_empty() {
                write!(sink, " [aliases: {}]", descriptor.aliases.join(", "))?;
            }
            writeln!(sink)?;
        }

        writeln!(sink)?;
        writeln!(sink, "Run '{} help COMMAND' for command options.", program)?;
        Ok(())
    }
}

fn parse_args(args: Vec<OsString>) -> Result<Vec<String>> {
    args.into_iter()
        .map(|arg| {
            arg.into_string().map_err(|raw| {
                BexError::Configuration(format!(
                    "argument {:?} is not valid UTF-8",
                    raw.to_string_lossy()
                ))
            })
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected fault".to_string()
    }
}
