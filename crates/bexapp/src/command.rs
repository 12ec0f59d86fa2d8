//! # Command Contract
//!
//! The dispatcher knows nothing about individual commands. It drives every
//! one of them through the same three steps:
//!
//! 1. [`Command::options`] declares the schema the resolver parses against.
//! 2. [`Command::configure`] binds the resolved values and rejects values that
//!    violate a domain constraint (malformed address, out-of-range timeout).
//! 3. [`Command::execute`] does the work, writing to the two sinks it is
//!    handed, and classifies the outcome.
//!
//! Side effects (network calls, file writes) belong in `execute` only, so a
//! failed `configure` can never leave partial work behind.

use crate::error::Result;
use crate::options::{EffectiveParameters, OptionSchema};
use crate::result::ConsoleResult;
use std::io::Write;

pub trait Command {
    fn options(&self) -> OptionSchema;

    fn configure(&mut self, params: &EffectiveParameters) -> Result<()>;

    fn execute(&mut self, output: &mut dyn Write, error: &mut dyn Write) -> ConsoleResult;
}
