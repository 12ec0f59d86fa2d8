//! # CLI Layer
//!
//! The only place in the workspace that:
//! - touches the real stdout and stderr handles,
//! - reads the process arguments,
//! - decides the process exit code.
//!
//! Argument parsing itself is not done here; each command's options are
//! parsed by the library's resolver once the command is known.

pub mod setup;

use bexapp::client::tcp_connector;
use bexapp::commands::default_registry;
use bexapp::dispatch::Dispatcher;
use bexapp::resolver::VariableResolver;
use bexapp::result::ConsoleResult;
use std::io::Write;

pub const PROGRAM: &str = "bex";

/// Run one invocation and return the process exit code.
pub fn run() -> i32 {
    setup::init_logging();

    let registry = match default_registry(tcp_connector(), setup::build_info()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ConsoleResult::Failure.code();
        }
    };
    let dispatcher = Dispatcher::new(&registry, VariableResolver::from_process(PROGRAM));

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let mut output = stdout.lock();
    let mut error = stderr.lock();
    let result = dispatcher.dispatch(std::env::args_os().skip(1), &mut output, &mut error);
    let _ = output.flush();
    let _ = error.flush();

    tracing::debug!(%result, "exiting");
    result.code()
}
