//! # Bex CLI
//!
//! The binary is intentionally thin. Everything that decides *what* happens
//! (command lookup, settings resolution, remote calls, exit classification)
//! lives in the `bexapp` library. This crate only:
//!
//! - installs logging (`BEX_LOG`, diagnostics to stderr),
//! - builds the registry with the TCP transport and the stamped version,
//! - passes the process arguments to the dispatcher,
//! - and turns the returned classification into the process exit code.
//!
//! End-to-end tests in `tests/` run this binary against a throwaway server.

mod cli;

fn main() {
    std::process::exit(cli::run());
}
