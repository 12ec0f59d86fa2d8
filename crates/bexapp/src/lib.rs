//! # Bex Architecture
//!
//! Bex is a **command dispatch library** with a block explorer built on top.
//! The `bex` binary is a thin client: it builds a registry, hands the process
//! arguments to a [`dispatch::Dispatcher`], and exits with the code it gets back.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Binary (crates/bex)                                        │
//! │  - Logging setup, version stamping, process exit            │
//! │  - The ONLY place that calls std::process::exit             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Dispatch (dispatch.rs, registry.rs, resolver.rs)           │
//! │  - Name → command, help and usage                           │
//! │  - Layered settings: defaults < env < config < command line │
//! │  - Every failure folded into a tri-state ConsoleResult      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs)                                   │
//! │  - options → configure → execute                            │
//! │  - Write to the sinks they are handed, never to stdio       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Remote (bridge.rs, client.rs)                              │
//! │  - RemoteClient trait, TcpClient (production)               │
//! │  - AsyncBridge: two callbacks → one blocking result         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Exit Codes
//!
//! A dispatch ends in exactly one [`result::ConsoleResult`]: `Success` (0),
//! `Invalid` (1, usage problems the dispatcher detects itself) or `Failure`
//! (-1, everything else, including panics caught at the dispatcher boundary).
//!
//! ## Testing Strategy
//!
//! 1. **Commands**: unit tests against a scripted remote client from
//!    [`test_utils`], which can answer, fail, misbehave or stay silent.
//! 2. **Dispatch and resolution**: unit tests with in-memory environments
//!    ([`environment::MapEnvironment`]) and temporary config files.
//! 3. **Binary**: end-to-end tests in `crates/bex/tests` that run the real
//!    executable against a throwaway TCP server.
//!
//! ## Module Overview
//!
//! - [`dispatch`]: The entry point: argument list in, exit classification out
//! - [`registry`]: Command descriptors, names and aliases
//! - [`resolver`]: Builds effective parameters from every settings source
//! - [`options`]: Option schemas, typed values and their origins
//! - [`config`]: Config file location and lookup
//! - [`environment`]: Environment variable access
//! - [`command`]: The contract every command implements
//! - [`commands`]: The shipped commands
//! - [`client`]: Remote client contract and the TCP transport
//! - [`bridge`]: Callback-to-blocking adapter
//! - [`render`]: Text and JSON output
//! - [`error`]: Error types

pub mod bridge;
pub mod client;
pub mod command;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod options;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod result;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
