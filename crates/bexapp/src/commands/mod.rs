//! # Commands
//!
//! Each submodule is one command implementing [`crate::command::Command`].
//! They fall into two groups:
//!
//! - **Remote** (`fetch-*`): declare the shared server options from [`remote`],
//!   validate them in `configure`, and perform exactly one bridged request in
//!   `execute`.
//! - **Local** (`settings`, `version`): never touch the network.
//!
//! Nothing here parses arguments or picks exit codes by hand. The resolver
//! hands over typed parameters and the dispatcher passes the returned
//! [`crate::result::ConsoleResult`] straight through.
//!
//! [`default_registry`] is the one place commands are wired up; the binary
//! calls it once at startup.

use crate::client::Connector;
use crate::error::Result;
use crate::registry::{CommandDescriptor, Registry};
use std::sync::Arc;

pub mod fetch_balance;
pub mod fetch_header;
pub mod fetch_height;
pub mod remote;
pub mod settings;
pub mod version;

pub use fetch_balance::FetchBalance;
pub use fetch_header::FetchHeader;
pub use fetch_height::FetchHeight;
pub use settings::Settings;
pub use version::{BuildInfo, Version};

/// Build the registry of every shipped command.
///
/// `connector` supplies remote clients to the `fetch-*` commands, and
/// `build` is what `bex version` prints.
pub fn default_registry(connector: Connector, build: BuildInfo) -> Result<Registry> {
    let mut registry = Registry::new();

    let c = Arc::clone(&connector);
    registry.register(
        CommandDescriptor::new(
            "fetch-balance",
            "Get the balance of a payment address",
            move || Box::new(FetchBalance::new(Arc::clone(&c))),
        )
        .alias("balance"),
    )?;

    let c = Arc::clone(&connector);
    registry.register(
        CommandDescriptor::new(
            "fetch-header",
            "Get a block header by height or hash",
            move || Box::new(FetchHeader::new(Arc::clone(&c))),
        )
        .alias("header"),
    )?;

    let c = Arc::clone(&connector);
    registry.register(
        CommandDescriptor::new(
            "fetch-height",
            "Get the height of the last block",
            move || Box::new(FetchHeight::new(Arc::clone(&c))),
        )
        .alias("height"),
    )?;

    registry.register(CommandDescriptor::new(
        "settings",
        "Show the effective server settings",
        || Box::new(Settings::default()),
    ))?;

    registry.register(CommandDescriptor::new(
        "version",
        "Show the bex version",
        move || Box::new(Version::new(build)),
    ))?;

    Ok(registry)
}
