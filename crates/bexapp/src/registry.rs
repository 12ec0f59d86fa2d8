//! # Command Registry
//!
//! Maps symbolic command names (and aliases) to factories. The registry is
//! built once at startup by [`crate::commands::default_registry`] and is
//! read-only from then on, so it is handed to the dispatcher by reference.
//!
//! Lookup is exact. `fetch-bal` does not find `fetch-balance`; the caller is
//! told the name is unknown rather than being given a guess.

use crate::command::Command;
use crate::error::{BexError, Result};
use std::collections::HashMap;
use std::fmt;

pub type CommandFactory = Box<dyn Fn() -> Box<dyn Command> + Send + Sync>;

pub struct CommandDescriptor {
    pub name: &'static str,
    pub aliases: Vec<&'static str>,
    pub summary: &'static str,
    factory: CommandFactory,
}

impl CommandDescriptor {
    pub fn new<F>(name: &'static str, summary: &'static str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Command> + Send + Sync + 'static,
    {
        Self {
            name,
            aliases: Vec::new(),
            summary,
            factory: Box::new(factory),
        }
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn instantiate(&self) -> Box<dyn Command> {
        (self.factory)()
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    descriptors: Vec<CommandDescriptor>,
    // name or alias -> position in `descriptors`
    lookup: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<()> {
        let keys: Vec<&'static str> = std::iter::once(descriptor.name)
            .chain(descriptor.aliases.iter().copied())
            .collect();

        for (i, key) in keys.iter().enumerate() {
            if self.lookup.contains_key(key) || keys[..i].contains(key) {
                return Err(BexError::Configuration(format!(
                    "command name '{}' is registered twice",
                    key
                )));
            }
        }

        let position = self.descriptors.len();
        for key in keys {
            self.lookup.insert(key, position);
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn describe(&self, name: &str) -> Option<&CommandDescriptor> {
        self.lookup.get(name).map(|&i| &self.descriptors[i])
    }

    pub fn resolve(&self, name: &str) -> Result<Box<dyn Command>> {
        self.describe(name)
            .map(CommandDescriptor::instantiate)
            .ok_or_else(|| BexError::Resolution(name.to_string()))
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> &[CommandDescriptor] {
        &self.descriptors
    }
}
