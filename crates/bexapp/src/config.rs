//! # Configuration File
//!
//! bex reads an optional TOML file. The core only ever asks it one question:
//! "what value is stored under this key?" Keys are dotted paths, so the
//! option declared with `config_key("server.url")` reads
//!
//! ```toml
//! format = "json"
//!
//! [server]
//! url = "tcp://127.0.0.1:9091"
//! timeout = 10
//! ```
//!
//! ## Locating the File
//!
//! The path is resolved in priority order:
//! 1. **`--config <PATH>`** on the command line.
//! 2. **`BEX_CONFIG`** in the environment.
//! 3. **Platform default**: `<config dir>/bex.toml` (via the `directories` crate).
//!
//! Whichever path wins, a file that does not exist contributes nothing. A file
//! that exists but does not parse aborts the invocation.

use crate::error::{BexError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "BEX_CONFIG";

pub const CONFIG_FILENAME: &str = "bex.toml";

/// Platform config location, e.g. `~/.config/bex/bex.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "bex", "bex").map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    path: PathBuf,
    table: toml::Table,
}

impl ConfigFile {
    /// Load the file at `path`. Returns `Ok(None)` when there is no such file.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BexError::Configuration(format!(
                    "cannot read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Self::parse(path, &raw).map(Some)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let table = raw.parse::<toml::Table>().map_err(|e| {
            BexError::Configuration(format!(
                "malformed config file {}: {}",
                path.display(),
                e.message()
            ))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a dotted key. Missing sections and missing leaves both read as `None`.
    pub fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.table.get(first)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ConfigFile::load(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bex.toml");
        fs::write(&path, "[server\nurl = ").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        match err {
            BexError::Configuration(msg) => assert!(msg.contains("bex.toml")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_dotted_lookup() {
        let config = ConfigFile::parse(
            Path::new("inline.toml"),
            "format = \"json\"\n[server]\nurl = \"tcp://a:1\"\ntimeout = 9\n",
        )
        .unwrap();

        assert_eq!(
            config.lookup("server.url").and_then(|v| v.as_str()),
            Some("tcp://a:1")
        );
        assert_eq!(
            config.lookup("server.timeout").and_then(|v| v.as_integer()),
            Some(9)
        );
        assert_eq!(config.lookup("format").and_then(|v| v.as_str()), Some("json"));
        assert!(config.lookup("server.missing").is_none());
        assert!(config.lookup("format.nested").is_none());
        assert!(config.lookup("wallet.address").is_none());
    }
}
