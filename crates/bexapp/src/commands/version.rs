use crate::command::Command;
use crate::error::Result;
use crate::options::{EffectiveParameters, OptionSchema};
use crate::result::ConsoleResult;
use std::fmt;
use std::io::Write;

/// Build metadata the binary stamps in at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Short commit hash; empty when built outside a git checkout.
    pub git_hash: &'static str,
    pub commit_date: &'static str,
    /// A clean tree whose HEAD carries the version tag.
    pub release: bool,
}

/// `v0.3.0` for releases and builds without git metadata,
/// `v0.3.0 (dev: abc1234 2024-01-15 14:30)` otherwise.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version)?;
        if !self.release && !self.git_hash.is_empty() {
            write!(f, " (dev: {} {})", self.git_hash, self.commit_date)?;
        }
        Ok(())
    }
}

/// `version`: print the version the binary was built as.
pub struct Version {
    build: BuildInfo,
}

impl Version {
    pub fn new(build: BuildInfo) -> Self {
        Self { build }
    }
}

impl Command for Version {
    fn options(&self) -> OptionSchema {
        OptionSchema::new()
    }

    fn configure(&mut self, _params: &EffectiveParameters) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self, output: &mut dyn Write, error: &mut dyn Write) -> ConsoleResult {
        match writeln!(output, "bex {}", self.build) {
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

    fn build(git_hash: &'static str, release: bool) -> BuildInfo {
        BuildInfo {
            version: "0.3.0",
            git_hash,
            commit_date: "2024-01-15 14:30",
            release,
        }
    }

    #[test]
    fn test_release_shows_bare_version() {
        assert_eq!(build("abc1234", true).to_string(), "v0.3.0");
    }

    #[test]
    fn test_dev_build_shows_commit() {
        assert_eq!(
            build("abc1234", false).to_string(),
            "v0.3.0 (dev: abc1234 2024-01-15 14:30)"
        );
    }

    #[test]
    fn test_missing_git_metadata_falls_back_to_version() {
        assert_eq!(build("", false).to_string(), "v0.3.0");
    }

    #[test]
    fn test_prints_version() {
        let mut output = Vec::new();
        let result = Version::new(build("", true)).execute(&mut output, &mut Vec::new());
        assert_eq!(result, ConsoleResult::Success);
        assert_eq!(String::from_utf8(output).unwrap(), "bex v0.3.0\n");
    }
}
