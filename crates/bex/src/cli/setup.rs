use bexapp::commands::BuildInfo;
use tracing_subscriber::EnvFilter;

/// Variable holding the log filter, e.g. `BEX_LOG=debug` or `BEX_LOG=bexapp=trace`.
pub const LOG_ENV: &str = "BEX_LOG";

/// Version metadata stamped by `build.rs`.
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        commit_date: env!("GIT_COMMIT_DATE"),
        release: env!("IS_RELEASE") == "true",
    }
}

/// Install the stderr logger. Quiet (`warn`) unless `BEX_LOG` says otherwise.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_carries_package_version() {
        let build = build_info();
        assert_eq!(build.version, env!("CARGO_PKG_VERSION"));
        assert!(build
            .to_string()
            .starts_with(&format!("v{}", env!("CARGO_PKG_VERSION"))));
    }
}
