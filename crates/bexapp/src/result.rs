use std::fmt;

/// Three-valued outcome of a dispatch, used directly as the process exit code.
///
/// `Invalid` (bad usage) and `Failure` (the command ran and failed) are
/// distinct codes, so there is no conversion from `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleResult {
    Failure,
    Success,
    Invalid,
}

impl ConsoleResult {
    pub fn code(self) -> i32 {
        match self {
            ConsoleResult::Failure => -1,
            ConsoleResult::Success => 0,
            ConsoleResult::Invalid => 1,
        }
    }
}

impl fmt::Display for ConsoleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConsoleResult::Failure => "failure",
            ConsoleResult::Success => "success",
            ConsoleResult::Invalid => "invalid",
        };
        write!(f, "{}", label)
    }
}
