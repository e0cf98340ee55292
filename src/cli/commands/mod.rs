pub mod check;
pub mod compat;
pub mod format;

/// What a command found, independent of how `run` turns that into an
/// `ExitStatus` (§8's testable properties are about the compiler, not
/// the CLI, so this stays a thin summary rather than a typed report).
pub struct CommandResult {
    pub issue_count: usize,
    pub message: Option<String>,
}
