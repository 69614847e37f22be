use crate::parser::ParsingError;
use crate::process::ExitCode;
use std::fmt;
use std::io;

/// Status of a command that could not be parsed.
pub const SYNTAX_ERROR: ExitCode = 2;
/// Status of a command whose program exists but cannot be executed.
pub const NOT_EXECUTABLE: ExitCode = 126;
/// Status of a command whose program does not exist.
pub const NOT_FOUND: ExitCode = 127;

/// Errors that abandon a single command without affecting the shell.
#[derive(Debug)]
pub enum ExecError {
    Syntax(ParsingError),
    /// No program with this name on `PATH`.
    NotFound(String),
    PermissionDenied(String),
    /// Any other failure to create the process or its pipe.
    Spawn { command: String, source: io::Error },
    /// A redirection target could not be opened.
    Redirect { path: String, source: io::Error },
    Wait { pid: u32, source: io::Error },
}

impl ExecError {
    /// Map a failed spawn to the matching variant.
    pub fn from_spawn(command: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => ExecError::NotFound(command.to_string()),
            io::ErrorKind::PermissionDenied => ExecError::PermissionDenied(command.to_string()),
            _ => ExecError::Spawn { command: command.to_string(), source },
        }
    }

    /// The status a caller observes for this failure.
    pub fn status(&self) -> ExitCode {
        match self {
            ExecError::Syntax(_) => SYNTAX_ERROR,
            ExecError::NotFound(_) => NOT_FOUND,
            ExecError::PermissionDenied(_) => NOT_EXECUTABLE,
            ExecError::Spawn { .. } | ExecError::Redirect { .. } | ExecError::Wait { .. } => 1,
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Syntax(e) => write!(f, "{}", e),
            ExecError::NotFound(cmd) => write!(f, "{}: command not found", cmd),
            ExecError::PermissionDenied(cmd) => write!(f, "{}: permission denied", cmd),
            ExecError::Spawn { command, source } => write!(f, "{}: {}", command, source),
            ExecError::Redirect { path, source } => write!(f, "{}: {}", path, source),
            ExecError::Wait { pid, source } => write!(f, "wait for process {}: {}", pid, source),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecError::Syntax(e) => Some(e),
            ExecError::Spawn { source, .. }
            | ExecError::Redirect { source, .. }
            | ExecError::Wait { source, .. } => Some(source),
            ExecError::NotFound(_) | ExecError::PermissionDenied(_) => None,
        }
    }
}

impl From<ParsingError> for ExecError {
    fn from(e: ParsingError) -> Self {
        ExecError::Syntax(e)
    }
}
