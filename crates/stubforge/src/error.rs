//! Error types and exit code constants for stubforge.
//!
//! This module provides a unified error type (`StubforgeError`) that bridges
//! failures from the generation and publish subsystems into a common format
//! with stable CLI exit codes.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Tool failures (interpreter missing, stubgen/build/twine failed)
//! - `4`: Missing output (no stub file produced, failed modules)
//! - `5`: Interrupted (SIGINT while a publish was in flight)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::io;
use std::path::Path;

use thiserror::Error;

// ============================================================================
// Exit Error Codes
// ============================================================================

/// Stable error codes reported as the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Invalid arguments from caller (unknown module, malformed request).
    InvalidArguments = 2,
    /// An external tool could not be found, spawned, or exited non-zero.
    ToolFailure = 3,
    /// An expected output was not produced (stub file, required modules).
    MissingOutput = 4,
    /// The run was interrupted by the user.
    Interrupted = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl ErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the stubforge CLI.
///
/// All subsystem failures are converted to this type before being rendered
/// to the user, so every error carries enough context for a one-line
/// message and maps to a stable exit code.
#[derive(Debug, Error)]
pub enum StubforgeError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// No usable Python interpreter was found on PATH.
    #[error("no Python interpreter found on PATH (tried {tried}); pass --python")]
    InterpreterNotFound { tried: String },

    /// An external tool could not be spawned.
    #[error("failed to run {command}: {source}")]
    ToolSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// An external tool exited with a failure status.
    #[error("{command} exited with status {status}")]
    ToolFailed { command: String, status: i32 },

    /// The generator ran but produced no stub file for a module.
    #[error("no stub file produced for {module} under {dir}")]
    StubMissing { module: String, dir: String },

    /// One or more modules failed under the active failure policy.
    #[error("stub generation failed for {failed} of {total} modules")]
    ModulesFailed { failed: usize, total: usize },

    /// Interrupted by the user.
    #[error("interrupted")]
    Interrupted,

    /// A filesystem operation failed.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&StubforgeError> for ErrorCode {
    fn from(err: &StubforgeError) -> Self {
        match err {
            StubforgeError::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            StubforgeError::InterpreterNotFound { .. } => ErrorCode::ToolFailure,
            StubforgeError::ToolSpawn { .. } => ErrorCode::ToolFailure,
            StubforgeError::ToolFailed { .. } => ErrorCode::ToolFailure,
            StubforgeError::StubMissing { .. } => ErrorCode::MissingOutput,
            StubforgeError::ModulesFailed { .. } => ErrorCode::MissingOutput,
            StubforgeError::Interrupted => ErrorCode::Interrupted,
            StubforgeError::Io { .. } => ErrorCode::InternalError,
            StubforgeError::Internal { .. } => ErrorCode::InternalError,
        }
    }
}

impl From<StubforgeError> for ErrorCode {
    fn from(err: StubforgeError) -> Self {
        ErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl StubforgeError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        StubforgeError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create an interpreter-not-found error from the candidate list.
    pub fn interpreter_not_found(tried: &[&str]) -> Self {
        StubforgeError::InterpreterNotFound {
            tried: tried.join(", "),
        }
    }

    /// Create a tool spawn error.
    pub fn tool_spawn(command: impl Into<String>, source: io::Error) -> Self {
        StubforgeError::ToolSpawn {
            command: command.into(),
            source,
        }
    }

    /// Create a tool failure error from a non-zero exit status.
    pub fn tool_failed(command: impl Into<String>, status: i32) -> Self {
        StubforgeError::ToolFailed {
            command: command.into(),
            status,
        }
    }

    /// Create a missing-stub error for a module.
    pub fn stub_missing(module: impl Into<String>, dir: &Path) -> Self {
        StubforgeError::StubMissing {
            module: module.into(),
            dir: dir.display().to_string(),
        }
    }

    /// Create a filesystem error with path context.
    pub fn io(path: &Path, source: io::Error) -> Self {
        StubforgeError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        StubforgeError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_arguments_maps_to_invalid_arguments() {
            let err = StubforgeError::invalid_args("unknown module 'Foo'");
            assert_eq!(ErrorCode::from(&err), ErrorCode::InvalidArguments);
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn tool_failures_map_to_tool_failure() {
            let spawn = StubforgeError::tool_spawn(
                "python -m build",
                io::Error::new(io::ErrorKind::NotFound, "no such file"),
            );
            assert_eq!(ErrorCode::from(&spawn), ErrorCode::ToolFailure);

            let failed = StubforgeError::tool_failed("twine upload", 1);
            assert_eq!(failed.error_code().code(), 3);

            let missing = StubforgeError::interpreter_not_found(&["python3", "python"]);
            assert_eq!(ErrorCode::from(&missing), ErrorCode::ToolFailure);
        }

        #[test]
        fn missing_stub_maps_to_missing_output() {
            let err = StubforgeError::stub_missing("OpenImageIO", Path::new("out"));
            assert_eq!(ErrorCode::from(&err), ErrorCode::MissingOutput);
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn modules_failed_maps_to_missing_output() {
            let err = StubforgeError::ModulesFailed {
                failed: 1,
                total: 2,
            };
            assert_eq!(ErrorCode::from(&err), ErrorCode::MissingOutput);
        }

        #[test]
        fn interrupted_maps_to_interrupted() {
            assert_eq!(StubforgeError::Interrupted.error_code().code(), 5);
        }

        #[test]
        fn internal_error_maps_to_internal_error() {
            let err = StubforgeError::internal("unexpected state");
            assert_eq!(ErrorCode::from(&err), ErrorCode::InternalError);
            assert_eq!(err.error_code().code(), 10);
        }
    }

    mod display_messages {
        use super::*;

        #[test]
        fn tool_failed_includes_command_and_status() {
            let err = StubforgeError::tool_failed("python -m mypy.stubgen", 2);
            assert_eq!(
                err.to_string(),
                "python -m mypy.stubgen exited with status 2"
            );
        }

        #[test]
        fn stub_missing_names_module_and_directory() {
            let err = StubforgeError::stub_missing("PyOpenColorIO", Path::new("types_oiio_python"));
            assert_eq!(
                err.to_string(),
                "no stub file produced for PyOpenColorIO under types_oiio_python"
            );
        }

        #[test]
        fn interpreter_not_found_lists_candidates() {
            let err = StubforgeError::interpreter_not_found(&["python3", "python"]);
            assert!(err.to_string().contains("python3, python"));
        }
    }
}
