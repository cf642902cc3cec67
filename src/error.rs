use std::path::Path;

/// Structured error taxonomy for the core library (see spec §7).
///
/// CLI command handlers work in `anyhow::Result` and add context as they
/// bubble errors up; this enum exists so callers that need to act on *kind*
/// (choose an exit code, decide whether a retry makes sense) can match on it
/// instead of parsing a message string.
#[derive(Debug, thiserror::Error)]
pub enum HiveError {
    /// A precondition the code assumes can never be false at runtime.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Bad input from the user: a malformed plan, an unknown drone name, a
    /// CLI flag combination that doesn't make sense.
    #[error("{0}")]
    UserInput(String),

    /// A resource that was expected to exist does not, or one that must not
    /// exist already does.
    #[error("{0}")]
    NotFound(String),

    /// Another lifecycle operation currently holds the per-drone lock.
    #[error("drone '{0}' is busy (another operation is in progress)")]
    Busy(String),

    /// A git/worktree subprocess failed or returned unexpected output.
    #[error("{context}: {message}")]
    Vcs { context: String, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HiveError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn user_input(msg: impl Into<String>) -> Self {
        Self::UserInput(msg.into())
    }

    pub fn vcs(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Vcs {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Helper for tagging an `std::io::Result` with a path-aware context message,
/// mirroring the `.context("...")` style the teacher uses with `anyhow`.
pub trait IoContext<T> {
    fn io_context(self, context: impl Into<String>) -> Result<T, HiveError>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, context: impl Into<String>) -> Result<T, HiveError> {
        self.map_err(|e| HiveError::io(context.into(), e))
    }
}

pub fn path_str(path: &Path) -> String {
    path.display().to_string()
}
