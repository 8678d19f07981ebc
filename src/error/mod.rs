//! Error types for uncle.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! - **Configuration**: missing or unreadable state files, bad URL templates
//! - **UserInput**: unknown preset, malformed conversation id, empty prompt
//! - **Remote**: the service answered with an unexpected status
//! - **Network**: connection, timeout, or transport failures
//! - **Internal**: I/O, JSON, and anything unclassified
//!
//! Each error has a stable error code (e.g., `UNCLE-U001`) for log correlation.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid state files.
    Configuration,
    /// Bad command words from the user.
    UserInput,
    /// Non-success answers from the service.
    Remote,
    /// Transport failures.
    Network,
    /// Internal errors (I/O, JSON, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::UserInput => "Input error",
            Self::Remote => "Service error",
            Self::Network => "Network error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Configuration => "C",
            Self::UserInput => "U",
            Self::Remote => "R",
            Self::Network => "N",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success, including the early-exit selection paths.
    Success = 0,
    /// Any failure.
    GeneralError = 1,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for uncle operations.
#[derive(Error, Debug)]
pub enum UncleError {
    // ==========================================================================
    // Configuration errors
    // ==========================================================================
    /// A required state file does not exist.
    #[error("state file not found: {path}")]
    StateFileMissing { path: String },

    /// A state file exists but could not be parsed.
    #[error("cannot parse {path}: {message}")]
    StateFileInvalid { path: String, message: String },

    /// A setting has an unusable value.
    #[error("invalid setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },

    // ==========================================================================
    // User input errors
    // ==========================================================================
    /// `-p<name>` referenced a preset that is not in `prompts.json`.
    #[error("unknown preset: {0}")]
    PresetNotFound(String),

    /// `-s` was given something that is not a UUID.
    #[error("not a conversation id: '{0}'")]
    InvalidConversationId(String),

    /// Query mode with nothing to send.
    #[error("nothing to ask: the prompt is empty")]
    EmptyPrompt,

    /// Query mode without an active conversation.
    #[error("no active conversation")]
    NoConversation,

    // ==========================================================================
    // Remote errors
    // ==========================================================================
    /// The service answered with an unexpected status.
    #[error("{operation} failed with HTTP {status}")]
    RemoteStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered with a body we could not use.
    #[error("unexpected response from {operation}: {message}")]
    UnexpectedResponse {
        operation: &'static str,
        message: String,
    },

    // ==========================================================================
    // Network errors
    // ==========================================================================
    /// Request timed out.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Generic transport error.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Internal errors
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UncleError {
    /// Map error to a process exit code.
    ///
    /// A malformed `-s` id is reported but is not a failure of the run.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidConversationId(_) => ExitCode::Success,
            _ => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::StateFileMissing { .. }
            | Self::StateFileInvalid { .. }
            | Self::InvalidSetting { .. } => ErrorCategory::Configuration,

            Self::PresetNotFound(_)
            | Self::InvalidConversationId(_)
            | Self::EmptyPrompt
            | Self::NoConversation => ErrorCategory::UserInput,

            Self::RemoteStatus { .. } | Self::UnexpectedResponse { .. } => ErrorCategory::Remote,

            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Network,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Stable error code, e.g. `UNCLE-U001`.
    #[must_use]
    pub fn error_code(&self) -> String {
        let number = match self {
            Self::StateFileMissing { .. }
            | Self::PresetNotFound(_)
            | Self::RemoteStatus { .. }
            | Self::Timeout(_)
            | Self::Io(_) => 1,
            Self::StateFileInvalid { .. }
            | Self::InvalidConversationId(_)
            | Self::UnexpectedResponse { .. }
            | Self::Network(_)
            | Self::Json(_) => 2,
            Self::InvalidSetting { .. } | Self::EmptyPrompt | Self::Other(_) => 3,
            Self::NoConversation => 4,
        };
        format!("UNCLE-{}{number:03}", self.category().code_prefix())
    }

    /// A one-line suggestion shown under the error, when one applies.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::StateFileMissing { path } => Some(format!(
                "Create {path} or point uncle at the right state directory"
            )),
            Self::StateFileInvalid { path, .. } => Some(format!("Check that {path} is valid JSON")),
            Self::PresetNotFound(_) => {
                Some("Presets live under \"prompts\" in prompts.json".into())
            }
            Self::InvalidConversationId(_) => {
                Some("Run `uncle <dir> -l` to list conversation ids".into())
            }
            Self::NoConversation => Some(
                "Start one with `uncle <dir> -n <name>` or pick one with `uncle <dir> -s <id>`"
                    .into(),
            ),
            Self::RemoteStatus { status: 401 | 403, .. } => {
                Some("The session cookie in creds.json has probably expired".into())
            }
            _ => None,
        }
    }

    /// Response body carried by a remote failure, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::RemoteStatus { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

/// Result type alias for uncle operations.
pub type Result<T> = std::result::Result<T, UncleError>;
