//! Composition error types.

use std::fmt;

use vexsoc_platform::PlatformError;

use crate::compose::Stage;
use crate::feature::FeatureKind;

/// Errors that abort a composition pass.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Registry, region, or pin catalogue failure.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Attachment to a region that was never reserved.
    #[error("cannot attach '{peripheral}': memory region '{region}' is not reserved")]
    UnboundRegion { region: String, peripheral: String },

    /// Collision outside the registry (bus slot, arbiter port, constant).
    #[error("{resource} conflict: {detail}")]
    Conflict { resource: String, detail: String },

    /// A collaborator the composition depends on is absent.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Malformed input.
    #[error("validation error: {detail}")]
    Validation { detail: String },

    /// A feature module was applied when its precondition on order failed.
    #[error("{feature} applied out of order: {detail}")]
    Ordering { feature: FeatureKind, detail: String },

    /// An external tool could not be run or returned non-zero.
    #[error("external tool '{tool}' failed: {detail}")]
    ExternalTool { tool: String, detail: String },

    /// A driver operation was called in the wrong stage.
    #[error("invalid composition transition from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },

    /// A board does not support the requested operation.
    #[error("{action} is not supported on board '{board}'")]
    Unsupported { board: String, action: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error categories callers react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    Overlap,
    NotFound,
    Validation,
    UnboundRegion,
    Ordering,
    ExternalTool,
    InvalidTransition,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Conflict => "conflict",
            ErrorKind::Overlap => "overlap",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Validation => "validation",
            ErrorKind::UnboundRegion => "unbound-region",
            ErrorKind::Ordering => "ordering",
            ErrorKind::ExternalTool => "external-tool",
            ErrorKind::InvalidTransition => "invalid-transition",
            ErrorKind::Io => "io",
        };
        write!(f, "{name}")
    }
}

impl ComposeError {
    /// Category of this error, flattening platform errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComposeError::Platform(e) => match e {
                PlatformError::Conflict { .. } | PlatformError::PinConflict { .. } => {
                    ErrorKind::Conflict
                }
                PlatformError::Overlap { .. } => ErrorKind::Overlap,
                PlatformError::NotFound { .. }
                | PlatformError::PinNotFound { .. }
                | PlatformError::FileNotFound { .. } => ErrorKind::NotFound,
                PlatformError::Validation { .. }
                | PlatformError::Toml(_)
                | PlatformError::TomlSer(_) => ErrorKind::Validation,
                PlatformError::Io(_) => ErrorKind::Io,
            },
            ComposeError::UnboundRegion { .. } => ErrorKind::UnboundRegion,
            ComposeError::Conflict { .. } => ErrorKind::Conflict,
            ComposeError::NotFound { .. } => ErrorKind::NotFound,
            ComposeError::Validation { .. } | ComposeError::Unsupported { .. } => {
                ErrorKind::Validation
            }
            ComposeError::Ordering { .. } => ErrorKind::Ordering,
            ComposeError::ExternalTool { .. } => ErrorKind::ExternalTool,
            ComposeError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            ComposeError::Io(_) => ErrorKind::Io,
            ComposeError::Json(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn validation(detail: impl Into<String>) -> Self {
        ComposeError::Validation {
            detail: detail.into(),
        }
    }
}

/// Result type for composition operations.
pub type Result<T> = std::result::Result<T, ComposeError>;
