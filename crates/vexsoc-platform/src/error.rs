//! Error types for platform and registry operations.

use std::path::PathBuf;

use crate::namespace::Namespace;

/// Errors that can occur while building or querying a platform description.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// A name or value is already bound in a namespace.
    #[error("{namespace} conflict on '{name}': {detail}")]
    Conflict {
        /// Namespace the collision happened in.
        namespace: Namespace,
        /// Name being reserved.
        name: String,
        /// What collided with what.
        detail: String,
    },

    /// A memory region intersects an existing region's exposed span.
    #[error(
        "memory region '{name}' (0x{base:08X}..0x{end:08X}) overlaps '{other}' (0x{other_base:08X}..0x{other_end:08X})"
    )]
    Overlap {
        name: String,
        base: u64,
        end: u64,
        other: String,
        other_base: u64,
        other_end: u64,
    },

    /// Lookup of a name that was never registered.
    #[error("{namespace} entry '{name}' not found")]
    NotFound {
        /// Namespace that was searched.
        namespace: Namespace,
        /// Missing name.
        name: String,
    },

    /// A pin resource was declared or requested twice.
    #[error("pin resource '{resource}' conflict: {detail}")]
    PinConflict {
        /// Resource name and number, e.g. "user_led:0".
        resource: String,
        detail: String,
    },

    /// A pin resource or connector the board does not provide.
    #[error("pin resource '{resource}' not found")]
    PinNotFound {
        /// Resource name and number, e.g. "hdmi:0".
        resource: String,
    },

    /// Malformed input or descriptor.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },

    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading/writing board files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Board file not found.
    #[error("board file not found: {}", path.display())]
    FileNotFound {
        /// The path that was not found.
        path: PathBuf,
    },
}

impl PlatformError {
    pub(crate) fn validation(detail: impl Into<String>) -> Self {
        PlatformError::Validation {
            detail: detail.into(),
        }
    }
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
