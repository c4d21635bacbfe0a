//! Error type shared by both map engines and their views.

use thiserror::Error;

/// Failure conditions surfaced by map operations.
///
/// Errors are raised at the call that triggered them; nothing is retried
/// internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// Bad construction parameter, malformed range bound, or a write outside
    /// a sub-map's effective range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument
        message: String,
    },

    /// The active key order rejected a key.
    #[error("key ordering error: {message}")]
    KeyOrdering {
        /// Why the key cannot be ordered
        message: String,
    },

    /// A cursor observed a structural change it did not make itself.
    ///
    /// Detection is best-effort and meant for diagnosing misuse only.
    #[error("structural change detected: expected generation {expected}, found {actual}")]
    ConcurrentStructuralChange {
        /// Generation captured by the cursor
        expected: u64,
        /// Generation of the live structure
        actual: u64,
    },

    /// The operation requires an element that is not there.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked for
        what: &'static str,
    },

    /// Mutation attempted through a read-only view.
    #[error("unsupported mutation: {operation}")]
    UnsupportedMutation {
        /// The rejected operation
        operation: &'static str,
    },
}

impl MapError {
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn key_ordering<S: Into<String>>(message: S) -> Self {
        Self::KeyOrdering {
            message: message.into(),
        }
    }

    pub fn structural_change(expected: u64, actual: u64) -> Self {
        Self::ConcurrentStructuralChange { expected, actual }
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound { what }
    }

    pub fn unsupported(operation: &'static str) -> Self {
        Self::UnsupportedMutation { operation }
    }

    /// Short category name, handy as a log field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "argument",
            Self::KeyOrdering { .. } => "ordering",
            Self::ConcurrentStructuralChange { .. } => "concurrent_modification",
            Self::NotFound { .. } => "not_found",
            Self::UnsupportedMutation { .. } => "unsupported",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, MapError>;
