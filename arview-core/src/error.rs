//! Error types for viewer operations.

use thiserror::Error;

/// Result type for viewer operations.
pub type ArViewResult<T> = Result<T, ArViewError>;

/// Errors that can occur in viewer operations.
///
/// None of these are fatal to the page. Capability absence never reaches
/// this type at all: it degrades to `false` or a no-op.
#[derive(Debug, Error)]
pub enum ArViewError {
    /// A capture was requested before the viewer was available.
    #[error("Viewer not ready")]
    ViewerNotReady,

    /// Frame export or download failed.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// AR activation was requested on a viewer without AR capability.
    ///
    /// The message doubles as the user-visible notice.
    #[error("AR is not supported on this device")]
    ArUnavailable,

    /// The viewer reported an AR status this core does not know.
    #[error("Unknown AR status: {0}")]
    UnknownStatus(String),

    /// A browser API call failed.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Config or bridge serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
