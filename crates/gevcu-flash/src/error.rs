//! Error types for upload operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors that can occur during a firmware upload.
///
/// Every variant is fatal: the transfer has no retry or resume semantics,
/// so errors propagate straight to the caller.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Could not reach the controller
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// Firmware image could not be opened
    #[error("failed to open firmware image {}: {source}", path.display())]
    FirmwareOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Socket or file I/O failed mid-transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
