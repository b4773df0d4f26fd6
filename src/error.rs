// src/error.rs

//! Crate-wide error type and result alias

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to initialize: {0}")]
    InitError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Version string unparseable even under the registry fallback grammar
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Plugin container unreadable, or missing its embedded manifest entry
    #[error("Invalid plugin package {name} {version}: {reason}")]
    InvalidPackage {
        name: String,
        version: String,
        reason: String,
    },

    #[error("{count} plugin(s) require a core version newer than {ceiling}")]
    CoreVersionExceeded { ceiling: String, count: usize },
}
