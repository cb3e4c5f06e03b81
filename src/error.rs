//! Error types for the install pipeline.

use thiserror::Error;

/// Errors that can occur while resolving, installing or removing a package.
#[derive(Error, Debug)]
pub enum GetError {
    #[error("release not found: {repo} @ {tag}")]
    NotFound { repo: String, tag: String },

    #[error("unsupported platform: {0} (only linux is supported)")]
    UnsupportedPlatform(String),

    #[error("no suitable asset found for your platform")]
    NoSuitableAsset,

    #[error("download failed: {0}")]
    DownloadFailure(String),

    #[error("no installable .deb or binary found in archive: {0}")]
    NoInstallableArtifact(String),

    #[error("install failed: {cmd}\n{reason}")]
    InstallFailure { cmd: String, reason: String },

    #[error("package {0} is not installed")]
    NotInstalled(String),

    #[error("invalid repository URL or identifier: {0}")]
    InvalidRepo(String),

    #[error("invalid install options: {0}")]
    InvalidOptions(String),

    #[error("GitHub API request failed: {0}")]
    Api(String),

    #[error("archive extraction failed: {0}")]
    Extract(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = GetError> = std::result::Result<T, E>;
