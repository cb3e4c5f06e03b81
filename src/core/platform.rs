//! Host platform detection.

use std::fmt;

use crate::error::{GetError, Result};

/// The only operating system packages can be installed on.
pub const SUPPORTED_OS: &str = "linux";

/// Operating system and normalized architecture of the running host.
///
/// Detected once per process and passed by value into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    os: String,
    arch: String,
}

impl Host {
    /// Describe a host explicitly. The architecture is normalized.
    pub fn new(os: impl Into<String>, arch: &str) -> Self {
        Self {
            os: os.into().to_lowercase(),
            arch: normalize_arch(arch),
        }
    }

    /// Detect the current host from compile-time target information.
    pub fn detect() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    /// Architecture token as it appears in release asset names (e.g. `amd64`).
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Fail with `UnsupportedPlatform` unless this is a Linux host.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.os == SUPPORTED_OS {
            Ok(())
        } else {
            Err(GetError::UnsupportedPlatform(self.os.clone()))
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Map machine names onto the tokens used by release assets.
pub fn normalize_arch(machine: &str) -> String {
    let machine = machine.to_lowercase();
    match machine.as_str() {
        "x86_64" | "amd64" => "amd64".to_string(),
        "aarch64" | "arm64" => "arm64".to_string(),
        _ => machine,
    }
}
