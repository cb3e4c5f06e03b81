//! Runtime configuration for the install pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default GitHub API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Directory binaries are copied into
pub const DEFAULT_BIN_DIR: &str = "/usr/local/bin";

/// Default HTTP timeout for API requests in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Downloads can be large, so they get their own timeout
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Configuration shared by every pipeline call.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file holding installed package records
    pub metadata_path: PathBuf,
    /// Absolute directory binaries are installed into (default: /usr/local/bin)
    pub bin_dir: PathBuf,
    /// GitHub REST API base URL
    pub api_base: String,
    /// Token for authenticated API requests (raises rate limits)
    pub github_token: Option<String>,
    pub http_timeout: Duration,
    pub download_timeout: Duration,
    /// If true, log privileged commands without executing them
    pub dry_run: bool,
    /// If true, print privileged commands as they execute
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(|_| None),
            bin_dir: PathBuf::from(DEFAULT_BIN_DIR),
            api_base: GITHUB_API_BASE.to_string(),
            github_token: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
            dry_run: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Recognized variables: `GET_METADATA_PATH`, `XDG_DATA_HOME`,
    /// `GITHUB_TOKEN`, `GET_HTTP_TIMEOUT`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let http_timeout = lookup("GET_HTTP_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(5, 300);

        Self {
            metadata_path: default_metadata_path(&lookup),
            github_token: lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()),
            http_timeout: Duration::from_secs(http_timeout),
            ..Default::default()
        }
    }

    /// Set the metadata file location.
    pub fn metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = path.into();
        self
    }

    /// Set the binary install directory.
    pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = dir.into();
        self
    }

    /// Point the release client at a different API host.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set dry run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set verbose mode.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), String> {
        if !self.bin_dir.is_absolute() {
            return Err(format!(
                "binary directory must be absolute: {}",
                self.bin_dir.display()
            ));
        }
        Ok(())
    }
}

/// `$GET_METADATA_PATH`, else `$XDG_DATA_HOME/get/get.json`, else
/// `~/.local/share/get/get.json`.
fn default_metadata_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = lookup("GET_METADATA_PATH").filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    let data_home = lookup("XDG_DATA_HOME")
        .filter(|p| Path::new(p).is_absolute())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local/share")
        });

    data_home.join("get").join("get.json")
}
