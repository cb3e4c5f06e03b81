//! Releases and their assets
//!
//! A [`ReleaseSource`] produces a [`Release`]; [`select`] picks the asset
//! to install from it.

pub mod github;
pub mod select;

use serde::Deserialize;

use crate::error::{GetError, Result};

pub use github::GithubClient;
pub use select::{score, select};

/// Tag value that selects the newest release.
pub const LATEST: &str = "latest";

/// A single downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

impl ReleaseAsset {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }
}

/// A tagged publication. Asset order is the order the API returned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Version recorded for this release: the tag without a leading `v`.
    pub fn version(&self) -> &str {
        self.tag.strip_prefix('v').unwrap_or(&self.tag)
    }
}

/// Anything that can resolve `owner/repo` + tag into a release.
pub trait ReleaseSource {
    /// Fetch a release.
    ///
    /// `tag == "latest"` selects the newest release; with a non-empty
    /// `tag_prefix` it selects the newest release whose tag starts with the
    /// prefix. Any other tag is matched exactly. Missing repo or tag fails
    /// with `NotFound`.
    fn get_release(&self, repo_id: &str, tag: &str, tag_prefix: &str) -> Result<Release>;
}

/// Normalize `owner/repo` or a GitHub URL into `owner/repo`.
pub fn parse_repo_id(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let s = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let s = s.strip_prefix("www.").unwrap_or(s);
    let s = s.strip_prefix("github.com/").unwrap_or(s);
    let s = s.trim_end_matches('/');
    let s = s.strip_suffix(".git").unwrap_or(s);

    let mut parts = s.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if is_name(owner) && is_name(repo) => {
            Ok(format!("{}/{}", owner, repo))
        }
        _ => Err(GetError::InvalidRepo(input.to_string())),
    }
}

fn is_name(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
