//! GitHub release source
//!
//! Blocking client for the GitHub REST API.
//!
//! ## Authentication
//!
//! Set `GITHUB_TOKEN` to raise the rate limit from 60/hr to 5000/hr:
//! ```bash
//! export GITHUB_TOKEN="ghp_xxxxxxxxxxxxxxxxxxxx"
//! ```

use std::time::Duration;

use super::{LATEST, Release, ReleaseSource};
use crate::core::config::Config;
use crate::error::{GetError, Result};

/// Releases inspected when searching for a tag prefix
const RELEASES_PER_PAGE: u32 = 100;

const USER_AGENT: &str = concat!("get-installer/", env!("CARGO_PKG_VERSION"));

/// Release source backed by `api.github.com` (or a compatible host).
pub struct GithubClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base(&config.api_base, config.github_token.clone(), config.http_timeout)
    }

    /// Client with an explicit base URL (used against mock servers in tests).
    pub fn with_base(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// GET a JSON document from the API with the proper headers.
    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, repo: &str, tag: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .agent
            .get(&url)
            .set("Accept", "application/vnd.github.v3+json")
            .set("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(404, _) => GetError::NotFound {
                repo: repo.to_string(),
                tag: tag.to_string(),
            },
            ureq::Error::Status(403, _) => GetError::Api(
                "GitHub API rate limit exceeded. Try again later or set GITHUB_TOKEN.".to_string(),
            ),
            other => GetError::Api(other.to_string()),
        })?;

        response
            .into_json()
            .map_err(|e| GetError::Api(format!("failed to parse GitHub response: {}", e)))
    }

    /// Newest release whose tag starts with `prefix`.
    fn latest_with_prefix(&self, repo_id: &str, prefix: &str) -> Result<Release> {
        let path = format!(
            "/repos/{}/releases?per_page={}",
            repo_id, RELEASES_PER_PAGE
        );
        let releases: Vec<Release> = self.get_json(&path, repo_id, LATEST)?;

        releases
            .into_iter()
            .find(|r| r.tag.starts_with(prefix))
            .ok_or_else(|| GetError::NotFound {
                repo: repo_id.to_string(),
                tag: format!("latest with tag prefix \"{}\"", prefix),
            })
    }
}

impl ReleaseSource for GithubClient {
    fn get_release(&self, repo_id: &str, tag: &str, tag_prefix: &str) -> Result<Release> {
        if tag == LATEST {
            if !tag_prefix.is_empty() {
                return self.latest_with_prefix(repo_id, tag_prefix);
            }
            let path = format!("/repos/{}/releases/latest", repo_id);
            return self.get_json(&path, repo_id, tag);
        }

        // A tag like "release/1.0" must stay one path segment
        let path = format!(
            "/repos/{}/releases/tags/{}",
            repo_id,
            urlencoding::encode(tag)
        );
        self.get_json(&path, repo_id, tag)
    }
}
