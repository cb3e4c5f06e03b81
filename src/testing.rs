//! Test doubles for the manager's seams.
//!
//! Shared by the unit tests and the integration tests under `tests/`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::mem::{Discriminant, discriminant};
use std::path::PathBuf;

use tempfile::TempPath;

use crate::download::Fetch;
use crate::error::{GetError, Result};
use crate::install::runner::{CommandOutput, CommandRunner, PrivilegedOp};
use crate::release::{LATEST, Release, ReleaseAsset, ReleaseSource};

/// Download URL the fake source gives each asset.
pub fn asset_url(repo_id: &str, name: &str) -> String {
    format!("https://github.com/{}/releases/download/{}", repo_id, name)
}

/// Records every operation and answers from a script.
pub struct RecordingRunner {
    pub ops: RefCell<Vec<PrivilegedOp>>,
    /// Answer for `dpkg-deb --field ... Package`; `None` makes the query fail
    package_name: Option<String>,
    /// Answer for `dpkg-query`
    package_status: String,
    /// Operations (matched by variant) that should fail
    failing: Vec<Discriminant<PrivilegedOp>>,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            ops: RefCell::new(Vec::new()),
            package_name: None,
            package_status: "install ok installed".to_string(),
            failing: Vec::new(),
        }
    }

    pub fn with_package_name(mut self, name: &str) -> Self {
        self.package_name = Some(name.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.package_status = status.to_string();
        self
    }

    pub fn failing(mut self, op: PrivilegedOp) -> Self {
        self.failing.push(discriminant(&op));
        self
    }

    pub fn recorded(&self) -> Vec<PrivilegedOp> {
        self.ops.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&PrivilegedOp) -> bool) -> usize {
        self.ops.borrow().iter().filter(|op| pred(op)).count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, op: &PrivilegedOp) -> Result<CommandOutput> {
        self.ops.borrow_mut().push(op.clone());

        if self.failing.contains(&discriminant(op)) {
            return Ok(CommandOutput::failed(1, "scripted failure"));
        }

        Ok(match op {
            PrivilegedOp::QueryPackageName(_) => match &self.package_name {
                Some(name) => CommandOutput::ok(format!("{}\n", name)),
                None => CommandOutput::failed(2, "dpkg-deb: not a debian archive"),
            },
            PrivilegedOp::QueryPackageStatus(_) => CommandOutput::ok(self.package_status.clone()),
            _ => CommandOutput::ok(""),
        })
    }
}

/// Serves releases from memory. Releases are listed newest first.
#[derive(Default)]
pub struct FakeSource {
    releases: HashMap<String, Vec<Release>>,
    pub calls: RefCell<Vec<(String, String, String)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, repo_id: &str, tag: &str, assets: &[&str]) -> Self {
        let assets = assets
            .iter()
            .map(|name| ReleaseAsset::new(*name, asset_url(repo_id, name)))
            .collect();
        self.releases.entry(repo_id.to_string()).or_default().push(Release {
            tag: tag.to_string(),
            assets,
        });
        self
    }
}

impl ReleaseSource for FakeSource {
    fn get_release(&self, repo_id: &str, tag: &str, tag_prefix: &str) -> Result<Release> {
        self.calls
            .borrow_mut()
            .push((repo_id.to_string(), tag.to_string(), tag_prefix.to_string()));

        let found = self.releases.get(repo_id).and_then(|releases| {
            releases.iter().find(|r| {
                if tag == LATEST {
                    r.tag.starts_with(tag_prefix)
                } else {
                    r.tag == tag
                }
            })
        });
        found.cloned().ok_or_else(|| GetError::NotFound {
            repo: repo_id.to_string(),
            tag: tag.to_string(),
        })
    }
}

/// Writes asset bytes into a fresh temp file for every fetch.
///
/// Bodies are looked up by URL, falling back to the default body.
#[derive(Default)]
pub struct FakeFetcher {
    default_body: Vec<u8>,
    bodies: HashMap<String, Vec<u8>>,
    fail: bool,
    pub urls: RefCell<Vec<String>>,
    pub temp_paths: RefCell<Vec<PathBuf>>,
}

impl FakeFetcher {
    pub fn new(body: &[u8]) -> Self {
        Self {
            default_body: body.to_vec(),
            ..Default::default()
        }
    }

    /// Every fetch fails with a download error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }
}

impl Fetch for FakeFetcher {
    fn fetch(&self, url: &str, _name: &str) -> Result<TempPath> {
        self.urls.borrow_mut().push(url.to_string());
        if self.fail {
            return Err(GetError::DownloadFailure(format!("{}: HTTP 500", url)));
        }

        let mut file = tempfile::Builder::new().prefix("get-asset-").tempfile()?;
        file.write_all(self.bodies.get(url).unwrap_or(&self.default_body))?;
        self.temp_paths.borrow_mut().push(file.path().to_path_buf());
        Ok(file.into_temp_path())
    }
}
