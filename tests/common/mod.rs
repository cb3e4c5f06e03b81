//! Shared setup for pipeline tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use std::path::{Path, PathBuf};

pub use get_installer::testing::{FakeFetcher, FakeSource, RecordingRunner, asset_url};
use get_installer::{Host, InstallOptions, MetadataStore, PackageManager};
use tempfile::TempDir;

/// Default asset body: the start of an ELF header.
pub const ELF: &[u8] = b"\x7fELF";

/// Scratch directory with a metadata file path inside it.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.path().join("get.json")
    }

    pub fn store(&self) -> MetadataStore {
        MetadataStore::open(self.metadata_path()).unwrap()
    }

    pub fn metadata_json(&self) -> serde_json::Value {
        let raw = std::fs::read_to_string(self.metadata_path()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

pub fn linux_amd64() -> Host {
    Host::new("linux", "x86_64")
}

pub fn manager<'a>(
    env: &TestEnv,
    source: &'a FakeSource,
    fetcher: &'a FakeFetcher,
    runner: &'a RecordingRunner,
    bin_dir: &Path,
) -> PackageManager<'a> {
    PackageManager::new(env.store(), source, fetcher, runner, linux_amd64(), bin_dir)
}

pub fn options(tag_prefix: &str, rename: Option<&str>) -> InstallOptions {
    InstallOptions::new(tag_prefix, rename.map(str::to_string)).unwrap()
}
