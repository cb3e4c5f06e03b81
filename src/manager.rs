//! Install, remove, list and upgrade packages
//!
//! [`PackageManager`] owns the metadata store and borrows the collaborators
//! that talk to the outside world: a release source, a downloader and a
//! command runner. Nothing here is global, so tests build one over fakes.
//!
//! ## Install pipeline
//!
//! ```text
//! release -> select asset -> download -> install -> record
//! ```
//!
//! Any failure aborts before the record is written. The downloaded file is
//! deleted when the install call returns, whatever the outcome.

use std::path::{Path, PathBuf};

use crate::core::output;
use crate::core::platform::Host;
use crate::core::version;
use crate::download::Fetch;
use crate::error::{GetError, Result};
use crate::install::runner::{CommandRunner, PrivilegedOp};
use crate::install::{self, Artifact, InstallOptions, Installed, Installer};
use crate::release::{self, LATEST, ReleaseSource, parse_repo_id};
use crate::store::{MetadataStore, PackageRecord};

/// A newer release for an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub repo_id: String,
    /// Recorded version
    pub installed: String,
    /// Tag of the newest matching release
    pub latest_tag: String,
}

/// Outcome of [`PackageManager::check_updates`]. Lookups that failed do not
/// stop the others.
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub available: Vec<Update>,
    pub failed: Vec<(String, GetError)>,
}

/// Outcome of [`PackageManager::upgrade`].
#[derive(Debug, Default)]
pub struct UpgradeReport {
    pub upgraded: Vec<(String, PackageRecord)>,
    /// Already at the newest release
    pub current: Vec<String>,
    pub failed: Vec<(String, GetError)>,
}

pub struct PackageManager<'a> {
    store: MetadataStore,
    source: &'a dyn ReleaseSource,
    fetcher: &'a dyn Fetch,
    runner: &'a dyn CommandRunner,
    host: Host,
    bin_dir: PathBuf,
}

impl<'a> PackageManager<'a> {
    pub fn new(
        store: MetadataStore,
        source: &'a dyn ReleaseSource,
        fetcher: &'a dyn Fetch,
        runner: &'a dyn CommandRunner,
        host: Host,
        bin_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            source,
            fetcher,
            runner,
            host,
            bin_dir: bin_dir.into(),
        }
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Installed packages ordered by repo id.
    pub fn list(&self) -> impl Iterator<Item = (&str, &PackageRecord)> {
        self.store.list()
    }

    /// Install `repo` at `tag` (`"latest"` for the newest release) and
    /// record it. Re-installing replaces the existing record.
    pub fn install(&mut self, repo: &str, tag: &str, options: &InstallOptions) -> Result<PackageRecord> {
        let repo_id = parse_repo_id(repo)?;
        self.host.ensure_supported()?;

        output::action(&format!("Installing {}", repo_id));
        let release = self.source.get_release(&repo_id, tag, &options.tag_prefix)?;
        output::detail(&format!("release: {}", release.tag));

        let asset = release::select(&release.assets, &self.host)?;
        output::detail(&format!("asset: {}", asset.name));

        let downloaded = self.fetcher.fetch(&asset.download_url, &asset.name)?;
        let path: &Path = &downloaded;

        let installer = Installer {
            runner: self.runner,
            bin_dir: &self.bin_dir,
        };
        let artifact = Artifact {
            path,
            name: &asset.name,
        };
        let installed = install::install_artifact(&installer, artifact, options)?;

        let record = PackageRecord::new(release.version(), &asset.name, &installed, &options.tag_prefix);
        self.store.upsert(&repo_id, record.clone())?;

        output::success(&format!("Installed {} {}", repo_id, record.version));
        Ok(record)
    }

    /// Uninstall `repo` and drop its record.
    ///
    /// A binary whose file is already gone is skipped. A record without its
    /// package name or path has nothing to uninstall and is only dropped.
    pub fn remove(&mut self, repo: &str) -> Result<PackageRecord> {
        let repo_id = parse_repo_id(repo)?;
        let record = self
            .store
            .get(&repo_id)
            .cloned()
            .ok_or_else(|| GetError::NotInstalled(repo_id.clone()))?;

        output::action(&format!("Removing {}", repo_id));
        match record.installed() {
            Some(Installed::NativePackage { name }) => {
                let op = PrivilegedOp::RemovePackage(name);
                self.runner.run(&op)?.ensure_success(&op)?;
            }
            Some(Installed::Binary { path }) => {
                if path.exists() {
                    let op = PrivilegedOp::Delete(path);
                    self.runner.run(&op)?.ensure_success(&op)?;
                } else {
                    output::skip(&format!("{} already gone", path.display()));
                }
            }
            None => output::warning(&format!(
                "record for {} has no {} target, removing it from metadata only",
                repo_id,
                record.install_type.as_str()
            )),
        }

        let removed = self.store.remove(&repo_id)?;
        output::success(&format!("Removed {}", repo_id));
        Ok(removed)
    }

    /// Look up the newest release of every installed package.
    pub fn check_updates(&self) -> UpdateReport {
        let mut report = UpdateReport::default();
        for (repo_id, _) in self.store.list() {
            match self.check_one(repo_id) {
                Ok(Some(update)) => report.available.push(update),
                Ok(None) => {}
                Err(e) => report.failed.push((repo_id.to_string(), e)),
            }
        }
        report
    }

    /// Re-install packages that have a newer release: only `repo` if given,
    /// else everything installed.
    pub fn upgrade(&mut self, repo: Option<&str>) -> Result<UpgradeReport> {
        let targets: Vec<String> = match repo {
            Some(repo) => {
                let repo_id = parse_repo_id(repo)?;
                if self.store.get(&repo_id).is_none() {
                    return Err(GetError::NotInstalled(repo_id));
                }
                vec![repo_id]
            }
            None => self.store.list().map(|(id, _)| id.to_string()).collect(),
        };

        let mut report = UpgradeReport::default();
        let total = targets.len();
        for (i, repo_id) in targets.into_iter().enumerate() {
            output::action_numbered(i + 1, total, &format!("Checking {}", repo_id));
            let result = self
                .check_one(&repo_id)
                .and_then(|update| update.map(|u| self.upgrade_one(&u)).transpose());
            match result {
                Ok(Some(record)) => report.upgraded.push((repo_id, record)),
                Ok(None) => report.current.push(repo_id),
                Err(e) => {
                    output::error(&format!("{}: {}", repo_id, e));
                    report.failed.push((repo_id, e));
                }
            }
        }
        Ok(report)
    }

    fn check_one(&self, repo_id: &str) -> Result<Option<Update>> {
        let record = self
            .store
            .get(repo_id)
            .ok_or_else(|| GetError::NotInstalled(repo_id.to_string()))?;
        let latest = self.source.get_release(repo_id, LATEST, &record.tag_prefix)?;

        if version::is_newer(&record.version, &latest.tag, &record.tag_prefix) {
            Ok(Some(Update {
                repo_id: repo_id.to_string(),
                installed: record.version.clone(),
                latest_tag: latest.tag,
            }))
        } else {
            Ok(None)
        }
    }

    /// Install the update's tag, keeping the tag prefix and the binary's
    /// installed file name.
    fn upgrade_one(&mut self, update: &Update) -> Result<PackageRecord> {
        let (tag_prefix, rename) = match self.store.get(&update.repo_id) {
            Some(record) => {
                let rename = match record.installed() {
                    Some(Installed::Binary { path }) => path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned()),
                    _ => None,
                };
                (record.tag_prefix.clone(), rename)
            }
            None => return Err(GetError::NotInstalled(update.repo_id.clone())),
        };

        let options = InstallOptions::new(tag_prefix, rename)?;
        self.install(&update.repo_id, &update.latest_tag, &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::InstallMethod;
    use crate::testing::{FakeFetcher, FakeSource, RecordingRunner};
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> MetadataStore {
        MetadataStore::open(dir.path().join("get.json")).unwrap()
    }

    fn linux() -> Host {
        Host::new("linux", "x86_64")
    }

    #[test]
    fn test_install_binary_records_version_without_v() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new().with_release("owner/tool", "v1.4.0", &["tool-linux-amd64"]);
        let fetcher = FakeFetcher::new(b"\x7fELF");
        let runner = RecordingRunner::new();
        let mut pm = PackageManager::new(open_store(&dir), &source, &fetcher, &runner, linux(), "/usr/local/bin");

        let options = InstallOptions::new("", Some("tool".to_string())).unwrap();
        let record = pm.install("https://github.com/owner/tool", LATEST, &options).unwrap();

        assert_eq!(record.version, "1.4.0");
        assert_eq!(record.original_name, "tool-linux-amd64");
        assert_eq!(record.install_type, InstallMethod::Binary);
        assert_eq!(record.binary_path, Some(PathBuf::from("/usr/local/bin/tool")));
        assert!(pm.store().get("owner/tool").is_some());
    }

    #[test]
    fn test_check_updates_uses_record_prefix() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .with_release("owner/mono", "web-v3.0.0", &["web-linux-amd64"])
            .with_release("owner/mono", "cli-v1.1.0", &["cli-linux-amd64"])
            .with_release("owner/mono", "cli-v1.0.0", &["cli-linux-amd64"]);
        let fetcher = FakeFetcher::new(b"bin");
        let runner = RecordingRunner::new();
        let mut pm = PackageManager::new(open_store(&dir), &source, &fetcher, &runner, linux(), "/usr/local/bin");

        let options = InstallOptions::new("cli-", None).unwrap();
        pm.install("owner/mono", "cli-v1.0.0", &options).unwrap();

        let report = pm.check_updates();
        assert!(report.failed.is_empty());
        assert_eq!(
            report.available,
            vec![Update {
                repo_id: "owner/mono".to_string(),
                installed: "cli-v1.0.0".to_string(),
                latest_tag: "cli-v1.1.0".to_string(),
            }]
        );
    }

    #[test]
    fn test_check_updates_collects_failures() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        store
            .upsert(
                "owner/gone",
                PackageRecord::new(
                    "1.0.0",
                    "gone_1.0.0_amd64.deb",
                    &Installed::NativePackage {
                        name: "gone".to_string(),
                    },
                    "",
                ),
            )
            .unwrap();
        let source = FakeSource::new();
        let fetcher = FakeFetcher::new(b"");
        let runner = RecordingRunner::new();
        let pm = PackageManager::new(store, &source, &fetcher, &runner, linux(), "/usr/local/bin");

        let report = pm.check_updates();
        assert!(report.available.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].1, GetError::NotFound { .. }));
    }

    #[test]
    fn test_upgrade_keeps_installed_name() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .with_release("owner/tool", "v2.0.0", &["tool-2.0.0-linux-amd64"])
            .with_release("owner/tool", "v1.0.0", &["tool-1.0.0-linux-amd64"]);
        let fetcher = FakeFetcher::new(b"bin");
        let runner = RecordingRunner::new();
        let mut pm = PackageManager::new(open_store(&dir), &source, &fetcher, &runner, linux(), "/usr/local/bin");

        let options = InstallOptions::new("", Some("tool".to_string())).unwrap();
        pm.install("owner/tool", "v1.0.0", &options).unwrap();

        let report = pm.upgrade(None).unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(report.upgraded.len(), 1);

        let record = pm.store().get("owner/tool").unwrap();
        assert_eq!(record.version, "2.0.0");
        assert_eq!(record.original_name, "tool-2.0.0-linux-amd64");
        assert_eq!(record.binary_path, Some(PathBuf::from("/usr/local/bin/tool")));
    }

    #[test]
    fn test_upgrade_up_to_date() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new().with_release("owner/tool", "v1.0.0", &["tool"]);
        let fetcher = FakeFetcher::new(b"bin");
        let runner = RecordingRunner::new();
        let mut pm = PackageManager::new(open_store(&dir), &source, &fetcher, &runner, linux(), "/usr/local/bin");

        pm.install("owner/tool", LATEST, &InstallOptions::default()).unwrap();
        let fetches = fetcher.urls.borrow().len();

        let report = pm.upgrade(Some("owner/tool")).unwrap();
        assert_eq!(report.current, vec!["owner/tool".to_string()]);
        assert!(report.upgraded.is_empty());
        assert_eq!(fetcher.urls.borrow().len(), fetches);
    }

    #[test]
    fn test_upgrade_unknown_repo() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new();
        let fetcher = FakeFetcher::new(b"");
        let runner = RecordingRunner::new();
        let mut pm = PackageManager::new(open_store(&dir), &source, &fetcher, &runner, linux(), "/usr/local/bin");

        let err = pm.upgrade(Some("owner/none")).unwrap_err();
        assert!(matches!(err, GetError::NotInstalled(_)));
    }

    #[test]
    fn test_remove_legacy_record_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let mut record = PackageRecord::new(
            "1.0",
            "tool",
            &Installed::Binary {
                path: PathBuf::from("/usr/local/bin/tool"),
            },
            "",
        );
        record.binary_path = None;
        store.upsert("owner/tool", record).unwrap();

        let source = FakeSource::new();
        let fetcher = FakeFetcher::new(b"");
        let runner = RecordingRunner::new();
        let mut pm = PackageManager::new(store, &source, &fetcher, &runner, linux(), "/usr/local/bin");

        pm.remove("owner/tool").unwrap();
        assert!(runner.recorded().is_empty());
        assert!(pm.store().is_empty());
    }

    #[test]
    fn test_invalid_repo_id() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new();
        let fetcher = FakeFetcher::new(b"");
        let runner = RecordingRunner::new();
        let mut pm = PackageManager::new(open_store(&dir), &source, &fetcher, &runner, linux(), "/usr/local/bin");

        let err = pm.install("not-a-repo", LATEST, &InstallOptions::default()).unwrap_err();
        assert!(matches!(err, GetError::InvalidRepo(_)));
        assert!(source.calls.borrow().is_empty());
    }
}
