//! Installed-package metadata
//!
//! A single JSON object keyed by repo id, e.g.
//!
//! ```json
//! {
//!   "sharkdp/bat": {
//!     "version": "0.24.0",
//!     "installed_at": "2026-01-04T10:12:55+01:00",
//!     "original_name": "bat_0.24.0_amd64.deb",
//!     "install_type": "deb",
//!     "apt_name": "bat",
//!     "tag_prefix": ""
//!   }
//! }
//! ```
//!
//! The whole file is loaded once and rewritten after every mutation.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::output;
use crate::error::{GetError, Result};
use crate::install::{InstallMethod, Installed};

/// What was installed for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub version: String,
    /// RFC 3339 local time
    pub installed_at: String,
    /// Asset name as published in the release
    pub original_name: String,
    pub install_type: InstallMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apt_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<PathBuf>,
    #[serde(default)]
    pub tag_prefix: String,
}

impl PackageRecord {
    /// Build a record from an installer outcome, stamped with the current time.
    pub fn new(
        version: impl Into<String>,
        original_name: impl Into<String>,
        installed: &Installed,
        tag_prefix: impl Into<String>,
    ) -> Self {
        let (apt_name, binary_path) = match installed {
            Installed::NativePackage { name } => (Some(name.clone()), None),
            Installed::Binary { path } => (None, Some(path.clone())),
        };
        Self {
            version: version.into(),
            installed_at: chrono::Local::now().to_rfc3339(),
            original_name: original_name.into(),
            install_type: installed.method(),
            apt_name,
            binary_path,
            tag_prefix: tag_prefix.into(),
        }
    }

    /// `None` when the method-specific field is missing (old or hand-edited
    /// records).
    pub fn installed(&self) -> Option<Installed> {
        match self.install_type {
            InstallMethod::NativePackage => self
                .apt_name
                .clone()
                .map(|name| Installed::NativePackage { name }),
            InstallMethod::Binary => self
                .binary_path
                .clone()
                .map(|path| Installed::Binary { path }),
        }
    }
}

/// Read the metadata file.
///
/// A missing or unparsable file yields an empty map. Other read errors
/// propagate.
pub fn load(path: &Path) -> Result<BTreeMap<String, PackageRecord>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(GetError::Metadata(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )));
        }
    };

    match serde_json::from_str(&content) {
        Ok(packages) => Ok(packages),
        Err(e) => {
            output::warning(&format!(
                "ignoring unreadable metadata file {}: {}",
                path.display(),
                e
            ));
            Ok(BTreeMap::new())
        }
    }
}

/// The package database.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    packages: BTreeMap<String, PackageRecord>,
    /// Keep mutations in memory only
    dry_run: bool,
}

impl MetadataStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let packages = load(&path)?;
        Ok(Self {
            path,
            packages,
            dry_run: false,
        })
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn get(&self, repo_id: &str) -> Option<&PackageRecord> {
        self.packages.get(repo_id)
    }

    /// All records ordered by repo id.
    pub fn list(&self) -> impl Iterator<Item = (&str, &PackageRecord)> {
        self.packages.iter().map(|(id, rec)| (id.as_str(), rec))
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Insert or replace a record and persist.
    ///
    /// If the write fails the in-memory map is restored, so memory and disk
    /// never disagree.
    pub fn upsert(&mut self, repo_id: &str, record: PackageRecord) -> Result<()> {
        let previous = self.packages.insert(repo_id.to_string(), record);
        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.packages.insert(repo_id.to_string(), old),
                None => self.packages.remove(repo_id),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove a record and persist. Unknown ids leave the store untouched,
    /// and so does a failed write.
    pub fn remove(&mut self, repo_id: &str) -> Result<PackageRecord> {
        let record = self
            .packages
            .remove(repo_id)
            .ok_or_else(|| GetError::NotInstalled(repo_id.to_string()))?;
        if let Err(e) = self.save() {
            self.packages.insert(repo_id.to_string(), record);
            return Err(e);
        }
        Ok(record)
    }

    /// Write the whole map as pretty JSON.
    ///
    /// Goes through a temp file in the same directory and a rename, so the
    /// file on disk is always either the old or the new version.
    pub fn save(&self) -> Result<()> {
        if self.dry_run {
            output::skip(&format!("not writing {} (dry run)", self.path.display()));
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&self.packages)
            .map_err(|e| GetError::Metadata(format!("cannot serialize metadata: {}", e)))?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| {
            GetError::Metadata(format!("cannot create {}: {}", parent.display(), e))
        })?;

        let temp_path = parent.join(format!(
            ".{}.tmp.{}",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id()
        ));
        let write = |temp_path: &Path| -> std::io::Result<()> {
            let mut file = std::fs::File::create(temp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()
        };
        write(&temp_path)
            .and_then(|_| std::fs::rename(&temp_path, &self.path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&temp_path);
                GetError::Metadata(format!("cannot write {}: {}", self.path.display(), e))
            })
    }
}
