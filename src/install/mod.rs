//! Artifact installation
//!
//! [`classify`] decides how a file is installed from its name alone.
//! [`install_artifact`] routes it to the native package installer, the binary
//! installer, or (for archives) through the archive scanner first.
//! Archives are only opened one level deep.

pub mod archive;
pub mod binary;
pub mod deb;
pub mod runner;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::output;
use crate::error::{GetError, Result};
use runner::CommandRunner;

/// Extension of native packages.
pub const NATIVE_PACKAGE_EXT: &str = ".deb";

/// Suffixes recognized as archives. Longer suffixes come first.
pub const ARCHIVE_SUFFIXES: &[&str] = &[
    ".tar.gz", ".tgz", ".tar.xz", ".txz", ".tar.bz2", ".tbz2", ".tar.zst", ".tzst", ".tar",
    ".zip", ".gz",
];

/// How a downloaded file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    NativePackage,
    Archive,
    Binary,
}

/// How a package ended up installed. Archives always resolve to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallMethod {
    #[serde(rename = "deb")]
    NativePackage,
    #[serde(rename = "binary")]
    Binary,
}

impl InstallMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallMethod::NativePackage => "deb",
            InstallMethod::Binary => "binary",
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installed {
    /// Installed through the package manager under this package name
    NativePackage { name: String },
    /// Copied to this absolute path
    Binary { path: PathBuf },
}

impl Installed {
    pub fn method(&self) -> InstallMethod {
        match self {
            Installed::NativePackage { .. } => InstallMethod::NativePackage,
            Installed::Binary { .. } => InstallMethod::Binary,
        }
    }
}

/// Caller-supplied install options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Only consider releases whose tag starts with this prefix
    pub tag_prefix: String,
    /// Install a binary under this file name instead of its own
    pub rename: Option<String>,
}

impl InstallOptions {
    /// Validate and build options. An empty `rename` means "no rename".
    pub fn new(tag_prefix: impl Into<String>, rename: Option<String>) -> Result<Self> {
        let rename = rename.filter(|r| !r.is_empty());
        if let Some(name) = &rename
            && (name.contains('/') || name == "." || name == "..")
        {
            return Err(GetError::InvalidOptions(format!(
                "rename must be a plain file name, got '{}'",
                name
            )));
        }

        Ok(Self {
            tag_prefix: tag_prefix.into(),
            rename,
        })
    }
}

/// A file on disk together with the name it should be judged by.
///
/// Downloads live under temporary names; `name` is the asset (or archive
/// member) file name, which drives classification and naming.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub path: &'a Path,
    pub name: &'a str,
}

/// Where installs go and who runs the privileged commands.
pub struct Installer<'a> {
    pub runner: &'a dyn CommandRunner,
    pub bin_dir: &'a Path,
}

/// Classify a file by name.
///
/// Binary is the fallback, not a positive match.
pub fn classify(filename: &str) -> ArtifactKind {
    let name = filename.to_lowercase();
    if name.ends_with(NATIVE_PACKAGE_EXT) {
        ArtifactKind::NativePackage
    } else if ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        ArtifactKind::Archive
    } else {
        ArtifactKind::Binary
    }
}

/// Heuristic for a raw executable: a file name without any `.`.
pub fn looks_like_binary(filename: &str) -> bool {
    !filename.contains('.')
}

/// Install `artifact` according to its classification.
pub fn install_artifact(
    installer: &Installer<'_>,
    artifact: Artifact<'_>,
    options: &InstallOptions,
) -> Result<Installed> {
    match classify(artifact.name) {
        ArtifactKind::NativePackage => install_native(installer, artifact, options),
        ArtifactKind::Binary => binary::install(installer, artifact, options.rename.as_deref()),
        ArtifactKind::Archive => {
            let extracted = archive::scan(artifact.path, artifact.name)?;
            let inner = extracted.artifact();
            // `extracted` owns the scratch directory until the install is done
            match extracted.method() {
                InstallMethod::NativePackage => install_native(installer, inner, options),
                InstallMethod::Binary => {
                    binary::install(installer, inner, options.rename.as_deref())
                }
            }
        }
    }
}

fn install_native(
    installer: &Installer<'_>,
    artifact: Artifact<'_>,
    options: &InstallOptions,
) -> Result<Installed> {
    if let Some(rename) = &options.rename {
        output::warning(&format!(
            "--rename '{}' only applies to binaries, ignoring it for {}",
            rename, artifact.name
        ));
    }
    deb::install(installer.runner, artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_native_package() {
        assert_eq!(classify("app_1.0_amd64.deb"), ArtifactKind::NativePackage);
        assert_eq!(classify("APP.DEB"), ArtifactKind::NativePackage);
    }

    #[test]
    fn test_classify_archives() {
        for name in [
            "app.tar.gz",
            "app.tgz",
            "app.tar.xz",
            "app.tar.bz2",
            "app.tar.zst",
            "app.tar",
            "app.zip",
            "app.gz",
        ] {
            assert_eq!(classify(name), ArtifactKind::Archive, "{}", name);
        }
    }

    #[test]
    fn test_classify_binary_is_fallback() {
        assert_eq!(classify("app-linux-amd64"), ArtifactKind::Binary);
        assert_eq!(classify("app.AppImage"), ArtifactKind::Binary);
        assert_eq!(classify("app.deb.sig"), ArtifactKind::Binary);
    }

    #[test]
    fn test_looks_like_binary() {
        assert!(looks_like_binary("ripgrep"));
        assert!(!looks_like_binary("README.md"));
        assert!(!looks_like_binary("tool.sh"));
    }

    #[test]
    fn test_install_method_serialization() {
        assert_eq!(
            serde_json::to_string(&InstallMethod::NativePackage).unwrap(),
            "\"deb\""
        );
        assert_eq!(
            serde_json::from_str::<InstallMethod>("\"binary\"").unwrap(),
            InstallMethod::Binary
        );
    }

    #[test]
    fn test_options_validation() {
        let opts = InstallOptions::new("auth-", Some("mytool".to_string())).unwrap();
        assert_eq!(opts.tag_prefix, "auth-");
        assert_eq!(opts.rename.as_deref(), Some("mytool"));

        let opts = InstallOptions::new("", Some(String::new())).unwrap();
        assert!(opts.rename.is_none());

        for bad in ["../evil", "bin/tool", ".", ".."] {
            let err = InstallOptions::new("", Some(bad.to_string())).unwrap_err();
            assert!(matches!(err, GetError::InvalidOptions(_)), "{}", bad);
        }
    }

    #[test]
    fn test_installed_method() {
        let deb = Installed::NativePackage {
            name: "app".to_string(),
        };
        assert_eq!(deb.method(), InstallMethod::NativePackage);
        let bin = Installed::Binary {
            path: PathBuf::from("/usr/local/bin/app"),
        };
        assert_eq!(bin.method().as_str(), "binary");
    }
}
