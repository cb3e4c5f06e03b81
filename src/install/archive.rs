//! Archive scanning
//!
//! Extracts an archive into a scratch directory and looks for something to
//! install inside it. Extraction is native (no external tools needed).
//!
//! ## Search order
//!
//! The tree is walked depth-first with directory entries sorted by file
//! name. The first `.deb` found anywhere wins outright. Without one, the
//! first file whose name has no `.` is used.

use std::fs::File;
use std::io::{BufReader, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use super::{Artifact, ArtifactKind, InstallMethod, classify, looks_like_binary};
use crate::core::output;
use crate::error::{GetError, Result};

/// Archive formats that can be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    TarGz,
    TarXz,
    TarBz2,
    TarZst,
    Tar,
    Zip,
    /// A single gzip-compressed file
    Gz,
}

/// Detect archive format from the file name.
pub fn detect_format(name: &str) -> Option<Format> {
    let name = name.to_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(Format::TarGz)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some(Format::TarXz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some(Format::TarBz2)
    } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
        Some(Format::TarZst)
    } else if name.ends_with(".tar") {
        Some(Format::Tar)
    } else if name.ends_with(".zip") {
        Some(Format::Zip)
    } else if name.ends_with(".gz") {
        Some(Format::Gz)
    } else {
        None
    }
}

/// An installable file found inside an extracted archive.
///
/// Owns the scratch directory: dropping this value deletes everything that
/// was extracted.
#[derive(Debug)]
pub struct ExtractedArtifact {
    dir: TempDir,
    path: PathBuf,
    name: String,
    method: InstallMethod,
}

impl ExtractedArtifact {
    pub fn artifact(&self) -> Artifact<'_> {
        Artifact {
            path: &self.path,
            name: &self.name,
        }
    }

    /// Never `Archive`: nested archives are not opened.
    pub fn method(&self) -> InstallMethod {
        self.method
    }
}

/// Extract `archive_path` (judged by `archive_name`) and find the artifact
/// to install.
pub fn scan(archive_path: &Path, archive_name: &str) -> Result<ExtractedArtifact> {
    let dir = tempfile::Builder::new().prefix("get-extracted-").tempdir()?;

    output::sub_action(&format!("extracting {}", archive_name));
    extract(archive_path, archive_name, dir.path())?;

    let (path, method) = find_installable(dir.path())?
        .ok_or_else(|| GetError::NoInstallableArtifact(archive_name.to_string()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let found = match method {
        InstallMethod::NativePackage => "Found .deb in archive",
        InstallMethod::Binary => "Found binary in archive",
    };
    output::detail(&format!("{}: {}", found, name));

    Ok(ExtractedArtifact {
        dir,
        path,
        name,
        method,
    })
}

/// Walk `root` and pick the artifact to install.
pub fn find_installable(root: &Path) -> Result<Option<(PathBuf, InstallMethod)>> {
    let mut binary: Option<PathBuf> = None;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| GetError::Extract(format!("cannot walk {}: {}", root.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if classify(&name) == ArtifactKind::NativePackage {
            return Ok(Some((entry.into_path(), InstallMethod::NativePackage)));
        }
        // Keep walking: a later .deb still wins
        if binary.is_none() && looks_like_binary(&name) {
            binary = Some(entry.into_path());
        }
    }

    Ok(binary.map(|path| (path, InstallMethod::Binary)))
}

/// Extract an archive into `dest`, picking the format from `name`.
pub fn extract(archive_path: &Path, name: &str, dest: &Path) -> Result<()> {
    let format = detect_format(name)
        .ok_or_else(|| GetError::Extract(format!("cannot detect archive format: {}", name)))?;

    std::fs::create_dir_all(dest)?;

    let pb = output::spinner(&format!("extracting {}", name));
    let result = match format {
        Format::TarGz => extract_tar(flate2::read::GzDecoder::new(open(archive_path)?), dest),
        Format::TarXz => extract_tar(xz2::read::XzDecoder::new(open(archive_path)?), dest),
        Format::TarBz2 => extract_tar(bzip2::read::BzDecoder::new(open(archive_path)?), dest),
        Format::TarZst => {
            let decoder = zstd::stream::read::Decoder::new(open(archive_path)?)
                .map_err(|e| GetError::Extract(format!("zstd init error: {}", e)))?;
            extract_tar(decoder, dest)
        }
        Format::Tar => extract_tar(open(archive_path)?, dest),
        Format::Zip => extract_zip(archive_path, dest),
        Format::Gz => extract_gz(archive_path, name, dest),
    };
    output::progress_done(pb);

    result
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| GetError::Extract(format!("cannot open {}: {}", path.display(), e)))?;
    Ok(BufReader::new(file))
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| GetError::Extract(format!("tar read error: {}", e)))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| GetError::Extract(format!("tar entry error: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| GetError::Extract(format!("tar path error: {}", e)))?
            .into_owned();

        if path.is_absolute() || path.components().any(|c| c == Component::ParentDir) {
            return Err(GetError::Extract(format!(
                "tar contains unsafe path: {}",
                path.display()
            )));
        }
        // Some archives contain a "." entry
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        let full_path = dest.join(&path);
        ensure_no_symlink_components(dest, &full_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type == tar::EntryType::Symlink || entry_type == tar::EntryType::Link {
            let link_name = entry
                .link_name()
                .map_err(|e| GetError::Extract(format!("tar link_name error: {}", e)))?
                .ok_or_else(|| {
                    GetError::Extract(format!("tar link without target: {}", path.display()))
                })?;
            let link_parent = full_path.parent().unwrap_or(dest);
            ensure_link_within(dest, link_parent, &link_name)?;
        }

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry
            .unpack(&full_path)
            .map_err(|e| GetError::Extract(format!("unpack error for {}: {}", path.display(), e)))?;
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .map_err(|e| GetError::Extract(format!("cannot open {}: {}", archive_path.display(), e)))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| GetError::Extract(format!("zip read error: {}", e)))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| GetError::Extract(format!("zip entry error: {}", e)))?;

        // Entries with unsafe paths are skipped
        let Some(outpath) = file.enclosed_name().map(|p| dest.join(p)) else {
            continue;
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut file, &mut outfile)?;

        if let Some(mode) = file.unix_mode() {
            std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode & 0o777))?;
        }
    }

    Ok(())
}

/// `tool-linux-amd64.gz` decompresses to `dest/tool-linux-amd64`.
fn extract_gz(archive_path: &Path, name: &str, dest: &Path) -> Result<()> {
    let stem = &name[..name.len() - ".gz".len()];
    let stem = Path::new(stem)
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "artifact".into());

    let mut decoder = flate2::read::GzDecoder::new(open(archive_path)?);
    let mut outfile = File::create(dest.join(stem))?;
    std::io::copy(&mut decoder, &mut outfile)
        .map_err(|e| GetError::Extract(format!("gzip error for {}: {}", name, e)))?;
    Ok(())
}

/// Lexically normalize a path without touching the filesystem.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    // Leading ".." stays for relative paths
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }
    out
}

/// Writing through an existing symlink could escape `dest`.
fn ensure_no_symlink_components(dest: &Path, full_path: &Path) -> Result<()> {
    let rel = full_path.strip_prefix(dest).map_err(|_| {
        GetError::Extract(format!("path outside destination: {}", full_path.display()))
    })?;

    let mut cur = dest.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(md) = std::fs::symlink_metadata(&cur)
            && md.file_type().is_symlink()
        {
            return Err(GetError::Extract(format!(
                "extraction blocked: symlink in path component: {}",
                cur.display()
            )));
        }
    }
    Ok(())
}

fn ensure_link_within(dest: &Path, link_parent: &Path, link_name: &Path) -> Result<()> {
    if link_name.is_absolute() {
        return Err(GetError::Extract(format!(
            "unsafe link target (absolute): {}",
            link_name.display()
        )));
    }

    let candidate = normalize_lexical(&link_parent.join(link_name));
    if !candidate.starts_with(normalize_lexical(dest)) {
        return Err(GetError::Extract(format!(
            "unsafe link target (escapes dest): {} -> {}",
            link_parent.display(),
            link_name.display()
        )));
    }
    Ok(())
}
