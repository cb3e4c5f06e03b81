//! Asset selection
//!
//! Pure scoring over a release's asset list. The highest score wins; ties go
//! to the asset listed first, so the choice is stable for a given release.

use super::ReleaseAsset;
use crate::core::platform::Host;
use crate::error::{GetError, Result};
use crate::install::NATIVE_PACKAGE_EXT;

const ARCH_MATCH: u32 = 10;
const NATIVE_PACKAGE: u32 = 5;
const BARE_BINARY: u32 = 3;
const ARCHIVE: u32 = 1;

/// Markers that identify an archive in an asset name.
const ARCHIVE_MARKERS: &[&str] = &[".tar", ".zip", ".gz", ".tgz"];

/// Score one asset name for the given architecture token.
pub fn score(name: &str, arch: &str) -> u32 {
    let name = name.to_lowercase();
    let mut score = 0;

    if !arch.is_empty() && name.contains(arch) {
        score += ARCH_MATCH;
    }

    if name.ends_with(NATIVE_PACKAGE_EXT) {
        score += NATIVE_PACKAGE;
    } else if !name.contains('.') {
        score += BARE_BINARY;
    } else if ARCHIVE_MARKERS.iter().any(|m| name.contains(m)) {
        score += ARCHIVE;
    }

    score
}

/// Pick the best asset for `host`.
///
/// Fails with `UnsupportedPlatform` on non-Linux hosts (before scoring) and
/// with `NoSuitableAsset` when the list is empty.
pub fn select<'a>(assets: &'a [ReleaseAsset], host: &Host) -> Result<&'a ReleaseAsset> {
    host.ensure_supported()?;

    let mut best: Option<(&ReleaseAsset, u32)> = None;
    for asset in assets {
        let s = score(&asset.name, host.arch());
        // Strictly greater: the earliest asset keeps a tie.
        if best.is_none_or(|(_, top)| s > top) {
            best = Some((asset, s));
        }
    }

    best.map(|(asset, _)| asset).ok_or(GetError::NoSuitableAsset)
}
