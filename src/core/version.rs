//! Release version comparison

/// Strip the tag prefix and one leading `v`: `cli-v1.2.0` with prefix
/// `cli-` gives `1.2.0`.
pub fn bare_version<'a>(tag: &'a str, tag_prefix: &str) -> &'a str {
    let s = tag.strip_prefix(tag_prefix).unwrap_or(tag);
    s.strip_prefix('v').unwrap_or(s)
}

/// Returns true if `latest` is newer than `installed`.
///
/// Tries semver parsing first (short versions like `1.2` are padded), falls
/// back to string inequality for tags that are not versions at all.
pub fn is_newer(installed: &str, latest: &str, tag_prefix: &str) -> bool {
    let installed = bare_version(installed, tag_prefix);
    let latest = bare_version(latest, tag_prefix);

    match (parse_lenient(installed), parse_lenient(latest)) {
        (Some(installed_ver), Some(latest_ver)) => latest_ver > installed_ver,
        _ => installed != latest,
    }
}

fn parse_lenient(version: &str) -> Option<semver::Version> {
    if let Ok(v) = semver::Version::parse(version) {
        return Some(v);
    }
    let padded = match version.matches('.').count() {
        0 => format!("{}.0.0", version),
        1 => format!("{}.0", version),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}
