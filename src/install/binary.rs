//! Raw binary installer.

use std::os::unix::fs::PermissionsExt;

use super::runner::PrivilegedOp;
use super::{Artifact, Installed, Installer};
use crate::core::output;
use crate::error::Result;

/// Mode given to installed binaries
const EXECUTABLE_MODE: u32 = 0o755;

/// Make the artifact executable and copy it into the binary directory.
///
/// The target file name is `rename` if given, else the artifact's own name.
pub fn install(installer: &Installer<'_>, artifact: Artifact<'_>, rename: Option<&str>) -> Result<Installed> {
    std::fs::set_permissions(
        artifact.path,
        std::fs::Permissions::from_mode(EXECUTABLE_MODE),
    )?;

    let target_name = rename.unwrap_or(artifact.name);
    let target = installer.bin_dir.join(target_name);

    output::sub_action(&format!("installing binary to {}", target.display()));
    let copy = PrivilegedOp::Copy {
        src: artifact.path.to_path_buf(),
        dst: target.clone(),
    };
    installer.runner.run(&copy)?.ensure_success(&copy)?;

    Ok(Installed::Binary { path: target })
}
