//! Native package installer (`.deb`).

use super::runner::{CommandOutput, CommandRunner, PrivilegedOp};
use super::{Artifact, Installed, NATIVE_PACKAGE_EXT};
use crate::core::output;
use crate::error::{GetError, Result};

/// `dpkg-query` status of a fully installed package
const INSTALLED_STATUS: &str = "install ok installed";

/// Install a native package and resolve its package name.
///
/// A failed `dpkg -i` gets exactly one `apt-get -f install` repair. The
/// original install is not retried: after a successful repair the package
/// status is checked, and the install fails unless the package ended up
/// installed.
pub fn install(runner: &dyn CommandRunner, artifact: Artifact<'_>) -> Result<Installed> {
    output::sub_action(&format!("installing {} with dpkg", artifact.name));

    let install = PrivilegedOp::InstallPackage(artifact.path.to_path_buf());
    let first = runner.run(&install)?;
    let repaired = !first.success;

    if repaired {
        output::warning("dpkg failed, attempting to fix dependencies...");
        let repair = PrivilegedOp::RepairDependencies;
        runner.run(&repair)?.ensure_success(&repair)?;
    }

    let name = package_name(runner, artifact);

    if repaired {
        ensure_installed(runner, &name, &install, &first)?;
    }

    output::detail(&format!("package name: {}", name));
    Ok(Installed::NativePackage { name })
}

/// Ask `dpkg-deb` for the package name, falling back to the file name.
fn package_name(runner: &dyn CommandRunner, artifact: Artifact<'_>) -> String {
    let query = PrivilegedOp::QueryPackageName(artifact.path.to_path_buf());
    runner
        .run(&query)
        .ok()
        .filter(|out| out.success)
        .map(|out| out.stdout.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| name_from_filename(artifact.name))
}

/// `app_1.2.3_amd64.deb` -> `app`
pub fn name_from_filename(filename: &str) -> String {
    let lower = filename.to_lowercase();
    let stem = if lower.ends_with(NATIVE_PACKAGE_EXT) {
        &filename[..filename.len() - NATIVE_PACKAGE_EXT.len()]
    } else {
        filename
    };
    stem.split('_').next().unwrap_or(stem).to_string()
}

fn ensure_installed(
    runner: &dyn CommandRunner,
    name: &str,
    install: &PrivilegedOp,
    first: &CommandOutput,
) -> Result<()> {
    let status = PrivilegedOp::QueryPackageStatus(name.to_string());
    let installed = runner
        .run(&status)?
        .ensure_success(&status)
        .map(|out| out.stdout.contains(INSTALLED_STATUS))
        .unwrap_or(false);

    if installed {
        return Ok(());
    }

    Err(GetError::InstallFailure {
        cmd: install.to_string(),
        reason: format!(
            "package '{}' is still not installed after fixing dependencies\nstderr: {}",
            name,
            first.stderr.trim()
        ),
    })
}
