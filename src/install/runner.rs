//! Privileged command execution
//!
//! Every system mutation goes through a [`CommandRunner`] as a
//! [`PrivilegedOp`], so callers can substitute a runner that only records
//! what would have run.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::core::output;
use crate::error::{GetError, Result};

const SUDO_PROMPT: &str = "[get] Password required: ";

/// The fixed set of operations the pipeline performs on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegedOp {
    /// `dpkg -i <path>`
    InstallPackage(PathBuf),
    /// `apt-get -f install -y`
    RepairDependencies,
    /// `dpkg --remove <name>`
    RemovePackage(String),
    /// `dpkg-deb --field <path> Package`
    QueryPackageName(PathBuf),
    /// `dpkg-query --show --showformat=${Status} <name>`
    QueryPackageStatus(String),
    /// `cp <src> <dst>`
    Copy { src: PathBuf, dst: PathBuf },
    /// `rm -f <path>`
    Delete(PathBuf),
}

impl PrivilegedOp {
    /// Program and arguments, without elevation.
    pub fn argv(&self) -> Vec<String> {
        let path = |p: &PathBuf| p.display().to_string();
        match self {
            PrivilegedOp::InstallPackage(p) => vec!["dpkg".into(), "-i".into(), path(p)],
            PrivilegedOp::RepairDependencies => {
                vec!["apt-get".into(), "-f".into(), "install".into(), "-y".into()]
            }
            PrivilegedOp::RemovePackage(name) => {
                vec!["dpkg".into(), "--remove".into(), name.clone()]
            }
            PrivilegedOp::QueryPackageName(p) => vec![
                "dpkg-deb".into(),
                "--field".into(),
                path(p),
                "Package".into(),
            ],
            PrivilegedOp::QueryPackageStatus(name) => vec![
                "dpkg-query".into(),
                "--show".into(),
                "--showformat=${Status}".into(),
                name.clone(),
            ],
            PrivilegedOp::Copy { src, dst } => vec!["cp".into(), path(src), path(dst)],
            PrivilegedOp::Delete(p) => vec!["rm".into(), "-f".into(), path(p)],
        }
    }

    /// Queries only read package state and run unprivileged.
    pub fn needs_elevation(&self) -> bool {
        !matches!(
            self,
            PrivilegedOp::QueryPackageName(_) | PrivilegedOp::QueryPackageStatus(_)
        )
    }

    /// Queries do not change the host, so they still run in dry-run mode.
    pub fn is_query(&self) -> bool {
        !self.needs_elevation()
    }
}

impl fmt::Display for PrivilegedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let argv = self.argv();
        if self.needs_elevation() {
            write!(f, "sudo {}", argv.join(" "))
        } else {
            write!(f, "{}", argv.join(" "))
        }
    }
}

/// Exit status and captured output of one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Turn a non-success status into `InstallFailure`.
    pub fn ensure_success(self, op: &PrivilegedOp) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let stderr = self.stderr.trim();
        let reason = if stderr.is_empty() {
            format!("exit code: {:?}", self.code)
        } else {
            format!("exit code: {:?}\nstderr: {}", self.code, stderr)
        };
        Err(GetError::InstallFailure {
            cmd: op.to_string(),
            reason,
        })
    }
}

/// Executes privileged operations. Returning `Err` means the command could
/// not be started at all; a command that ran and failed is `Ok` with
/// `success == false`.
pub trait CommandRunner {
    fn run(&self, op: &PrivilegedOp) -> Result<CommandOutput>;
}

/// Runs operations on the real host, elevating with `sudo`.
#[derive(Debug, Clone, Default)]
pub struct SudoRunner {
    /// If true, log mutating commands without executing them
    pub dry_run: bool,
    /// If true, print commands as they execute
    pub verbose: bool,
}

impl SudoRunner {
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self { dry_run, verbose }
    }

    fn command(&self, op: &PrivilegedOp) -> Command {
        let argv = op.argv();
        let mut cmd = if op.needs_elevation() {
            let mut cmd = Command::new("sudo");
            cmd.args(["-p", SUDO_PROMPT]).args(&argv);
            cmd
        } else {
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]);
            cmd
        };
        // sudo reads the password from the terminal
        cmd.stdin(Stdio::inherit());
        cmd
    }
}

impl CommandRunner for SudoRunner {
    fn run(&self, op: &PrivilegedOp) -> Result<CommandOutput> {
        let skip = self.dry_run && !op.is_query();
        if self.verbose || skip {
            output::command(skip, &op.to_string());
        }
        if skip {
            return Ok(CommandOutput::ok(""));
        }

        let out = self.command(op).output().map_err(|e| GetError::InstallFailure {
            cmd: op.to_string(),
            reason: format!("command failed to start: {}", e),
        })?;

        Ok(CommandOutput {
            success: out.status.success(),
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}
