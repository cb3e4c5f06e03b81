//! get - install GitHub release artifacts
//!
//! Usage:
//!   get install <owner/repo>       Install the latest release
//!   get list                       List installed packages
//!   get remove <owner/repo>        Remove a package
//!   get update                     Check for newer releases
//!   get upgrade [owner/repo]       Install newer releases

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use get_installer::core::output;
use get_installer::{
    Config, GithubClient, Host, HttpDownloader, InstallOptions, LATEST, MetadataStore,
    PackageManager, SudoRunner,
};

#[derive(Parser)]
#[command(name = "get")]
#[command(about = "Install, track and remove GitHub release artifacts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Metadata file (default: $XDG_DATA_HOME/get/get.json)
    #[arg(long, global = true, env = "GET_METADATA_PATH")]
    metadata: Option<PathBuf>,

    /// Print privileged commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print privileged commands as they run
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a release asset
    Install {
        /// owner/repo or https://github.com/owner/repo
        repo: String,

        /// Release tag to install
        #[arg(short = 'r', long, default_value = LATEST)]
        release: String,

        /// Only consider releases whose tag starts with this prefix
        #[arg(short = 't', long, default_value = "")]
        tag_prefix: String,

        /// Install a binary under this name
        #[arg(long)]
        rename: Option<String>,
    },

    /// List installed packages
    List,

    /// Remove an installed package
    Remove {
        /// owner/repo or https://github.com/owner/repo
        repo: String,
    },

    /// Check installed packages for newer releases
    Update,

    /// Install newer releases
    Upgrade {
        /// Specific package to upgrade (all if not specified)
        repo: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().dry_run(cli.dry_run).verbose(cli.verbose);
    if let Some(path) = cli.metadata {
        config = config.metadata_path(path);
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let store = MetadataStore::open(&config.metadata_path)
        .with_context(|| format!("Failed to load metadata: {}", config.metadata_path.display()))?
        .dry_run(config.dry_run);
    let source = GithubClient::new(&config);
    let fetcher = HttpDownloader::new(&config);
    let runner = SudoRunner::new(config.dry_run, config.verbose);
    let mut pm = PackageManager::new(store, &source, &fetcher, &runner, Host::detect(), &config.bin_dir);

    match cli.command {
        Commands::Install {
            repo,
            release,
            tag_prefix,
            rename,
        } => {
            let options = InstallOptions::new(tag_prefix, rename)?;
            pm.install(&repo, &release, &options)
                .with_context(|| format!("Failed to install {}", repo))?;
        }

        Commands::List => {
            if pm.store().is_empty() {
                output::info("No packages installed");
            } else {
                output::package_header();
                for (repo_id, record) in pm.list() {
                    output::package_row(
                        repo_id,
                        &record.version,
                        record.install_type.as_str(),
                        &record.installed_at,
                    );
                }
            }
        }

        Commands::Remove { repo } => {
            pm.remove(&repo)
                .with_context(|| format!("Failed to remove {}", repo))?;
        }

        Commands::Update => {
            output::action("Checking for updates...");
            let report = pm.check_updates();

            if report.available.is_empty() {
                output::info("All packages are up to date");
            }
            for update in &report.available {
                output::detail(&format!(
                    "{}: {} -> {}",
                    update.repo_id, update.installed, update.latest_tag
                ));
            }
            for (repo_id, err) in &report.failed {
                output::warning(&format!("{}: {}", repo_id, err));
            }
            if !report.available.is_empty() {
                output::info("Run 'get upgrade' to install them");
            }
        }

        Commands::Upgrade { repo } => {
            output::action("Upgrading packages...");
            let report = pm.upgrade(repo.as_deref())?;

            if report.upgraded.is_empty() && report.failed.is_empty() {
                output::info("All packages are up to date");
            }
            if !report.failed.is_empty() {
                let names: Vec<_> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
                bail!("{} package(s) failed to upgrade: {}", names.len(), names.join(", "));
            }
        }
    }

    Ok(())
}
