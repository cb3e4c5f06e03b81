//! Install GitHub release artifacts on Linux
//!
//! Given `owner/repo`, fetches a release, picks the asset that best fits the
//! host, downloads it and installs it through privileged system commands.
//! Every successful install is recorded in a JSON metadata file so the
//! package can be listed, upgraded and removed later.
//!
//! # Artifact kinds
//!
//! - `.deb` - installed with `dpkg -i`, with one `apt-get -f install` repair
//!   on failure; removed with `dpkg --remove`
//! - archives (`.tar.gz`, `.tar.xz`, `.tar.bz2`, `.tar.zst`, `.zip`, `.gz`) -
//!   extracted and searched for a `.deb`, then for an executable
//! - anything else - treated as a raw binary and copied to `/usr/local/bin`
//!
//! # Example
//!
//! ```no_run
//! use get_installer::{
//!     Config, GithubClient, Host, HttpDownloader, InstallOptions, MetadataStore,
//!     PackageManager, SudoRunner,
//! };
//!
//! # fn main() -> get_installer::Result<()> {
//! let config = Config::from_env();
//! let source = GithubClient::new(&config);
//! let fetcher = HttpDownloader::new(&config);
//! let runner = SudoRunner::new(config.dry_run, config.verbose);
//! let store = MetadataStore::open(&config.metadata_path)?;
//!
//! let mut pm = PackageManager::new(store, &source, &fetcher, &runner, Host::detect(), &config.bin_dir);
//! pm.install("sharkdp/bat", "latest", &InstallOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod download;
pub mod error;
pub mod install;
pub mod manager;
pub mod release;
pub mod store;

#[doc(hidden)]
pub mod testing;

pub use core::config::Config;
pub use core::platform::Host;
pub use download::{Fetch, HttpDownloader};
pub use error::{GetError, Result};
pub use install::runner::{CommandOutput, CommandRunner, PrivilegedOp, SudoRunner};
pub use install::{InstallMethod, InstallOptions, Installed};
pub use manager::{PackageManager, Update, UpdateReport, UpgradeReport};
pub use release::{GithubClient, LATEST, Release, ReleaseAsset, ReleaseSource};
pub use store::{MetadataStore, PackageRecord};
