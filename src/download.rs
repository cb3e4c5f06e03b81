//! Asset download
//!
//! Streams a release asset into a private temporary file. The returned
//! [`TempPath`] deletes the file when dropped, so whatever happens after the
//! download the artifact does not outlive the install call.

use std::io::{Read, Write};
use std::time::Duration;

use tempfile::TempPath;

use crate::core::config::Config;
use crate::core::output;
use crate::error::{GetError, Result};

/// Size of each chunk copied from the response body
const CHUNK_SIZE: usize = 8192;

/// Fetches an asset to local storage.
pub trait Fetch {
    /// Download `url` into a fresh temporary file. `name` is the asset's
    /// file name, used only for display.
    fn fetch(&self, url: &str, name: &str) -> Result<TempPath>;
}

/// HTTP downloader with a progress bar.
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    pub fn new(config: &Config) -> Self {
        Self::with_timeout(config.download_timeout)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Fetch for HttpDownloader {
    fn fetch(&self, url: &str, name: &str) -> Result<TempPath> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                GetError::DownloadFailure(format!("{}: HTTP {}", url, code))
            }
            other => GetError::DownloadFailure(format!("{}: {}", url, other)),
        })?;

        let pb = output::spinner(&format!("downloading {}", name));
        if let Some(len) = response
            .header("content-length")
            .and_then(|s| s.parse().ok())
        {
            output::upgrade_to_bytes(&pb, len);
        }

        let result = stream_to_temp(response.into_reader(), |total| pb.set_position(total));
        output::progress_done(pb);

        let (path, total_bytes) = result?;
        output::detail(&format!("downloaded {} ({} bytes)", name, total_bytes));
        Ok(path)
    }
}

/// Copy `reader` into a new temp file chunk by chunk.
fn stream_to_temp(mut reader: impl Read, mut progress: impl FnMut(u64)) -> Result<(TempPath, u64)> {
    let mut file = tempfile::Builder::new()
        .prefix("get-asset-")
        .tempfile()
        .map_err(|e| GetError::DownloadFailure(format!("cannot create temp file: {}", e)))?;

    let mut buffer = [0u8; CHUNK_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| GetError::DownloadFailure(format!("read error: {}", e)))?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| GetError::DownloadFailure(format!("write error: {}", e)))?;

        total_bytes += bytes_read as u64;
        progress(total_bytes);
    }

    file.flush()
        .map_err(|e| GetError::DownloadFailure(format!("write error: {}", e)))?;

    Ok((file.into_temp_path(), total_bytes))
}
