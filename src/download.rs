//! File and video transfer to disk.
//!
//! Two paths to a saved file: a direct HTTP download streamed chunk by
//! chunk, and a stream-extraction helper subprocess whose stdout is piped
//! into the destination. Both clean up the partial file on failure so a
//! rerun's skip check never trusts a truncated download.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Moves remote bytes to local files.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    /// Name or path of the stream-extraction helper binary.
    helper_bin: String,
}

impl Downloader {
    /// Creates a downloader using `helper_bin` for hosted-video streams.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(helper_bin: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            helper_bin: helper_bin.into(),
        }
    }

    /// Downloads `url` directly to `dest`, streaming the body to disk.
    ///
    /// Unlike page fetches, a non-success status here is an error: a CDN
    /// asset either exists or it doesn't.
    ///
    /// # Errors
    ///
    /// [`Error::Request`] for transport or status failures, [`Error::Io`]
    /// for filesystem failures. The partial file is removed on error.
    #[instrument(level = "debug", skip(self))]
    pub async fn direct(&self, url: &str, dest: &Path) -> Result<()> {
        let result = self.stream_to_file(url, dest).await;
        if result.is_err() {
            remove_partial(dest).await;
        }
        result
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::request(url, e))?;

        let file = File::create(dest)
            .await
            .map_err(|e| Error::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::request(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| Error::io(dest, e))?;
        }
        writer.flush().await.map_err(|e| Error::io(dest, e))?;
        debug!(dest = %dest.display(), "direct download complete");
        Ok(())
    }

    /// Downloads a hosted video by piping the helper's stdout into `dest`.
    ///
    /// Runs `{helper_bin} -o - {url}` and copies the emitted stream to the
    /// destination file. A non-zero helper exit discards the partial file.
    ///
    /// # Errors
    ///
    /// [`Error::Helper`] when the helper cannot be spawned or exits
    /// non-zero, [`Error::Io`] for filesystem failures.
    #[instrument(level = "debug", skip(self))]
    pub async fn streamed(&self, url: &str, dest: &Path) -> Result<()> {
        let result = self.pipe_helper_to_file(url, dest).await;
        if result.is_err() {
            remove_partial(dest).await;
        }
        result
    }

    async fn pipe_helper_to_file(&self, url: &str, dest: &Path) -> Result<()> {
        let mut child = Command::new(&self.helper_bin)
            .arg("-o")
            .arg("-")
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::helper(url, format!("failed to spawn {}: {e}", self.helper_bin)))?;

        let Some(mut stdout) = child.stdout.take() else {
            return Err(Error::helper(url, "helper stdout was not captured"));
        };

        let file = File::create(dest)
            .await
            .map_err(|e| Error::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        tokio::io::copy(&mut stdout, &mut writer)
            .await
            .map_err(|e| Error::io(dest, e))?;
        writer.flush().await.map_err(|e| Error::io(dest, e))?;

        let status = child
            .wait()
            .await
            .map_err(|e| Error::helper(url, format!("failed to wait for helper: {e}")))?;
        if !status.success() {
            return Err(Error::helper(url, format!("helper exited with {status}")));
        }
        debug!(dest = %dest.display(), "streamed download complete");
        Ok(())
    }
}

/// Best-effort removal of a partially written file.
async fn remove_partial(dest: &Path) {
    if let Err(e) = tokio::fs::remove_file(dest).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dest = %dest.display(), error = %e, "failed to remove partial file");
        }
    }
}
