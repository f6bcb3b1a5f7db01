use std::{
    fmt::Debug,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use reqwest::{Client, IntoUrl};
use tokio::{
    fs::{self, create_dir_all, File},
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
};
use tracing::{debug, info, instrument, trace, warn};

use crate::file::partial_path;

const BUF_SIZE: usize = 1024 * 1024; //  1mb

#[derive(Debug, Default)]
pub struct Manager {
    client: Client,
    downloaded_bytes: AtomicU64,
}

impl Manager {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            downloaded_bytes: AtomicU64::new(0),
        }
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    /// Streams the body of `url` into `writer`. Any non-success status is an error.
    #[instrument(skip(self, writer))]
    pub async fn download<U, W>(&self, url: U, writer: &mut W) -> crate::Result<()>
    where
        U: IntoUrl + Debug,
        W: AsyncWrite + Unpin,
    {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        debug!(status = %response.status(), "Remote responded");
        while let Some(chunk) = response.chunk().await? {
            let len = chunk.len();
            trace!(len, "New chunk arrived");
            writer.write_all(&chunk).await?;
            self.downloaded_bytes
                .fetch_add(len as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Downloads `url` to `path`, replacing whatever is there.
    ///
    /// The body is staged in a `.part` sibling and renamed over `path` once complete,
    /// a failed download removes the staged file and leaves `path` untouched.
    #[instrument(skip(self))]
    pub async fn download_file<U, P>(&self, url: U, path: P) -> crate::Result<()>
    where
        U: IntoUrl + Debug,
        P: AsRef<Path> + Debug,
    {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        let staged = partial_path(path);
        let result = match self.write_staged(url, &staged).await {
            Ok(()) => fs::rename(&staged, path).await.map_err(crate::Error::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(?path, "File downloaded");
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&staged).await {
                    trace!(%cleanup, "Nothing staged to remove");
                }
                warn!(?path, error = %e, "Download failed");
                Err(e)
            }
        }
    }

    /// Same as [`Manager::download_file`] but skips an existing `path`. Returns whether it fetched.
    #[instrument(skip(self))]
    pub async fn download_if_absent<U, P>(&self, url: U, path: P) -> crate::Result<bool>
    where
        U: IntoUrl + Debug,
        P: AsRef<Path> + Debug,
    {
        let path = path.as_ref();
        if path.exists() {
            info!(?path, "File already exists");
            return Ok(false);
        }
        self.download_file(url, path).await?;
        Ok(true)
    }

    async fn write_staged<U>(&self, url: U, staged: &Path) -> crate::Result<()>
    where
        U: IntoUrl + Debug,
    {
        let file = File::create(staged).await?;
        let mut output = BufWriter::with_capacity(BUF_SIZE, file);
        self.download(url, &mut output).await?;
        output.flush().await?;
        Ok(())
    }
}
