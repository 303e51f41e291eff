//! File download operations with atomic writes
//!
//! Bodies are written to `<name>.tmp` next to the destination and renamed
//! into place only after the whole body is on disk, so a failed attempt
//! never leaves a truncated file under the final name.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::files;
use crate::errors::{FetchError, FetchResult};

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Downloads `url` into `destination_dir/<file name>` in a single attempt
    ///
    /// The file name is the last path component of the URL; the query string
    /// never reaches the local name. Returns the final path.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The URL has no usable file name
    /// - The request fails or returns a non-success status
    /// - Writing or renaming the file fails
    pub async fn fetch_once(&self, url: &Url, destination_dir: &Path) -> FetchResult<PathBuf> {
        let file_name = file_name_from_url(url)?;
        let destination = destination_dir.join(&file_name);

        let body = self.http_handler.get_bytes(url).await?;
        write_atomic(&destination, &body).await?;

        tracing::debug!("Downloaded {} -> {}", url, destination.display());
        Ok(destination)
    }
}

/// Derives the local file name for a URL: last path segment, query dropped
pub fn file_name_from_url(url: &Url) -> FetchResult<String> {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .ok_or_else(|| FetchError::MissingFileName {
            url: url.to_string(),
        })
}

/// Writes `contents` to `destination` through a temporary sibling and a rename
pub async fn write_atomic(destination: &Path, contents: &[u8]) -> FetchResult<()> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(destination);

    let written = async {
        let mut file = File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(FetchError::Io(e));
    }

    tokio::fs::rename(&temp_path, destination)
        .await
        .map_err(|_| FetchError::AtomicOperationFailed {
            temp_path: temp_path.clone(),
            final_path: destination.to_path_buf(),
        })
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}
