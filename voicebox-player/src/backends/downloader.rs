use std::path::PathBuf;
use thiserror::Error;
use voicebox_common::MediaReference;

/// Downloader failures
#[derive(Error, Debug)]
pub enum DownloadError {
    /// `fetch_first` was handed an empty batch
    #[error("No items are currently in queue")]
    NoItems,

    #[error("download failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches deferred items to local storage
///
/// Blocking, like [`super::Resolver`]. Every method must be idempotent: fetching
/// an item that is already on disk is a no-op.
pub trait Downloader: Send + Sync + 'static {
    /// Fetch the first item of `items`
    fn fetch_first(&self, items: &[MediaReference]) -> Result<(), DownloadError>;

    /// Fetch one item, skipping it if already present
    fn fetch_one(&self, item: &MediaReference) -> Result<(), DownloadError>;

    /// Whether the local copy of `item` is complete
    fn exists(&self, item: &MediaReference) -> bool;

    /// Where the local copy of `item` lives (present or not)
    fn local_path(&self, item: &MediaReference) -> PathBuf;

    /// Delete the local copy. Returns false if there was nothing to delete.
    fn delete(&self, item: &MediaReference) -> Result<bool, DownloadError>;
}
