use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Error type for file system operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    /// Error when no asset exists at the path
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when path is invalid
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for file system operations
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// Type alias for async asset lookups
pub type AssetOpenFuture<'a> =
    Pin<Box<dyn Future<Output = FileSystemResult<Box<dyn AssetEntry>>> + Send + 'a>>;

/// Type alias for async full-content reads
pub type AssetReadFuture<'a> = Pin<Box<dyn Future<Output = FileSystemResult<Vec<u8>>> + Send + 'a>>;

/// What `stat` reports about an opened asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMetadata {
    /// Final path component
    pub name: String,
    pub is_dir: bool,
}

/// An opened entry of an asset collection
pub trait AssetEntry: Send + Sync {
    fn stat(&self) -> FileSystemResult<AssetMetadata>;

    /// Read the full content of a file entry
    fn read_all(&self) -> AssetReadFuture<'_>;
}

/// AssetSource defines the port (interface) for the read-only static asset collection
pub trait AssetSource: Send + Sync + 'static {
    /// Open an asset
    ///
    /// # Arguments
    /// * `path` - Slash-separated path relative to the collection root,
    ///   e.g. `static/index.html`
    ///
    /// # Returns
    /// A future that resolves to the opened entry, or `NotFound`
    fn open<'a>(&'a self, path: &'a str) -> AssetOpenFuture<'a>;
}
