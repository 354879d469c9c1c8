use std::path::{Component, Path, PathBuf};

use include_dir::{Dir, DirEntry, include_dir};

use crate::ports::file_system::{
    AssetEntry, AssetMetadata, AssetOpenFuture, AssetReadFuture, AssetSource, FileSystemError,
    FileSystemResult,
};

static BUNDLED: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets");

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Assets compiled into the binary from the `assets/` directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedAssets;

impl EmbeddedAssets {
    pub fn new() -> Self {
        Self
    }
}

struct EmbeddedEntry {
    entry: &'static DirEntry<'static>,
}

impl AssetEntry for EmbeddedEntry {
    fn stat(&self) -> FileSystemResult<AssetMetadata> {
        let path = self.entry.path().to_string_lossy();
        Ok(AssetMetadata {
            name: base_name(&path),
            is_dir: matches!(self.entry, DirEntry::Dir(_)),
        })
    }

    fn read_all(&self) -> AssetReadFuture<'_> {
        Box::pin(async move {
            match self.entry {
                DirEntry::File(file) => Ok(file.contents().to_vec()),
                DirEntry::Dir(dir) => Err(FileSystemError::InvalidPath(format!(
                    "{} is a directory",
                    dir.path().display()
                ))),
            }
        })
    }
}

impl AssetSource for EmbeddedAssets {
    fn open<'a>(&'a self, path: &'a str) -> AssetOpenFuture<'a> {
        Box::pin(async move {
            let entry = BUNDLED
                .get_entry(path)
                .ok_or_else(|| FileSystemError::NotFound(path.to_string()))?;
            Ok(Box::new(EmbeddedEntry { entry }) as Box<dyn AssetEntry>)
        })
    }
}

/// Assets read from a directory on disk, laid out like `assets/`.
#[derive(Debug, Clone)]
pub struct DiskAssets {
    root: PathBuf,
}

impl DiskAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps an asset path under the root; anything that could climb out is not found.
    fn resolve(&self, path: &str) -> FileSystemResult<PathBuf> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(FileSystemError::NotFound(path.to_string())),
            }
        }
        Ok(resolved)
    }
}

struct DiskEntry {
    path: PathBuf,
    is_dir: bool,
}

impl AssetEntry for DiskEntry {
    fn stat(&self) -> FileSystemResult<AssetMetadata> {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(AssetMetadata {
            name,
            is_dir: self.is_dir,
        })
    }

    fn read_all(&self) -> AssetReadFuture<'_> {
        Box::pin(async move { Ok(tokio::fs::read(&self.path).await?) })
    }
}

impl AssetSource for DiskAssets {
    fn open<'a>(&'a self, path: &'a str) -> AssetOpenFuture<'a> {
        Box::pin(async move {
            let resolved = self.resolve(path)?;
            let metadata = match tokio::fs::metadata(&resolved).await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Err(FileSystemError::NotFound(path.to_string()));
                }
                Err(err) => return Err(err.into()),
            };
            Ok(Box::new(DiskEntry {
                path: resolved,
                is_dir: metadata.is_dir(),
            }) as Box<dyn AssetEntry>)
        })
    }
}
