//! Filesystem-backed attachment cache and local-file resolution helpers.

use std::io;
use std::path::{Path, PathBuf};

use crate::models::AttachmentRef;
use crate::ports::FileResolution;

/// `FileResolution` over a real cache directory.
///
/// The canonical location of an attachment is `cache_dir/<file_name>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsFileResolver {
    cache_dir: PathBuf,
}

impl FsFileResolver {
    /// Create a resolver rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory holding cached copies.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl FileResolution for FsFileResolver {
    fn cache_path(&self, attachment: &AttachmentRef) -> PathBuf {
        self.cache_dir.join(&attachment.file_name)
    }

    fn file_len(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path)
            .ok()
            .filter(std::fs::Metadata::is_file)
            .map(|metadata| metadata.len())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Resolve where a local copy of `attachment` lives or would live.
///
/// Prefers the direct attach path when a file exists there, otherwise the
/// canonical cache path.
pub fn resolve_local_file<F: FileResolution + ?Sized>(
    files: &F,
    attachment: &AttachmentRef,
) -> PathBuf {
    if let Some(direct) = attachment.direct_path() {
        if files.file_len(direct).is_some() {
            return direct.to_path_buf();
        }
    }
    files.cache_path(attachment)
}

/// Delete a zero-length file at `path`.
///
/// Returns the remaining length, `None` when nothing usable is on disk. A
/// failed delete is logged and the file is still reported absent.
pub fn purge_if_empty<F: FileResolution + ?Sized>(files: &F, path: &Path) -> Option<u64> {
    match files.file_len(path) {
        Some(0) => {
            if let Err(error) = files.remove(path) {
                tracing::warn!("Failed to purge empty cache file {:?}: {}", path, error);
            } else {
                tracing::debug!("Purged empty cache file {:?}", path);
            }
            None
        }
        other => other,
    }
}
