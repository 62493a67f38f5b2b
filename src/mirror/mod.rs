//! The local mirror tree.
//!
//! Layout: one directory per date bucket under the mirror root, page files
//! named by [`paths::page_file_name`], and a sidecar ledger per bucket.
//!
//! ```text
//! <root>/20231201/0info.txt
//! <root>/20231201/5-Invoice.0.png
//! <root>/20231201/5-Invoice.1.png
//! ```

pub mod ledger;
pub mod paths;

use std::path::{Path, PathBuf};

/// Filesystem half of materialization. All methods are plain I/O; policy
/// (when to fetch, when to reuse) lives in the sync engine.
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_dir(&self, bucket_id: u32) -> PathBuf {
        self.root.join(bucket_id.to_string())
    }

    /// Create (if needed) and return the bucket directory.
    pub async fn ensure_bucket(&self, bucket_id: u32) -> std::io::Result<PathBuf> {
        let dir = self.bucket_dir(bucket_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// File names in `dir` starting with `prefix`.
    pub async fn prefix_files(&self, dir: &Path, prefix: &str) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut rd = tokio::fs::read_dir(dir).await?;
        while let Some(dirent) = rd.next_entry().await? {
            let name = dirent.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(prefix) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove the named files from `dir`. Failures are logged per file and do
    /// not abort the rest; the caller re-writes the pages anyway.
    pub async fn remove_files(&self, dir: &Path, names: &[String]) {
        for name in names {
            let path = dir.join(name);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "could not remove stale page file");
            }
        }
    }

    /// Write one page file and return its path.
    pub async fn write_page(
        &self,
        dir: &Path,
        file_name: &str,
        data: &[u8],
    ) -> std::io::Result<PathBuf> {
        let path = dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Enumerate an entry's pages already on disk by probing sequential page
    /// indices until one is missing. This is how materialization recovers
    /// `local_images` without re-fetching.
    pub async fn probe_pages(
        &self,
        dir: &Path,
        sequence_id: u64,
        display_name: &str,
    ) -> Vec<PathBuf> {
        let mut pages = Vec::new();
        for index in 0.. {
            let path = dir.join(paths::page_file_name(sequence_id, display_name, index));
            match tokio::fs::metadata(&path).await {
                Ok(_) => pages.push(path),
                Err(_) => break,
            }
        }
        pages
    }
}
