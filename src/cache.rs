//! Local cache for item metadata and document content.
//!
//! The cache is a directory with two independent namespaces: `meta/` holds
//! the raw server representation of item metadata and `files/` holds raw
//! document bytes, both keyed by resource URL. Entries are stored one file
//! per key, named by the hex SHA-256 of the URL, so distinct URLs can never
//! collide and a listing of `files/` shows exactly one file per cached
//! document.
//!
//! Writes go through a temporary file in the target directory followed by an
//! atomic rename, so a concurrent reader of the same key observes either the
//! full previous value or the full new one, never a torn write. There is no
//! eviction; cleanup is the caller's responsibility.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, trace};

const META_DIR_NAME: &str = "meta";
const FILES_DIR_NAME: &str = "files";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to create cache directory {}: {cause}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
    #[error("no cache entry for {url}")]
    NotFound { url: String },
    #[error("cache read failed for {url}: {cause}")]
    Read {
        url: String,
        #[source]
        cause: std::io::Error,
    },
    #[error("cache write failed for {url}: {cause}")]
    Write {
        url: String,
        #[source]
        cause: std::io::Error,
    },
}

/// Persistent two-part store for metadata and document content.
///
/// Opening the same directory twice operates on the same underlying data,
/// so any number of clients may share one cache path.
#[derive(Debug)]
pub struct Cache {
    root: PathBuf,
    meta_dir: PathBuf,
    files_dir: PathBuf,
}

impl Cache {
    /// Open (creating if necessary) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Cache, CacheError> {
        let root = dir.into();
        let meta_dir = root.join(META_DIR_NAME);
        let files_dir = root.join(FILES_DIR_NAME);
        for path in [&meta_dir, &files_dir] {
            fs::create_dir_all(path).map_err(|cause| CacheError::CreateDirectory {
                path: path.clone(),
                cause,
            })?;
        }
        debug!("cache opened at {}", root.display());
        Ok(Cache {
            root,
            meta_dir,
            files_dir,
        })
    }

    /// Root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding cached document content, one file per document URL.
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// True if metadata for `url` is cached.
    pub fn has_item(&self, url: &str) -> bool {
        self.entry_path(&self.meta_dir, url).is_file()
    }

    /// Read cached metadata for `url`.
    pub fn get_item(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        self.read_entry(&self.meta_dir, url)
    }

    /// Store metadata for `url`, replacing any previous entry.
    pub fn add_item(&self, url: &str, data: &[u8]) -> Result<(), CacheError> {
        self.write_entry(&self.meta_dir, url, data)
    }

    /// True if document content for `url` is cached.
    pub fn has_file(&self, url: &str) -> bool {
        self.entry_path(&self.files_dir, url).is_file()
    }

    /// Read cached document content for `url`.
    pub fn get_file(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        self.read_entry(&self.files_dir, url)
    }

    /// Store document content for `url`, replacing any previous entry.
    pub fn add_file(&self, url: &str, data: &[u8]) -> Result<(), CacheError> {
        self.write_entry(&self.files_dir, url, data)
    }

    fn entry_path(&self, dir: &Path, url: &str) -> PathBuf {
        dir.join(entry_file_name(url))
    }

    fn read_entry(&self, dir: &Path, url: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.entry_path(dir, url);
        if !path.is_file() {
            return Err(CacheError::NotFound {
                url: url.to_string(),
            });
        }
        fs::read(&path).map_err(|cause| CacheError::Read {
            url: url.to_string(),
            cause,
        })
    }

    fn write_entry(&self, dir: &Path, url: &str, data: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(dir, url);

        // Write next to the destination and rename into place, so readers
        // never observe a partially written entry.
        let mut temp = NamedTempFile::new_in(dir).map_err(|cause| CacheError::Write {
            url: url.to_string(),
            cause,
        })?;
        temp.write_all(data).map_err(|cause| CacheError::Write {
            url: url.to_string(),
            cause,
        })?;
        temp.persist(&path).map_err(|e| CacheError::Write {
            url: url.to_string(),
            cause: e.error,
        })?;

        trace!("cached {} bytes for {}", data.len(), url);
        Ok(())
    }
}

/// Deterministic, collision-free file name for a URL.
fn entry_file_name(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str = "https://app.alveo.edu.au/catalog/cooee/1-190";

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(dir.path()).unwrap();

        assert!(!cache.has_item(URL));
        cache.add_item(URL, b"{\"@context\": {}}").unwrap();
        assert!(cache.has_item(URL));
        assert_eq!(cache.get_item(URL).unwrap(), b"{\"@context\": {}}");
    }

    #[test]
    fn test_missing_entry_is_distinguishable() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(dir.path()).unwrap();

        let error = cache.get_item(URL).unwrap_err();
        assert!(matches!(error, CacheError::NotFound { .. }));
    }

    #[test]
    fn test_overwrite_is_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(dir.path()).unwrap();

        cache.add_item(URL, b"first").unwrap();
        cache.add_item(URL, b"second").unwrap();
        assert_eq!(cache.get_item(URL).unwrap(), b"second");
    }

    #[test]
    fn test_namespaces_are_independent() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(dir.path()).unwrap();

        cache.add_item(URL, b"metadata").unwrap();
        assert!(!cache.has_file(URL));

        cache.add_file(URL, b"content").unwrap();
        assert_eq!(cache.get_item(URL).unwrap(), b"metadata");
        assert_eq!(cache.get_file(URL).unwrap(), b"content");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();

        let cache = Cache::open(dir.path()).unwrap();
        cache.add_item(URL, b"metadata").unwrap();
        drop(cache);

        let cache = Cache::open(dir.path()).unwrap();
        assert!(cache.has_item(URL));
        assert_eq!(cache.get_item(URL).unwrap(), b"metadata");
    }

    #[test]
    fn test_one_file_per_cached_document() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(dir.path()).unwrap();

        cache
            .add_file("https://example.org/doc/1.txt", b"one")
            .unwrap();
        cache
            .add_file("https://example.org/doc/2.txt", b"two")
            .unwrap();
        // overwrite must not add a second file
        cache
            .add_file("https://example.org/doc/1.txt", b"one again")
            .unwrap();

        let listing: Vec<_> = fs::read_dir(cache.files_dir()).unwrap().collect();
        assert_eq!(listing.len(), 2);
    }

    #[test]
    fn test_binary_content_integrity() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(dir.path()).unwrap();

        let payload: Vec<u8> = b"\r\n\r\n\r\nSydney, New So\x00\xff\xfe".to_vec();
        cache.add_file(URL, &payload).unwrap();
        assert_eq!(cache.get_file(URL).unwrap(), payload);
    }

    #[test]
    fn test_distinct_urls_never_collide() {
        assert_ne!(
            entry_file_name("https://example.org/doc/a"),
            entry_file_name("https://example.org/doc/b")
        );
        // deterministic across calls
        assert_eq!(entry_file_name(URL), entry_file_name(URL));
    }
}
