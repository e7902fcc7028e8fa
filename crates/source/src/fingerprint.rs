//! Content-addressable digests of files and directory trees.
//!
//! Files are streamed through BLAKE3 with a fixed-size buffer. Directories are
//! hashed by visiting every descendant in sorted name order and feeding each
//! file's bytes into **one** running hasher. It's a flat concatenation rather
//! than a Merkle tree, so renaming a file without changing any bytes (and
//! without changing the visiting order) doesn't change the digest.
//!
//! An empty digest means "could not be computed" and never matches anything,
//! see [`is_match`].

use crate::error::{ErrorKind, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::instrument;

const BUFFER_SIZE: usize = 8 * 1024;

/// Digest a file or directory tree, returning an empty string on any I/O
/// failure.
pub fn digest(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    match try_digest(path) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = ?err, "could not fingerprint; treating as changed");
            String::new()
        },
    }
}

/// Digest a file or directory tree, propagating I/O failures.
#[instrument(level = "trace", skip_all, fields(path = %path.as_ref().display()))]
pub fn try_digest(path: impl AsRef<Path>) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    feed(&mut hasher, path.as_ref())?;
    Ok(hasher.finalize().to_string())
}

/// [`digest`], run on the blocking thread pool.
pub async fn digest_async(path: impl Into<PathBuf>) -> String {
    let path = path.into();
    // A panicked hashing task is just another way of failing to read the file.
    tokio::task::spawn_blocking(move || digest(path)).await.unwrap_or_default()
}

/// Whether a stored digest and a freshly computed one describe the same
/// content. Empty digests never match, not even each other.
pub fn is_match(stored: &str, current: &str) -> bool {
    !stored.is_empty() && !current.is_empty() && stored == current
}

fn feed(hasher: &mut blake3::Hasher, path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| ErrorKind::from_io(e, path))?;
    if metadata.is_dir() {
        let mut children = fs::read_dir(path)
            .map_err(|e| ErrorKind::from_io(e, path))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| ErrorKind::from_io(e, path))?;
        children.sort();
        for child in children {
            feed(hasher, &child)?;
        }
        return Ok(());
    }
    let mut file = File::open(path).map_err(|e| ErrorKind::from_io(e, path))?;
    let mut buffer = [0u8; BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer).map_err(|e| ErrorKind::from_io(e, path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(())
}
