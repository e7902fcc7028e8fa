//! Depth-first enumeration of a source tree.

use crate::error::{ErrorKind, Result};
use crate::file::SourceFile;
use crate::path::source_uri;
use async_stream::stream;
use futures::{Stream, TryStreamExt};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use time::OffsetDateTime;
use tokio::fs;

pub type SourceStream<'a> = Pin<Box<dyn Stream<Item = Result<SourceFile>> + Send + 'a>>;

enum WalkEntry {
    File(SourceFile),
    Descend(PathBuf),
    Skip,
}

/// Walks a source tree rooted at a directory.
///
/// - Entries are visited in sorted name order; files of a directory are
///   yielded before its subdirectories are descended into.
/// - Hidden entries (name starting with `.`) are skipped unless
///   [`include_hidden`](Self::include_hidden) is set.
/// - A directory containing the [ignore marker](Self::ignore_file) is skipped
///   along with everything beneath it. This applies to the root too.
/// - A root that doesn't exist is an empty tree, not an error.
///
/// # Examples
///
/// ```no_run
/// use bakery_source::Walker;
/// use futures::TryStreamExt;
///
/// # async fn example() -> bakery_source::error::Result<()> {
/// let walker = Walker::new("/site/content").ignore_file(".bakeignore");
/// let mut files = walker.stream(|path| path.extension().is_some_and(|ext| ext == "md"));
/// while let Some(file) = files.try_next().await? {
///     println!("{} ({} bytes)", file.source_uri, file.size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    include_hidden: bool,
    ignore_file: Option<String>,
}
impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_hidden: false,
            ignore_file: None,
        }
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn ignore_file(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.ignore_file = (!name.is_empty()).then_some(name);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream every file accepted by `filter`.
    ///
    /// Errors reading one directory or entry are yielded without ending the
    /// stream.
    pub fn stream<'a, F>(&'a self, filter: F) -> SourceStream<'a>
    where
        F: Fn(&Path) -> bool + Send + Sync + 'a,
    {
        let mut stack = vec![self.root.clone()];
        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let children = match Self::read_dir_sorted(&current).await {
                    Ok(children) => children,
                    Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => continue 'dirs,
                    Err(err) => {
                        yield Err(err);
                        continue 'dirs;
                    },
                };
                if let Some(marker) = &self.ignore_file
                    && children.iter().any(|(name, _)| name.as_os_str() == marker.as_str())
                {
                    tracing::debug!(directory = %current.display(), "ignore marker found; skipping directory");
                    continue 'dirs;
                }
                let mut descend = Vec::new();
                for (name, path) in children {
                    if !self.include_hidden && name.as_encoded_bytes().starts_with(b".") {
                        continue;
                    }
                    match self.process_entry(path, &filter).await {
                        Ok(WalkEntry::File(file)) => yield Ok(file),
                        Ok(WalkEntry::Descend(dir)) => descend.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(err) => yield Err(err),
                    }
                }
                // Pushed in reverse so that the alphabetically-first
                // directory is popped (descended into) first.
                stack.extend(descend.into_iter().rev());
            }
        })
    }

    /// Collect [`stream`](Self::stream) into a [`Vec`], failing on the first error.
    pub async fn list<F>(&self, filter: F) -> Result<Vec<SourceFile>>
    where
        F: Fn(&Path) -> bool + Send + Sync,
    {
        self.stream(filter).try_collect().await
    }

    async fn read_dir_sorted(dir: &Path) -> Result<Vec<(OsString, PathBuf)>> {
        let mut entries = fs::read_dir(dir).await.map_err(|e| ErrorKind::from_io(e, dir))?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, dir))? {
            children.push((entry.file_name(), entry.path()));
        }
        children.sort();
        Ok(children)
    }

    async fn process_entry<F>(&self, path: PathBuf, filter: &F) -> Result<WalkEntry>
    where
        F: Fn(&Path) -> bool,
    {
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            // Most likely a broken symlink; drop it silently.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(WalkEntry::Skip),
            Err(err) => exn::bail!(ErrorKind::from_io(err, &path)),
        };
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if !metadata.is_file() || !filter(&path) {
            return Ok(WalkEntry::Skip);
        }
        let uri = source_uri(&self.root, &path)?;
        let modified = metadata.modified().map(OffsetDateTime::from).map_err(ErrorKind::Io)?;
        Ok(WalkEntry::File(SourceFile::new(path, uri, metadata.len(), modified)))
    }
}
