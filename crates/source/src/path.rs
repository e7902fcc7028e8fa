//! Path validation and derivation of catalog paths.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::path::{Component, Path, PathBuf};

/// Validates a path relative to a source root.
/// Ensures that paths don't escape the root (no `..` traversal).
///
/// > **Note:** Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bakery_source::validate_path;
/// assert!(validate_path("blog/2024/hello.md").is_ok());
/// assert!(validate_path("a/../file.md").is_ok()); // (never leaves the root)
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert_eq!(
///     validate_path("wrong/../blog/./hello.md/").unwrap(),
///     Path::new("blog/hello.md")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Canonical catalog key for a file: its path relative to `root`, joined
/// with `/` regardless of platform, without a leading slash.
///
/// ```
/// use bakery_source::source_uri;
/// assert_eq!(source_uri("/site/content", "/site/content/blog/hello.md").unwrap(), "blog/hello.md");
/// assert!(source_uri("/site/content", "/elsewhere/hello.md").is_err());
/// ```
pub fn source_uri(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let relative = path
        .strip_prefix(root.as_ref())
        .map_err(|_| exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf())))?;
    let relative = validate(relative)?;
    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str().ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf())))
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}

/// Relative path from a document back to the output root, one `../` per
/// directory level the document sits below the root.
///
/// ```
/// use bakery_source::root_path;
/// assert_eq!(root_path("about.md"), "");
/// assert_eq!(root_path("blog/2024/hello.md"), "../../");
/// ```
pub fn root_path(source_uri: &str) -> String {
    let depth = source_uri.trim_matches('/').matches('/').count();
    "../".repeat(depth)
}
