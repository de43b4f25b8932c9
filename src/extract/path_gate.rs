//! Zip-slip protection.
//!
//! Entry names come from the archive and are untrusted. Before anything is
//! created on disk, the destination computed from a name is cleaned lexically
//! and must stay equal to, or nested under, the extraction root.

use crate::common::clean_path;
use crate::{ArchiverError, Result};

use std::path::{Component, Path, PathBuf};

/// Returns `true` if the cleaned `candidate` equals `root` or lies under it.
///
/// Both paths are expected to be cleaned with [`clean_path`].
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    if root == Path::new(".") {
        return candidate.is_relative()
            && !matches!(candidate.components().next(), Some(Component::ParentDir));
    }
    candidate.starts_with(root)
}

/// Joins `entry_name` onto `root` and checks the result cannot escape `root`.
///
/// Returns the cleaned destination path, or [`ArchiverError::PathEscape`].
pub fn resolve(root: &Path, entry_name: &str) -> Result<PathBuf> {
    let root = clean_path(root);
    let candidate = clean_path(&root.join(entry_name));
    if is_within(&root, &candidate) {
        Ok(candidate)
    } else {
        Err(ArchiverError::PathEscape { entry: entry_name.to_string(), resolved: candidate })
    }
}
