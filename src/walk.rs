//! Deterministic directory walk.
//!
//! The walk yields the root itself plus every path below it, sorted by the
//! full path (byte order of the OS string). Sorting the complete list, rather
//! than the children of each directory, is what makes two walks of the same
//! tree produce the same sequence numbers and therefore byte-identical
//! archives.

use crate::common::{clean_path, SourcePath};
use crate::{ArchiverError, Result};

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Turns `path` into an absolute, lexically cleaned path.
pub fn absolute_clean(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(clean_path(path));
    }
    let cwd = std::env::current_dir().map_err(|e| ArchiverError::io(path, e))?;
    Ok(clean_path(&cwd.join(path)))
}

/// Walks `root` and returns every reachable path with its sequence number.
///
/// Symlinks are not followed. Any entry that cannot be read aborts the walk
/// with [`ArchiverError::Traversal`].
pub fn walk_sorted(root: &Path) -> Result<Vec<SourcePath>> {
    walk_sorted_excluding(root, None)
}

/// Like [`walk_sorted`], but leaves out `excluded` (an absolute, cleaned path)
/// before sequence numbers are assigned.
///
/// Packing uses this to keep the output archive out of its own input when it
/// is written inside the source tree.
pub fn walk_sorted_excluding(root: &Path, excluded: Option<&Path>) -> Result<Vec<SourcePath>> {
    let mut found: Vec<PathBuf> = Vec::with_capacity(1024);
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            ArchiverError::Traversal { path, source: io::Error::from(err) }
        })?;
        if excluded == Some(entry.path()) {
            tracing::debug!("skipping {}", entry.path().display());
            continue;
        }
        found.push(entry.into_path());
    }
    found.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

    tracing::debug!("walked {} paths under {}", found.len(), root.display());
    Ok(found
        .into_iter()
        .enumerate()
        .map(|(seq, path)| SourcePath { path, seq })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walk_is_sorted_by_full_path() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("a-c")).unwrap();
        fs::write(root.join("a/b/x.txt"), b"x").unwrap();
        fs::write(root.join("a-c/y.txt"), b"y").unwrap();
        fs::write(root.join("z.txt"), b"z").unwrap();

        let walked = walk_sorted(&root).unwrap();
        let rel: Vec<String> = walked
            .iter()
            .map(|s| s.path.strip_prefix(tmp.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        // '-' sorts before '/', so "root/a-c" comes before "root/a/b".
        assert_eq!(
            rel,
            vec![
                "root",
                "root/a",
                "root/a-c",
                "root/a-c/y.txt",
                "root/a/b",
                "root/a/b/x.txt",
                "root/z.txt",
            ]
        );
        for (i, s) in walked.iter().enumerate() {
            assert_eq!(s.seq, i);
        }
    }

    #[test]
    fn walk_of_a_file_is_just_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("lonely.bin");
        fs::write(&file, [1, 2, 3]).unwrap();
        let walked = walk_sorted(&file).unwrap();
        assert_eq!(walked.len(), 1);
        assert_eq!(walked[0].path, file);
    }

    #[test]
    fn missing_root_is_a_traversal_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = walk_sorted(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ArchiverError::Traversal { .. }));
    }

    #[test]
    fn excluded_path_is_left_out_before_numbering() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        fs::write(tmp.path().join("out.zip"), b"stale").unwrap();
        fs::write(tmp.path().join("z.txt"), b"z").unwrap();

        let excluded = tmp.path().join("out.zip");
        let walked = walk_sorted_excluding(tmp.path(), Some(&excluded)).unwrap();
        assert_eq!(walked.len(), 3);
        assert!(walked.iter().all(|s| s.path != excluded));
        assert_eq!(walked[2].path, tmp.path().join("z.txt"));
        assert_eq!(walked[2].seq, 2);
    }

    #[test]
    fn repeated_walks_are_identical() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..20 {
            fs::write(tmp.path().join(format!("f{i}")), b"").unwrap();
        }
        assert_eq!(walk_sorted(tmp.path()).unwrap(), walk_sorted(tmp.path()).unwrap());
    }
}
