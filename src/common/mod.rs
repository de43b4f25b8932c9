//! Common utilities and types module.
// Shared structs used by both the packing and the unpacking pipelines.

use crate::ArchiverError;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// A filesystem path discovered by the directory walk.
///
/// Only the path is kept: the preparer stats it again, so the type, mode and
/// mtime it records are the ones current at preparation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    /// Absolute, cleaned path.
    pub path: PathBuf,
    /// Position in the sorted walk; decides the commit order.
    pub seq: usize,
}

/// Lexically cleans `path`: drops `.` components and resolves `..` against the
/// preceding normal component. A `..` with nothing left to pop is kept for
/// relative paths and dropped at the filesystem root. The filesystem is never
/// consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}

/// Single-slot holder for the first error reported by any worker.
///
/// Later errors are logged and dropped.
#[derive(Debug, Default)]
pub struct FirstError {
    slot: Mutex<Option<ArchiverError>>,
}

impl FirstError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` if the slot is still empty. Returns `true` if this call filled it.
    pub fn set(&self, err: ArchiverError) -> bool {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            tracing::warn!("additional failure: {err}");
            return false;
        }
        *slot = Some(err);
        true
    }

    /// Consumes the slot: `Err` with the captured error, or `Ok(())`.
    pub fn into_result(self) -> Result<(), ArchiverError> {
        let slot = match self.slot.into_inner() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slot {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn clean_path_resolves_dots() {
        assert_eq!(clean_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(clean_path(Path::new("/out/../../etc")), PathBuf::from("/etc"));
        assert_eq!(clean_path(Path::new("../x/y")), PathBuf::from("../x/y"));
        assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(clean_path(Path::new("a//b/")), PathBuf::from("a/b"));
    }

    #[test]
    fn empty_slot_is_ok() {
        assert!(FirstError::new().into_result().is_ok());
    }

    #[test]
    fn only_first_error_is_kept() {
        let first = FirstError::new();
        assert!(first.set(ArchiverError::MissingEntry { seq: 1 }));
        assert!(!first.set(ArchiverError::MissingEntry { seq: 2 }));
        match first.into_result() {
            Err(ArchiverError::MissingEntry { seq }) => assert_eq!(seq, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn exactly_one_concurrent_writer_wins() {
        let first = Arc::new(FirstError::new());
        let winners: usize = (0..8)
            .map(|seq| {
                let first = Arc::clone(&first);
                thread::spawn(move || first.set(ArchiverError::MissingEntry { seq }))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(winners, 1);
        let first = Arc::try_unwrap(first).unwrap();
        assert!(first.into_result().is_err());
    }
}
