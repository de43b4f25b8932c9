//! # Extraction Module
//!
//! Restores an archive into a directory tree.
//!
//! Directories are created first, sequentially, so that no file worker can
//! race ahead of its parent. File entries are then restored by a bounded
//! worker pool: each worker needs a permit (an independent archive handle)
//! before touching the filesystem, which caps open descriptors and
//! decompression buffers regardless of the archive's size. A failing entry
//! does not stop the others; the first failure is reported once all workers
//! are done.

pub mod path_gate;
pub mod permits;

use crate::archive::{ArchiveHandle, ArchiveReader, EntryInfo};
use crate::common::FirstError;
use crate::config::UnpackOptions;
use crate::{fsx, walk, ArchiverError, Result};
use permits::PermitPool;

use filetime::FileTime;
use rayon::prelude::*;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Summary of a successful unpack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackStats {
    pub directories: usize,
    pub files: usize,
    /// Decompressed bytes written to disk.
    pub bytes: u64,
}

/// Lists the entries of an archive in central-directory order.
pub fn list(archive_path: &Path) -> Result<Vec<EntryInfo>> {
    Ok(ArchiveReader::open(archive_path)?.entries().to_vec())
}

/// Extracts every entry of `archive_path` under `dest`.
///
/// `dest` and its missing parents are created. Any entry whose name would
/// resolve outside `dest` fails the operation with [`ArchiverError::PathEscape`]
/// and is never written.
pub fn unpack(archive_path: &Path, dest: &Path, options: &UnpackOptions) -> Result<UnpackStats> {
    let started = Instant::now();
    let reader = ArchiveReader::open(archive_path)?;
    fs::create_dir_all(dest).map_err(|e| ArchiverError::io(dest, e))?;
    let root = walk::absolute_clean(dest)?;

    let (dirs, files): (Vec<&EntryInfo>, Vec<&EntryInfo>) = reader.entries().iter().partition(|e| e.is_dir);

    // Directory pre-pass: cheap, sequential, idempotent.
    for entry in &dirs {
        let target = path_gate::resolve(&root, &entry.name)?;
        fs::create_dir_all(&target).map_err(|e| ArchiverError::restore(&target, e))?;
    }

    let mut stats = UnpackStats { directories: dirs.len(), files: files.len(), bytes: 0 };
    if files.is_empty() {
        return Ok(stats);
    }

    let workers = options.worker_count();
    let cap = options.permit_count().clamp(1, files.len());
    tracing::info!(
        "unpacking {} files and {} directories from {} with {} workers ({} permits) -> {}",
        files.len(),
        dirs.len(),
        archive_path.display(),
        workers,
        cap,
        root.display()
    );

    let handles = (0..cap).map(|_| reader.open_handle()).collect::<Result<Vec<_>>>()?;
    let permits = PermitPool::new(handles);
    let bytes = AtomicU64::new(0);

    run_bounded(&files, workers, &permits, |handle, entry| {
        let written = restore_file(handle, entry, &root)?;
        bytes.fetch_add(written, Ordering::Relaxed);
        Ok(())
    })?;

    stats.bytes = bytes.into_inner();
    tracing::info!(
        "unpacked {} files ({} bytes) in {:.2?}",
        stats.files,
        stats.bytes,
        started.elapsed()
    );
    Ok(stats)
}

/// Runs `work` for every task on a pool of `workers` threads, with at most
/// `permits.capacity()` tasks in progress at once.
///
/// Every task runs even if some fail; the first recorded failure is returned
/// after all of them have finished. An empty permit pool with pending tasks is
/// rejected up front with [`ArchiverError::NoPermits`].
pub fn run_bounded<T, H, F>(tasks: &[T], workers: usize, permits: &PermitPool<H>, work: F) -> Result<()>
where
    T: Sync,
    H: Send,
    F: Fn(&mut H, &T) -> Result<()> + Sync,
{
    if tasks.is_empty() {
        return Ok(());
    }
    if permits.capacity() == 0 {
        return Err(ArchiverError::NoPermits { tasks: tasks.len() });
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("parzip-restore-{i}"))
        .build()?;

    let first_error = FirstError::new();
    pool.install(|| {
        tasks.par_iter().for_each(|task| {
            let permit = permits.acquire();
            let mut resource = permit.resource();
            if let Err(err) = work(&mut *resource, task) {
                if first_error.set(err) {
                    tracing::debug!("first extraction failure recorded");
                }
            }
        });
    });
    first_error.into_result()
}

/// Restores a single file entry. Returns the number of bytes written.
fn restore_file(handle: &mut ArchiveHandle, entry: &EntryInfo, root: &Path) -> Result<u64> {
    let target = path_gate::resolve(root, &entry.name)?;
    let restore_err = |e: io::Error| ArchiverError::restore(&target, e);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ArchiverError::restore(parent, e))?;
    }

    let mut reader = handle.open_entry(entry.index).map_err(restore_err)?;
    let mode = entry.permission_bits();
    let mut out = BufWriter::new(fsx::create_with_mode(&target, mode).map_err(restore_err)?);
    let written = io::copy(&mut reader, &mut out).map_err(restore_err)?;
    out.flush().map_err(restore_err)?;
    drop(out);

    // The creation mode is filtered by the umask; apply the recorded bits exactly.
    fsx::set_unix_permissions(&target, mode).map_err(restore_err)?;

    if let Some(modified) = entry.modified_system_time() {
        if let Err(e) = filetime::set_file_mtime(&target, FileTime::from_system_time(modified)) {
            tracing::warn!("cannot set modification time of {}: {}", target.display(), e);
        }
    }
    tracing::debug!("restored {} ({} bytes)", target.display(), written);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn every_task_runs_even_after_a_failure() {
        let tasks: Vec<usize> = (0..50).collect();
        let permits = PermitPool::new(vec![(), ()]);
        let ran = AtomicUsize::new(0);
        let err = run_bounded(&tasks, 4, &permits, |_, &t| {
            ran.fetch_add(1, Ordering::SeqCst);
            if t % 10 == 3 {
                return Err(ArchiverError::MissingEntry { seq: t });
            }
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, ArchiverError::MissingEntry { seq } if seq % 10 == 3));
        assert_eq!(ran.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn empty_permit_pool_with_tasks_is_rejected() {
        let permits: PermitPool<()> = PermitPool::new(Vec::new());
        let tasks = vec![1u8, 2, 3];
        let err = run_bounded(&tasks, 2, &permits, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, ArchiverError::NoPermits { tasks: 3 }));
    }

    #[test]
    fn no_tasks_is_ok() {
        let permits: PermitPool<()> = PermitPool::new(Vec::new());
        let tasks: Vec<u8> = Vec::new();
        run_bounded(&tasks, 2, &permits, |_, _| Ok(())).unwrap();
    }
}
