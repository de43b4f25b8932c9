//! # Packing pipeline
//!
//! This module turns a source path into a ZIP archive:
//!
//! 1. **Walk**: [`crate::walk::walk_sorted`] lists every path in a stable order.
//! 2. **Prepare**: worker threads stat each path and build a [`PreparedEntry`]
//!    (header + lazy content reader) via [`prepare_entry`].
//! 3. **Commit**: [`crate::workers::run_ordered`] hands prepared entries to a
//!    single [`ArchiveWriter`] strictly in walk order.
//!
//! Preparation failures are stored in the entry instead of being raised, so the
//! operation always reports the failure that comes first in walk order.

use crate::archive::{ArchiveWriter, ContentFn, EntryHeader};
use crate::common::SourcePath;
use crate::config::PackOptions;
use crate::{fsx, walk, workers, ArchiverError, Result};

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Instant, SystemTime};
use zip::result::ZipError;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// What an entry contributes to the archive.
pub enum EntryPayload {
    /// The implicit root of a whole-directory archive; nothing is written.
    Skip,
    /// A directory entry: header only.
    Directory(EntryHeader),
    /// A file entry: header plus the function that streams its bytes.
    File(EntryHeader, ContentFn),
    /// Preparation failed; surfaced when this entry's turn to be committed comes.
    Failed(ArchiverError),
}

/// The unit produced by a preparation worker.
pub struct PreparedEntry {
    pub seq: usize,
    pub payload: EntryPayload,
}

impl std::fmt::Debug for PreparedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.payload {
            EntryPayload::Skip => "skip".to_string(),
            EntryPayload::Directory(h) => format!("dir {}", h.name),
            EntryPayload::File(h, _) => format!("file {}", h.name),
            EntryPayload::Failed(e) => format!("failed: {e}"),
        };
        write!(f, "PreparedEntry(#{} {})", self.seq, kind)
    }
}

/// How source paths map to names inside the archive.
#[derive(Debug, Clone)]
pub enum NameLayout {
    /// The source is a directory: names are relative to its parent, so every
    /// entry starts with the directory's own base name.
    Directory { root: PathBuf, base: PathBuf },
    /// The source is a single file: its entry is named by its base name only.
    SingleFile,
}

impl NameLayout {
    pub fn for_root(root: &Path, is_dir: bool) -> Self {
        if !is_dir {
            return NameLayout::SingleFile;
        }
        let base = root.parent().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
        NameLayout::Directory { root: root.to_path_buf(), base }
    }

    fn is_root(&self, path: &Path) -> bool {
        matches!(self, NameLayout::Directory { root, .. } if root == path)
    }

    /// Archive name for `path`, `/`-separated, without a trailing slash.
    pub fn entry_name(&self, path: &Path) -> String {
        let relative = match self {
            NameLayout::SingleFile => path.file_name().map(PathBuf::from).unwrap_or_default(),
            NameLayout::Directory { base, .. } => path.strip_prefix(base).unwrap_or(path).to_path_buf(),
        };
        to_archive_name(&relative)
    }
}

/// Joins the normal components of `path` with `/`, whatever the host separator is.
fn to_archive_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds the [`PreparedEntry`] for one walked path.
pub fn prepare_entry(source: &SourcePath, layout: &NameLayout) -> PreparedEntry {
    let payload = match build_payload(source, layout) {
        Ok(payload) => payload,
        Err(err) => EntryPayload::Failed(err),
    };
    PreparedEntry { seq: source.seq, payload }
}

fn build_payload(source: &SourcePath, layout: &NameLayout) -> Result<EntryPayload> {
    let path = &source.path;
    let prepare_err = |e: io::Error| ArchiverError::Prepare { path: path.clone(), source: e };

    let meta = fs::metadata(path).map_err(prepare_err)?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let mode = fsx::permission_bits(&meta);

    if meta.is_dir() {
        if layout.is_root(path) {
            return Ok(EntryPayload::Skip);
        }
        let header = EntryHeader::for_directory(layout.entry_name(path), mode, modified);
        return Ok(EntryPayload::Directory(header));
    }

    let header = EntryHeader::for_file(layout.entry_name(path), mode, modified, meta.len());
    let file_path = path.clone();
    let entry_name = header.name.clone();
    let content: ContentFn = Box::new(move |sink: &mut dyn Write| stream_file(&file_path, &entry_name, sink));
    Ok(EntryPayload::File(header, content))
}

/// Copies `path` into `sink`. Failures on the source side are `Prepare`
/// errors naming the file on disk; failures on the sink side are `Write`
/// errors naming the entry.
fn stream_file(path: &Path, entry_name: &str, sink: &mut dyn Write) -> Result<u64> {
    let prepare_err = |e: io::Error| ArchiverError::Prepare { path: path.to_path_buf(), source: e };
    let write_err = |e: io::Error| ArchiverError::Write { name: entry_name.to_string(), source: ZipError::Io(e) };

    // Dropping `file` closes it on every path out of this function.
    let mut file = File::open(path).map_err(prepare_err)?;
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(prepare_err(e)),
        };
        sink.write_all(&buf[..n]).map_err(write_err)?;
        total += n as u64;
    }
    Ok(total)
}

/// Summary of a successful pack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    /// Entries written to the archive (files and directories).
    pub entries: usize,
    pub files: usize,
    /// Uncompressed bytes streamed into the archive.
    pub bytes: u64,
}

/// Packs `source` (a file or a directory) into a new archive at `archive_path`.
///
/// Missing parent directories of `archive_path` are created. On failure the
/// archive file may exist but is incomplete and must not be used.
pub fn pack(source: &Path, archive_path: &Path, options: &PackOptions) -> Result<PackStats> {
    let started = Instant::now();
    let root = walk::absolute_clean(source)?;
    let root_meta = fs::metadata(&root).map_err(|e| ArchiverError::Traversal { path: root.clone(), source: e })?;
    let layout = NameLayout::for_root(&root, root_meta.is_dir());

    // An archive written inside the source tree must not end up in its own input.
    let archive_abs = walk::absolute_clean(archive_path)?;
    let paths = walk::walk_sorted_excluding(&root, Some(&archive_abs))?;
    let threads = options.worker_count();
    tracing::info!(
        "packing {} paths from {} with {} workers -> {}",
        paths.len(),
        root.display(),
        threads,
        archive_path.display()
    );

    let mut writer = ArchiveWriter::create(archive_path, options.compression_level)?;
    let mut stats = PackStats::default();

    workers::run_ordered(
        &paths,
        threads,
        |source| prepare_entry(source, &layout),
        |entry| commit(&mut writer, entry, &mut stats),
    )?;

    tracing::debug!("writing central directory for {} entries", writer.entry_count());
    writer.finish()?;
    tracing::info!(
        "packed {} entries ({} files, {} bytes) in {:.2?}",
        stats.entries,
        stats.files,
        stats.bytes,
        started.elapsed()
    );
    Ok(stats)
}

fn commit(writer: &mut ArchiveWriter, entry: PreparedEntry, stats: &mut PackStats) -> Result<()> {
    match entry.payload {
        EntryPayload::Skip => {}
        EntryPayload::Failed(err) => return Err(err),
        EntryPayload::Directory(header) => {
            writer.write_entry(&header, None)?;
            stats.entries += 1;
        }
        EntryPayload::File(header, content) => {
            stats.bytes += writer.write_entry(&header, Some(content))?;
            stats.entries += 1;
            stats.files += 1;
        }
    }
    Ok(())
}
