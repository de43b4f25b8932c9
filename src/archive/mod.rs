//! # Container codec
//!
//! Thin adapter over the `zip` crate. The packing and unpacking pipelines talk
//! to the container exclusively through this module:
//!
//! - [`EntryHeader`] + [`ArchiveWriter::write_entry`] append one entry at a time;
//! - [`ArchiveReader`] parses the central directory once into a list of
//!   [`EntryInfo`] values, and hands out independent [`ArchiveHandle`]s, each of
//!   which can stream-decompress any entry without touching the others.
//!
//! ZIP stores modification times as DOS date/time without a time zone; they
//! are written and read back as local time, which is what common ZIP tools do.

use crate::{ArchiverError, Result};

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

pub use zip::CompressionMethod;

/// Entries at least this large are written with ZIP64 extensions.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Streams an entry's content into the archive sink. Returns the number of bytes copied.
///
/// The function classifies its own failures: problems with its source are
/// [`ArchiverError::Prepare`], problems writing into the sink are
/// [`ArchiverError::Write`].
pub type ContentFn = Box<dyn FnOnce(&mut dyn Write) -> Result<u64> + Send>;

/// Everything the container needs to know about an entry before its content.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryHeader {
    /// Name inside the archive, `/`-separated. Directory names end with `/`.
    pub name: String,
    pub method: CompressionMethod,
    /// Permission bits (`rwxrwxrwx`).
    pub mode: u32,
    pub modified: NaiveDateTime,
    /// Uncompressed size in bytes; `0` for directories.
    pub size: u64,
}

impl EntryHeader {
    /// Header for a directory entry. A trailing `/` is appended if missing.
    pub fn for_directory(name: impl Into<String>, mode: u32, modified: SystemTime) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            method: CompressionMethod::Stored,
            mode,
            modified: local_naive(modified),
            size: 0,
        }
    }

    /// Header for a deflated file entry.
    pub fn for_file(name: impl Into<String>, mode: u32, modified: SystemTime, size: u64) -> Self {
        Self {
            name: name.into(),
            method: CompressionMethod::Deflated,
            mode,
            modified: local_naive(modified),
            size,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Sequential writer for a ZIP archive. Entries are appended in call order.
pub struct ArchiveWriter {
    zip: ZipWriter<BufWriter<File>>,
    path: PathBuf,
    level: Option<i32>,
    entries: usize,
}

impl ArchiveWriter {
    /// Creates (or truncates) the archive at `path`, creating missing parent directories.
    pub fn create(path: &Path, level: Option<i32>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ArchiverError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| ArchiverError::io(path, e))?;
        Ok(Self {
            zip: ZipWriter::new(BufWriter::new(file)),
            path: path.to_path_buf(),
            level,
            entries: 0,
        })
    }

    /// Appends one entry. Without `content`, a header ending in `/` becomes a
    /// directory entry and any other header an empty file.
    pub fn write_entry(&mut self, header: &EntryHeader, content: Option<ContentFn>) -> Result<u64> {
        let write_err = |source: ZipError| ArchiverError::Write { name: header.name.clone(), source };

        let mut options = FileOptions::default()
            .compression_method(header.method)
            .last_modified_time(to_zip_time(&header.modified))
            .unix_permissions(header.mode);
        if header.method == CompressionMethod::Deflated {
            options = options.compression_level(self.level);
        }

        let mut written = 0;
        if content.is_none() && header.is_dir() {
            self.zip.add_directory(header.name.as_str(), options).map_err(write_err)?;
        } else {
            options = options.large_file(header.size >= ZIP64_THRESHOLD);
            self.zip.start_file(header.name.as_str(), options).map_err(write_err)?;
            if let Some(content) = content {
                written = content(&mut self.zip)?;
            }
        }
        self.entries += 1;
        tracing::debug!("committed #{} {} ({} bytes)", self.entries, header.name, written);
        Ok(written)
    }

    /// Number of entries written so far.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Writes the central directory and flushes the file.
    pub fn finish(mut self) -> Result<()> {
        let path = self.path.clone();
        let mut inner = self
            .zip
            .finish()
            .map_err(|source| ArchiverError::Container { path: path.clone(), source })?;
        inner.flush().map_err(|e| ArchiverError::io(&path, e))?;
        Ok(())
    }
}

/// One entry of an opened archive, as listed in its central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Position in the central directory.
    pub index: usize,
    /// Raw, untrusted entry name.
    pub name: String,
    pub is_dir: bool,
    /// Unix mode bits, if the archive recorded them.
    pub mode: Option<u32>,
    pub modified: Option<NaiveDateTime>,
    pub size: u64,
    pub compressed_size: u64,
}

impl EntryInfo {
    /// Permission bits to restore, falling back to a sane default.
    pub fn permission_bits(&self) -> u32 {
        match self.mode {
            Some(mode) => mode & 0o777,
            None if self.is_dir => crate::fsx::DEFAULT_DIR_MODE,
            None => crate::fsx::DEFAULT_FILE_MODE,
        }
    }

    /// Modification time as a `SystemTime`, if it maps to a valid local time.
    pub fn modified_system_time(&self) -> Option<SystemTime> {
        let naive = self.modified?;
        Local.from_local_datetime(&naive).earliest().map(SystemTime::from)
    }
}

/// An opened archive: the parsed entry list plus the means to open more handles.
#[derive(Debug)]
pub struct ArchiveReader {
    path: PathBuf,
    entries: Vec<EntryInfo>,
}

impl ArchiveReader {
    /// Opens `path` and reads its central directory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut handle = ArchiveHandle::open(path)?;
        let zip = &mut handle.zip;
        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let file = zip
                .by_index_raw(index)
                .map_err(|source| ArchiverError::Container { path: path.to_path_buf(), source })?;
            entries.push(EntryInfo {
                index,
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                mode: file.unix_mode(),
                modified: from_zip_time(file.last_modified()),
                size: file.size(),
                compressed_size: file.compressed_size(),
            });
        }
        Ok(Self { path: path.to_path_buf(), entries })
    }

    /// Entries in central-directory order.
    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    /// Opens an independent read handle on the same archive file.
    pub fn open_handle(&self) -> Result<ArchiveHandle> {
        ArchiveHandle::open(&self.path)
    }
}

/// A private file descriptor + central directory over an archive.
pub struct ArchiveHandle {
    zip: ZipArchive<BufReader<File>>,
}

impl ArchiveHandle {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ArchiverError::io(path, e))?;
        let zip = ZipArchive::new(BufReader::new(file))
            .map_err(|source| ArchiverError::Container { path: path.to_path_buf(), source })?;
        Ok(Self { zip })
    }

    /// Opens the decompressed byte stream of entry `index`.
    pub fn open_entry(&mut self, index: usize) -> io::Result<impl Read + '_> {
        self.zip.by_index(index).map_err(io::Error::from)
    }
}

fn local_naive(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

fn to_zip_time(time: &NaiveDateTime) -> zip::DateTime {
    let year = u16::try_from(time.year()).unwrap_or(0);
    zip::DateTime::from_date_and_time(
        year,
        time.month() as u8,
        time.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
    )
    // DOS time cannot represent dates before 1980 or after 2107.
    .unwrap_or_default()
}

fn from_zip_time(time: zip::DateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(time.year().into(), time.month().into(), time.day().into())?
        .and_hms_opt(time.hour().into(), time.minute().into(), time.second().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn text(s: &'static str) -> ContentFn {
        Box::new(move |w: &mut dyn Write| {
            w.write_all(s.as_bytes())
                .map_err(|e| ArchiverError::Write { name: "test".into(), source: ZipError::Io(e) })?;
            Ok(s.len() as u64)
        })
    }

    #[test]
    fn write_then_list_and_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/out.zip");
        let now = SystemTime::now();

        let mut writer = ArchiveWriter::create(&path, None).unwrap();
        writer.write_entry(&EntryHeader::for_directory("root", 0o755, now), None).unwrap();
        let n = writer
            .write_entry(&EntryHeader::for_file("root/a.txt", 0o640, now, 5), Some(text("hello")))
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(writer.entry_count(), 2);
        writer.finish().unwrap();

        let reader = ArchiveReader::open(&path).unwrap();
        let entries = reader.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "root/");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "root/a.txt");
        assert_eq!(entries[1].permission_bits(), 0o640);
        assert_eq!(entries[1].size, 5);

        let mut handle = reader.open_handle().unwrap();
        let mut body = String::new();
        handle.open_entry(1).unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "hello");
    }

    #[test]
    fn directory_header_gets_trailing_slash() {
        let h = EntryHeader::for_directory("a/b", 0o755, SystemTime::now());
        assert_eq!(h.name, "a/b/");
        assert!(h.is_dir());
        assert_eq!(h.method, CompressionMethod::Stored);
    }

    #[test]
    fn dos_time_roundtrip_keeps_even_seconds() {
        let naive = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap().and_hms_opt(13, 45, 22).unwrap();
        assert_eq!(from_zip_time(to_zip_time(&naive)), Some(naive));
    }

    #[test]
    fn out_of_range_time_falls_back_to_dos_epoch() {
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
        let header = EntryHeader::for_file("x", 0o644, old, 0);
        let dos = to_zip_time(&header.modified);
        assert_eq!((dos.year(), dos.month(), dos.day()), (1980, 1, 1));
    }
}
