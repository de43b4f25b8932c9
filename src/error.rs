use std::path::PathBuf;

/// The primary error type for all operations in the `parzip` crate.
///
/// Every variant that stems from the filesystem or the container carries the
/// path (or entry name) it happened on, so a single error is enough for the
/// caller to tell the user what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum ArchiverError {
    /// A path under the source root could not be read during the directory walk.
    #[error("cannot traverse '{}': {source}", path.display())]
    Traversal { path: PathBuf, source: std::io::Error },

    /// A single entry could not be stat'ed or opened while preparing it for packing.
    #[error("cannot prepare '{}': {source}", path.display())]
    Prepare { path: PathBuf, source: std::io::Error },

    /// Writing an entry (or the trailer) into the archive failed.
    #[error("cannot write entry '{name}': {source}")]
    Write { name: String, source: zip::result::ZipError },

    /// An entry name would resolve outside the extraction root.
    #[error("zip slip detected: entry '{entry}' resolves to '{}'", resolved.display())]
    PathEscape { entry: String, resolved: PathBuf },

    /// Restoring a single entry during extraction failed.
    #[error("cannot restore '{}': {source}", path.display())]
    Restore { path: PathBuf, source: std::io::Error },

    /// The archive could not be opened or its central directory could not be parsed.
    #[error("cannot read archive '{}': {source}", path.display())]
    Container { path: PathBuf, source: zip::result::ZipError },

    /// The result stream ended before entry `seq` was produced.
    #[error("entry #{seq} was never produced by the preparation workers")]
    MissingEntry { seq: usize },

    /// A generic I/O error outside of a specific entry (creating the output, the root directory, ...).
    #[error("I/O error on path '{}': {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    /// Bounded work was requested with no permits to hand out.
    #[error("cannot run {tasks} tasks with an empty permit pool")]
    NoPermits { tasks: usize },

    /// A worker thread panicked.
    #[error("a worker thread panicked")]
    WorkerPanicked,

    /// The extraction thread pool could not be built.
    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ArchiverError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiverError::Io { path: path.into(), source }
    }

    pub(crate) fn restore(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiverError::Restore { path: path.into(), source }
    }
}

pub type Result<T, E = ArchiverError> = std::result::Result<T, E>;
