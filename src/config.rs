//! Per-call configuration for packing and unpacking.
//!
//! Options are plain immutable values handed to [`crate::compress::pack`] and
//! [`crate::extract::unpack`]. Nothing here is process-wide: defaults are
//! resolved from the arguments (and the environment) every time they are needed.

/// Environment variable consulted when a thread count of `0` ("auto") is requested.
pub const THREADS_ENV: &str = "PARZIP_THREADS";

/// Options for [`crate::compress::pack`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// Number of entry-preparation workers. `0` = auto-detect.
    pub threads: usize,
    /// Deflate level (0-9). `None` uses the codec default.
    pub compression_level: Option<i32>,
}

impl PackOptions {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn compression_level(mut self, level: Option<i32>) -> Self {
        self.compression_level = level;
        self
    }

    pub(crate) fn worker_count(&self) -> usize {
        resolve_threads(self.threads, env_threads())
    }
}

/// Options for [`crate::extract::unpack`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Number of restore worker threads. `0` = auto-detect.
    pub threads: usize,
    /// Cap on entries restored at the same time (each holds an archive handle
    /// and an output file). `0` = same as the worker count.
    pub max_open_files: usize,
}

impl UnpackOptions {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files;
        self
    }

    pub(crate) fn worker_count(&self) -> usize {
        resolve_threads(self.threads, env_threads())
    }

    pub(crate) fn permit_count(&self) -> usize {
        if self.max_open_files == 0 {
            self.worker_count()
        } else {
            self.max_open_files
        }
    }
}

fn env_threads() -> Option<usize> {
    std::env::var(THREADS_ENV).ok().and_then(|s| s.trim().parse().ok())
}

/// Resolves a requested thread count.
///
/// Priority:
/// 1. an explicit non-zero request;
/// 2. a positive value from [`THREADS_ENV`];
/// 3. the number of logical CPUs.
pub fn resolve_threads(requested: usize, from_env: Option<usize>) -> usize {
    if requested > 0 {
        return requested;
    }
    match from_env {
        Some(n) if n > 0 => n,
        _ => num_cpus::get().max(1),
    }
}
