//! Cross-platform filesystem helpers.
//!
//! On Unix the permission bits are read from and applied to the real file
//! mode. On other platforms they are ignored: archives created there carry a
//! default mode, and extraction leaves the platform default in place.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Permission bits used when the platform (or the archive) has none to offer.
pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const DEFAULT_DIR_MODE: u32 = 0o755;

#[cfg(unix)]
/// Permission bits (`rwxrwxrwx`) of `meta`.
pub fn permission_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
/// Permission bits of `meta`; a fixed default off Unix.
pub fn permission_bits(meta: &Metadata) -> u32 {
    if meta.is_dir() {
        DEFAULT_DIR_MODE
    } else {
        DEFAULT_FILE_MODE
    }
}

#[cfg(unix)]
/// Set POSIX permission bits on Unix.
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
/// No-op off Unix: POSIX permission bits are not preserved.
pub fn set_unix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Creates (or truncates) `path` for writing, requesting `mode` on creation.
pub fn create_with_mode(path: &Path, mode: u32) -> io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}
