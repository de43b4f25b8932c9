use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Pack a file or directory into a ZIP archive.
    #[command(alias = "zip")]
    Pack {
        /// The file or directory to pack.
        #[arg(required = true)]
        source: PathBuf,

        /// The path for the output archive. Defaults to `<source name>.zip` in the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel threads to use. [0 = auto-detect based on CPU cores]
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Deflate compression level (0-9). Uses the codec default when omitted.
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..=9))]
        level: Option<i32>,
    },

    /// Extract every entry of a ZIP archive.
    #[command(alias = "unzip")]
    Unpack {
        /// The archive file to extract.
        #[arg(required = true)]
        archive: PathBuf,

        /// The destination directory. Defaults to the archive name without its extensions.
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Number of parallel threads to use. [0 = auto-detect based on CPU cores]
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Maximum number of entries restored at the same time. [0 = same as --threads]
        #[arg(long = "max-open", default_value_t = 0)]
        max_open: usize,
    },

    /// List the contents of an archive without extracting it.
    #[command(alias = "l")]
    List {
        /// The archive file to list contents of.
        #[arg(required = true)]
        archive: PathBuf,
    },
}

/// Default archive path for `pack`: the source's base name plus `.zip`.
///
/// A source without a usable base name (`/`, `..`) is packed into `archive.zip`.
pub fn default_archive_name(source: &Path) -> PathBuf {
    let base = match source.file_name() {
        Some(name) => name.to_os_string(),
        None => "archive".into(),
    };
    let mut name = base;
    name.push(".zip");
    PathBuf::from(name)
}

/// Default destination for `unpack`.
///
/// A `.zip` extension (any case) is removed first, then one more extension, so
/// `backup.tar.zip` and `backup.tar.ZIP` both extract into `backup`.
pub fn default_dest_dir(archive: &Path) -> PathBuf {
    let name = match archive.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return PathBuf::from("extracted"),
    };
    let stem = strip_extension_ci(name, ".zip");
    let stem = match stem.rfind('.') {
        Some(pos) if pos > 0 => &stem[..pos],
        _ => stem,
    };
    if stem.is_empty() {
        PathBuf::from("extracted")
    } else {
        PathBuf::from(stem)
    }
}

fn strip_extension_ci<'a>(name: &'a str, ext: &str) -> &'a str {
    let split = name.len().saturating_sub(ext.len());
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(tail)) if tail.eq_ignore_ascii_case(ext) => stem,
        _ => name,
    }
}

/// Parses command-line arguments using `clap`.
///
/// Parse failures (and `--help`/`--version`) are returned as a boxed
/// [`clap::Error`] so the caller decides how to exit.
pub fn run() -> Result<Args, Box<dyn std::error::Error>> {
    Ok(Args::try_parse()?)
}
