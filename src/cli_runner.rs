//! Command dispatch for the `parzip` binary.
//!
//! Keeps `main.rs` down to exit-code handling so the same logic can be driven
//! from tests or another front end.

use crate::cli::{self, Args, Commands};
use crate::config::{PackOptions, UnpackOptions};
use crate::{compress, extract};
use std::path::Path;
use std::time::Instant;
use tracing::Level;

/// Parses the command line and runs the requested command.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run()?;
    init_logging(&args);

    match &args.command {
        Commands::Pack { source, output, threads, level } => {
            ensure_exists(source)?;
            let output = output.clone().unwrap_or_else(|| cli::default_archive_name(source));
            let options = PackOptions::default().threads(*threads).compression_level(*level);

            let start = Instant::now();
            let stats = compress::pack(source, &output, &options)?;
            println!(
                "Packed {} entries ({} files, {} bytes) into {} in {:.2?}",
                stats.entries,
                stats.files,
                stats.bytes,
                output.display(),
                start.elapsed()
            );
        }
        Commands::Unpack { archive, dest, threads, max_open } => {
            ensure_exists(archive)?;
            let dest = dest.clone().unwrap_or_else(|| cli::default_dest_dir(archive));
            let options = UnpackOptions::default().threads(*threads).max_open_files(*max_open);

            let start = Instant::now();
            let stats = extract::unpack(archive, &dest, &options)?;
            println!(
                "Unpacked {} files and {} directories ({} bytes) into {} in {:.2?}",
                stats.files,
                stats.directories,
                stats.bytes,
                dest.display(),
                start.elapsed()
            );
        }
        Commands::List { archive } => {
            ensure_exists(archive)?;
            let entries = extract::list(archive)?;
            println!("{:>12} {:>12}  {}", "size", "packed", "name");
            for entry in &entries {
                println!("{:>12} {:>12}  {}", entry.size, entry.compressed_size, entry.name);
            }
            println!("{} entries", entries.len());
        }
    }

    Ok(())
}

fn init_logging(args: &Args) {
    let level = match (args.quiet, args.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, _) => Level::DEBUG,
    };
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn ensure_exists(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.symlink_metadata().is_err() {
        return Err(format!("path does not exist: {}", path.display()).into());
    }
    Ok(())
}
