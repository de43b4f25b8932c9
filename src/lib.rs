//! # parzip Core Library
//!
//! This crate provides the core functionality for the `parzip` archiver: a ZIP
//! packer that prepares entries in parallel but writes them in a deterministic
//! order, and an unpacker that restores entries in parallel with a bounded
//! number of open files.
//!
//! ## Key Modules
//!
//! - [`archive`]: Container codec over the `zip` crate (headers, writer, reader).
//! - [`compress`]: The packing pipeline, [`compress::pack`].
//! - [`extract`]: The unpacking pipeline, [`extract::unpack`] and [`extract::list`].
//! - [`workers`]: The ordered worker pool used for packing.
//! - [`walk`]: Deterministic source tree traversal.
//! - [`config`]: Per-call options.
//!
//! ## Examples
//!
//! ```no_run
//! use parzip::config::{PackOptions, UnpackOptions};
//! use std::path::Path;
//!
//! # fn main() -> parzip::Result<()> {
//! parzip::compress::pack(Path::new("photos"), Path::new("photos.zip"), &PackOptions::default())?;
//! parzip::extract::unpack(Path::new("photos.zip"), Path::new("restored"), &UnpackOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod compress;
pub mod config;
pub mod error;
pub mod extract;
pub mod walk;
pub mod workers;

// Cross-platform filesystem helpers
pub mod fsx;

pub use error::{ArchiverError, Result};
