//! # filepack Core Library
//!
//! This crate resolves a set of source files into archive entry names and
//! packs them into a compressed ZIP archive.
//!
//! It is designed to be used by the `filepack` command-line application, but
//! its public API can also be used programmatically.
//!
//! ## Key Modules
//!
//! - [`file_list`]: Resolves a directory tree or a JSON manifest into a [`FileList`].
//! - [`pack`]: The packing pipeline that streams every entry into the archive.
//! - [`archive`]: The archive-container capability and its ZIP implementation.
//! - [`inspect`]: Reads back the entries of a produced archive.
//! - [`error`]: The error taxonomy and exit codes.
//!
//! ## Examples
//!
//! ```no_run
//! use filepack::{FileList, PackOptions};
//! use std::path::Path;
//!
//! let files = FileList::resolve(Path::new("assets"))?;
//! let summary = filepack::pack(&files, Path::new("assets.zip"), PackOptions::default())?;
//! println!("{} entries", summary.entries);
//! # Ok::<(), filepack::PackError>(())
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod error;
pub mod file_list;
pub mod inspect;
pub mod pack;
pub mod progress;

pub use archive::{ArchiveWriter, Compression, Container};
pub use error::{ErrorKind, PackError};
pub use file_list::FileList;
pub use pack::{pack, PackOptions, PackSummary, Packer};
