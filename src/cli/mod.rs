use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::archive::Compression;
use crate::error::PackError;
use crate::pack::{PackOptions, DEFAULT_CHUNK_SIZE};

/// Environment variable consulted when `--level` is not given.
pub const LEVEL_ENV: &str = "FILEPACK_LEVEL";

/// Pack a directory tree or a JSON file manifest into a compressed archive.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// A directory to pack, or a JSON manifest of `[name, path]` pairs.
    pub input: PathBuf,

    /// The path for the output archive. A previous file there is replaced.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also store a `(listfile)` entry listing every packed entry.
    #[arg(long)]
    pub filelist: bool,

    /// Compression scheme for every entry.
    #[arg(long, value_enum, default_value_t = Compression::Deflate)]
    pub compression: Compression,

    /// Compression level (deflate 0-9, zstd 1-22). Falls back to FILEPACK_LEVEL.
    #[arg(long)]
    pub level: Option<i32>,

    /// Bytes read from each source file per archive write.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Fail before creating the archive if a manifest source is missing.
    #[arg(long)]
    pub check_sources: bool,

    /// Show a progress line on stderr.
    #[arg(long)]
    pub progress: bool,
}

impl Args {
    /// Builds the packing options, resolving the level from the environment if needed.
    pub fn pack_options(&self) -> Result<PackOptions, PackError> {
        Ok(PackOptions {
            compression: self.compression,
            level: get_level_from_opt_or_env(self.level)?,
            chunk_size: self.chunk_size,
            include_listing: self.filelist,
        })
    }
}

/// Gets the compression level from the command-line option or the `FILEPACK_LEVEL` environment variable.
///
/// Priority:
/// 1. `--level` command-line argument.
/// 2. `FILEPACK_LEVEL` environment variable.
/// 3. `Ok(None)`, leaving the scheme's default level.
pub fn get_level_from_opt_or_env(level_opt: Option<i32>) -> Result<Option<i32>, PackError> {
    if let Some(level) = level_opt {
        return Ok(Some(level));
    }
    match std::env::var(LEVEL_ENV) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| PackError::Arg(format!("{LEVEL_ENV}={raw:?} is not an integer"))),
        Err(_) => Ok(None),
    }
}

/// Parses command-line arguments without exiting the process on failure.
pub fn parse_from<I, T>(args: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args)
}
