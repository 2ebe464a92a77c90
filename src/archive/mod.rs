//! # Archive Container
//!
//! The packer talks to the output archive only through the [`Container`]
//! trait: create an entry with an announced size, write its bytes in chunks,
//! finish it, then flush and close the whole archive. [`ArchiveWriter`] is
//! the ZIP implementation used by the CLI.
//!
//! `ArchiveWriter` never writes to the final path directly. The archive is
//! built in a hidden temporary file next to the target and renamed onto it by
//! [`Container::close`]. Dropping the writer at any earlier point deletes the
//! temporary file, so a failed run leaves nothing behind.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Output buffer for the temporary archive file.
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// Compression scheme requested for an entry.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// DEFLATE (zlib family). Readable by every ZIP tool.
    #[default]
    Deflate,
    /// Zstandard.
    Zstd,
    /// No compression.
    Store,
}

impl Compression {
    pub(crate) fn method(self) -> CompressionMethod {
        match self {
            Compression::Deflate => CompressionMethod::Deflated,
            Compression::Zstd => CompressionMethod::Zstd,
            Compression::Store => CompressionMethod::Stored,
        }
    }

    /// Levels accepted for this scheme, or `None` when levels are not supported.
    pub fn level_range(self) -> Option<std::ops::RangeInclusive<i32>> {
        match self {
            Compression::Deflate => Some(0..=9),
            Compression::Zstd => Some(1..=22),
            Compression::Store => None,
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Compression::Deflate => "deflate",
            Compression::Zstd => "zstd",
            Compression::Store => "store",
        })
    }
}

/// The archive-container capability used by the packer.
///
/// Calls must follow the lifecycle `create_entry → write_entry* →
/// finish_entry`, repeated per entry, then `flush` and `close`. Out-of-order
/// calls fail.
pub trait Container {
    /// Opens a new entry that will receive exactly `size` bytes.
    fn create_entry(&mut self, name: &str, size: u64, compression: Compression) -> io::Result<()>;

    /// Appends a chunk to the open entry.
    fn write_entry(&mut self, chunk: &[u8], compression: Compression) -> io::Result<()>;

    /// Completes the open entry. Fails if fewer bytes than announced were written.
    fn finish_entry(&mut self) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Finalizes the archive and returns its size in bytes.
    fn close(self) -> io::Result<u64>
    where
        Self: Sized;
}

/// Bookkeeping for the entry currently being written.
#[derive(Debug)]
struct OpenEntry {
    name: String,
    announced: u64,
    written: u64,
    compression: Compression,
}

/// ZIP archive writer backed by a temporary file next to the target path.
pub struct ArchiveWriter {
    writer: ZipWriter<BufWriter<NamedTempFile>>,
    target: PathBuf,
    level: Option<i32>,
    open: Option<OpenEntry>,
    finished: Vec<String>,
}

impl ArchiveWriter {
    /// Starts a new archive destined for `target`.
    ///
    /// `capacity` is the expected number of entries. `level` applies to every
    /// compressed entry; `None` uses the scheme's default.
    pub fn create(target: &Path, capacity: usize, level: Option<i32>) -> io::Result<Self> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".filepack-")
            .suffix(".part")
            .tempfile_in(dir)?;
        debug!("staging archive for '{}' in '{}'", target.display(), temp.path().display());

        Ok(Self {
            writer: ZipWriter::new(BufWriter::with_capacity(WRITE_BUFFER_SIZE, temp)),
            target: target.to_path_buf(),
            level,
            open: None,
            finished: Vec::with_capacity(capacity),
        })
    }

    fn options(&self, size: u64, compression: Compression) -> FileOptions {
        let level = match compression {
            Compression::Store => None,
            _ => self.level,
        };
        FileOptions::default()
            .compression_method(compression.method())
            .compression_level(level)
            .large_file(size >= u64::from(u32::MAX))
            .unix_permissions(0o644)
    }
}

fn protocol_error(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, msg)
}

impl Container for ArchiveWriter {
    fn create_entry(&mut self, name: &str, size: u64, compression: Compression) -> io::Result<()> {
        if let Some(open) = &self.open {
            return Err(protocol_error(format!("entry '{}' is still open", open.name)));
        }
        let options = self.options(size, compression);
        self.writer.start_file(name, options)?;
        self.open = Some(OpenEntry {
            name: name.to_string(),
            announced: size,
            written: 0,
            compression,
        });
        Ok(())
    }

    fn write_entry(&mut self, chunk: &[u8], compression: Compression) -> io::Result<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| protocol_error("no entry is open".into()))?;
        if open.compression != compression {
            return Err(protocol_error(format!(
                "entry '{}' was created with {:?}, chunk requests {:?}",
                open.name, open.compression, compression
            )));
        }
        let written = open.written + chunk.len() as u64;
        if written > open.announced {
            return Err(protocol_error(format!(
                "entry '{}' exceeds its announced size of {} bytes",
                open.name, open.announced
            )));
        }
        self.writer.write_all(chunk)?;
        open.written = written;
        Ok(())
    }

    fn finish_entry(&mut self) -> io::Result<()> {
        let open = self
            .open
            .take()
            .ok_or_else(|| protocol_error("no entry is open".into()))?;
        if open.written != open.announced {
            return Err(protocol_error(format!(
                "entry '{}' received {} of {} announced bytes",
                open.name, open.written, open.announced
            )));
        }
        self.finished.push(open.name);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(open) = &self.open {
            return Err(protocol_error(format!("entry '{}' is still open", open.name)));
        }
        self.writer.flush()
    }

    fn close(mut self) -> io::Result<u64> {
        if let Some(open) = &self.open {
            return Err(protocol_error(format!("entry '{}' is still open", open.name)));
        }
        let buffered = self.writer.finish()?;
        let temp = buffered.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        let size = temp.as_file().metadata()?.len();
        let file: File = temp.persist(&self.target).map_err(|e| e.error)?;
        drop(file);
        debug!(
            "closed archive '{}' ({} entries, {} bytes)",
            self.target.display(),
            self.finished.len(),
            size
        );
        Ok(size)
    }
}
