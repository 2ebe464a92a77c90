//! # Packing Pipeline
//!
//! Materializes a [`FileList`] into a compressed archive. The run is strictly
//! sequential:
//!
//! 1. Check the output path (not a directory; remove a previous file).
//! 2. Create the archive container, sized for the number of entries.
//! 3. For each entry: open the source, create the archive entry with the
//!    source size, stream the bytes in fixed-size chunks, finish the entry.
//! 4. Optionally add the `(listfile)` listing record.
//! 5. Flush and close the archive.
//!
//! The first failure aborts the run. Because [`ArchiveWriter`] stages the
//! archive in a temporary file, an aborted run leaves no output behind.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::archive::{ArchiveWriter, Compression, Container};
use crate::error::PackError;
use crate::file_list::FileList;
use crate::progress::{PackProgress, ProgressCallback, ProgressTracker};

/// Default size of the read buffer used to stream each source file.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Name of the optional entry listing every other entry.
pub const LISTING_ENTRY: &str = "(listfile)";

/// Holds all configuration options for a packing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOptions {
    pub compression: Compression,
    /// Compression level; `None` uses the scheme's default.
    pub level: Option<i32>,
    /// Bytes read from a source file per write into the archive.
    pub chunk_size: usize,
    /// Add a `(listfile)` entry naming every packed entry.
    pub include_listing: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            level: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            include_listing: false,
        }
    }
}

impl PackOptions {
    pub fn validate(&self) -> Result<(), PackError> {
        if self.chunk_size == 0 {
            return Err(PackError::Arg("chunk size must be greater than zero".into()));
        }
        if let Some(level) = self.level {
            match self.compression.level_range() {
                None => {
                    return Err(PackError::Arg(format!(
                        "{} compression does not take a level",
                        self.compression
                    )))
                }
                Some(range) if !range.contains(&level) => {
                    return Err(PackError::Arg(format!(
                        "level {} is outside {}..={} for {}",
                        level,
                        range.start(),
                        range.end(),
                        self.compression
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    /// Entries written, including the listing record.
    pub entries: usize,
    /// Source bytes read.
    pub bytes_in: u64,
    /// Size of the finished archive.
    pub bytes_out: u64,
}

/// Packs file lists into archives.
pub struct Packer<'a> {
    options: PackOptions,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a> Packer<'a> {
    pub fn new(options: PackOptions) -> Self {
        Self { options, progress: None }
    }

    /// Calls `callback` after every finished entry.
    pub fn with_progress(mut self, callback: impl FnMut(&PackProgress) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Packs `files` into a ZIP archive at `output`.
    pub fn pack(&mut self, files: &FileList, output: &Path) -> Result<PackSummary, PackError> {
        self.options.validate()?;
        prepare_output(output)?;

        info!(
            "packing {} entries into '{}' ({})",
            files.len(),
            output.display(),
            self.options.compression
        );
        let capacity = files.len() + usize::from(self.options.include_listing);
        let container = ArchiveWriter::create(output, capacity, self.options.level).map_err(|source| {
            PackError::ArchiveCreate {
                path: output.to_path_buf(),
                source,
            }
        })?;

        self.pack_into(container, files, output)
    }

    /// Writes every entry into an already created container, then flushes and
    /// closes it. `output` is only used for error context.
    pub fn pack_into<C: Container>(
        &mut self,
        mut container: C,
        files: &FileList,
        output: &Path,
    ) -> Result<PackSummary, PackError> {
        let listing = self.options.include_listing;
        let shadowed = listing && files.contains(LISTING_ENTRY);
        if shadowed {
            warn!("entry '{}' is replaced by the generated listing", LISTING_ENTRY);
        }
        let mut tracker = self.progress.as_ref().map(|_| {
            let planned = files.len() - usize::from(shadowed) + usize::from(listing);
            ProgressTracker::new(planned as u64, total_source_bytes(files))
        });

        let mut buf = vec![0u8; self.options.chunk_size];
        let mut entries = 0usize;
        let mut bytes_in = 0u64;

        for (name, path) in files.iter() {
            if shadowed && name == LISTING_ENTRY {
                continue;
            }
            let written = self.pack_entry(&mut container, name, path, &mut buf)?;
            entries += 1;
            bytes_in += written;
            self.report(&mut tracker, name, written);
        }

        if listing {
            let record = listing_record(files);
            self.write_record(&mut container, LISTING_ENTRY, &record)?;
            entries += 1;
            self.report(&mut tracker, LISTING_ENTRY, 0);
        }

        container.flush().map_err(|source| PackError::ArchiveFlush { source })?;
        let bytes_out = container.close().map_err(|source| PackError::ArchiveClose {
            path: output.to_path_buf(),
            source,
        })?;

        info!("packed {} entries, {} -> {} bytes", entries, bytes_in, bytes_out);
        Ok(PackSummary {
            entries,
            bytes_in,
            bytes_out,
        })
    }

    /// Streams one source file into a new archive entry. Returns the bytes written.
    fn pack_entry<C: Container>(
        &self,
        container: &mut C,
        name: &str,
        path: &Path,
        buf: &mut [u8],
    ) -> Result<u64, PackError> {
        let mut file = File::open(path).map_err(|e| read_error(name, path, e))?;
        let meta = file.metadata().map_err(|e| read_error(name, path, e))?;
        if !meta.is_file() {
            let e = io::Error::new(io::ErrorKind::InvalidInput, "not a regular file");
            return Err(read_error(name, path, e));
        }

        let compression = self.options.compression;
        container
            .create_entry(name, meta.len(), compression)
            .map_err(|source| PackError::EntryCreate {
                name: name.to_string(),
                source,
            })?;

        let mut written = 0u64;
        loop {
            let n = match file.read(buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(read_error(name, path, e)),
            };
            container
                .write_entry(&buf[..n], compression)
                .map_err(|source| PackError::EntryWrite {
                    name: name.to_string(),
                    source,
                })?;
            written += n as u64;
        }

        container.finish_entry().map_err(|source| PackError::EntryFinish {
            name: name.to_string(),
            source,
        })?;
        debug!("packed '{}' from '{}' ({} bytes)", name, path.display(), written);
        Ok(written)
    }

    /// Writes an in-memory entry.
    fn write_record<C: Container>(&self, container: &mut C, name: &str, data: &[u8]) -> Result<(), PackError> {
        let compression = self.options.compression;
        container
            .create_entry(name, data.len() as u64, compression)
            .map_err(|source| PackError::EntryCreate {
                name: name.to_string(),
                source,
            })?;
        for chunk in data.chunks(self.options.chunk_size) {
            container
                .write_entry(chunk, compression)
                .map_err(|source| PackError::EntryWrite {
                    name: name.to_string(),
                    source,
                })?;
        }
        container.finish_entry().map_err(|source| PackError::EntryFinish {
            name: name.to_string(),
            source,
        })
    }

    fn report(&mut self, tracker: &mut Option<ProgressTracker>, name: &str, bytes: u64) {
        if let (Some(tracker), Some(callback)) = (tracker.as_mut(), self.progress.as_mut()) {
            callback(&tracker.record_entry(name, bytes));
        }
    }
}

/// Packs `files` into `output` with `options` and no progress reporting.
pub fn pack(files: &FileList, output: &Path, options: PackOptions) -> Result<PackSummary, PackError> {
    Packer::new(options).pack(files, output)
}

/// Rejects a directory at `output` and removes a previous file there.
///
/// Callers that walk a directory which may contain `output` run this before
/// resolving, so a previous archive is not picked up as an entry.
pub(crate) fn prepare_output(output: &Path) -> Result<(), PackError> {
    if output.is_dir() {
        return Err(PackError::OutputIsFolder {
            path: output.to_path_buf(),
        });
    }
    match fs::symlink_metadata(output) {
        Ok(_) => {
            fs::remove_file(output).map_err(|source| PackError::OutputCantWrite {
                path: output.to_path_buf(),
                source,
            })?;
            debug!("removed previous output '{}'", output.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PackError::OutputCantWrite {
            path: output.to_path_buf(),
            source,
        }),
    }
}

fn read_error(name: &str, path: &Path, source: io::Error) -> PackError {
    PackError::ReadFile {
        name: name.to_string(),
        path: path.to_path_buf(),
        source,
    }
}

/// Every entry name except the listing itself, each followed by CRLF.
pub(crate) fn listing_record(files: &FileList) -> Vec<u8> {
    let mut out = String::new();
    for name in files.names().filter(|n| *n != LISTING_ENTRY) {
        out.push_str(name);
        out.push_str("\r\n");
    }
    out.into_bytes()
}

fn total_source_bytes(files: &FileList) -> u64 {
    files
        .iter()
        .map(|(_, p)| fs::metadata(p).map(|m| m.len()).unwrap_or(0))
        .sum()
}
