//! Error taxonomy for resolving and packing.
//!
//! Every failure in `filepack` belongs to exactly one [`ErrorKind`]. The kind
//! decides the fixed, human-readable message and the process exit code; the
//! [`PackError`] value carries the context (paths, entry names) and the
//! underlying I/O or JSON error.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The flat set of failure categories, one per pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArgError,
    InputNotFolder,
    InputReadFailed,
    InputDocumentError,
    OutputIsFolder,
    OutputCantWrite,
    ArchiveCreateFailed,
    ArchiveFileCreateFailed,
    ReadFileFailed,
    ArchiveFileWriteFailed,
    ArchiveFileFinishFailed,
    ArchiveFlushFailed,
    ArchiveCloseFailed,
}

impl ErrorKind {
    /// All kinds, in exit-code order.
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::ArgError,
        ErrorKind::InputNotFolder,
        ErrorKind::InputReadFailed,
        ErrorKind::InputDocumentError,
        ErrorKind::OutputIsFolder,
        ErrorKind::OutputCantWrite,
        ErrorKind::ArchiveCreateFailed,
        ErrorKind::ArchiveFileCreateFailed,
        ErrorKind::ReadFileFailed,
        ErrorKind::ArchiveFileWriteFailed,
        ErrorKind::ArchiveFileFinishFailed,
        ErrorKind::ArchiveFlushFailed,
        ErrorKind::ArchiveCloseFailed,
    ];

    /// The fixed description printed for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::ArgError => "Argument error",
            ErrorKind::InputNotFolder => "Input is not a folder",
            ErrorKind::InputReadFailed => "Read input failed",
            ErrorKind::InputDocumentError => "Input document error",
            ErrorKind::OutputIsFolder => "Output can not be a folder",
            ErrorKind::OutputCantWrite => "Output write failed",
            ErrorKind::ArchiveCreateFailed => "Create archive failed",
            ErrorKind::ArchiveFileCreateFailed => "Create archive file failed",
            ErrorKind::ReadFileFailed => "Read file failed",
            ErrorKind::ArchiveFileWriteFailed => "Write archive file failed",
            ErrorKind::ArchiveFileFinishFailed => "Finish archive file failed",
            ErrorKind::ArchiveFlushFailed => "Flush archive failed",
            ErrorKind::ArchiveCloseFailed => "Close archive failed",
        }
    }

    /// Process exit code reported by the CLI. Never zero.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::ArgError => 1,
            ErrorKind::InputNotFolder => 2,
            ErrorKind::InputReadFailed => 3,
            ErrorKind::InputDocumentError => 4,
            ErrorKind::OutputIsFolder => 5,
            ErrorKind::OutputCantWrite => 6,
            ErrorKind::ArchiveCreateFailed => 7,
            ErrorKind::ArchiveFileCreateFailed => 8,
            ErrorKind::ReadFileFailed => 9,
            ErrorKind::ArchiveFileWriteFailed => 10,
            ErrorKind::ArchiveFileFinishFailed => 11,
            ErrorKind::ArchiveFlushFailed => 12,
            ErrorKind::ArchiveCloseFailed => 13,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The primary error type for all operations in the `filepack` crate.
#[derive(Debug, Error)]
pub enum PackError {
    /// Invalid option or argument.
    #[error("{}: {}", ErrorKind::ArgError, .0)]
    Arg(String),

    /// A directory was required but the path is something else.
    #[error("{}: '{}'", ErrorKind::InputNotFolder, .path.display())]
    InputNotFolder { path: PathBuf },

    /// The manifest (or an archive being inspected) could not be read.
    #[error("{}: '{}': {source}", ErrorKind::InputReadFailed, .path.display())]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest is not a JSON array of `[name, path]` string pairs.
    #[error("{}: '{}': {source}", ErrorKind::InputDocumentError, .path.display())]
    InputDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: '{}'", ErrorKind::OutputIsFolder, .path.display())]
    OutputIsFolder { path: PathBuf },

    /// A previous file at the output path could not be removed.
    #[error("{}: '{}': {source}", ErrorKind::OutputCantWrite, .path.display())]
    OutputCantWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: '{}': {source}", ErrorKind::ArchiveCreateFailed, .path.display())]
    ArchiveCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: entry '{name}': {source}", ErrorKind::ArchiveFileCreateFailed)]
    EntryCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// A source file could not be opened or read.
    #[error("{}: entry '{name}' from '{}': {source}", ErrorKind::ReadFileFailed, .path.display())]
    ReadFile {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: entry '{name}': {source}", ErrorKind::ArchiveFileWriteFailed)]
    EntryWrite {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{}: entry '{name}': {source}", ErrorKind::ArchiveFileFinishFailed)]
    EntryFinish {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", ErrorKind::ArchiveFlushFailed)]
    ArchiveFlush {
        #[source]
        source: io::Error,
    },

    #[error("{}: '{}': {source}", ErrorKind::ArchiveCloseFailed, .path.display())]
    ArchiveClose {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PackError {
    /// The taxonomy tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackError::Arg(_) => ErrorKind::ArgError,
            PackError::InputNotFolder { .. } => ErrorKind::InputNotFolder,
            PackError::InputReadFailed { .. } => ErrorKind::InputReadFailed,
            PackError::InputDocument { .. } => ErrorKind::InputDocumentError,
            PackError::OutputIsFolder { .. } => ErrorKind::OutputIsFolder,
            PackError::OutputCantWrite { .. } => ErrorKind::OutputCantWrite,
            PackError::ArchiveCreate { .. } => ErrorKind::ArchiveCreateFailed,
            PackError::EntryCreate { .. } => ErrorKind::ArchiveFileCreateFailed,
            PackError::ReadFile { .. } => ErrorKind::ReadFileFailed,
            PackError::EntryWrite { .. } => ErrorKind::ArchiveFileWriteFailed,
            PackError::EntryFinish { .. } => ErrorKind::ArchiveFileFinishFailed,
            PackError::ArchiveFlush { .. } => ErrorKind::ArchiveFlushFailed,
            PackError::ArchiveClose { .. } => ErrorKind::ArchiveCloseFailed,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}
