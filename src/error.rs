//
// error.rs
// Dicom-Archive-Tools
//
// Typed errors for the archive, record, subprocess and codec layers. The CLI wraps them in anyhow.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures while opening or walking a tar archive. These abort the run.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to read archive {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive {archive:?} has no regular file named '{name}'")]
    MemberNotFound { archive: PathBuf, name: String },
}

impl ArchiveError {
    pub(crate) fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        ArchiveError::Read {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Per-record failures. The directory walk logs these and moves on.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Not a readable DICOM file: {0}")]
    Unreadable(String),

    #[error("Pixel data would need {required} bytes (limit {limit})")]
    TooLarge { required: u64, limit: u64 },

    #[error("Failed to decode pixel data: {0}")]
    Decode(String),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Outcome of an external tool that did not succeed.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool '{program}' was not found on PATH")]
    NotFound { program: String },

    #[error("Tool '{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Compression or decompression failures for a single file.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Failed to open DICOM file: {0}")]
    Open(String),

    #[error("Failed to transcode pixel data: {0}")]
    Transcode(String),

    #[error("Failed to write DICOM file: {0}")]
    Write(String),

    #[error("Unsupported pixel layout: {0}")]
    Unsupported(String),
}
