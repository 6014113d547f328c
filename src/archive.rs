//
// archive.rs
// Dicom-Archive-Tools
//
// Walks (optionally compressed) tar archives: summarizes entries, finds the largest/smallest file, and extracts members.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::error::ArchiveError;
use crate::models::{ArchiveEntry, ArchiveSummary, EntryKind, FileExtreme};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BZIP2_MAGIC: [u8; 3] = [b'B', b'Z', b'h'];

/// Compression wrapped around the tar stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TarCompression {
    #[default]
    None,
    Gzip,
    Bzip2,
}

impl TarCompression {
    pub fn from_extension(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz") {
            Some(Self::Bzip2)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Gzip)
        } else if name.ends_with(".tar") {
            Some(Self::None)
        } else {
            None
        }
    }

    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else if bytes.starts_with(&BZIP2_MAGIC) {
            Self::Bzip2
        } else {
            Self::None
        }
    }

    /// Extension first, then the leading bytes of the file.
    pub fn detect(path: &Path) -> Result<Self, ArchiveError> {
        if let Some(compression) = Self::from_extension(path) {
            return Ok(compression);
        }
        let mut head = [0u8; 4];
        let mut file = File::open(path).map_err(|e| ArchiveError::read(path, e))?;
        let n = file.read(&mut head).map_err(|e| ArchiveError::read(path, e))?;
        Ok(Self::from_magic_bytes(&head[..n]))
    }
}

/// Open the archive and hand a decompressing reader to `f`.
fn with_archive<T>(
    path: &Path,
    f: impl FnOnce(&mut Archive<Box<dyn Read>>) -> Result<T, ArchiveError>,
) -> Result<T, ArchiveError> {
    let compression = TarCompression::detect(path)?;
    debug!("Opening {:?} as {:?} tar", path, compression);

    let file = File::open(path).map_err(|e| ArchiveError::read(path, e))?;
    let reader = BufReader::new(file);
    let stream: Box<dyn Read> = match compression {
        TarCompression::None => Box::new(reader),
        TarCompression::Gzip => Box::new(GzDecoder::new(reader)),
        TarCompression::Bzip2 => Box::new(BzDecoder::new(reader)),
    };

    let mut archive = Archive::new(stream);
    f(&mut archive)
}

fn classify(entry_type: tar::EntryType) -> EntryKind {
    if entry_type.is_file() {
        EntryKind::File
    } else if entry_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::Other
    }
}

/// Visit every entry in archive order without reading member contents.
pub fn for_each_entry(
    path: &Path,
    mut visit: impl FnMut(ArchiveEntry),
) -> Result<(), ArchiveError> {
    with_archive(path, |archive| {
        let entries = archive.entries().map_err(|e| ArchiveError::read(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ArchiveError::read(path, e))?;
            let header = entry.header();
            let name = entry
                .path()
                .map_err(|e| ArchiveError::read(path, e))?
                .to_string_lossy()
                .into_owned();
            let size = header.size().map_err(|e| ArchiveError::read(path, e))?;
            visit(ArchiveEntry {
                name,
                size,
                kind: classify(header.entry_type()),
            });
        }
        Ok(())
    })
}

/// Running totals over a stream of entries.
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    summary: ArchiveSummary,
    seen_file: bool,
}

impl SummaryBuilder {
    pub fn push(&mut self, entry: &ArchiveEntry) {
        let s = &mut self.summary;
        s.total_entries += 1;
        s.total_size += entry.size;

        match entry.kind {
            EntryKind::File => {
                s.file_count += 1;
                // Strict comparisons keep the first entry on ties.
                if !self.seen_file || entry.size > s.largest.size {
                    s.largest = FileExtreme {
                        name: entry.name.clone(),
                        size: entry.size,
                    };
                }
                if !self.seen_file || entry.size < s.smallest.size {
                    s.smallest = FileExtreme {
                        name: entry.name.clone(),
                        size: entry.size,
                    };
                }
                self.seen_file = true;
            }
            EntryKind::Directory => s.dir_count += 1,
            EntryKind::Other => s.other_count += 1,
        }
    }

    pub fn finish(self) -> ArchiveSummary {
        self.summary
    }
}

pub fn summarize_entries<'a>(entries: impl IntoIterator<Item = &'a ArchiveEntry>) -> ArchiveSummary {
    let mut builder = SummaryBuilder::default();
    for entry in entries {
        builder.push(entry);
    }
    builder.finish()
}

/// Summarize an archive, calling `on_entry` for each entry as it is visited.
pub fn inspect_archive(
    path: &Path,
    mut on_entry: impl FnMut(&ArchiveEntry),
) -> Result<ArchiveSummary, ArchiveError> {
    let mut builder = SummaryBuilder::default();
    for_each_entry(path, |entry| {
        on_entry(&entry);
        builder.push(&entry);
    })?;
    Ok(builder.finish())
}

pub fn largest_file(path: &Path) -> Result<Option<ArchiveEntry>, ArchiveError> {
    let summary = inspect_archive(path, |_| {})?;
    Ok(extreme_entry(summary.largest))
}

pub fn smallest_file(path: &Path) -> Result<Option<ArchiveEntry>, ArchiveError> {
    let summary = inspect_archive(path, |_| {})?;
    Ok(extreme_entry(summary.smallest))
}

fn extreme_entry(extreme: FileExtreme) -> Option<ArchiveEntry> {
    if extreme.is_sentinel() {
        return None;
    }
    Some(ArchiveEntry {
        name: extreme.name,
        size: extreme.size,
        kind: EntryKind::File,
    })
}

/// One-line description of an entry, worded like the summary report.
pub fn describe_entry(entry: &ArchiveEntry) -> String {
    match entry.kind {
        EntryKind::File => format!("File {} is {} bytes.", entry.name, entry.size),
        EntryKind::Directory => format!("Directory {}", entry.name),
        EntryKind::Other => format!("{} is not a file or directory.", entry.name),
    }
}

pub fn print_summary(summary: &ArchiveSummary) {
    println!(
        "{} total items, {} are files, {} are directories, {} are other, {} total bytes",
        summary.total_entries,
        summary.file_count,
        summary.dir_count,
        summary.other_count,
        summary.total_size
    );
    println!(
        "Largest file is {} bytes: {}",
        summary.largest.size, summary.largest.name
    );
    println!(
        "Smallest file is {} bytes: {}",
        summary.smallest.size, summary.smallest.name
    );
}

/// Unpack the whole archive below `dest`.
pub fn extract_all(path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(dest).map_err(|e| ArchiveError::read(dest, e))?;
    with_archive(path, |archive| {
        archive.unpack(dest).map_err(|e| ArchiveError::read(path, e))
    })
}

/// Extract a single regular file, keeping its relative path under `dest`.
pub fn extract_member(path: &Path, name: &str, dest: &Path) -> Result<PathBuf, ArchiveError> {
    let extracted = with_archive(path, |archive| {
        let entries = archive.entries().map_err(|e| ArchiveError::read(path, e))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| ArchiveError::read(path, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let member = entry
                .path()
                .map_err(|e| ArchiveError::read(path, e))?
                .into_owned();
            if member.to_string_lossy() != name {
                continue;
            }
            let Some(relative) = sanitize_path(&member) else {
                continue;
            };
            let target = dest.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::read(parent, e))?;
            }
            entry
                .unpack(&target)
                .map_err(|e| ArchiveError::read(path, e))?;
            return Ok(Some(target));
        }
        Ok(None)
    })?;

    extracted.ok_or_else(|| ArchiveError::MemberNotFound {
        archive: path.to_path_buf(),
        name: name.to_string(),
    })
}

// Drops `..`, roots and prefixes so members cannot escape `dest`.
fn sanitize_path(path: &Path) -> Option<PathBuf> {
    let mut sanitized = PathBuf::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }
    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}
