//
// models.rs
// Dicom-Archive-Tools
//
// Defines serializable data structures for archive summaries, pixel layouts, extraction results, and compression trials.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a tar entry is, as far as the summary cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// One entry visited while walking an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub kind: EntryKind,
}

/// Name and size of the largest or smallest regular file.
/// The default value (empty name, zero size) is reported when the archive has no regular files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExtreme {
    pub name: String,
    pub size: u64,
}

impl FileExtreme {
    pub fn is_sentinel(&self) -> bool {
        self.name.is_empty() && self.size == 0
    }
}

/// Aggregate view over every entry of an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub total_entries: u64,
    pub file_count: u64,
    pub dir_count: u64,
    pub other_count: u64,
    pub total_size: u64,
    pub largest: FileExtreme,
    pub smallest: FileExtreme,
}

/// Pixel geometry read from the header, before any decoding happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelShape {
    pub frames: u32,
    pub rows: u32,
    pub columns: u32,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
}

impl PixelShape {
    /// Array-style dimensions: `[rows, columns]` for one frame, `[frames, rows, columns]` otherwise,
    /// with a trailing samples axis for colour data.
    pub fn dimensions(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(4);
        if self.frames != 1 {
            dims.push(self.frames as usize);
        }
        dims.push(self.rows as usize);
        dims.push(self.columns as usize);
        if self.samples_per_pixel > 1 {
            dims.push(self.samples_per_pixel as usize);
        }
        dims
    }

    /// Bytes needed to hold the decoded pixel buffer, `None` if that does not fit in a `u64`.
    pub fn decoded_len(&self) -> Option<u64> {
        let bytes_per_sample = u64::from(self.bits_allocated.max(8)).div_ceil(8);
        u64::from(self.frames)
            .checked_mul(u64::from(self.rows))?
            .checked_mul(u64::from(self.columns))?
            .checked_mul(u64::from(self.samples_per_pixel))?
            .checked_mul(bytes_per_sample)
    }
}

/// How a record's pixel data maps onto output images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLayout {
    /// No Pixel Data element: metadata only.
    NoImage,
    Single,
    Multi(u32),
    /// Geometry that cannot be rendered; carries the array rank.
    Unsupported(usize),
}

impl FrameLayout {
    pub fn from_shape(shape: Option<&PixelShape>) -> Self {
        let Some(shape) = shape else {
            return FrameLayout::NoImage;
        };
        let dims = shape.dimensions();
        if dims.iter().any(|&d| d == 0) || !matches!(shape.samples_per_pixel, 1 | 3) {
            return FrameLayout::Unsupported(dims.len());
        }
        match shape.frames {
            1 => FrameLayout::Single,
            n => FrameLayout::Multi(n),
        }
    }

    /// Tag appended to derived file names.
    pub fn tag(&self) -> &'static str {
        match self {
            FrameLayout::NoImage => "no_image",
            FrameLayout::Multi(_) => "multi_frame",
            FrameLayout::Single | FrameLayout::Unsupported(_) => "single_frame",
        }
    }
}

/// What the extractor produced for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutcome {
    pub source: PathBuf,
    pub name: String,
    pub layout: FrameLayout,
    pub images: Vec<PathBuf>,
    pub dump: Option<PathBuf>,
}

/// Size bookkeeping for one compress/decompress round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeComparison {
    pub compress_delta: i64,
    pub compress_ratio: f64,
    pub decompress_delta: i64,
    pub decompress_ratio: f64,
    pub data_loss: i64,
}

impl SizeComparison {
    /// Ratios are `0.0` when the compressed file is empty.
    pub fn compute(original: u64, compressed: u64, decompressed: u64) -> Self {
        let ratio = |num: u64| {
            if compressed == 0 {
                0.0
            } else {
                num as f64 / compressed as f64
            }
        };
        SizeComparison {
            compress_delta: original as i64 - compressed as i64,
            compress_ratio: ratio(original),
            decompress_delta: decompressed as i64 - compressed as i64,
            decompress_ratio: ratio(decompressed),
            data_loss: original as i64 - decompressed as i64,
        }
    }
}

/// Lines present on only one side of a dataset diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDiff {
    pub removed: Vec<String>,
    pub inserted: Vec<String>,
}

impl ContentDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.removed.len() + self.inserted.len()
    }
}

/// One input file run through one codec family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionTrial {
    pub input: PathBuf,
    pub codec: String,
    pub compressed_path: PathBuf,
    pub decompressed_path: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    pub decompressed_size: u64,
    pub sizes: SizeComparison,
    pub diff: ContentDiff,
}
