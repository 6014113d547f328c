//
// extract.rs
// Dicom-Archive-Tools
//
// Turns one DICOM file into PNG frames (and optionally a metadata dump) under an explicit output directory.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use dicom::object::{open_file, DefaultDicomObject};
use tracing::{debug, warn};

use crate::dicom_access::ElementAccess;
use crate::error::RecordError;
use crate::image::{decode_frames, save_png, DepthMapping};
use crate::metadata::MetadataDumper;
use crate::models::{ExtractOutcome, FrameLayout};
use crate::naming::derive_filename;

/// 2 GiB of decoded samples.
pub const DEFAULT_MAX_PIXEL_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Options controlling how a record is turned into images.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub depth_mapping: DepthMapping,
    pub max_pixel_bytes: u64,
    pub dumper: Option<MetadataDumper>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            depth_mapping: DepthMapping::default(),
            max_pixel_bytes: DEFAULT_MAX_PIXEL_BYTES,
            dumper: None,
        }
    }
}

pub fn read_record(path: &Path) -> Result<DefaultDicomObject, RecordError> {
    open_file(path).map_err(|e| RecordError::Unreadable(e.to_string()))
}

/// Process one file: name it, dump its metadata if asked, and write one PNG per frame.
pub fn extract_record(
    path: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<ExtractOutcome, RecordError> {
    let obj = read_record(path)?;
    let name = derive_filename(&obj, path);
    let shape = obj.pixel_shape();
    let layout = FrameLayout::from_shape(shape.as_ref());
    debug!("{:?} -> {} ({:?})", path, name, layout);

    fs::create_dir_all(output_dir)?;

    let dump = match &options.dumper {
        Some(dumper) => match dumper.dump(path, &obj, &name, output_dir) {
            Ok(target) => Some(target),
            Err(e) => {
                warn!("Metadata dump failed for {:?}: {:#}", path, e);
                None
            }
        },
        None => None,
    };

    let mut outcome = ExtractOutcome {
        source: path.to_path_buf(),
        name,
        layout,
        images: Vec::new(),
        dump,
    };

    let shape = match (layout, shape) {
        (FrameLayout::Single | FrameLayout::Multi(_), Some(shape)) => shape,
        (FrameLayout::Unsupported(rank), _) => {
            debug!("Skipping images for {:?}: unsupported pixel array rank {}", path, rank);
            return Ok(outcome);
        }
        _ => return Ok(outcome),
    };

    // Header values are untrusted; an overflowing size counts as too large.
    let required = shape.decoded_len().unwrap_or(u64::MAX);
    if required > options.max_pixel_bytes {
        return Err(RecordError::TooLarge {
            required,
            limit: options.max_pixel_bytes,
        });
    }

    let frames = decode_frames(&obj, options.depth_mapping)?;
    outcome.images = write_frames(&frames, layout, &outcome.name, output_dir)?;
    Ok(outcome)
}

fn write_frames(
    frames: &[::image::DynamicImage],
    layout: FrameLayout,
    name: &str,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, RecordError> {
    match layout {
        FrameLayout::Single => {
            let Some(frame) = frames.first() else {
                return Ok(Vec::new());
            };
            let target = output_dir.join(format!("{}.png", name));
            save_png(frame, &target)?;
            Ok(vec![target])
        }
        FrameLayout::Multi(_) => {
            let frame_dir = output_dir.join(name);
            fs::create_dir_all(&frame_dir)?;
            let mut written = Vec::with_capacity(frames.len());
            for (idx, frame) in frames.iter().enumerate() {
                let target = frame_dir.join(format!("{}_{}.png", name, idx + 1));
                save_png(frame, &target)?;
                written.push(target);
            }
            Ok(written)
        }
        FrameLayout::NoImage | FrameLayout::Unsupported(_) => Ok(Vec::new()),
    }
}
