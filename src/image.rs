//
// image.rs
// Dicom-Archive-Tools
//
// Converts decoded DICOM pixel data into 8-bit PNG frames.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::object::DefaultDicomObject;
use dicom_pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption};
use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::{ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// How stored sample values are squeezed into 8 bits.
///
/// `Clamp` and `Wrap` throw away dynamic range for 10/12/16-bit sources; `Normalize`
/// keeps the relative contrast of each frame at the cost of absolute values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DepthMapping {
    /// Saturate below 0 and above 255.
    #[default]
    Clamp,
    /// Keep the low byte (modulo 256).
    Wrap,
    /// Stretch the frame's min..max onto 0..255.
    Normalize,
}

impl DepthMapping {
    fn map(self, value: f64, min: f64, max: f64) -> u8 {
        match self {
            DepthMapping::Clamp => value.round().clamp(0.0, 255.0) as u8,
            DepthMapping::Wrap => (value.round() as i64).rem_euclid(256) as u8,
            DepthMapping::Normalize => {
                if max <= min {
                    0
                } else {
                    (((value - min) / (max - min)) * 255.0).round().clamp(0.0, 255.0) as u8
                }
            }
        }
    }
}

/// Map one frame of shape (rows, columns, samples) to an 8-bit image.
pub fn frame_to_image(frame: ArrayView3<f64>, mapping: DepthMapping) -> Result<DynamicImage, RecordError> {
    let (rows, columns, samples) = frame.dim();

    let (min, max) = frame
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let bytes: Vec<u8> = frame.iter().map(|&v| mapping.map(v, min, max)).collect();

    let width = columns as u32;
    let height = rows as u32;
    let image = match samples {
        1 => GrayImage::from_raw(width, height, bytes).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgb8),
        n => {
            return Err(RecordError::Decode(format!(
                "{} samples per pixel cannot be written as PNG",
                n
            )))
        }
    };

    image.ok_or_else(|| RecordError::Decode("Pixel buffer does not match frame size".to_string()))
}

/// Decode every frame of the object's pixel data into 8-bit images, in frame order.
pub fn decode_frames(
    obj: &DefaultDicomObject,
    mapping: DepthMapping,
) -> Result<Vec<DynamicImage>, RecordError> {
    let decoded = obj
        .decode_pixel_data()
        .map_err(|e| RecordError::Decode(e.to_string()))?;

    // Raw stored values: no rescale, no windowing.
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::None)
        .with_voi_lut(VoiLutOption::Identity);
    let array = decoded
        .to_ndarray_with_options::<f64>(&options)
        .map_err(|e| RecordError::Decode(e.to_string()))?;

    array
        .axis_iter(Axis(0))
        .map(|frame| frame_to_image(frame, mapping))
        .collect()
}

pub fn save_png(image: &DynamicImage, path: &Path) -> Result<(), RecordError> {
    image.save_with_format(path, ::image::ImageFormat::Png)?;
    Ok(())
}
