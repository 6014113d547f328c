//
// transcode.rs
// Dicom-Archive-Tools
//
// In-process pixel data transcoding: RLE Lossless through the rle module, JPEG baseline via dicom-pixeldata, and native re-encoding.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::core::value::{PixelFragmentSequence, Value};
use dicom::core::{DataElement, Length, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::{tags, uids, StandardDataDictionary};
use dicom::encoding::TransferSyntaxIndex;
use dicom::object::{open_file, DefaultDicomObject, FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::TransferSyntaxRegistry;
use dicom_pixeldata::{PixelDecoder, Transcode};

use crate::dicom_access::ElementAccess;
use crate::error::CodecError;
use crate::rle::{decode_frame, encode_frame, FrameGeometry};

fn open(input: &Path) -> Result<DefaultDicomObject, CodecError> {
    open_file(input).map_err(|e| CodecError::Open(format!("{:?}: {}", input, e)))
}

/// Frame geometry plus the per-frame and total native sizes, all checked against overflow.
struct NativeLayout {
    geometry: FrameGeometry,
    frame_len: usize,
    frames: usize,
}

fn native_layout<T: ElementAccess>(obj: &T) -> Result<NativeLayout, CodecError> {
    let shape = obj
        .pixel_shape()
        .ok_or_else(|| CodecError::Unsupported("no Pixel Data element".to_string()))?;
    let geometry = FrameGeometry {
        rows: shape.rows as usize,
        columns: shape.columns as usize,
        samples_per_pixel: usize::from(shape.samples_per_pixel),
        bits_allocated: shape.bits_allocated,
    };
    let frame_len = geometry
        .frame_len()
        .map_err(|e| CodecError::Unsupported(e.to_string()))?;
    if frame_len == 0 {
        return Err(CodecError::Unsupported(format!("empty frame geometry {:?}", geometry)));
    }
    let frames = shape.frames as usize;
    if frame_len.checked_mul(frames).is_none() {
        return Err(CodecError::Unsupported(format!(
            "{} frame(s) of {} bytes cannot be addressed",
            frames, frame_len
        )));
    }
    // The encoder only walks pixel-interleaved samples.
    if shape.samples_per_pixel > 1 && obj.element_int(tags::PLANAR_CONFIGURATION).unwrap_or(0) != 0 {
        return Err(CodecError::Unsupported(
            "planar configuration 1 is not supported".to_string(),
        ));
    }
    Ok(NativeLayout {
        geometry,
        frame_len,
        frames,
    })
}

/// Encode native pixel data as RLE Lossless, one fragment per frame.
pub fn rle_compress(input: &Path, output: &Path) -> Result<(), CodecError> {
    let obj = open(input)?;
    if obj.meta().transfer_syntax() == uids::RLE_LOSSLESS {
        return Err(CodecError::Unsupported("file is already RLE encoded".to_string()));
    }
    // Geometry is validated before the pixel buffer is read.
    let layout = native_layout(&obj)?;
    let needed = layout.frame_len * layout.frames;

    let pixels = obj
        .element(tags::PIXEL_DATA)
        .map_err(|e| CodecError::Transcode(e.to_string()))?
        .to_bytes()
        .map_err(|_| CodecError::Unsupported("pixel data is already encapsulated".to_string()))?
        .into_owned();

    if pixels.len() < needed {
        return Err(CodecError::Transcode(format!(
            "pixel data holds {} bytes, {} frame(s) need {}",
            pixels.len(),
            layout.frames,
            needed
        )));
    }

    let fragments = pixels
        .chunks(layout.frame_len)
        .take(layout.frames)
        .map(|frame| encode_frame(frame, &layout.geometry))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CodecError::Transcode(e.to_string()))?;

    // Empty basic offset table, one fragment per frame.
    let mut dataset = obj.into_inner();
    dataset.put(DataElement::new_with_len(
        tags::PIXEL_DATA,
        VR::OB,
        Length::UNDEFINED,
        Value::PixelSequence(PixelFragmentSequence::new(Vec::<u32>::new(), fragments)),
    ));

    write_with_transfer_syntax(dataset, uids::RLE_LOSSLESS, output)
}

/// Decode RLE Lossless pixel data back to Explicit VR Little Endian.
///
/// Decoded in-crate rather than through the pixel data registry, whose RLE adapter
/// misplaces samples of 8-bit single-channel images by one byte.
pub fn rle_decompress(input: &Path, output: &Path) -> Result<(), CodecError> {
    let obj = open(input)?;
    if obj.meta().transfer_syntax() != uids::RLE_LOSSLESS {
        return Err(CodecError::Unsupported(format!(
            "expected RLE Lossless, found {}",
            obj.meta().transfer_syntax()
        )));
    }
    let layout = native_layout(&obj)?;

    let element = obj
        .element(tags::PIXEL_DATA)
        .map_err(|e| CodecError::Transcode(e.to_string()))?;
    let Value::PixelSequence(sequence) = element.value() else {
        return Err(CodecError::Unsupported("pixel data is not encapsulated".to_string()));
    };

    let mut pixels = Vec::new();
    for fragment in sequence.fragments() {
        let frame = decode_frame(fragment, &layout.geometry)
            .map_err(|e| CodecError::Transcode(e.to_string()))?;
        pixels.extend_from_slice(&frame);
    }

    let mut dataset = obj.into_inner();
    put_native_pixels(&mut dataset, pixels, layout.geometry.bits_allocated);
    write_with_transfer_syntax(dataset, uids::EXPLICIT_VR_LITTLE_ENDIAN, output)
}

/// Encode with JPEG Baseline (8-bit) through dicom-pixeldata's transcoder. Lossy.
pub fn jpeg_baseline_compress(input: &Path, output: &Path) -> Result<(), CodecError> {
    let mut obj = open(input)?;
    let ts = TransferSyntaxRegistry
        .get(uids::JPEG_BASELINE8_BIT)
        .ok_or_else(|| CodecError::Unsupported("JPEG Baseline is not registered".to_string()))?;

    obj.transcode(ts)
        .map_err(|e| CodecError::Transcode(e.to_string()))?;
    obj.write_to_file(output)
        .map_err(|e| CodecError::Write(format!("{:?}: {}", output, e)))
}

/// Decode any pixel data dicom-pixeldata understands into native Explicit VR Little Endian.
pub fn native_decompress(input: &Path, output: &Path) -> Result<(), CodecError> {
    let obj = open(input)?;

    let decoded = obj
        .decode_pixel_data()
        .map_err(|e| CodecError::Transcode(e.to_string()))?;
    let bits_allocated = decoded.bits_allocated();
    let pixels = decoded.data().to_vec();

    // The decoded buffer borrows `obj`; release it before taking the dataset out.
    drop(decoded);

    let mut dataset = obj.into_inner();
    put_native_pixels(&mut dataset, pixels, bits_allocated);
    write_with_transfer_syntax(dataset, uids::EXPLICIT_VR_LITTLE_ENDIAN, output)
}

/// Attributes that only describe encapsulated pixel data.
const ENCAPSULATION_TAGS: [Tag; 3] = [
    // Extended Offset Table
    Tag(0x7FE0, 0x0001),
    // Extended Offset Table Lengths
    Tag(0x7FE0, 0x0002),
    // Encapsulated Pixel Data Value Total Length
    Tag(0x7FE0, 0x0003),
];

/// Replace Pixel Data with native samples and drop whatever only made sense while encapsulated.
fn put_native_pixels(
    dataset: &mut InMemDicomObject<StandardDataDictionary>,
    pixels: Vec<u8>,
    bits_allocated: u16,
) {
    for tag in ENCAPSULATION_TAGS {
        dataset.remove_element(tag);
    }

    // 16-bit samples go back as OW words, 8-bit as OB bytes.
    if bits_allocated > 8 {
        let words: Vec<u16> = pixels
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        dataset.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(words.into()),
        ));
    } else {
        dataset.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::from(pixels),
        ));
    }
}

/// Save `dataset` with a freshly built file meta group announcing `ts_uid`.
fn write_with_transfer_syntax(
    dataset: InMemDicomObject<StandardDataDictionary>,
    ts_uid: &str,
    output: &Path,
) -> Result<(), CodecError> {
    let sop_class_uid = dataset
        .element(Tag(0x0008, 0x0016))
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.into_owned())
        .unwrap_or_else(|| uids::SECONDARY_CAPTURE_IMAGE_STORAGE.to_string());

    let sop_instance_uid = dataset
        .element(Tag(0x0008, 0x0018))
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.into_owned())
        .unwrap_or_else(|| "1.2.3.4.5".to_string());

    let file_meta = FileMetaTableBuilder::new()
        .transfer_syntax(ts_uid)
        .media_storage_sop_class_uid(sop_class_uid.as_str())
        .media_storage_sop_instance_uid(sop_instance_uid.as_str())
        .build()
        .map_err(|e| CodecError::Write(e.to_string()))?;

    // Fresh meta group: only the transfer syntax and SOP references carry over.
    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, file_meta);
    for elem in dataset {
        file_obj.put(elem);
    }

    file_obj
        .write_to_file(output)
        .map_err(|e| CodecError::Write(format!("{:?}: {}", output, e)))
}
