//
// rle.rs
// Dicom-Archive-Tools
//
// DICOM RLE Lossless (PS3.5 Annex G) frame encoder and decoder.
//
// Thales Matheus Mendonça Santos - November 2025

use thiserror::Error;

/// An RLE frame header holds at most 15 segment offsets.
const MAX_SEGMENTS: usize = 15;
const HEADER_LEN: usize = 64;
/// Longest literal or replicate run PackBits can express.
const MAX_RUN: usize = 128;
/// Header byte -128: no-op, used to pad segments to even length.
const NOOP: u8 = 0x80;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RleError {
    #[error("Bits Allocated {0} is not supported (expected 8 or 16)")]
    UnsupportedBitsAllocated(u16),

    #[error("{0} segments needed, at most 15 are allowed")]
    TooManySegments(usize),

    #[error("Frame buffer has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Frame of {rows}x{columns}x{samples} samples is too large to address")]
    FrameTooLarge {
        rows: usize,
        columns: usize,
        samples: usize,
    },

    #[error("Invalid RLE header: {0}")]
    InvalidHeader(String),

    #[error("Segment {index} decodes to {actual} bytes, expected {expected}")]
    SegmentLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Geometry of one frame of native, pixel-interleaved, little-endian samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub rows: usize,
    pub columns: usize,
    pub samples_per_pixel: usize,
    pub bits_allocated: u16,
}

impl FrameGeometry {
    fn bytes_per_sample(&self) -> Result<usize, RleError> {
        match self.bits_allocated {
            8 => Ok(1),
            16 => Ok(2),
            other => Err(RleError::UnsupportedBitsAllocated(other)),
        }
    }

    fn segments(&self) -> Result<usize, RleError> {
        let segments = self.samples_per_pixel * self.bytes_per_sample()?;
        if segments > MAX_SEGMENTS {
            return Err(RleError::TooManySegments(segments));
        }
        Ok(segments)
    }

    /// Bytes in one native frame. Fails instead of wrapping on absurd geometries.
    pub fn frame_len(&self) -> Result<usize, RleError> {
        let bytes = usize::from(self.bits_allocated.max(8)).div_ceil(8);
        self.rows
            .checked_mul(self.columns)
            .and_then(|n| n.checked_mul(self.samples_per_pixel))
            .and_then(|n| n.checked_mul(bytes))
            .ok_or(RleError::FrameTooLarge {
                rows: self.rows,
                columns: self.columns,
                samples: self.samples_per_pixel,
            })
    }
}

/// Byte position inside an interleaved little-endian pixel for a segment.
/// Segments run sample by sample, most significant byte first.
fn byte_position(segment: usize, bytes_per_sample: usize) -> usize {
    let sample = segment / bytes_per_sample;
    let significance = segment % bytes_per_sample;
    sample * bytes_per_sample + (bytes_per_sample - 1 - significance)
}

/// Encode one frame into a single RLE fragment (header + segments).
pub fn encode_frame(src: &[u8], geometry: &FrameGeometry) -> Result<Vec<u8>, RleError> {
    let bytes_per_sample = geometry.bytes_per_sample()?;
    let segments = geometry.segments()?;
    let expected = geometry.frame_len()?;
    if src.len() != expected {
        return Err(RleError::FrameSize {
            expected,
            actual: src.len(),
        });
    }

    let pixel_stride = segments;
    let mut out = vec![0u8; HEADER_LEN];
    out[0..4].copy_from_slice(&(segments as u32).to_le_bytes());

    let mut plane = Vec::with_capacity(geometry.rows * geometry.columns);
    for segment in 0..segments {
        let offset = out.len() as u32;
        out[4 + segment * 4..8 + segment * 4].copy_from_slice(&offset.to_le_bytes());

        plane.clear();
        plane.extend(
            src.iter()
                .skip(byte_position(segment, bytes_per_sample))
                .step_by(pixel_stride)
                .copied(),
        );

        // Runs never cross row boundaries.
        for row in plane.chunks(geometry.columns.max(1)) {
            encode_row(row, &mut out);
        }
        if out.len() % 2 != 0 {
            out.push(NOOP);
        }
    }

    Ok(out)
}

/// PackBits-encode one row.
pub fn encode_row(src: &[u8], dst: &mut Vec<u8>) {
    let mut literal_start = 0;
    let mut i = 0;

    while i < src.len() {
        let mut run = 1;
        while i + run < src.len() && src[i + run] == src[i] && run < MAX_RUN {
            run += 1;
        }

        if run >= 2 {
            flush_literal(&src[literal_start..i], dst);
            // -(run - 1) as a signed byte.
            dst.push((257 - run) as u8);
            dst.push(src[i]);
            i += run;
            literal_start = i;
        } else {
            i += 1;
            if i - literal_start == MAX_RUN {
                flush_literal(&src[literal_start..i], dst);
                literal_start = i;
            }
        }
    }

    flush_literal(&src[literal_start..], dst);
}

fn flush_literal(literal: &[u8], dst: &mut Vec<u8>) {
    if literal.is_empty() {
        return;
    }
    dst.push((literal.len() - 1) as u8);
    dst.extend_from_slice(literal);
}

fn read_header(fragment: &[u8]) -> Result<Vec<usize>, RleError> {
    if fragment.len() < HEADER_LEN {
        return Err(RleError::InvalidHeader(format!(
            "fragment is {} bytes long",
            fragment.len()
        )));
    }
    let word = |i: usize| {
        u32::from_le_bytes([
            fragment[i * 4],
            fragment[i * 4 + 1],
            fragment[i * 4 + 2],
            fragment[i * 4 + 3],
        ]) as usize
    };

    let count = word(0);
    if count == 0 || count > MAX_SEGMENTS {
        return Err(RleError::InvalidHeader(format!("{} segments", count)));
    }
    let mut offsets: Vec<usize> = (1..=count).map(word).collect();
    offsets.push(fragment.len());

    if offsets[0] != HEADER_LEN || offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(RleError::InvalidHeader(format!("offsets {:?}", offsets)));
    }
    Ok(offsets)
}

/// Decode a PackBits segment, stopping once `expected` bytes are produced.
pub fn decode_segment(src: &[u8], expected: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected);
    let mut pos = 0;

    while pos < src.len() && out.len() < expected {
        let header = src[pos] as i8;
        pos += 1;
        match header {
            0..=127 => {
                let len = header as usize + 1;
                let end = (pos + len).min(src.len());
                out.extend_from_slice(&src[pos..end]);
                pos = end;
            }
            -127..=-1 => {
                if let Some(&value) = src.get(pos) {
                    let len = (1 - header as isize) as usize;
                    out.extend(std::iter::repeat(value).take(len));
                }
                pos += 1;
            }
            -128 => {}
        }
    }

    out.truncate(expected);
    out
}

/// Decode one RLE fragment back into native interleaved little-endian samples.
pub fn decode_frame(fragment: &[u8], geometry: &FrameGeometry) -> Result<Vec<u8>, RleError> {
    let bytes_per_sample = geometry.bytes_per_sample()?;
    let segments = geometry.segments()?;
    let offsets = read_header(fragment)?;
    if offsets.len() - 1 != segments {
        return Err(RleError::InvalidHeader(format!(
            "{} segments found, {} expected",
            offsets.len() - 1,
            segments
        )));
    }

    let mut out = vec![0u8; geometry.frame_len()?];
    let plane_len = geometry.rows * geometry.columns;

    for segment in 0..segments {
        let decoded = decode_segment(&fragment[offsets[segment]..offsets[segment + 1]], plane_len);
        if decoded.len() != plane_len {
            return Err(RleError::SegmentLength {
                index: segment,
                expected: plane_len,
                actual: decoded.len(),
            });
        }
        let start = byte_position(segment, bytes_per_sample);
        for (dst, &value) in out.iter_mut().skip(start).step_by(segments).zip(decoded.iter()) {
            *dst = value;
        }
    }

    Ok(out)
}
