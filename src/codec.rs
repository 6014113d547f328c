//
// codec.rs
// Dicom-Archive-Tools
//
// Codec families for the compression harness: DCMTK subprocesses or in-process transcoders behind one trait.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::tool::ToolCommand;
use crate::transcode;
use crate::validate::EncodingConstraints;

/// A compress/decompress pair. Both directions write a complete DICOM file to `output`.
pub trait Codec {
    /// Short identifier used in file names and reports.
    fn id(&self) -> &str;
    fn compress(&self, input: &Path, output: &Path) -> Result<(), CodecError>;
    fn decompress(&self, input: &Path, output: &Path) -> Result<(), CodecError>;
    /// Constraints checked before compressing; `None` means anything goes.
    fn constraints(&self) -> Option<EncodingConstraints> {
        None
    }
}

/// Codec families selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CodecFamily {
    /// DCMTK dcmcrle / dcmdrle
    DcmtkRle,
    /// DCMTK dcmcjpls / dcmdjpls
    DcmtkJpls,
    /// In-process RLE Lossless
    Rle,
    /// In-process JPEG Baseline (8-bit, lossy)
    JpegBaseline,
}

impl CodecFamily {
    pub fn id(self) -> &'static str {
        match self {
            CodecFamily::DcmtkRle => "dcmtk-rle",
            CodecFamily::DcmtkJpls => "dcmtk-jpls",
            CodecFamily::Rle => "rle",
            CodecFamily::JpegBaseline => "jpeg-baseline",
        }
    }

    pub fn build(self) -> Box<dyn Codec> {
        match self {
            CodecFamily::DcmtkRle => Box::new(ExternalCodec::new(
                self.id(),
                ToolCommand::new("dcmcrle"),
                ToolCommand::new("dcmdrle"),
            )),
            CodecFamily::DcmtkJpls => Box::new(
                ExternalCodec::new(
                    self.id(),
                    ToolCommand::new("dcmcjpls"),
                    ToolCommand::new("dcmdjpls"),
                )
                .with_constraints(EncodingConstraints::JPEG_LS),
            ),
            CodecFamily::Rle => Box::new(RleCodec),
            CodecFamily::JpegBaseline => Box::new(JpegBaselineCodec),
        }
    }
}

/// Codec implemented by two external programs invoked as `tool input output`.
#[derive(Debug, Clone)]
pub struct ExternalCodec {
    id: String,
    compressor: ToolCommand,
    decompressor: ToolCommand,
    constraints: Option<EncodingConstraints>,
}

impl ExternalCodec {
    pub fn new(id: impl Into<String>, compressor: ToolCommand, decompressor: ToolCommand) -> Self {
        ExternalCodec {
            id: id.into(),
            compressor,
            decompressor,
            constraints: None,
        }
    }

    pub fn with_constraints(mut self, constraints: EncodingConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }
}

impl Codec for ExternalCodec {
    fn id(&self) -> &str {
        &self.id
    }

    fn compress(&self, input: &Path, output: &Path) -> Result<(), CodecError> {
        self.compressor.run(&[input, output])?;
        Ok(())
    }

    fn decompress(&self, input: &Path, output: &Path) -> Result<(), CodecError> {
        self.decompressor.run(&[input, output])?;
        Ok(())
    }

    fn constraints(&self) -> Option<EncodingConstraints> {
        self.constraints.clone()
    }
}

/// RLE Lossless, encoded and decoded in-process.
#[derive(Debug, Clone, Copy)]
pub struct RleCodec;

impl Codec for RleCodec {
    fn id(&self) -> &str {
        CodecFamily::Rle.id()
    }

    fn compress(&self, input: &Path, output: &Path) -> Result<(), CodecError> {
        transcode::rle_compress(input, output)
    }

    fn decompress(&self, input: &Path, output: &Path) -> Result<(), CodecError> {
        transcode::rle_decompress(input, output)
    }
}

/// JPEG Baseline through dicom-pixeldata; decompression goes back to native pixel data.
#[derive(Debug, Clone, Copy)]
pub struct JpegBaselineCodec;

impl Codec for JpegBaselineCodec {
    fn id(&self) -> &str {
        CodecFamily::JpegBaseline.id()
    }

    fn compress(&self, input: &Path, output: &Path) -> Result<(), CodecError> {
        transcode::jpeg_baseline_compress(input, output)
    }

    fn decompress(&self, input: &Path, output: &Path) -> Result<(), CodecError> {
        transcode::native_decompress(input, output)
    }

    fn constraints(&self) -> Option<EncodingConstraints> {
        Some(EncodingConstraints::JPEG_BASELINE)
    }
}
