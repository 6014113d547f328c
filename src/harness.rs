//
// harness.rs
// Dicom-Archive-Tools
//
// Compression harness: compress, decompress, measure sizes and diff the dataset content of each input file.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use dicom::object::open_file;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::diff::{diff_lines, format_diff};
use crate::dump::{render_file, RenderOptions};
use crate::models::{CompressionTrial, ContentDiff, SizeComparison};
use crate::validate::check_encoding_constraints;

/// Values are compared untruncated so a change late in a long value still shows up.
const DIFF_RENDER: RenderOptions = RenderOptions {
    max_depth: 8,
    max_value_len: 4096,
};

/// Knobs for a harness run.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub output_dir: PathBuf,
    /// Append each trial to `<out>/<codec>_comparison.txt`.
    pub write_report: bool,
}

impl HarnessOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        HarnessOptions {
            output_dir: output_dir.into(),
            write_report: true,
        }
    }
}

/// Result of running one file through a codec.
#[derive(Debug, Clone)]
pub enum TrialOutcome {
    Completed(CompressionTrial),
    /// The file was skipped untouched; carries the constraint violations.
    Incompatible(Vec<String>),
}

#[derive(Debug, Default, Serialize)]
pub struct HarnessReport {
    pub trials: Vec<CompressionTrial>,
    pub incompatible: Vec<(PathBuf, Vec<String>)>,
    pub failed: Vec<(PathBuf, String)>,
}

fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string())
}

/// Stem for an input's artifacts that no earlier input of the run has taken:
/// `case`, then `case_2`, `case_3`, ...
fn unique_stem(input: &Path, taken: &mut HashSet<String>) -> String {
    let stem = input_stem(input);
    let mut candidate = stem.clone();
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{}_{}", stem, n);
    }
    candidate
}

/// Compress then decompress `input`, writing both results into `output_dir`.
pub fn run_trial(input: &Path, codec: &dyn Codec, output_dir: &Path) -> Result<TrialOutcome> {
    run_named_trial(input, &input_stem(input), codec, output_dir)
}

fn run_named_trial(
    input: &Path,
    stem: &str,
    codec: &dyn Codec,
    output_dir: &Path,
) -> Result<TrialOutcome> {
    // Incompatible inputs are reported before any artifact is written.
    if let Some(constraints) = codec.constraints() {
        let obj = open_file(input).with_context(|| format!("Failed to open DICOM file {:?}", input))?;
        let problems = check_encoding_constraints(&obj, &constraints);
        if !problems.is_empty() {
            return Ok(TrialOutcome::Incompatible(problems));
        }
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let compressed_path = output_dir.join(format!("{}_{}_compressed.dcm", stem, codec.id()));
    let decompressed_path = output_dir.join(format!("{}_{}_decompressed.dcm", stem, codec.id()));

    codec
        .compress(input, &compressed_path)
        .with_context(|| format!("{} compression failed for {:?}", codec.id(), input))?;
    debug!("Compressed {:?} -> {:?}", input, compressed_path);
    codec
        .decompress(&compressed_path, &decompressed_path)
        .with_context(|| format!("{} decompression failed for {:?}", codec.id(), compressed_path))?;
    debug!("Decompressed {:?} -> {:?}", compressed_path, decompressed_path);

    let original_size = file_size(input)?;
    let compressed_size = file_size(&compressed_path)?;
    let decompressed_size = file_size(&decompressed_path)?;

    // Dataset text only; the meta group differs by transfer syntax on every run.
    let diff = diff_files(input, &decompressed_path)?;

    Ok(TrialOutcome::Completed(CompressionTrial {
        input: input.to_path_buf(),
        codec: codec.id().to_string(),
        compressed_path,
        decompressed_path,
        original_size,
        compressed_size,
        decompressed_size,
        sizes: SizeComparison::compute(original_size, compressed_size, decompressed_size),
        diff,
    }))
}

/// Run every input through `codec`. Per-file problems are recorded and the run goes on.
pub fn run_harness<P: AsRef<Path>>(
    inputs: &[P],
    codec: &dyn Codec,
    options: &HarnessOptions,
) -> Result<HarnessReport> {
    let mut report = HarnessReport::default();
    let report_path = options
        .output_dir
        .join(format!("{}_comparison.txt", codec.id()));

    if options.write_report {
        fs::create_dir_all(&options.output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", options.output_dir))?;
        append_report(
            &report_path,
            &format!("=== {} run started {} ===\n", codec.id(), Local::now().format("%Y-%m-%d %H:%M:%S")),
        )?;
    }

    let mut taken = HashSet::new();
    for input in inputs {
        let input = input.as_ref();
        let stem = unique_stem(input, &mut taken);
        match run_named_trial(input, &stem, codec, &options.output_dir) {
            Ok(TrialOutcome::Completed(trial)) => {
                if options.write_report {
                    append_report(&report_path, &format_trial(&trial))?;
                }
                report.trials.push(trial);
            }
            Ok(TrialOutcome::Incompatible(reasons)) => {
                warn!("Skipping {:?}, not compatible with {}: {}", input, codec.id(), reasons.join("; "));
                if options.write_report {
                    append_report(
                        &report_path,
                        &format!("{}\n  incompatible: {}\n", input.display(), reasons.join("; ")),
                    )?;
                }
                report.incompatible.push((input.to_path_buf(), reasons));
            }
            Err(err) => {
                // A failed file never aborts the run; the error chain goes into the report.
                warn!("{:#}", err);
                if options.write_report {
                    append_report(&report_path, &format!("{}\n  failed: {:#}\n", input.display(), err))?;
                }
                report.failed.push((input.to_path_buf(), format!("{:#}", err)));
            }
        }
    }

    Ok(report)
}

/// Diff the rendered datasets of two DICOM files.
pub fn diff_files(before: &Path, after: &Path) -> Result<ContentDiff> {
    let a = render_file(before, DIFF_RENDER)?;
    let b = render_file(after, DIFF_RENDER)?;
    Ok(diff_lines(&a, &b))
}

/// Report block for one trial: sizes, then the differing lines.
pub fn format_trial(trial: &CompressionTrial) -> String {
    let sizes = &trial.sizes;
    let mut out = format!("{}\n", trial.input.display());
    out.push_str(&format!("  original size: {} bytes\n", trial.original_size));
    out.push_str(&format!("  compressed size: {} bytes\n", trial.compressed_size));
    out.push_str(&format!("  decompressed size: {} bytes\n", trial.decompressed_size));
    out.push_str(&format!(
        "  compression: {} bytes saved, ratio {:.3}\n",
        sizes.compress_delta, sizes.compress_ratio
    ));
    out.push_str(&format!(
        "  decompression: {} bytes added, ratio {:.3}\n",
        sizes.decompress_delta, sizes.decompress_ratio
    ));
    out.push_str(&format!("  data loss: {} bytes\n", sizes.data_loss));
    out.push_str(&format!("  content differences: {} line(s)\n", trial.diff.len()));
    for line in format_diff(&trial.diff) {
        out.push_str("    ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn append_report(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open report {:?}", path))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("Failed to write report {:?}", path))
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)
        .with_context(|| format!("Failed to stat {:?}", path))?
        .len())
}
