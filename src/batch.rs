use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::extract::{extract_record, ExtractOptions};
use crate::models::ExtractOutcome;

/// What a directory walk produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ExtractOutcome>,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Files under `dir` whose extension matches `extension`, ignoring case, in walk order.
pub fn collect_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let wanted = extension.trim_start_matches('.');
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                // Unreadable subtrees are skipped like unreadable records.
                warn!("Skipping part of {:?}: {}", dir, e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case(wanted))
        })
        .map(|e| e.into_path())
        .collect()
}

pub fn process_directory(
    dir: &Path,
    output_dir: &Path,
    extension: &str,
    options: &ExtractOptions,
) -> BatchReport {
    println!("Processing directory: {:?} -> {:?}", dir, output_dir);

    let files = collect_files(dir, extension);
    println!("Found {} .{} file(s).", files.len(), extension.trim_start_matches('.'));

    let mut report = BatchReport::default();
    for path in files {
        match extract_record(&path, output_dir, options) {
            Ok(outcome) => {
                println!(
                    "{}: {} image(s) [{}]",
                    outcome.name,
                    outcome.images.len(),
                    outcome.layout.tag()
                );
                report.processed.push(outcome);
            }
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                report.skipped.push((path, e.to_string()));
            }
        }
    }

    report
}
