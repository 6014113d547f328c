//
// main.rs
// Dicom-Archive-Tools
//
// Binary entry point that hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_archive_tools::cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
