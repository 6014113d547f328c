//
// lib.rs
// Dicom-Archive-Tools
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Public surface of the library: each module mirrors a CLI verb or shared utility.
pub mod archive;
pub mod batch;
pub mod cli;
pub mod codec;
pub mod dicom_access;
pub mod diff;
pub mod dump;
pub mod error;
pub mod extract;
pub mod harness;
pub mod image;
pub mod metadata;
pub mod models;
pub mod naming;
pub mod rle;
pub mod tool;
pub mod transcode;
pub mod validate;

pub use cli::{run as run_cli, Cli, Commands};
