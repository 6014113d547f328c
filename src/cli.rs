//
// cli.rs
// Dicom-Archive-Tools
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::archive;
use crate::batch;
use crate::codec::CodecFamily;
use crate::dump::{self, RenderOptions};
use crate::extract::{ExtractOptions, DEFAULT_MAX_PIXEL_BYTES};
use crate::harness::{self, HarnessOptions};
use crate::image::DepthMapping;
use crate::metadata::{self, DumpBackend, MetadataDumper};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "dicom-archive-tools")]
#[command(about = "Inspect DICOM archives, extract images and benchmark codecs", long_about = None)]
pub struct Cli {
    /// Log debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a tar archive (.tar, .tar.gz, .tar.bz2)
    Inspect {
        archive: PathBuf,
        /// Only print the summary, not one line per entry
        #[arg(short, long)]
        quiet: bool,
        #[arg(long)]
        json: bool,
    },
    /// Unpack an archive, or a single member of it
    Unpack {
        archive: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        member: Option<String>,
    },
    /// Convert every DICOM file under a directory into PNG frames
    Extract {
        root: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "dcm")]
        extension: String,
        #[arg(long, value_enum, default_value_t = DepthMapping::Clamp)]
        depth_mapping: DepthMapping,
        #[arg(long, value_enum, default_value_t = DumpChoice::None)]
        dump: DumpChoice,
        #[arg(long, default_value_t = DEFAULT_MAX_PIXEL_BYTES)]
        max_pixel_bytes: u64,
    },
    /// Write a metadata dump for one file
    Dump {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = DumpBackend::Dcmdump)]
        backend: DumpBackend,
    },
    /// Compress and decompress files, then compare sizes and content
    Compress {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum)]
        codec: CodecFamily,
        /// Print trials as JSON instead of appending to the comparison report
        #[arg(long)]
        json: bool,
    },
    /// Print the dataset, one line per element
    Render {
        file: PathBuf,
        #[arg(long, default_value_t = 4)]
        max_depth: usize,
        #[arg(long, default_value_t = 64)]
        max_value_len: usize,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum DumpChoice {
    None,
    Dcmdump,
    Builtin,
}

impl From<DumpChoice> for Option<DumpBackend> {
    fn from(value: DumpChoice) -> Self {
        match value {
            DumpChoice::None => None,
            DumpChoice::Dcmdump => Some(DumpBackend::Dcmdump),
            DumpChoice::Builtin => Some(DumpBackend::Builtin),
        }
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Could not set up global logger")
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Inspect {
            archive: path,
            quiet,
            json,
        } => {
            let print_entries = !quiet && !json;
            let summary = archive::inspect_archive(&path, |entry| {
                if print_entries {
                    println!("{}", archive::describe_entry(entry));
                }
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                archive::print_summary(&summary);
            }
        }
        Commands::Unpack {
            archive: path,
            output,
            member,
        } => match member {
            Some(name) => {
                let target = archive::extract_member(&path, &name, &output)?;
                println!("Extracted {} to {:?}", name, target);
            }
            None => {
                archive::extract_all(&path, &output)?;
                println!("Unpacked {:?} into {:?}", path, output);
            }
        },
        Commands::Extract {
            root,
            output,
            extension,
            depth_mapping,
            dump,
            max_pixel_bytes,
        } => {
            if !root.is_dir() {
                bail!("{:?} is not a directory", root);
            }
            let backend: Option<DumpBackend> = dump.into();
            let options = ExtractOptions {
                depth_mapping,
                max_pixel_bytes,
                dumper: backend.map(MetadataDumper::new),
            };
            let report = batch::process_directory(&root, &output, &extension, &options);
            let images: usize = report.processed.iter().map(|o| o.images.len()).sum();
            println!(
                "Processed {} file(s), wrote {} image(s), skipped {}.",
                report.processed.len(),
                images,
                report.skipped.len()
            );
        }
        Commands::Dump {
            file,
            output,
            backend,
        } => {
            let target = metadata::dump_metadata(&file, &output, backend)?;
            println!("Metadata written to {:?}", target);
        }
        Commands::Compress {
            inputs,
            output,
            codec,
            json,
        } => {
            let codec = codec.build();
            let options = HarnessOptions {
                output_dir: output,
                write_report: !json,
            };
            let report = harness::run_harness(inputs.as_slice(), codec.as_ref(), &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for trial in &report.trials {
                    print!("{}", harness::format_trial(trial));
                }
                for (path, reasons) in &report.incompatible {
                    println!("{} skipped: {}", path.display(), reasons.join("; "));
                }
                for (path, reason) in &report.failed {
                    println!("{} failed: {}", path.display(), reason);
                }
                println!(
                    "Report appended to {:?}",
                    options.output_dir.join(format!("{}_comparison.txt", codec.id()))
                );
            }
        }
        Commands::Render {
            file,
            max_depth,
            max_value_len,
        } => dump::dump_file(
            &file,
            RenderOptions {
                max_depth,
                max_value_len,
            },
        )?,
    }

    Ok(())
}
