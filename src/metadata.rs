use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dicom::object::{open_file, DefaultDicomObject};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dump::{render_dataset, RenderOptions};
use crate::error::ToolError;
use crate::naming::derive_filename;
use crate::tool::ToolCommand;

/// Where metadata text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DumpBackend {
    /// DCMTK's `dcmdump`, output kept verbatim.
    Dcmdump,
    /// In-process rendering of the dataset.
    Builtin,
}

/// Writes `<output_dir>/<name>.txt` for a source file.
#[derive(Debug, Clone)]
pub struct MetadataDumper {
    backend: DumpBackend,
    dcmdump: ToolCommand,
}

impl MetadataDumper {
    pub fn new(backend: DumpBackend) -> Self {
        MetadataDumper {
            backend,
            dcmdump: ToolCommand::new("dcmdump"),
        }
    }

    /// Use a different `dcmdump` executable (path or name).
    pub fn with_dcmdump(mut self, command: ToolCommand) -> Self {
        self.dcmdump = command;
        self
    }

    pub fn backend(&self) -> DumpBackend {
        self.backend
    }

    /// Dump `source` next to the images derived from `obj`, using the same display name.
    pub fn dump(
        &self,
        source: &Path,
        obj: &DefaultDicomObject,
        name: &str,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {:?}", output_dir))?;
        let target = output_dir.join(format!("{}.txt", name));

        let text = match self.backend {
            DumpBackend::Builtin => render_dataset(obj, RenderOptions::default()),
            DumpBackend::Dcmdump => match self.dcmdump.run(&[source]) {
                Ok(output) => output.stdout,
                Err(ToolError::Failed {
                    program,
                    status,
                    stdout,
                    stderr,
                }) => {
                    // Whatever the tool printed is still worth keeping for inspection.
                    fs::write(&target, &stdout)
                        .with_context(|| format!("Failed to write {:?}", target))?;
                    warn!("{} exited with {} for {:?}: {}", program, status, source, stderr.trim());
                    return Err(ToolError::Failed {
                        program,
                        status,
                        stdout,
                        stderr,
                    })
                    .with_context(|| format!("Metadata dump of {:?} is incomplete", source));
                }
                Err(e) => return Err(e).context("Failed to run metadata dump tool"),
            },
        };

        fs::write(&target, text).with_context(|| format!("Failed to write {:?}", target))?;
        Ok(target)
    }
}

/// Open `path`, derive its display name and dump it into `output_dir`.
pub fn dump_metadata(path: &Path, output_dir: &Path, backend: DumpBackend) -> Result<PathBuf> {
    let obj: DefaultDicomObject = open_file(path).context("Failed to open DICOM file")?;
    let name = derive_filename(&obj, path);
    MetadataDumper::new(backend).dump(path, &obj, &name, output_dir)
}
