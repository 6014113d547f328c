//
// tool.rs
// Dicom-Archive-Tools
//
// Runs external command-line tools (DCMTK) synchronously and classifies the result by exit status.
//
// Thales Matheus Mendonça Santos - November 2025

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::ToolError;

/// An external program plus the arguments every invocation starts with.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    base_args: Vec<String>,
}

/// Captured output of a tool that exited successfully.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        ToolCommand {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run with `paths` appended as positional arguments and wait for the process to exit.
    pub fn run<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ToolOutput, ToolError> {
        let mut command = Command::new(&self.program);
        command.args(&self.base_args);
        command.args(paths.iter().map(|p| p.as_ref().as_os_str()));
        debug!("Running {} {:?}", self.program, command.get_args().collect::<Vec<&OsStr>>());

        let output = command.output().map_err(|source| match source.kind() {
            ErrorKind::NotFound => ToolError::NotFound {
                program: self.program.clone(),
            },
            _ => ToolError::Spawn {
                program: self.program.clone(),
                source,
            },
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ToolError::Failed {
                program: self.program.clone(),
                status: output.status,
                stdout,
                stderr,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_reported_as_not_found() {
        let tool = ToolCommand::new("definitely-not-a-dcmtk-binary-4f1c");
        let err = tool.run(&[Path::new("in.dcm")]).unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_checked() {
        let ok = ToolCommand::new("sh")
            .with_args(["-c", "echo dumped"])
            .run::<&Path>(&[])
            .expect("sh should run");
        assert_eq!(ok.stdout.trim(), "dumped");

        let failed = ToolCommand::new("sh")
            .with_args(["-c", "echo partial; exit 3"])
            .run::<&Path>(&[])
            .unwrap_err();
        match failed {
            ToolError::Failed { stdout, status, .. } => {
                assert_eq!(stdout.trim(), "partial");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
