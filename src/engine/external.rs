use crate::engine::OverlapEngine;
use crate::error::InsertionError;
use crate::overlap::{read_overlap_table, OverlapRecord};
use crate::utils::ENGINE_SCRIPT_FILE;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Runs an external overlap search program and parses what it prints.
///
/// The command line is `program [script] args... annotation insertions`. The
/// program must print the raw tab-separated overlap table (header row included)
/// to standard output and exit with status zero. Output without a single record
/// after the header row fails with [`InsertionError::EngineNoOutput`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalEngine {
    pub program: String,
    pub script: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for ExternalEngine {
    /// `perl gff_genomics.pl -G`
    fn default() -> ExternalEngine {
        ExternalEngine {
            program: String::from("perl"),
            script: Some(PathBuf::from(ENGINE_SCRIPT_FILE)),
            args: vec![String::from("-G")],
        }
    }
}

impl ExternalEngine {
    pub fn new<T: Into<String>>(program: T) -> ExternalEngine {
        ExternalEngine {
            program: program.into(),
            script: None,
            args: Vec::new(),
        }
    }

    pub fn with_script<P: Into<PathBuf>>(mut self, script: P) -> ExternalEngine {
        self.script = Some(script.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> ExternalEngine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self, annotation: &Path, insertions: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(script) = &self.script {
            cmd.arg(script);
        }
        cmd.args(&self.args).arg(annotation).arg(insertions);
        cmd
    }
}

impl OverlapEngine for ExternalEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn required_inputs(&self) -> Vec<&Path> {
        self.script.iter().map(PathBuf::as_path).collect()
    }

    fn find_overlaps(
        &self,
        annotation: &Path,
        insertions: &Path,
    ) -> Result<Vec<OverlapRecord>, InsertionError> {
        let mut cmd = self.command(annotation, insertions);
        info!("Running overlap engine: {:?}", cmd);

        let output = cmd.output().map_err(|source| InsertionError::EngineSpawn {
            program: self.program.clone(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(InsertionError::EngineFailed {
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("overlap engine wrote to stderr: {}", stderr);
        }
        debug!("overlap engine printed {} bytes", output.stdout.len());

        // a header row alone is no output either
        let table = read_overlap_table(Cursor::new(output.stdout))?;
        if table.records.is_empty() {
            return Err(InsertionError::EngineNoOutput(self.program.clone()));
        }
        Ok(table.records)
    }
}
