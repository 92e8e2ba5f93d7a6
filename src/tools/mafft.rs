/// MAFFT multiple sequence alignment driver
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::bio::fasta::{parse_fasta, write_fasta};
use crate::bio::sequence::SequenceRecord;
use crate::tools::runner::{staging_dir, ToolCommand};
use crate::tools::traits::{MsaOutput, MultipleAligner};
use crate::{OdbError, Result};

#[derive(Debug, Clone)]
pub struct Mafft {
    executable: String,
    threads: usize,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
    temp_root: Option<PathBuf>,
}

impl Mafft {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            threads: 1,
            extra_args: Vec::new(),
            timeout: None,
            temp_root: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// `mafft --thread N --quiet --anysymbol [extra...] input > output`
    pub fn command(&self, input: PathBuf, output: PathBuf) -> ToolCommand {
        ToolCommand::new(&self.executable)
            .arg("--thread")
            .arg(self.threads.to_string())
            .args(["--quiet", "--anysymbol"])
            .args(&self.extra_args)
            .arg(input)
            .stdout_to(output)
    }
}

impl MultipleAligner for Mafft {
    fn name(&self) -> &str {
        "mafft"
    }

    fn align(&self, records: &[&SequenceRecord], run_label: &str) -> Result<MsaOutput> {
        let fail = |msg: String| OdbError::AlignmentTool(msg);

        let staging = staging_dir(self.temp_root.as_deref(), run_label)
            .map_err(|e| fail(format!("cannot create staging directory: {}", e)))?;
        let input = staging.path().join("input.fasta");
        let output = staging.path().join("aligned.fasta");

        // headers carry only the id so rows map back without ambiguity
        let stripped: Vec<SequenceRecord> = records
            .iter()
            .map(|r| SequenceRecord::new(r.id.clone(), r.sequence.clone()))
            .collect();
        let refs: Vec<&SequenceRecord> = stripped.iter().collect();
        write_fasta(&input, &refs)?;

        let command = self.command(input, output.clone());
        let rendered = command.render();
        info!("Aligning {} sequences with MAFFT", records.len());
        command
            .run(self.timeout)
            .map_err(|e| fail(e.to_string()))?;

        let rows = parse_fasta(&output)
            .map_err(|e| fail(format!("unreadable MAFFT output: {}", e)))?;
        check_rows(records, &rows).map_err(fail)?;
        debug!("MAFFT produced {} columns", rows.first().map_or(0, |r| r.len()));

        Ok(MsaOutput {
            command: rendered,
            rows,
        })
    }
}

/// Every input id must come back exactly once, all rows equally long.
fn check_rows(records: &[&SequenceRecord], rows: &[SequenceRecord]) -> std::result::Result<(), String> {
    if rows.len() != records.len() {
        return Err(format!(
            "expected {} aligned rows, got {}",
            records.len(),
            rows.len()
        ));
    }
    for record in records {
        if !rows.iter().any(|r| r.id == record.id) {
            return Err(format!("{} is missing from the alignment", record.id));
        }
    }
    if let Some(first) = rows.first() {
        if let Some(bad) = rows.iter().find(|r| r.len() != first.len()) {
            return Err(format!(
                "row {} has {} columns, expected {}",
                bad.id,
                bad.len(),
                first.len()
            ));
        }
    }
    Ok(())
}
