/// On-disk artifacts of a pipeline run
///
/// ```text
/// <out>/info_jsons/<prefix>_info.json
/// <out>/info_jsons/failures/<query id>_info.json
/// <out>/sequences/<prefix>_{full_og,ldos,clustered_ldos}.fasta
/// <out>/alignments/<prefix>_clustered_ldos_aln.fasta
/// ```
pub mod json;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::bio::fasta::write_fasta;
use crate::bio::sequence::SequenceRecord;
use crate::core::pipeline::{PipelineResult, PipelineStage};
use crate::tools::runner::sanitize;
use crate::Result;

/// Files written for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportPaths {
    pub info_json: PathBuf,
    pub sequence_files: Vec<PathBuf>,
    pub alignment_file: Option<PathBuf>,
}

pub struct Reporter {
    output_folder: PathBuf,
}

impl Reporter {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }

    fn info_dir(&self) -> PathBuf {
        self.output_folder.join("info_jsons")
    }

    pub fn failure_json_path(&self, query_id: &str) -> PathBuf {
        self.info_dir()
            .join("failures")
            .join(format!("{}_info.json", sanitize(query_id)))
    }

    pub fn info_json_path(&self, prefix: &str) -> PathBuf {
        self.info_dir().join(format!("{}_info.json", prefix))
    }

    pub fn write(&self, result: &PipelineResult) -> Result<ReportPaths> {
        info!("[{}] {:?}", result.query.id(), PipelineStage::Reporting);

        let (analysis, prefix) = match (result.analysis(), result.output_prefix()) {
            (Some(analysis), Some(prefix)) => (analysis, prefix),
            _ => {
                let path = self.failure_json_path(result.query.id());
                json::write_info_json(&path, &json::info_json(result, None)?)?;
                info!("Wrote failure record to {}", path.display());
                return Ok(ReportPaths {
                    info_json: path,
                    ..Default::default()
                });
            }
        };

        let sequences_dir = self.output_folder.join("sequences");
        let members: Vec<&SequenceRecord> = analysis.member_sequences.values().collect();
        let ldos: Vec<&SequenceRecord> = analysis.ldo_sequences.values().collect();
        let representatives = analysis.representative_sequences();

        let mut sequence_files = Vec::with_capacity(3);
        for (suffix, records) in [
            ("full_og", &members),
            ("ldos", &ldos),
            ("clustered_ldos", &representatives),
        ] {
            let path = sequences_dir.join(format!("{}_{}.fasta", prefix, suffix));
            write_into(&path, records)?;
            sequence_files.push(path);
        }

        let alignment_file = match &analysis.alignment {
            Some(alignment) => {
                let path = self
                    .output_folder
                    .join("alignments")
                    .join(format!("{}_clustered_ldos_aln.fasta", prefix));
                let rows: Vec<&SequenceRecord> = alignment.rows.iter().collect();
                write_into(&path, &rows)?;
                Some(path)
            }
            None => None,
        };

        let info_json = self.info_json_path(&prefix);
        let value = json::info_json(result, alignment_file.as_deref())?;
        json::write_info_json(&info_json, &value)?;
        info!("Wrote {}", info_json.display());

        Ok(ReportPaths {
            info_json,
            sequence_files,
            alignment_file,
        })
    }
}

fn write_into(path: &Path, records: &[&SequenceRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_fasta(path, records)
}
