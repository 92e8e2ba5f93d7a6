use anyhow::Context;
use clap::{Args, ValueEnum};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::cli::commands::{load_database, CommonArgs};
use crate::cli::formatter::{create_progress_style, print_stats_table, print_success, print_warning};
use crate::core::config::Config;
use crate::core::pipeline::{Pipeline, Query};
use crate::core::resolver::IdResolver;
use crate::report::Reporter;
use crate::storage::OrthologyStore;
use crate::tools::{self, MultipleAligner, Clusterer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdType {
    Uniprot,
    Gene,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// File with one query id per line ('#' starts a comment)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Kind of id listed in the input file
    #[arg(long, value_enum, default_value = "uniprot")]
    pub id_type: IdType,

    /// Where to write the per-query status table (default: <output>/batch_summary.tsv)
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Completed,
    Failed,
    Error,
    Duplicate,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub query: String,
    pub status: Status,
    pub group_id: String,
    pub ldos: usize,
    pub clusters: usize,
    pub message: String,
}

/// Query ids of a batch file, blank lines and comments skipped
pub fn read_queries(path: &Path, id_type: IdType) -> anyhow::Result<Vec<Query>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(|id| match id_type {
            IdType::Uniprot => Query::UniProt(id.to_string()),
            IdType::Gene => Query::Gene(id.to_string()),
        })
        .collect())
}

/// Keep the first query per gene, matching accessions through the id
/// resolver. Accessions that do not resolve are keyed by their own text.
/// Every dropped query becomes a `Duplicate` row.
pub fn dedup_queries(
    queries: Vec<Query>,
    store: &dyn OrthologyStore,
    config: &Config,
) -> (Vec<Query>, Vec<BatchRow>) {
    let resolver = IdResolver::new(store, config.id_resolution.duplicate_action);
    let mut first_by_gene: HashMap<String, String> = HashMap::new();
    let mut kept = Vec::with_capacity(queries.len());
    let mut duplicates = Vec::new();

    for query in queries {
        let key = match &query {
            Query::Gene(gene_id) => gene_id.clone(),
            Query::UniProt(accession) => resolver
                .resolve(accession)
                .unwrap_or_else(|_| accession.clone()),
        };
        match first_by_gene.get(&key) {
            Some(first) => {
                warn!("Skipping {}: same gene as {}", query, first);
                duplicates.push(BatchRow {
                    query: query.id().to_string(),
                    status: Status::Duplicate,
                    group_id: String::new(),
                    ldos: 0,
                    clusters: 0,
                    message: format!("{} is already processed for {}", key, first),
                });
            }
            None => {
                first_by_gene.insert(key, query.id().to_string());
                kept.push(query);
            }
        }
    }
    (kept, duplicates)
}

/// Run one query and report it. Fatal errors become an `Error` row.
pub fn process_query(
    config: &Config,
    store: &dyn OrthologyStore,
    scoring_aligner: &dyn MultipleAligner,
    final_aligner: &dyn MultipleAligner,
    clusterer: &dyn Clusterer,
    query: &Query,
) -> BatchRow {
    let outcome = Pipeline::new(config, store, scoring_aligner, clusterer)
        .with_final_aligner(final_aligner)
        .run(query)
        .and_then(|result| {
            if config.write_files {
                Reporter::new(&config.main_output_folder).write(&result)?;
            }
            Ok(result)
        });

    match outcome {
        Ok(result) => match result.analysis() {
            Some(analysis) => BatchRow {
                query: query.id().to_string(),
                status: Status::Completed,
                group_id: analysis.group_id.clone(),
                ldos: analysis.ldo_ids.len(),
                clusters: analysis.clusters.len(),
                message: String::new(),
            },
            None => BatchRow {
                query: query.id().to_string(),
                status: Status::Failed,
                group_id: String::new(),
                ldos: 0,
                clusters: 0,
                message: result.critical_error().unwrap_or_default().to_string(),
            },
        },
        Err(e) => {
            error!("{} aborted: {}", query, e);
            BatchRow {
                query: query.id().to_string(),
                status: Status::Error,
                group_id: String::new(),
                ldos: 0,
                clusters: 0,
                message: e.to_string(),
            }
        }
    }
}

pub fn write_summary(path: &Path, rows: &[BatchRow]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn run(args: BatchArgs) -> anyhow::Result<()> {
    let config = args.common.resolve_config()?;
    let queries = read_queries(&args.input, args.id_type)?;
    if queries.is_empty() {
        print_warning(&format!("No query ids in {}", args.input.display()));
        return Ok(());
    }
    let db = load_database(&config)?;
    let (queries, duplicates) = dedup_queries(queries, &db, &config);

    let scoring_aligner = tools::scoring_aligner(&config);
    let final_aligner = tools::final_aligner(&config);
    let clusterer = tools::clusterer(&config);

    info!("Running {} queries", queries.len());
    let pb = ProgressBar::new(queries.len() as u64);
    pb.set_style(create_progress_style());

    let mut rows: Vec<BatchRow> = queries
        .par_iter()
        .map(|query| {
            let row = process_query(
                &config,
                &db,
                &scoring_aligner,
                &final_aligner,
                &clusterer,
                query,
            );
            pb.set_message(query.id().to_string());
            pb.inc(1);
            row
        })
        .collect();
    pb.finish_with_message("done");
    rows.extend(duplicates);

    let count = |status: Status| rows.iter().filter(|r| r.status == status).count();
    let completed = count(Status::Completed);
    let failed = count(Status::Failed);
    let errors = count(Status::Error);
    let duplicated = count(Status::Duplicate);

    let summary = args
        .summary
        .unwrap_or_else(|| config.main_output_folder.join("batch_summary.tsv"));
    write_summary(&summary, &rows)?;

    print_stats_table(
        "Batch",
        vec![
            ("Queries", rows.len().to_string()),
            ("Completed", completed.to_string()),
            ("Failed (resolution)", failed.to_string()),
            ("Errors", errors.to_string()),
            ("Duplicates skipped", duplicated.to_string()),
            ("Summary", summary.display().to_string()),
        ],
    );
    if errors > 0 {
        print_warning(&format!("{} queries aborted; see the summary for details", errors));
    }
    print_success(&format!("Processed {} queries", rows.len()));
    Ok(())
}
