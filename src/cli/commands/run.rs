use clap::Args;

use crate::cli::commands::{load_database, CommonArgs};
use crate::cli::formatter::{info_box, print_error, print_stats_table, print_success, print_tip};
use crate::core::pipeline::{Pipeline, PipelineResult, Query};
use crate::report::Reporter;
use crate::tools;
use crate::OdbError;

#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("query").required(true).args(["uniprot_id", "gene_id"]))]
pub struct RunArgs {
    /// UniProt accession of the query protein
    #[arg(short = 'u', long)]
    pub uniprot_id: Option<String>,

    /// OrthoDB gene id of the query protein (e.g. 9606_0:001c7b)
    #[arg(short = 'g', long)]
    pub gene_id: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl RunArgs {
    pub fn query(&self) -> anyhow::Result<Query> {
        match (&self.gene_id, &self.uniprot_id) {
            (Some(gene_id), _) => Ok(Query::Gene(gene_id.clone())),
            (None, Some(uniprot_id)) => Ok(Query::UniProt(uniprot_id.clone())),
            (None, None) => anyhow::bail!("either --uniprot-id or --gene-id must be provided"),
        }
    }
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.common.resolve_config()?;
    let query = args.query()?;
    let db = load_database(&config)?;

    let scoring_aligner = tools::scoring_aligner(&config);
    let final_aligner = tools::final_aligner(&config);
    let clusterer = tools::clusterer(&config);
    let pipeline = Pipeline::new(&config, &db, &scoring_aligner, &clusterer)
        .with_final_aligner(&final_aligner);

    let result = pipeline.run(&query)?;
    let paths = if config.write_files {
        Some(Reporter::new(&config.main_output_folder).write(&result)?)
    } else {
        None
    };

    if let Some(cause) = result.failure_cause() {
        print_error(&format!("{}: {}", query, cause));
        if let Some(paths) = &paths {
            print_tip(&format!("Failure record written to {}", paths.info_json.display()));
        }
        return Err(OdbError::Resolution(cause.clone()).into());
    }

    print_summary(&result);
    if let Some(paths) = paths {
        let mut items: Vec<String> = vec![paths.info_json.display().to_string()];
        items.extend(paths.sequence_files.iter().map(|p| p.display().to_string()));
        if let Some(aln) = &paths.alignment_file {
            items.push(aln.display().to_string());
        }
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        info_box("Output files", &refs);
    }
    print_success(&format!("Finished {}", query));
    Ok(())
}

pub(crate) fn print_summary(result: &PipelineResult) {
    let Some(analysis) = result.analysis() else {
        return;
    };
    print_stats_table(
        "Ortholog group",
        vec![
            ("Query gene", result.query_odb_gene_id.clone().unwrap_or_default()),
            ("Query UniProt", result.query_uniprot_id.clone().unwrap_or_else(|| "-".to_string())),
            ("Group", format!("{} ({})", analysis.group_id, analysis.level_name)),
            ("Members", analysis.member_ids.len().to_string()),
            ("After filtering", analysis.filtered_ids.len().to_string()),
            ("LDOs", analysis.ldo_ids.len().to_string()),
            ("Clusters", analysis.clusters.len().to_string()),
        ],
    );
}
