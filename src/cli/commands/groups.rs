use clap::Args;

use crate::cli::commands::{load_database, CommonArgs};
use crate::cli::formatter::{print_table, print_tip};
use crate::core::resolver::{GroupResolver, IdResolver};
use crate::storage::OrthoDatabase;

#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("query").required(true).args(["uniprot_id", "gene_id"]))]
pub struct GroupsArgs {
    /// UniProt accession of the query protein
    #[arg(short = 'u', long)]
    pub uniprot_id: Option<String>,

    /// OrthoDB gene id of the query protein
    #[arg(short = 'g', long)]
    pub gene_id: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn run(args: GroupsArgs) -> anyhow::Result<()> {
    let config = args.common.resolve_config()?;
    let db = load_database(&config)?;

    let gene_id = match (&args.gene_id, &args.uniprot_id) {
        (Some(gene_id), _) => gene_id.clone(),
        (None, Some(uniprot_id)) => {
            IdResolver::new(&db, config.id_resolution.duplicate_action).resolve(uniprot_id)?
        }
        (None, None) => anyhow::bail!("either --uniprot-id or --gene-id must be provided"),
    };
    list_groups(&db, &gene_id, &config.og_select.level_name, args.json)
}

fn list_groups(db: &OrthoDatabase, gene_id: &str, selected_level: &str, json: bool) -> anyhow::Result<()> {
    let groups = GroupResolver::new(db).available_groups(gene_id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    let species = db.species_name(gene_id).unwrap_or("unknown species");
    println!("\nOrtholog groups of {} ({})", gene_id, species);
    let rows = groups
        .iter()
        .map(|g| {
            let marker = if g.level_name == selected_level { "*" } else { "" };
            vec![
                marker.to_string(),
                g.group_id.clone(),
                g.level_name.clone(),
                g.level_id.to_string(),
                g.member_count.to_string(),
                g.species_count.to_string(),
                g.name.clone(),
            ]
        })
        .collect();
    print_table(
        &["", "Group", "Level", "Taxid", "Genes", "Species", "Name"],
        rows,
    );
    if groups.iter().all(|g| g.level_name != selected_level) {
        print_tip(&format!(
            "No group at the configured level `{}`; pass --level with one of the levels above",
            selected_level
        ));
    }
    Ok(())
}
