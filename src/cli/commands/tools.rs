use clap::Args;
use comfy_table::{Cell, Color};
use std::path::PathBuf;

use crate::cli::formatter::{print_tip, print_warning};
use crate::tools::Tool;

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Configuration file naming the executables
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: ToolsArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => crate::core::config::load_config(path)?,
        None => crate::core::config::default_config(),
    };

    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Tool", "Executable", "Status", "Path"]);

    let mut missing = Vec::new();
    for tool in Tool::all() {
        for (binary, located) in tool.locate(&config) {
            let (status, path) = match located {
                Some(path) => (Cell::new("found").fg(Color::Green), path.display().to_string()),
                None => {
                    missing.push((tool, binary));
                    (Cell::new("missing").fg(Color::Red), String::new())
                }
            };
            table.add_row(vec![
                Cell::new(tool.display_name()),
                Cell::new(binary),
                status,
                Cell::new(path),
            ]);
        }
    }
    println!("\nExternal tools");
    println!("{}", table);

    for (tool, binary) in &missing {
        print_warning(&format!("{} ({}) not found", tool, binary));
    }
    if missing.iter().any(|(tool, _)| *tool == Tool::Mafft) {
        print_tip("MAFFT is only needed for method = \"mafft\" or --align; try --method pairwise");
    }
    Ok(())
}
