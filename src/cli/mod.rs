pub mod commands;
pub mod formatter;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "odbgroup",
    version,
    about = "Ortholog group selection and LDO redundancy reduction over OrthoDB",
    long_about = "odbgroup picks the OrthoDB ortholog group of a query protein at a taxonomic level, \
                  filters its members, keeps the least divergent ortholog of every species, and \
                  clusters those with CD-HIT, optionally aligning the representatives with MAFFT."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline for one query
    Run(commands::run::RunArgs),

    /// Run the pipeline for every query listed in a file
    Batch(commands::batch::BatchArgs),

    /// List the ortholog groups available for a query
    Groups(commands::groups::GroupsArgs),

    /// Write or show the default configuration
    Config(commands::config::ConfigArgs),

    /// Check that the external tools can be found
    Tools(commands::tools::ToolsArgs),
}
