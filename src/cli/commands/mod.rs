pub mod batch;
pub mod config;
pub mod groups;
pub mod run;
pub mod tools;

use anyhow::Context;
use clap::Args;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::formatter::{create_spinner_style, format_number};
use crate::core::config::{default_config, load_config, Config};
use crate::core::identity::IdentityMethod;
use crate::storage::OrthoDatabase;

/// Options shared by every command that runs against the database
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Configuration file (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the OrthoDB release files
    #[arg(short = 'd', long, value_name = "DIR", env = "ODBGROUP_DB")]
    pub database_dir: Option<PathBuf>,

    /// Taxonomic level name of the ortholog group (e.g. "Vertebrata")
    #[arg(short = 'l', long)]
    pub level: Option<String>,

    /// Root folder for the output files
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Identity method used for LDO selection (mafft, pairwise, kmer)
    #[arg(short = 'm', long)]
    pub method: Option<IdentityMethod>,

    /// Minimum length as a fraction of the query length
    #[arg(long)]
    pub min_fraction: Option<f64>,

    /// CD-HIT identity threshold (0.4-1.0)
    #[arg(long)]
    pub cluster_identity: Option<f64>,

    /// Align the clustered LDOs with MAFFT
    #[arg(long)]
    pub align: bool,

    /// Do not write any output files
    #[arg(long)]
    pub no_write: bool,

    /// Kill external tools after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl CommonArgs {
    /// Config file (or defaults) with the command-line overrides applied
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => default_config(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.database_dir {
            config.database.dir = Some(dir.clone());
        }
        if let Some(level) = &self.level {
            config.og_select.level_name = level.clone();
        }
        if let Some(output) = &self.output {
            config.main_output_folder = output.clone();
        }
        if let Some(method) = self.method {
            config.ldo_select.method = method;
        }
        if let Some(fraction) = self.min_fraction {
            config.filter.min_fraction_shorter_than_query = fraction;
        }
        if let Some(threshold) = self.cluster_identity {
            config.clustering.identity_threshold = threshold;
        }
        if self.align {
            config.align.align = true;
        }
        if self.no_write {
            config.write_files = false;
        }
        if let Some(seconds) = self.timeout {
            config.tools.timeout_secs = Some(seconds);
        }
    }
}

/// Load the OrthoDB tables behind a spinner
pub fn load_database(config: &Config) -> anyhow::Result<OrthoDatabase> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(create_spinner_style());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Loading OrthoDB tables...");

    let db = OrthoDatabase::load(&config.database);
    spinner.finish_and_clear();
    let db = db?;
    tracing::info!(
        "Loaded {} sequences in {} groups",
        format_number(db.sequence_count()),
        format_number(db.group_count())
    );
    Ok(db)
}
