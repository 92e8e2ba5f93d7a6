use clap::Parser;
use colored::*;
use odbgroup::cli::{Cli, Commands};
use odbgroup::OdbError;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // ODBGROUP_LOG takes a tracing filter, e.g. "debug" or "odbgroup=trace"
    let log_level = std::env::var("ODBGROUP_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<OdbError>() {
            Some(OdbError::Config(_)) => 2,
            Some(OdbError::Io(_)) => 3,
            Some(OdbError::Parse(_))
            | Some(OdbError::AlignmentTool(_))
            | Some(OdbError::ClusteringTool(_)) => 4,
            Some(OdbError::Database(_)) | Some(OdbError::NotFound(_)) => 5,
            Some(OdbError::Resolution(_)) => 6,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let num_threads = if cli.threads == 0 {
        num_cpus::get()
    } else {
        cli.threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to initialize thread pool: {}", e))?;

    if cli.verbose > 0 {
        eprintln!("Using {} threads", num_threads);
    }

    match cli.command {
        Commands::Run(args) => odbgroup::cli::commands::run::run(args),
        Commands::Batch(args) => odbgroup::cli::commands::batch::run(args),
        Commands::Groups(args) => odbgroup::cli::commands::groups::run(args),
        Commands::Config(args) => odbgroup::cli::commands::config::run(args),
        Commands::Tools(args) => odbgroup::cli::commands::tools::run(args),
    }
}
