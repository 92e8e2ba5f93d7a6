use clap::Args;
use std::path::PathBuf;

use crate::cli::formatter::{print_success, print_warning};
use crate::core::config::{default_config, save_config};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Where to write the default configuration
    #[arg(short, long, value_name = "FILE", default_value = "odbgroup.toml")]
    pub output: PathBuf,

    /// Print the configuration instead of writing it
    #[arg(long)]
    pub show: bool,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let config = default_config();
    if args.show {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }
    if args.output.exists() && !args.force {
        print_warning(&format!(
            "{} already exists; use --force to overwrite it",
            args.output.display()
        ));
        return Ok(());
    }
    save_config(&args.output, &config)?;
    print_success(&format!("Wrote default configuration to {}", args.output.display()));
    Ok(())
}
