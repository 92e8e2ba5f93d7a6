/// External alignment and clustering tools
pub mod cdhit;
pub mod mafft;
pub mod runner;
pub mod testing;
pub mod traits;

pub use cdhit::CdHit;
pub use mafft::Mafft;
pub use runner::{RunError, ToolCommand};
pub use traits::{ClusterAssignment, ClusterOutput, Clusterer, MsaOutput, MultipleAligner};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::config::Config;

/// Tools the pipeline can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    Mafft,
    CdHit,
}

impl Tool {
    pub fn all() -> [Tool; 2] {
        [Tool::Mafft, Tool::CdHit]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Mafft => "mafft",
            Tool::CdHit => "cd-hit",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Mafft => "MAFFT",
            Tool::CdHit => "CD-HIT",
        }
    }

    /// Executables configured for this tool, without repeats
    pub fn binary_names<'a>(&self, config: &'a Config) -> Vec<&'a str> {
        let mut names: Vec<&str> = match self {
            Tool::Mafft => vec![&config.ldo_select.mafft_exe, &config.align.mafft_exe],
            Tool::CdHit => vec![&config.clustering.cd_hit_exe],
        };
        names.dedup();
        names
    }

    /// Each configured executable with its resolved path, if any
    pub fn locate<'a>(&self, config: &'a Config) -> Vec<(&'a str, Option<PathBuf>)> {
        self.binary_names(config)
            .into_iter()
            .map(|name| (name, runner::locate(Path::new(name))))
            .collect()
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Tool {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "mafft" => Ok(Tool::Mafft),
            "cd-hit" | "cdhit" => Ok(Tool::CdHit),
            _ => anyhow::bail!("Unknown tool: {}", s),
        }
    }
}

/// MAFFT driver configured for identity scoring
pub fn scoring_aligner(config: &Config) -> Mafft {
    Mafft::new(&config.ldo_select.mafft_exe)
        .with_threads(config.ldo_select.n_align_threads)
        .with_extra_args(config.ldo_select.extra_args.clone())
        .with_timeout(config.tools.timeout())
        .with_temp_root(config.tools.temp_dir.clone())
}

/// MAFFT driver configured for the final alignment of cluster representatives
pub fn final_aligner(config: &Config) -> Mafft {
    Mafft::new(&config.align.mafft_exe)
        .with_threads(config.align.n_align_threads)
        .with_extra_args(config.align.extra_args.clone())
        .with_timeout(config.tools.timeout())
        .with_temp_root(config.tools.temp_dir.clone())
}

pub fn clusterer(config: &Config) -> CdHit {
    CdHit::new(
        &config.clustering.cd_hit_exe,
        config.clustering.identity_threshold,
    )
    .with_threads(config.clustering.threads)
    .with_extra_args(config.clustering.extra_args.clone())
    .with_timeout(config.tools.timeout())
    .with_temp_root(config.tools.temp_dir.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_round_trip() {
        for tool in Tool::all() {
            assert_eq!(tool.name().parse::<Tool>().unwrap(), tool);
        }
        assert_eq!("CDHIT".parse::<Tool>().unwrap(), Tool::CdHit);
        assert!("blast".parse::<Tool>().is_err());
    }

    #[test]
    fn test_binary_names_follow_config() {
        let mut config = Config::default();
        config.clustering.cd_hit_exe = "/opt/cdhit/cd-hit".to_string();
        assert_eq!(Tool::CdHit.binary_names(&config), vec!["/opt/cdhit/cd-hit"]);
        assert_eq!(Tool::Mafft.binary_names(&config), vec!["mafft"]);

        config.ldo_select.mafft_exe = "/opt/mafft-7.5/mafft".to_string();
        assert_eq!(
            Tool::Mafft.binary_names(&config),
            vec!["/opt/mafft-7.5/mafft", "mafft"]
        );
    }

    #[test]
    fn test_missing_tool_does_not_locate() {
        let mut config = Config::default();
        config.ldo_select.mafft_exe = "odbgroup-missing-mafft".to_string();
        config.align.mafft_exe = "odbgroup-missing-mafft".to_string();
        assert_eq!(
            Tool::Mafft.locate(&config),
            vec![("odbgroup-missing-mafft", None)]
        );
    }

    #[test]
    fn test_scoring_and_final_aligners_are_configured_separately() {
        let mut config = Config::default();
        config.ldo_select.mafft_exe = "/opt/ldo/mafft".to_string();
        config.ldo_select.n_align_threads = 2;
        config.ldo_select.extra_args = vec!["--localpair".to_string()];
        config.align.n_align_threads = 6;
        config.align.extra_args = vec!["--maxiterate".to_string(), "1000".to_string()];

        let input = PathBuf::from("in.fa");
        let output = PathBuf::from("out.fa");
        assert_eq!(
            scoring_aligner(&config)
                .command(input.clone(), output.clone())
                .render(),
            "/opt/ldo/mafft --thread 2 --quiet --anysymbol --localpair in.fa > out.fa"
        );
        assert_eq!(
            final_aligner(&config).command(input, output).render(),
            "mafft --thread 6 --quiet --anysymbol --maxiterate 1000 in.fa > out.fa"
        );
    }
}
