use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::identity::IdentityMethod;
use crate::core::resolver::DuplicateAction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root folder for info jsons, sequences and alignments
    #[serde(default = "default_output_folder")]
    pub main_output_folder: PathBuf,
    #[serde(default = "default_write_files")]
    pub write_files: bool,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub id_resolution: IdResolutionConfig,
    #[serde(default)]
    pub og_select: OgSelectConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub ldo_select: LdoSelectConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub align: AlignConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the OrthoDB release files
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// File name prefix of the release, e.g. "odb11v0"
    #[serde(default = "default_release_prefix")]
    pub release_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResolutionConfig {
    /// Which gene to keep when a UniProt id maps to several
    #[serde(default)]
    pub duplicate_action: DuplicateAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OgSelectConfig {
    #[serde(default = "default_level_name")]
    pub level_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Sequences shorter than this fraction of the query length are dropped
    #[serde(default = "default_min_fraction")]
    pub min_fraction_shorter_than_query: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdoSelectConfig {
    #[serde(default)]
    pub method: IdentityMethod,
    /// Threads handed to the MSA tool when `method = "mafft"`
    #[serde(default = "default_threads")]
    pub n_align_threads: usize,
    #[serde(default = "default_kmer_size")]
    pub kmer_size: usize,
    /// Linear gap penalty for the in-process pairwise aligner
    #[serde(default = "default_gap_penalty")]
    pub gap_penalty: i32,
    /// MAFFT used for identity scoring, independent of the final alignment
    #[serde(default = "default_mafft_exe")]
    pub mafft_exe: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_cd_hit_exe")]
    pub cd_hit_exe: String,
    /// Sequence identity threshold passed as `-c`
    #[serde(default = "default_identity_threshold")]
    pub identity_threshold: f64,
    #[serde(default = "default_cluster_threads")]
    pub threads: usize,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Align the clustered LDOs at the end of the run
    #[serde(default)]
    pub align: bool,
    #[serde(default = "default_mafft_exe")]
    pub mafft_exe: String,
    #[serde(default = "default_threads")]
    pub n_align_threads: usize,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    /// Kill external tools that run longer than this. Unset waits forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Directory for per-run staging files (defaults to the system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("./orthoDB_analysis")
}
fn default_write_files() -> bool {
    true
}
fn default_release_prefix() -> String {
    "odb11v0".to_string()
}
fn default_level_name() -> String {
    "Vertebrata".to_string()
}
fn default_min_fraction() -> f64 {
    0.5
}
fn default_threads() -> usize {
    num_cpus::get().min(8)
}
fn default_cluster_threads() -> usize {
    1
}
fn default_kmer_size() -> usize {
    3
}
fn default_gap_penalty() -> i32 {
    4
}
fn default_cd_hit_exe() -> String {
    "cd-hit".to_string()
}
fn default_identity_threshold() -> f64 {
    0.9
}
fn default_mafft_exe() -> String {
    "mafft".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dir: None,
            release_prefix: default_release_prefix(),
        }
    }
}

impl Default for IdResolutionConfig {
    fn default() -> Self {
        Self {
            duplicate_action: DuplicateAction::default(),
        }
    }
}

impl Default for OgSelectConfig {
    fn default() -> Self {
        Self {
            level_name: default_level_name(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_fraction_shorter_than_query: default_min_fraction(),
        }
    }
}

impl Default for LdoSelectConfig {
    fn default() -> Self {
        Self {
            method: IdentityMethod::default(),
            n_align_threads: default_threads(),
            kmer_size: default_kmer_size(),
            gap_penalty: default_gap_penalty(),
            mafft_exe: default_mafft_exe(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            cd_hit_exe: default_cd_hit_exe(),
            identity_threshold: default_identity_threshold(),
            threads: default_cluster_threads(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            align: false,
            mafft_exe: default_mafft_exe(),
            n_align_threads: default_threads(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_output_folder: default_output_folder(),
            write_files: default_write_files(),
            database: DatabaseConfig::default(),
            id_resolution: IdResolutionConfig::default(),
            og_select: OgSelectConfig::default(),
            filter: FilterConfig::default(),
            ldo_select: LdoSelectConfig::default(),
            clustering: ClusteringConfig::default(),
            align: AlignConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), crate::OdbError> {
        use crate::OdbError::Config as Invalid;

        let fraction = self.filter.min_fraction_shorter_than_query;
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(Invalid(format!(
                "filter.min_fraction_shorter_than_query must be a non-negative number, got {}",
                fraction
            )));
        }
        if self.og_select.level_name.trim().is_empty() {
            return Err(Invalid("og_select.level_name must not be empty".to_string()));
        }
        let threshold = self.clustering.identity_threshold;
        if !(0.4..=1.0).contains(&threshold) {
            return Err(Invalid(format!(
                "clustering.identity_threshold must be within 0.4..=1.0, got {}",
                threshold
            )));
        }
        if self.ldo_select.kmer_size == 0 {
            return Err(Invalid("ldo_select.kmer_size must be at least 1".to_string()));
        }
        if self.ldo_select.gap_penalty < 0 {
            return Err(Invalid("ldo_select.gap_penalty must not be negative".to_string()));
        }
        if self.tools.timeout_secs == Some(0) {
            return Err(Invalid("tools.timeout_secs must be positive when set".to_string()));
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::OdbError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::OdbError::Config(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::OdbError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::OdbError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
