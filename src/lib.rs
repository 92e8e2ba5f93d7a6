pub mod bio;
pub mod cli;
pub mod core;
pub mod report;
pub mod storage;
pub mod tools;

pub use crate::core::{
    config::Config,
    pipeline::{Pipeline, PipelineResult, Query},
};
pub use crate::storage::OrthoDatabase;

use thiserror::Error;

/// Failures of the group resolution stage.
///
/// These are driven by the user's query rather than the environment, so the
/// pipeline records them as a failed result instead of aborting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no ortholog groups found for gene id {gene_id}")]
    NoGroupsFound { gene_id: String },

    #[error("No OGs found for {gene_id} with level name `{level_name}`. available levels are: {available:?}")]
    LevelNotFound {
        gene_id: String,
        level_name: String,
        available: Vec<String>,
    },

    #[error("Multiple OGs found for {gene_id} with level name `{level_name}`. duplicate OGs: {group_ids:?}")]
    AmbiguousLevel {
        gene_id: String,
        level_name: String,
        group_ids: Vec<String>,
    },

    #[error("Uniprot id `{0}` not found in gene key or xref tables")]
    UniProtNotFound(String),
}

#[derive(Error, Debug)]
pub enum OdbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found in sequence store: {0}")]
    NotFound(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Alignment tool error: {0}")]
    AlignmentTool(String),

    #[error("Clustering tool error: {0}")]
    ClusteringTool(String),
}

impl OdbError {
    /// Whether this error belongs to the resolution stage.
    pub fn is_resolution(&self) -> bool {
        matches!(self, OdbError::Resolution(_))
    }
}

impl From<serde_json::Error> for OdbError {
    fn from(err: serde_json::Error) -> Self {
        OdbError::Parse(err.to_string())
    }
}

impl From<csv::Error> for OdbError {
    fn from(err: csv::Error) -> Self {
        OdbError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OdbError>;
