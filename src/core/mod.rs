pub mod config;
pub mod filter;
pub mod identity;
pub mod ldo;
pub mod pipeline;
pub mod resolver;

pub use config::Config;
pub use identity::{IdentityEngine, IdentityMethod, IdentityScore};
pub use pipeline::{Outcome, Pipeline, PipelineResult, PipelineStage, Query};
pub use resolver::{DuplicateAction, GroupResolver, IdResolver};
