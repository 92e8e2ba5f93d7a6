pub mod global;
pub mod scoring;

pub use global::{GlobalAligner, PairwiseAlignment, PathSummary};
pub use scoring::{ScoringMatrix, BLOSUM62};
