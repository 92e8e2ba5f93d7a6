pub mod alignment;
pub mod fasta;
pub mod sequence;

pub use sequence::{species_of, GeneId, SequenceRecord};
