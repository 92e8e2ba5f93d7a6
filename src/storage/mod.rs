pub mod orthodb;
pub mod traits;

pub use orthodb::{OrthoDatabase, OrthoDbFiles};
pub use traits::{GroupMembership, OrthologGroup, OrthologyStore, SequenceStore, UniProtXref};
