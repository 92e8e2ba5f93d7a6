use serde::{Deserialize, Serialize};

/// Stable OrthoDB gene identifier, e.g. `9606_0:001c7b`.
pub type GeneId = String;

/// The twenty standard amino acids. Anything else is rejected by the filters.
pub const STANDARD_AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

/// A protein sequence fetched from the orthology store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub id: GeneId,
    pub description: Option<String>,
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: impl Into<GeneId>, sequence: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// True when every residue is one of the standard amino acids.
    pub fn is_standard_protein(&self) -> bool {
        !self.sequence.is_empty()
            && self
                .sequence
                .iter()
                .all(|c| STANDARD_AMINO_ACIDS.contains(&c.to_ascii_uppercase()))
    }

    pub fn sequence_str(&self) -> String {
        String::from_utf8_lossy(&self.sequence).to_string()
    }

    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) => format!(">{} {}", self.id, desc),
            None => format!(">{}", self.id),
        }
    }
}

/// Organism part of an OrthoDB gene id (`9606_0:001c7b` -> `9606_0`).
///
/// Ids without a `:` are treated as their own species.
pub fn species_of(gene_id: &str) -> &str {
    gene_id.split_once(':').map(|(org, _)| org).unwrap_or(gene_id)
}
