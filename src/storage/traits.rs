/// Read-only query interfaces over a precomputed orthology database
///
/// The pipeline only ever talks to the database through these traits, so the
/// backing store (flat files, an in-memory fixture, a SQL index) can change
/// without touching the core.
use crate::bio::sequence::{GeneId, SequenceRecord};
use crate::{OdbError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ortholog group the gene belongs to at one taxonomic level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthologGroup {
    pub group_id: String,
    /// NCBI taxonomy id of the level the group was built at
    pub level_id: u32,
    pub level_name: String,
    pub member_count: usize,
    /// Non-redundant species count underneath the level
    pub species_count: usize,
    pub name: String,
}

/// Sequence lookup by gene id
pub trait SequenceStore: Send + Sync {
    /// Fetch a single record, failing with `NotFound` if the id is unknown
    fn get(&self, gene_id: &str) -> Result<SequenceRecord>;

    /// Fetch many records, keyed and ordered as requested
    fn get_many(&self, gene_ids: &[GeneId]) -> Result<IndexMap<GeneId, SequenceRecord>> {
        let mut records = IndexMap::with_capacity(gene_ids.len());
        for gene_id in gene_ids {
            let record = self.get(gene_id)?;
            records.insert(gene_id.clone(), record);
        }
        Ok(records)
    }

    /// Whether the store holds a sequence for this id
    fn contains(&self, gene_id: &str) -> bool {
        self.get(gene_id).is_ok()
    }
}

/// Ortholog group membership
pub trait GroupMembership: Send + Sync {
    /// Groups containing the gene, one per ancestral level
    fn list_groups(&self, gene_id: &str) -> Result<Vec<OrthologGroup>>;

    /// Gene ids belonging to a group
    fn list_members(&self, group_id: &str) -> Result<Vec<GeneId>>;

    /// UniProt accession recorded for a gene, if any
    fn uniprot_of(&self, gene_id: &str) -> Result<Option<String>>;
}

/// UniProt accession cross-references
pub trait UniProtXref: Send + Sync {
    /// Gene ids referenced by the accession. May be empty or multi-valued.
    fn resolve(&self, uniprot_id: &str) -> Result<Vec<GeneId>>;
}

/// Everything the pipeline needs from the orthology database
pub trait OrthologyStore: SequenceStore + GroupMembership + UniProtXref {}

impl<T: SequenceStore + GroupMembership + UniProtXref> OrthologyStore for T {}

pub(crate) fn not_found(gene_id: &str) -> OdbError {
    OdbError::NotFound(gene_id.to_string())
}
