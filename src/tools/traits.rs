/// Interfaces over the external tools the pipeline drives
///
/// The core only sees these traits, so tests can substitute the mocks in
/// `tools::testing` for real MAFFT and CD-HIT binaries.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bio::sequence::{GeneId, SequenceRecord};
use crate::Result;

/// Rows of a multiple sequence alignment plus the command that produced them
#[derive(Debug, Clone)]
pub struct MsaOutput {
    pub command: String,
    /// Gapped rows, one per input record
    pub rows: Vec<SequenceRecord>,
}

impl MsaOutput {
    pub fn row(&self, id: &str) -> Option<&SequenceRecord> {
        self.rows.iter().find(|r| r.id == id)
    }
}

/// Multiple sequence alignment
pub trait MultipleAligner: Send + Sync {
    fn name(&self) -> &str;

    /// Align `records`, labelling staging files with `run_label`
    fn align(&self, records: &[&SequenceRecord], run_label: &str) -> Result<MsaOutput>;
}

/// Representative id -> member ids, the representative included
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterAssignment(IndexMap<GeneId, Vec<GeneId>>);

impl ClusterAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, representative: GeneId, members: Vec<GeneId>) {
        self.0.insert(representative, members);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn representatives(&self) -> impl Iterator<Item = &GeneId> {
        self.0.keys()
    }

    pub fn members(&self, representative: &str) -> Option<&[GeneId]> {
        self.0.get(representative).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GeneId, &Vec<GeneId>)> {
        self.0.iter()
    }

    /// Check that the clusters partition exactly `input_ids`.
    ///
    /// Every input id must appear in exactly one cluster, every representative
    /// must be a member of its own cluster, and no unknown id may appear.
    pub fn verify_partition<'a, I>(&self, input_ids: I) -> std::result::Result<(), String>
    where
        I: IntoIterator<Item = &'a GeneId>,
    {
        let mut seen: IndexMap<&str, &str> = IndexMap::new();
        for (representative, members) in &self.0 {
            if !members.iter().any(|m| m == representative) {
                return Err(format!(
                    "representative {} is not a member of its own cluster",
                    representative
                ));
            }
            for member in members {
                if let Some(other) = seen.insert(member.as_str(), representative.as_str()) {
                    return Err(format!(
                        "{} appears in the clusters of both {} and {}",
                        member, other, representative
                    ));
                }
            }
        }

        let mut expected = 0usize;
        for id in input_ids {
            expected += 1;
            if !seen.contains_key(id.as_str()) {
                return Err(format!("{} was not assigned to any cluster", id));
            }
        }
        if expected != seen.len() {
            return Err(format!(
                "clusters contain {} ids but {} sequences were clustered",
                seen.len(),
                expected
            ));
        }
        Ok(())
    }
}

/// Cluster assignments plus the command that produced them
#[derive(Debug, Clone)]
pub struct ClusterOutput {
    pub command: String,
    pub clusters: ClusterAssignment,
}

/// Redundancy clustering at a sequence identity threshold
pub trait Clusterer: Send + Sync {
    fn name(&self) -> &str;

    fn cluster(
        &self,
        sequences: &IndexMap<GeneId, SequenceRecord>,
        run_label: &str,
    ) -> Result<ClusterOutput>;
}
