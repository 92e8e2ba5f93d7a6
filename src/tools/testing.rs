//! Mock tools for testing

use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;

use crate::bio::sequence::{GeneId, SequenceRecord};
use crate::tools::traits::{ClusterAssignment, ClusterOutput, Clusterer, MsaOutput, MultipleAligner};
use crate::{OdbError, Result};

/// Mock aligner that right-pads every sequence with gaps to a common length
pub struct MockAligner {
    failure: Option<String>,
    call_count: AtomicUsize,
}

impl MockAligner {
    pub fn new() -> Self {
        Self {
            failure: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Configure to fail
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockAligner {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipleAligner for MockAligner {
    fn name(&self) -> &str {
        "mock-aligner"
    }

    fn align(&self, records: &[&SequenceRecord], run_label: &str) -> Result<MsaOutput> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(OdbError::AlignmentTool(message.clone()));
        }

        let width = records.iter().map(|r| r.len()).max().unwrap_or(0);
        let rows = records
            .iter()
            .map(|r| {
                let mut row = r.sequence.clone();
                row.resize(width, b'-');
                SequenceRecord::new(r.id.clone(), row)
            })
            .collect();
        Ok(MsaOutput {
            command: format!("mock-align {}", run_label),
            rows,
        })
    }
}

/// Mock clusterer returning fixed clusters, or one cluster per sequence
pub struct MockClusterer {
    clusters: Option<ClusterAssignment>,
    failure: Option<String>,
    call_count: AtomicUsize,
}

impl MockClusterer {
    pub fn new() -> Self {
        Self {
            clusters: None,
            failure: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Return these clusters whatever the input
    pub fn with_clusters(mut self, clusters: ClusterAssignment) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Configure to fail
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockClusterer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clusterer for MockClusterer {
    fn name(&self) -> &str {
        "mock-clusterer"
    }

    fn cluster(
        &self,
        sequences: &IndexMap<GeneId, SequenceRecord>,
        run_label: &str,
    ) -> Result<ClusterOutput> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(OdbError::ClusteringTool(message.clone()));
        }

        let clusters = match &self.clusters {
            Some(fixed) => fixed.clone(),
            None => {
                let mut singletons = ClusterAssignment::new();
                for id in sequences.keys() {
                    singletons.insert(id.clone(), vec![id.clone()]);
                }
                singletons
            }
        };
        clusters
            .verify_partition(sequences.keys())
            .map_err(OdbError::ClusteringTool)?;
        Ok(ClusterOutput {
            command: format!("mock-cluster {}", run_label),
            clusters,
        })
    }
}
