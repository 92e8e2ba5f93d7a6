/// Orchestration of one query through resolution, filtering, LDO selection,
/// clustering and the optional final alignment
///
/// Resolution problems (unknown UniProt id, missing or ambiguous level) end the
/// run with a `Failed` outcome that can still be reported. Store and tool
/// errors abort the run and are returned as `Err`.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bio::sequence::{species_of, GeneId, SequenceRecord};
use crate::core::config::Config;
use crate::core::filter::filter_sequences;
use crate::core::identity::{IdentityEngine, IdentityScore};
use crate::core::ldo;
use crate::core::resolver::{GroupResolver, IdResolver, SelectedGroup};
use crate::storage::OrthologyStore;
use crate::tools::runner::sanitize;
use crate::tools::traits::{ClusterAssignment, Clusterer, MultipleAligner};
use crate::{OdbError, ResolutionError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    UniProt(String),
    Gene(GeneId),
}

impl Query {
    pub fn id(&self) -> &str {
        match self {
            Query::UniProt(id) | Query::Gene(id) => id,
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::UniProt(id) => write!(f, "UniProt {}", id),
            Query::Gene(id) => write!(f, "gene {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Resolving,
    Fetching,
    Filtering,
    ScoringIdentity,
    SelectingLdo,
    Clustering,
    Aligning,
    Reporting,
}

/// Gapped rows of the final alignment and the command that built them
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentResult {
    #[serde(rename = "alignment_clustered_ldos_command")]
    pub command: String,
    #[serde(skip)]
    pub rows: Vec<SequenceRecord>,
}

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct GroupAnalysis {
    pub query_sequence_str: String,
    #[serde(rename = "ogid")]
    pub group_id: String,
    #[serde(rename = "oglevel")]
    pub level_name: String,
    /// All group members, in store order
    #[serde(rename = "sequences")]
    pub member_ids: Vec<GeneId>,
    #[serde(rename = "sequences_filtered")]
    pub filtered_ids: Vec<GeneId>,
    #[serde(rename = "sequences_ldos")]
    pub ldo_ids: Vec<GeneId>,
    /// Identity of each LDO to the query, best first
    pub ldo_identities: Vec<IdentityScore>,
    /// Cluster representatives, in cluster order
    #[serde(rename = "sequences_clustered_ldos")]
    pub representative_ids: Vec<GeneId>,
    pub clusters: ClusterAssignment,
    pub cdhit_command: String,
    #[serde(flatten)]
    pub alignment: Option<AlignmentResult>,

    #[serde(skip)]
    pub member_sequences: IndexMap<GeneId, SequenceRecord>,
    #[serde(skip)]
    pub ldo_sequences: IndexMap<GeneId, SequenceRecord>,
}

impl GroupAnalysis {
    pub fn representative_sequences(&self) -> Vec<&SequenceRecord> {
        self.representative_ids
            .iter()
            .filter_map(|id| self.ldo_sequences.get(id))
            .collect()
    }
}

/// Completed XOR failed with a critical error
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Completed(Box<GroupAnalysis>),
    Failed {
        #[serde(rename = "critical error")]
        critical_error: String,
        #[serde(skip)]
        cause: ResolutionError,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    #[serde(skip)]
    pub query: Query,
    pub query_uniprot_id: Option<String>,
    pub query_odb_gene_id: Option<GeneId>,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(rename = "processing params")]
    pub processing_params: Config,
}

impl PipelineResult {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, Outcome::Completed(_))
    }

    pub fn analysis(&self) -> Option<&GroupAnalysis> {
        match &self.outcome {
            Outcome::Completed(analysis) => Some(analysis),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn critical_error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Completed(_) => None,
            Outcome::Failed { critical_error, .. } => Some(critical_error),
        }
    }

    pub fn failure_cause(&self) -> Option<&ResolutionError> {
        match &self.outcome {
            Outcome::Completed(_) => None,
            Outcome::Failed { cause, .. } => Some(cause),
        }
    }

    /// `<gene id with ':' as '_'>_<level>_<group>`, the stem of every output file
    pub fn output_prefix(&self) -> Option<String> {
        let analysis = self.analysis()?;
        let gene_id = self.query_odb_gene_id.as_deref()?;
        Some(format!(
            "{}_{}_{}",
            gene_id.replace(':', "_"),
            analysis.level_name,
            analysis.group_id
        ))
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    store: &'a dyn OrthologyStore,
    scoring_aligner: &'a dyn MultipleAligner,
    final_aligner: &'a dyn MultipleAligner,
    clusterer: &'a dyn Clusterer,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        store: &'a dyn OrthologyStore,
        aligner: &'a dyn MultipleAligner,
        clusterer: &'a dyn Clusterer,
    ) -> Self {
        Self {
            config,
            store,
            scoring_aligner: aligner,
            final_aligner: aligner,
            clusterer,
        }
    }

    /// Use a differently configured aligner for the representatives
    pub fn with_final_aligner(mut self, aligner: &'a dyn MultipleAligner) -> Self {
        self.final_aligner = aligner;
        self
    }

    fn enter(&self, stage: PipelineStage, query: &Query) {
        info!("[{}] {:?}", query.id(), stage);
    }

    fn failed(
        &self,
        query: &Query,
        uniprot_id: Option<String>,
        gene_id: Option<GeneId>,
        error: ResolutionError,
    ) -> PipelineResult {
        warn!("{} failed: {}", query, error);
        PipelineResult {
            query: query.clone(),
            query_uniprot_id: uniprot_id,
            query_odb_gene_id: gene_id,
            outcome: Outcome::Failed {
                critical_error: error.to_string(),
                cause: error,
            },
            processing_params: self.config.clone(),
        }
    }

    pub fn run(&self, query: &Query) -> Result<PipelineResult> {
        self.enter(PipelineStage::Resolving, query);
        let (uniprot_id, gene_id) = match query {
            Query::UniProt(accession) => {
                let resolver =
                    IdResolver::new(self.store, self.config.id_resolution.duplicate_action);
                match resolver.resolve(accession) {
                    Ok(gene_id) => (Some(accession.clone()), gene_id),
                    Err(OdbError::Resolution(e)) => {
                        return Ok(self.failed(query, Some(accession.clone()), None, e))
                    }
                    Err(e) => return Err(e),
                }
            }
            Query::Gene(gene_id) => (self.store.uniprot_of(gene_id)?, gene_id.clone()),
        };

        let level_name = &self.config.og_select.level_name;
        let selected = match GroupResolver::new(self.store).resolve(&gene_id, level_name) {
            Ok(selected) => selected,
            Err(OdbError::Resolution(e)) => {
                return Ok(self.failed(query, uniprot_id, Some(gene_id), e))
            }
            Err(e) => return Err(e),
        };

        let analysis = self.analyse(query, &gene_id, selected)?;
        info!(
            "{}: {} members -> {} filtered -> {} LDOs -> {} clusters",
            gene_id,
            analysis.member_ids.len(),
            analysis.filtered_ids.len(),
            analysis.ldo_ids.len(),
            analysis.clusters.len()
        );

        Ok(PipelineResult {
            query: query.clone(),
            query_uniprot_id: uniprot_id,
            query_odb_gene_id: Some(gene_id),
            outcome: Outcome::Completed(Box::new(analysis)),
            processing_params: self.config.clone(),
        })
    }

    fn analyse(&self, query: &Query, gene_id: &str, selected: SelectedGroup) -> Result<GroupAnalysis> {
        let label = sanitize(gene_id);

        self.enter(PipelineStage::Fetching, query);
        let member_ids = self.store.list_members(&selected.group_id)?;
        let member_sequences = self.store.get_many(&member_ids)?;
        let query_record = member_sequences.get(gene_id).cloned().ok_or_else(|| {
            OdbError::Database(format!(
                "{} is listed in group {} but not among its members",
                gene_id, selected.group_id
            ))
        })?;

        self.enter(PipelineStage::Filtering, query);
        let filtered = filter_sequences(
            &member_sequences,
            gene_id,
            self.config.filter.min_fraction_shorter_than_query,
        )?;

        self.enter(PipelineStage::ScoringIdentity, query);
        let settings = &self.config.ldo_select;
        let scores = IdentityEngine::new(settings.method, self.scoring_aligner)
            .with_kmer_size(settings.kmer_size)
            .with_gap_penalty(settings.gap_penalty)
            .score(&filtered, &query_record, &label)?;

        self.enter(PipelineStage::SelectingLdo, query);
        let ldo_ids = ldo::select(&scores, species_of, gene_id);
        let ldo_sequences = self.store.get_many(&ldo_ids)?;
        let ldo_identities: Vec<IdentityScore> = scores
            .iter()
            .filter(|s| ldo_sequences.contains_key(&s.candidate_id))
            .cloned()
            .collect();

        self.enter(PipelineStage::Clustering, query);
        let clustering = self.clusterer.cluster(&ldo_sequences, &label)?;
        let representative_ids: Vec<GeneId> =
            clustering.clusters.representatives().cloned().collect();
        debug!("Cluster representatives: {:?}", representative_ids);

        let alignment = if self.config.align.align {
            self.enter(PipelineStage::Aligning, query);
            let representatives: Vec<&SequenceRecord> = representative_ids
                .iter()
                .filter_map(|id| ldo_sequences.get(id))
                .collect();
            let msa = self.final_aligner.align(&representatives, &label)?;
            Some(AlignmentResult {
                command: msa.command,
                rows: msa.rows,
            })
        } else {
            None
        };

        Ok(GroupAnalysis {
            query_sequence_str: query_record.sequence_str(),
            group_id: selected.group_id,
            level_name: selected.level_name,
            member_ids,
            filtered_ids: filtered.keys().cloned().collect(),
            ldo_ids,
            ldo_identities,
            representative_ids,
            clusters: clustering.clusters,
            cdhit_command: clustering.command,
            alignment,
            member_sequences,
            ldo_sequences,
        })
    }
}
