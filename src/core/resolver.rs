/// Query resolution: UniProt id -> gene id, and gene id + level -> ortholog group
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bio::sequence::GeneId;
use crate::storage::{GroupMembership, OrthologGroup, SequenceStore, UniProtXref};
use crate::{ResolutionError, Result};

/// The group picked for a gene at the requested level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedGroup {
    pub group_id: String,
    pub level_name: String,
}

/// Selects exactly one ortholog group for a gene by level name
pub struct GroupResolver<'a, S: GroupMembership + ?Sized> {
    store: &'a S,
}

impl<'a, S: GroupMembership + ?Sized> GroupResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every group available for the gene, smallest taxonomic scope first
    pub fn available_groups(&self, gene_id: &str) -> Result<Vec<OrthologGroup>> {
        let mut groups = self.store.list_groups(gene_id)?;
        groups.sort_by(|a, b| {
            a.species_count
                .cmp(&b.species_count)
                .then_with(|| a.group_id.cmp(&b.group_id))
        });
        Ok(groups)
    }

    pub fn resolve(&self, gene_id: &str, level_name: &str) -> Result<SelectedGroup> {
        let candidates = self.store.list_groups(gene_id)?;
        if candidates.is_empty() {
            return Err(ResolutionError::NoGroupsFound {
                gene_id: gene_id.to_string(),
            }
            .into());
        }

        let matches: Vec<&OrthologGroup> = candidates
            .iter()
            .filter(|g| g.level_name == level_name)
            .collect();

        match matches.as_slice() {
            [] => {
                let mut available: Vec<String> = Vec::new();
                for group in &candidates {
                    if !available.contains(&group.level_name) {
                        available.push(group.level_name.clone());
                    }
                }
                Err(ResolutionError::LevelNotFound {
                    gene_id: gene_id.to_string(),
                    level_name: level_name.to_string(),
                    available,
                }
                .into())
            }
            [group] => {
                debug!(
                    "Selected {} ({} members) for {} at {}",
                    group.group_id, group.member_count, gene_id, level_name
                );
                Ok(SelectedGroup {
                    group_id: group.group_id.clone(),
                    level_name: group.level_name.clone(),
                })
            }
            duplicates => Err(ResolutionError::AmbiguousLevel {
                gene_id: gene_id.to_string(),
                level_name: level_name.to_string(),
                group_ids: duplicates.iter().map(|g| g.group_id.clone()).collect(),
            }
            .into()),
        }
    }
}

/// What to do when a UniProt id maps to more than one gene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    /// First gene id in store order
    First,
    /// Gene with the longest sequence; equal lengths go to the smallest id
    #[default]
    Longest,
}

impl std::str::FromStr for DuplicateAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(DuplicateAction::First),
            "longest" => Ok(DuplicateAction::Longest),
            _ => Err(format!(
                "duplicate_action must be 'first' or 'longest', not {}",
                s
            )),
        }
    }
}

/// Maps UniProt accessions onto OrthoDB gene ids
pub struct IdResolver<'a, S: UniProtXref + SequenceStore + ?Sized> {
    store: &'a S,
    duplicate_action: DuplicateAction,
}

impl<'a, S: UniProtXref + SequenceStore + ?Sized> IdResolver<'a, S> {
    pub fn new(store: &'a S, duplicate_action: DuplicateAction) -> Self {
        Self {
            store,
            duplicate_action,
        }
    }

    pub fn resolve(&self, uniprot_id: &str) -> Result<GeneId> {
        let gene_ids = self.store.resolve(uniprot_id)?;

        match gene_ids.as_slice() {
            [] => Err(ResolutionError::UniProtNotFound(uniprot_id.to_string()).into()),
            [single] => Ok(single.clone()),
            multiple => {
                warn!(
                    "Multiple matches for `{}`: {:?}; choosing by \"{:?}\"",
                    uniprot_id, multiple, self.duplicate_action
                );
                let chosen = match self.duplicate_action {
                    DuplicateAction::First => multiple[0].clone(),
                    DuplicateAction::Longest => self.longest(multiple)?,
                };
                info!("Resolved {} to {}", uniprot_id, chosen);
                Ok(chosen)
            }
        }
    }

    fn longest(&self, gene_ids: &[GeneId]) -> Result<GeneId> {
        let mut best: Option<(usize, &GeneId)> = None;
        for gene_id in gene_ids {
            let len = self.store.get(gene_id)?.len();
            best = match best {
                Some((best_len, best_id))
                    if best_len > len || (best_len == len && best_id <= gene_id) =>
                {
                    Some((best_len, best_id))
                }
                _ => Some((len, gene_id)),
            };
        }
        // `gene_ids` is non-empty here
        Ok(best.map(|(_, id)| id.clone()).unwrap_or_default())
    }
}
