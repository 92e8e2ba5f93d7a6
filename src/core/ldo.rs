/// Least divergent ortholog selection: one sequence per species
use indexmap::IndexMap;
use tracing::debug;

use crate::bio::sequence::GeneId;
use crate::core::identity::IdentityScore;

/// Pick the most query-like sequence of every species.
///
/// Within a species the highest identity wins and exact ties go to the
/// lexicographically smallest id. The query's own species is always
/// represented by the query. The returned ids are sorted.
pub fn select<F>(scores: &[IdentityScore], species_of: F, query_id: &str) -> Vec<GeneId>
where
    F: Fn(&str) -> &str,
{
    let query_species = species_of(query_id).to_string();
    let mut best: IndexMap<String, &IdentityScore> = IndexMap::new();

    for score in scores {
        let species = species_of(&score.candidate_id);
        if species == query_species {
            continue;
        }
        match best.get_mut(species) {
            Some(current) => {
                if beats(score, current) {
                    *current = score;
                }
            }
            None => {
                best.insert(species.to_string(), score);
            }
        }
    }

    let mut ldos: Vec<GeneId> = best.values().map(|s| s.candidate_id.clone()).collect();
    ldos.push(query_id.to_string());
    ldos.sort();
    ldos.dedup();
    debug!("Selected {} LDOs from {} scores", ldos.len(), scores.len());
    ldos
}

fn beats(challenger: &IdentityScore, current: &IdentityScore) -> bool {
    match challenger.percent_identity.total_cmp(&current.percent_identity) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => challenger.candidate_id < current.candidate_id,
        std::cmp::Ordering::Less => false,
    }
}
