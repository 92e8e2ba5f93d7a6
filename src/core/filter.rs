/// Removes invalid and atypically short sequences from an ortholog group
use indexmap::IndexMap;
use tracing::debug;

use crate::bio::sequence::{GeneId, SequenceRecord};
use crate::{OdbError, Result};

/// Drop every sequence with a residue outside the standard amino-acid alphabet.
pub fn filter_non_standard(
    sequences: &IndexMap<GeneId, SequenceRecord>,
) -> IndexMap<GeneId, SequenceRecord> {
    sequences
        .iter()
        .filter(|(_, record)| record.is_standard_protein())
        .map(|(id, record)| (id.clone(), record.clone()))
        .collect()
}

/// Drop every sequence shorter than `min_length`.
pub fn filter_shorter(
    sequences: IndexMap<GeneId, SequenceRecord>,
    min_length: f64,
) -> IndexMap<GeneId, SequenceRecord> {
    sequences
        .into_iter()
        .filter(|(_, record)| record.len() as f64 >= min_length)
        .collect()
}

/// Filter an ortholog group relative to its query sequence.
///
/// The length threshold is `min_fraction_of_query_length` times the length of
/// the query as given, and the query is always present in the output even
/// when it fails its own filters.
pub fn filter_sequences(
    sequences: &IndexMap<GeneId, SequenceRecord>,
    query_id: &str,
    min_fraction_of_query_length: f64,
) -> Result<IndexMap<GeneId, SequenceRecord>> {
    if !min_fraction_of_query_length.is_finite() || min_fraction_of_query_length < 0.0 {
        return Err(OdbError::InvalidInput(format!(
            "length fraction must be a non-negative number, got {}",
            min_fraction_of_query_length
        )));
    }
    let query = sequences.get(query_id).ok_or_else(|| {
        OdbError::InvalidInput(format!("query {} is not among the sequences to filter", query_id))
    })?;

    let min_length = min_fraction_of_query_length * query.len() as f64;
    let standard = filter_non_standard(sequences);
    let non_standard = sequences.len() - standard.len();
    let mut filtered = filter_shorter(standard, min_length);
    debug!(
        "Filtered {} -> {} sequences ({} non-standard, min length {:.1})",
        sequences.len(),
        filtered.len(),
        non_standard,
        min_length
    );

    if !filtered.contains_key(query_id) {
        debug!("Query {} failed its own filters; keeping it", query_id);
        filtered.insert(query_id.to_string(), query.clone());
    }
    Ok(filtered)
}
