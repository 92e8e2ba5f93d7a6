/// Percent identity of every candidate against the query
///
/// Three interchangeable methods: a MAFFT multiple alignment, in-process
/// global pairwise alignment, and a k-mer Jaccard heuristic. Scores are on a
/// 0-100 scale and the query always scores exactly 100 against itself.
use std::collections::HashSet;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bio::alignment::{GlobalAligner, BLOSUM62};
use crate::bio::sequence::{GeneId, SequenceRecord};
use crate::tools::traits::MultipleAligner;
use crate::{OdbError, Result};

const GAP: u8 = b'-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMethod {
    /// One MSA of the whole group
    #[default]
    Mafft,
    /// Needleman-Wunsch against the query, BLOSUM62 with linear gaps
    Pairwise,
    /// Jaccard similarity of k-mer sets
    Kmer,
}

impl std::fmt::Display for IdentityMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IdentityMethod::Mafft => "mafft",
            IdentityMethod::Pairwise => "pairwise",
            IdentityMethod::Kmer => "kmer",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for IdentityMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mafft" | "msa" => Ok(IdentityMethod::Mafft),
            "pairwise" | "needleman-wunsch" => Ok(IdentityMethod::Pairwise),
            "kmer" | "k-mer" => Ok(IdentityMethod::Kmer),
            _ => Err(format!(
                "identity method must be 'mafft', 'pairwise' or 'kmer', not {}",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityScore {
    pub candidate_id: GeneId,
    pub percent_identity: f64,
}

pub struct IdentityEngine<'a> {
    method: IdentityMethod,
    aligner: &'a dyn MultipleAligner,
    kmer_size: usize,
    gap_penalty: i32,
}

impl<'a> IdentityEngine<'a> {
    pub fn new(method: IdentityMethod, aligner: &'a dyn MultipleAligner) -> Self {
        Self {
            method,
            aligner,
            kmer_size: 3,
            gap_penalty: 4,
        }
    }

    pub fn with_kmer_size(mut self, kmer_size: usize) -> Self {
        self.kmer_size = kmer_size.max(1);
        self
    }

    pub fn with_gap_penalty(mut self, gap_penalty: i32) -> Self {
        self.gap_penalty = gap_penalty;
        self
    }

    /// Score every candidate against `query`.
    ///
    /// The result holds one entry per distinct id in `candidates` plus the
    /// query, sorted by descending identity with ties broken by ascending id.
    pub fn score(
        &self,
        candidates: &IndexMap<GeneId, SequenceRecord>,
        query: &SequenceRecord,
        run_label: &str,
    ) -> Result<Vec<IdentityScore>> {
        info!(
            "Scoring {} candidates against {} ({})",
            candidates.len(),
            query.id,
            self.method
        );
        let others: Vec<&SequenceRecord> =
            candidates.values().filter(|r| r.id != query.id).collect();

        let mut scores = match self.method {
            IdentityMethod::Mafft => self.score_msa(&others, query, run_label)?,
            IdentityMethod::Pairwise => {
                let aligner = GlobalAligner::new(BLOSUM62::new().with_gap_penalty(self.gap_penalty));
                others
                    .par_iter()
                    .map(|r| IdentityScore {
                        candidate_id: r.id.clone(),
                        percent_identity: aligner.summarize(&query.sequence, &r.sequence).percent_identity(),
                    })
                    .collect()
            }
            IdentityMethod::Kmer => {
                let query_kmers = kmer_set(&query.sequence, self.kmer_size);
                others
                    .par_iter()
                    .map(|r| IdentityScore {
                        candidate_id: r.id.clone(),
                        percent_identity: kmer_identity_with(
                            &query.sequence,
                            query_kmers.as_ref(),
                            &r.sequence,
                            self.kmer_size,
                        ),
                    })
                    .collect()
            }
        };

        scores.push(IdentityScore {
            candidate_id: query.id.clone(),
            percent_identity: 100.0,
        });
        rank(&mut scores);
        debug!(
            "Top identities: {:?}",
            scores
                .iter()
                .take(5)
                .map(|s| (&s.candidate_id, s.percent_identity))
                .collect::<Vec<_>>()
        );
        Ok(scores)
    }

    fn score_msa(
        &self,
        others: &[&SequenceRecord],
        query: &SequenceRecord,
        run_label: &str,
    ) -> Result<Vec<IdentityScore>> {
        if others.is_empty() {
            return Ok(Vec::new());
        }
        let mut records: Vec<&SequenceRecord> = Vec::with_capacity(others.len() + 1);
        records.push(query);
        records.extend_from_slice(others);

        let msa = self.aligner.align(&records, run_label)?;
        let query_row = msa.row(&query.id).ok_or_else(|| {
            OdbError::AlignmentTool(format!("query {} missing from alignment", query.id))
        })?;

        others
            .iter()
            .map(|r| {
                let row = msa.row(&r.id).ok_or_else(|| {
                    OdbError::AlignmentTool(format!("{} missing from alignment", r.id))
                })?;
                Ok(IdentityScore {
                    candidate_id: r.id.clone(),
                    percent_identity: msa_identity(&query_row.sequence, &row.sequence),
                })
            })
            .collect()
    }
}

/// Descending identity, ties by ascending id
pub fn rank(scores: &mut [IdentityScore]) {
    scores.sort_by(|a, b| {
        b.percent_identity
            .total_cmp(&a.percent_identity)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
}

/// Identity of two rows of the same alignment.
///
/// Identical residue columns over the columns where at least one of the two
/// rows has a residue. Columns gapped in both rows are ignored.
pub fn msa_identity(query_row: &[u8], candidate_row: &[u8]) -> f64 {
    let mut identical = 0usize;
    let mut covered = 0usize;
    for (&q, &c) in query_row.iter().zip(candidate_row) {
        let q_res = q != GAP;
        let c_res = c != GAP;
        if q_res || c_res {
            covered += 1;
            if q_res && c_res && q.eq_ignore_ascii_case(&c) {
                identical += 1;
            }
        }
    }
    if covered == 0 {
        return 0.0;
    }
    100.0 * identical as f64 / covered as f64
}

fn kmer_set(sequence: &[u8], k: usize) -> Option<HashSet<Vec<u8>>> {
    if sequence.len() < k {
        return None;
    }
    Some(
        sequence
            .windows(k)
            .map(|w| w.to_ascii_uppercase())
            .collect(),
    )
}

/// 100 x Jaccard similarity of the distinct k-mer sets.
///
/// When either sequence is shorter than `k` only exact equality counts.
pub fn kmer_identity(a: &[u8], b: &[u8], k: usize) -> f64 {
    kmer_identity_with(a, kmer_set(a, k).as_ref(), b, k)
}

fn kmer_identity_with(a: &[u8], a_kmers: Option<&HashSet<Vec<u8>>>, b: &[u8], k: usize) -> f64 {
    let (a_kmers, b_kmers) = match (a_kmers, kmer_set(b, k)) {
        (Some(a_kmers), Some(b_kmers)) => (a_kmers, b_kmers),
        _ => {
            return if a.eq_ignore_ascii_case(b) { 100.0 } else { 0.0 };
        }
    };
    let shared = a_kmers.intersection(&b_kmers).count();
    let union = a_kmers.len() + b_kmers.len() - shared;
    100.0 * shared as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::MockAligner;
    use rstest::rstest;

    fn candidates(entries: &[(&str, &[u8])]) -> IndexMap<GeneId, SequenceRecord> {
        entries
            .iter()
            .map(|(id, seq)| (id.to_string(), SequenceRecord::new(*id, seq.to_vec())))
            .collect()
    }

    #[rstest]
    #[case(b"MKV-LA", b"MKVALA", 5.0 / 6.0)]
    #[case(b"MK--", b"MKLA", 0.5)]
    #[case(b"MK--", b"MK--", 1.0)]
    #[case(b"--MK", b"MK--", 0.0)]
    fn test_msa_identity(#[case] q: &[u8], #[case] c: &[u8], #[case] expected: f64) {
        assert!((msa_identity(q, c) - 100.0 * expected).abs() < 1e-9);
    }

    #[test]
    fn test_kmer_identity() {
        assert_eq!(kmer_identity(b"MKVLA", b"MKVLA", 3), 100.0);
        // {MKV, KVL, VLA} vs {MKV, KVL, VLG}: 2 shared of 4
        assert_eq!(kmer_identity(b"MKVLA", b"MKVLG", 3), 50.0);
        assert_eq!(kmer_identity(b"MK", b"mk", 3), 100.0);
        assert_eq!(kmer_identity(b"MK", b"MKVLA", 3), 0.0);
    }

    #[rstest]
    #[case(IdentityMethod::Mafft)]
    #[case(IdentityMethod::Pairwise)]
    #[case(IdentityMethod::Kmer)]
    fn test_query_scores_exactly_100(#[case] method: IdentityMethod) {
        let seqs = candidates(&[
            ("q", b"MKTAYIAKQRQISFVKSHFSRQ"),
            ("a", b"MKTAYIAKQRQISFVKSHFSRQ"),
            ("b", b"MKTAYLAKQRQISFVKAHFSRQ"),
            ("c", b"GGGGGGWWWWWPPPPP"),
        ]);
        let aligner = MockAligner::new();
        let engine = IdentityEngine::new(method, &aligner);
        let scores = engine.score(&seqs, &seqs["q"], "q").unwrap();

        assert_eq!(scores.len(), 4);
        let query = scores.iter().find(|s| s.candidate_id == "q").unwrap();
        assert_eq!(query.percent_identity, 100.0);
        // identical candidate ties with the query; "a" sorts first
        assert_eq!(scores[0].candidate_id, "a");
        assert_eq!(scores[1].candidate_id, "q");
        assert_eq!(scores[2].candidate_id, "b");
        assert_eq!(scores[3].candidate_id, "c");
        for s in &scores {
            assert!((0.0..=100.0).contains(&s.percent_identity));
        }
    }

    #[test]
    fn test_msa_method_uses_aligner_once() {
        let seqs = candidates(&[("q", b"MKV"), ("a", b"MKA"), ("b", b"MK")]);
        let aligner = MockAligner::new();
        let scores = IdentityEngine::new(IdentityMethod::Mafft, &aligner)
            .score(&seqs, &seqs["q"], "q")
            .unwrap();
        assert_eq!(aligner.call_count(), 1);
        let b = scores.iter().find(|s| s.candidate_id == "b").unwrap();
        assert!((b.percent_identity - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_lone_query_skips_aligner() {
        let seqs = candidates(&[("q", b"MKV")]);
        let aligner = MockAligner::new();
        let scores = IdentityEngine::new(IdentityMethod::Mafft, &aligner)
            .score(&seqs, &seqs["q"], "q")
            .unwrap();
        assert_eq!(aligner.call_count(), 0);
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn test_aligner_failure_propagates() {
        let seqs = candidates(&[("q", b"MKV"), ("a", b"MKA")]);
        let aligner = MockAligner::new().with_failure("mafft crashed");
        let err = IdentityEngine::new(IdentityMethod::Mafft, &aligner)
            .score(&seqs, &seqs["q"], "q")
            .unwrap_err();
        assert!(matches!(err, OdbError::AlignmentTool(_)));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("MAFFT".parse::<IdentityMethod>().unwrap(), IdentityMethod::Mafft);
        assert_eq!("kmer".parse::<IdentityMethod>().unwrap(), IdentityMethod::Kmer);
        assert!("blast".parse::<IdentityMethod>().is_err());
        assert_eq!(IdentityMethod::Pairwise.to_string(), "pairwise");
    }
}
