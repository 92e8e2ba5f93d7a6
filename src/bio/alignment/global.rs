/// Needleman-Wunsch global alignment with a linear gap model
use crate::bio::alignment::scoring::{ScoringMatrix, BLOSUM62};

const GAP: u8 = b'-';

#[derive(Debug, Clone)]
pub struct PairwiseAlignment {
    pub score: i32,
    pub a_aligned: Vec<u8>,
    pub b_aligned: Vec<u8>,
}

impl PairwiseAlignment {
    pub fn len(&self) -> usize {
        self.a_aligned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a_aligned.is_empty()
    }

    /// Identical columns over alignment length, as a percentage.
    pub fn percent_identity(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let matches = self
            .a_aligned
            .iter()
            .zip(&self.b_aligned)
            .filter(|(a, b)| a == b && **a != GAP)
            .count();
        100.0 * matches as f64 / self.len() as f64
    }
}

/// Score, identical columns and length of the optimal alignment path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathSummary {
    pub score: i32,
    pub matches: usize,
    pub length: usize,
}

impl PathSummary {
    fn gapped(score: i32, length: usize) -> Self {
        Self {
            score,
            matches: 0,
            length,
        }
    }

    pub fn percent_identity(&self) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        100.0 * self.matches as f64 / self.length as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Traceback {
    Diagonal,
    Up,
    Left,
    None,
}

pub struct GlobalAligner<S: ScoringMatrix> {
    scoring: S,
}

impl Default for GlobalAligner<BLOSUM62> {
    fn default() -> Self {
        Self::new(BLOSUM62::new())
    }
}

impl<S: ScoringMatrix> GlobalAligner<S> {
    pub fn new(scoring: S) -> Self {
        Self { scoring }
    }

    /// Summary of the path `align` would trace, keeping two DP rows only.
    ///
    /// Each cell carries the matches and length of the path through its
    /// chosen predecessor, with the same tie order as `align`.
    pub fn summarize(&self, a: &[u8], b: &[u8]) -> PathSummary {
        let gap = self.scoring.gap();
        let cols = b.len() + 1;
        let mut prev: Vec<PathSummary> = (0..cols)
            .map(|j| PathSummary::gapped(-(gap * j as i32), j))
            .collect();
        let mut curr = vec![PathSummary::default(); cols];

        for i in 1..=a.len() {
            curr[0] = PathSummary::gapped(-(gap * i as i32), i);
            for j in 1..cols {
                let (d, u, l) = (prev[j - 1], prev[j], curr[j - 1]);
                let diagonal = d.score + self.scoring.score(a[i - 1], b[j - 1]);
                let up = u.score - gap;
                let left = l.score - gap;

                curr[j] = if diagonal >= up && diagonal >= left {
                    let identical = a[i - 1] == b[j - 1] && a[i - 1] != GAP;
                    PathSummary {
                        score: diagonal,
                        matches: d.matches + usize::from(identical),
                        length: d.length + 1,
                    }
                } else if up >= left {
                    PathSummary {
                        score: up,
                        length: u.length + 1,
                        ..u
                    }
                } else {
                    PathSummary {
                        score: left,
                        length: l.length + 1,
                        ..l
                    }
                };
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        prev[cols - 1]
    }

    pub fn align(&self, a: &[u8], b: &[u8]) -> PairwiseAlignment {
        let rows = a.len() + 1;
        let cols = b.len() + 1;
        let gap = self.scoring.gap();

        // Row-major flat matrices, rows index `a`, columns index `b`.
        let mut score = vec![0i32; rows * cols];
        let mut trace = vec![Traceback::None; rows * cols];

        for i in 1..rows {
            score[i * cols] = -(gap * i as i32);
            trace[i * cols] = Traceback::Up;
        }
        for j in 1..cols {
            score[j] = -(gap * j as i32);
            trace[j] = Traceback::Left;
        }

        for i in 1..rows {
            for j in 1..cols {
                let diagonal =
                    score[(i - 1) * cols + j - 1] + self.scoring.score(a[i - 1], b[j - 1]);
                let up = score[(i - 1) * cols + j] - gap;
                let left = score[i * cols + j - 1] - gap;

                // Prefer diagonal, then up, then left on equal scores so the
                // traceback is deterministic.
                let (best, direction) = if diagonal >= up && diagonal >= left {
                    (diagonal, Traceback::Diagonal)
                } else if up >= left {
                    (up, Traceback::Up)
                } else {
                    (left, Traceback::Left)
                };
                score[i * cols + j] = best;
                trace[i * cols + j] = direction;
            }
        }

        let (a_aligned, b_aligned) = self.traceback(&trace, cols, a, b);

        PairwiseAlignment {
            score: score[rows * cols - 1],
            a_aligned,
            b_aligned,
        }
    }

    fn traceback(&self, trace: &[Traceback], cols: usize, a: &[u8], b: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut a_aligned = Vec::with_capacity(a.len() + b.len());
        let mut b_aligned = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (a.len(), b.len());

        while i > 0 || j > 0 {
            match trace[i * cols + j] {
                Traceback::Diagonal => {
                    a_aligned.push(a[i - 1]);
                    b_aligned.push(b[j - 1]);
                    i -= 1;
                    j -= 1;
                }
                Traceback::Up => {
                    a_aligned.push(a[i - 1]);
                    b_aligned.push(GAP);
                    i -= 1;
                }
                Traceback::Left => {
                    a_aligned.push(GAP);
                    b_aligned.push(b[j - 1]);
                    j -= 1;
                }
                Traceback::None => break,
            }
        }

        a_aligned.reverse();
        b_aligned.reverse();
        (a_aligned, b_aligned)
    }
}
