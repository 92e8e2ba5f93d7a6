/// CD-HIT redundancy clustering driver and `.clstr` parser
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::bio::fasta::write_fasta;
use crate::bio::sequence::{GeneId, SequenceRecord};
use crate::tools::runner::{staging_dir, ToolCommand};
use crate::tools::traits::{ClusterAssignment, ClusterOutput, Clusterer};
use crate::{OdbError, Result};

/// Protein word size CD-HIT accepts for an identity threshold
pub fn word_size(threshold: f64) -> Result<u8> {
    match threshold {
        t if (0.7..=1.0).contains(&t) => Ok(5),
        t if t >= 0.6 && t < 0.7 => Ok(4),
        t if t >= 0.5 && t < 0.6 => Ok(3),
        t if t >= 0.4 && t < 0.5 => Ok(2),
        t => Err(OdbError::ClusteringTool(format!(
            "identity threshold {} is outside the range CD-HIT supports (0.4 to 1.0)",
            t
        ))),
    }
}

const DEFAULT_THROW_AWAY: usize = 10;

/// CD-HIT's `-l` for inputs whose shortest sequence has `shortest` residues
pub fn throw_away_length(shortest: usize) -> usize {
    shortest.saturating_sub(1).min(DEFAULT_THROW_AWAY)
}

#[derive(Debug, Clone)]
pub struct CdHit {
    executable: String,
    identity_threshold: f64,
    threads: usize,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
    temp_root: Option<PathBuf>,
}

impl CdHit {
    pub fn new(executable: impl Into<String>, identity_threshold: f64) -> Self {
        Self {
            executable: executable.into(),
            identity_threshold,
            threads: 1,
            extra_args: Vec::new(),
            timeout: None,
            temp_root: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// `cd-hit -i in -o out -c T -n W -M 0 -d 0 -T threads -l L [extra...]`
    ///
    /// `shortest` is the length of the shortest input sequence. CD-HIT drops
    /// sequences of `-l` residues or fewer, so `L` stays below it.
    pub fn command(&self, input: &Path, output: &Path, shortest: usize) -> Result<ToolCommand> {
        let word = word_size(self.identity_threshold)?;
        Ok(ToolCommand::new(&self.executable)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-c")
            .arg(self.identity_threshold.to_string())
            .arg("-n")
            .arg(word.to_string())
            .args(["-M", "0", "-d", "0", "-T"])
            .arg(self.threads.to_string())
            .arg("-l")
            .arg(throw_away_length(shortest).to_string())
            .args(&self.extra_args))
    }
}

impl Clusterer for CdHit {
    fn name(&self) -> &str {
        "cd-hit"
    }

    fn cluster(
        &self,
        sequences: &IndexMap<GeneId, SequenceRecord>,
        run_label: &str,
    ) -> Result<ClusterOutput> {
        let fail = |msg: String| OdbError::ClusteringTool(msg);

        let staging = staging_dir(self.temp_root.as_deref(), run_label)
            .map_err(|e| fail(format!("cannot create staging directory: {}", e)))?;
        let input = staging.path().join("ldos.fasta");
        let output = staging.path().join("ldos_clustered.fasta");
        let shortest = sequences.values().map(SequenceRecord::len).min().unwrap_or(0);
        let command = self.command(&input, &output, shortest)?;
        let rendered = command.render();

        if sequences.is_empty() {
            return Ok(ClusterOutput {
                command: rendered,
                clusters: ClusterAssignment::new(),
            });
        }

        let records: Vec<SequenceRecord> = sequences
            .values()
            .map(|r| SequenceRecord::new(r.id.clone(), r.sequence.clone()))
            .collect();
        let refs: Vec<&SequenceRecord> = records.iter().collect();
        write_fasta(&input, &refs)?;

        info!(
            "Clustering {} sequences with CD-HIT at {}",
            sequences.len(),
            self.identity_threshold
        );
        command
            .run(self.timeout)
            .map_err(|e| fail(e.to_string()))?;

        if !output.is_file() {
            return Err(fail(format!(
                "CD-HIT exited without writing {}",
                output.display()
            )));
        }
        let mut clstr_path = output.into_os_string();
        clstr_path.push(".clstr");
        let text = std::fs::read_to_string(&clstr_path)
            .map_err(|e| fail(format!("cannot read cluster file: {}", e)))?;
        let clusters = parse_clstr(&text).map_err(fail)?;
        clusters.verify_partition(sequences.keys()).map_err(fail)?;
        debug!("{} sequences fell into {} clusters", sequences.len(), clusters.len());

        Ok(ClusterOutput {
            command: rendered,
            clusters,
        })
    }
}

/// Parse a CD-HIT `.clstr` report.
///
/// ```text
/// >Cluster 0
/// 0	350aa, >9606_0:001c7b... *
/// 1	349aa, >9598_0:00a1b2... at 98.85%
/// ```
pub fn parse_clstr(text: &str) -> std::result::Result<ClusterAssignment, String> {
    let mut clusters = ClusterAssignment::new();
    let mut representative: Option<GeneId> = None;
    let mut members: Vec<GeneId> = Vec::new();
    let mut in_cluster = false;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(">Cluster") {
            if in_cluster {
                finish_cluster(&mut clusters, representative.take(), std::mem::take(&mut members))?;
            }
            in_cluster = true;
            continue;
        }
        if !in_cluster {
            return Err(format!("line {}: member line before any cluster header", line_no + 1));
        }

        let (_, entry) = line
            .split_once('>')
            .ok_or_else(|| format!("line {}: no sequence id in `{}`", line_no + 1, line))?;
        let (id, flag) = match entry.find("...") {
            Some(pos) => (&entry[..pos], entry[pos + 3..].trim()),
            None => {
                let mut parts = entry.splitn(2, char::is_whitespace);
                (parts.next().unwrap_or(""), parts.next().unwrap_or("").trim())
            }
        };
        let id = id.trim().trim_end_matches("...").to_string();
        if id.is_empty() {
            return Err(format!("line {}: empty sequence id", line_no + 1));
        }

        if flag == "*" {
            if representative.is_some() {
                return Err(format!("line {}: second representative in one cluster", line_no + 1));
            }
            representative = Some(id.clone());
        }
        members.push(id);
    }
    if in_cluster {
        finish_cluster(&mut clusters, representative, members)?;
    }
    Ok(clusters)
}

fn finish_cluster(
    clusters: &mut ClusterAssignment,
    representative: Option<GeneId>,
    members: Vec<GeneId>,
) -> std::result::Result<(), String> {
    match representative {
        Some(rep) => {
            clusters.insert(rep, members);
            Ok(())
        }
        None if members.is_empty() => Ok(()),
        None => Err(format!("cluster without a representative: {:?}", members)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, 5)]
    #[case(0.9, 5)]
    #[case(0.7, 5)]
    #[case(0.65, 4)]
    #[case(0.5, 3)]
    #[case(0.45, 2)]
    #[case(0.4, 2)]
    fn test_word_size(#[case] threshold: f64, #[case] expected: u8) {
        assert_eq!(word_size(threshold).unwrap(), expected);
    }

    #[test]
    fn test_word_size_out_of_range() {
        assert!(word_size(0.39).is_err());
        assert!(word_size(1.01).is_err());
    }

    #[test]
    fn test_command_arguments() {
        let cdhit = CdHit::new("cd-hit", 0.9)
            .with_threads(2)
            .with_extra_args(vec!["-g".into(), "1".into()]);
        let cmd = cdhit
            .command(Path::new("/tmp/in.fa"), Path::new("/tmp/out.fa"), 350)
            .unwrap();
        assert_eq!(
            cmd.render(),
            "cd-hit -i /tmp/in.fa -o /tmp/out.fa -c 0.9 -n 5 -M 0 -d 0 -T 2 -l 10 -g 1"
        );
    }

    #[rstest]
    #[case(350, 10)]
    #[case(11, 10)]
    #[case(10, 9)]
    #[case(9, 8)]
    #[case(1, 0)]
    #[case(0, 0)]
    fn test_throw_away_length_keeps_shortest(#[case] shortest: usize, #[case] expected: usize) {
        assert_eq!(throw_away_length(shortest), expected);
        assert!(expected < shortest || shortest == 0);
    }

    #[test]
    fn test_short_inputs_lower_the_length_cutoff() {
        let cmd = CdHit::new("cd-hit", 0.9)
            .command(Path::new("in.fa"), Path::new("out.fa"), 9)
            .unwrap();
        assert!(cmd.render().ends_with("-T 1 -l 8"));
    }

    #[test]
    fn test_parse_clstr() {
        let text = "\
>Cluster 0
0\t350aa, >9606_0:001c7b... *
1\t349aa, >9598_0:00a1b2... at 98.85%
>Cluster 1
0\t120aa, >10090_0:0003ff... *
";
        let clusters = parse_clstr(text).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(
            clusters.members("9606_0:001c7b").unwrap(),
            &["9606_0:001c7b".to_string(), "9598_0:00a1b2".to_string()]
        );
        assert_eq!(
            clusters.members("10090_0:0003ff").unwrap(),
            &["10090_0:0003ff".to_string()]
        );
    }

    #[test]
    fn test_parse_clstr_representative_not_first() {
        let text = ">Cluster 0\n0\t80aa, >b... at 95.00%\n1\t90aa, >a... *\n";
        let clusters = parse_clstr(text).unwrap();
        assert_eq!(clusters.members("a").unwrap(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_parse_clstr_rejects_cluster_without_representative() {
        let text = ">Cluster 0\n0\t80aa, >b... at 95.00%\n";
        assert!(parse_clstr(text).is_err());
    }

    #[test]
    fn test_empty_input_skips_tool() {
        let cdhit = CdHit::new("odbgroup-missing-cd-hit", 0.9);
        let out = cdhit.cluster(&IndexMap::new(), "q").unwrap();
        assert!(out.clusters.is_empty());
        assert!(out.command.starts_with("odbgroup-missing-cd-hit -i"));
    }

    #[test]
    fn test_missing_executable_is_clustering_error() {
        let cdhit = CdHit::new("odbgroup-missing-cd-hit", 0.9);
        let mut seqs = IndexMap::new();
        seqs.insert("a".to_string(), SequenceRecord::new("a", b"MKV".to_vec()));
        let err = cdhit.cluster(&seqs, "q").unwrap_err();
        assert!(matches!(err, OdbError::ClusteringTool(_)));
    }
}
