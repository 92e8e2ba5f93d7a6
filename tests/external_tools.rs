//! CD-HIT and MAFFT adapters driven through stand-in shell scripts
#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use common::*;
use indexmap::IndexMap;
use odbgroup::bio::sequence::SequenceRecord;
use odbgroup::tools::{CdHit, Clusterer, Mafft, MultipleAligner};
use odbgroup::OdbError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// Copies the input and puts every sequence into one cluster headed by the first
const FAKE_CDHIT: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -i) in="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
cp "$in" "$out"
echo ">Cluster 0" > "$out.clstr"
n=0
grep '^>' "$in" | while read -r header; do
  id=${header#>}
  if [ "$n" -eq 0 ]; then
    echo "$n	100aa, >$id... *"
  else
    echo "$n	100aa, >$id... at 95.00%"
  fi
  n=$((n + 1))
done >> "$out.clstr"
"#;

// Echoes its last argument, which is the input FASTA
const FAKE_MAFFT: &str = r#"#!/bin/sh
for arg; do last="$arg"; done
cat "$last"
"#;

// Honours `-l` the way CD-HIT does: sequences of that length or shorter are
// left out of the report. Every kept sequence is its own cluster.
const LENGTH_CUTOFF_CDHIT: &str = r#"#!/bin/sh
l=10
while [ $# -gt 0 ]; do
  case "$1" in
    -i) in="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    -l) l="$2"; shift 2 ;;
    *) shift ;;
  esac
done
cp "$in" "$out"
awk -v l="$l" '
  function emit() {
    if (len > l) { printf ">Cluster %d\n0\t%daa, >%s... *\n", n, len, id; n++ }
  }
  /^>/ { if (id != "") emit(); id = substr($0, 2); len = 0; next }
  { len += length($0) }
  END { if (id != "") emit() }
' "$in" > "$out.clstr"
"#;

// Exits cleanly after writing the report but not the clustered FASTA
const CLSTR_ONLY_CDHIT: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -i) in="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
id=$(grep '^>' "$in" | head -n 1 | cut -c 2-)
printf '>Cluster 0\n0\t100aa, >%s... *\n' "$id" > "$out.clstr"
"#;

const SILENT_TOOL: &str = "#!/bin/sh\nexit 0\n";

const FAILING_TOOL: &str = "#!/bin/sh\necho 'out of memory' >&2\nexit 3\n";

fn install(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn ldo_records() -> IndexMap<String, SequenceRecord> {
    let members = scenario_members();
    expected_ldos()
        .into_iter()
        .map(|id| {
            let sequence = members
                .iter()
                .find(|(member, _)| *member == id)
                .map(|(_, s)| s.clone())
                .unwrap();
            (id.clone(), SequenceRecord::new(id, sequence))
        })
        .collect()
}

#[test]
fn test_cdhit_script_output_is_parsed() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let exe = install(bin.path(), "cd-hit", FAKE_CDHIT);

    let cdhit = CdHit::new(exe.display().to_string(), 0.9)
        .with_threads(2)
        .with_temp_root(Some(scratch.path().to_path_buf()));
    let output = cdhit.cluster(&ldo_records(), "fake").unwrap();

    assert_eq!(output.clusters.len(), 1);
    let representative = expected_ldos()[0].clone();
    assert_eq!(
        output.clusters.representatives().collect::<Vec<_>>(),
        vec![&representative]
    );
    assert_eq!(output.clusters.members(&representative).unwrap().len(), 3);
    assert!(output.command.contains("-c 0.9 -n 5 -M 0 -d 0 -T 2"));

    // staging directory is removed once the run finishes
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn test_cdhit_failure_carries_stderr() {
    let bin = TempDir::new().unwrap();
    let exe = install(bin.path(), "cd-hit", FAILING_TOOL);

    let err = CdHit::new(exe.display().to_string(), 0.9)
        .cluster(&ldo_records(), "fake")
        .unwrap_err();
    match err {
        OdbError::ClusteringTool(message) => assert!(message.contains("out of memory")),
        other => panic!("Expected ClusteringTool error, got {:?}", other),
    }
}

#[test]
fn test_mafft_script_rows_are_checked() {
    let bin = TempDir::new().unwrap();
    let exe = install(bin.path(), "mafft", FAKE_MAFFT);
    let records = ldo_records();
    let refs: Vec<&SequenceRecord> = records.values().collect();

    let output = Mafft::new(exe.display().to_string())
        .with_threads(4)
        .align(&refs, "fake")
        .unwrap();

    assert_eq!(output.rows.len(), 3);
    assert!(output.rows.iter().all(|row| row.len() == QUERY_LEN));
    assert!(output.row(QUERY).is_some());
    assert!(output.command.contains("--thread 4 --quiet --anysymbol"));
}

#[test]
fn test_mafft_ragged_output_is_rejected() {
    let bin = TempDir::new().unwrap();
    let exe = install(bin.path(), "mafft", FAKE_MAFFT);
    let query = SequenceRecord::new(QUERY, base_sequence(QUERY_LEN));
    let short = SequenceRecord::new("10090_0:00a002", base_sequence(90));

    let err = Mafft::new(exe.display().to_string())
        .align(&[&query, &short], "fake")
        .unwrap_err();
    assert!(matches!(err, OdbError::AlignmentTool(_)));
}

fn scratch_is_empty(scratch: &TempDir) -> bool {
    std::fs::read_dir(scratch.path()).unwrap().count() == 0
}

#[test]
fn test_cdhit_failure_removes_staging() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let exe = install(bin.path(), "cd-hit", FAILING_TOOL);

    let result = CdHit::new(exe.display().to_string(), 0.9)
        .with_temp_root(Some(scratch.path().to_path_buf()))
        .cluster(&ldo_records(), "fake");
    assert!(matches!(result, Err(OdbError::ClusteringTool(_))));
    assert!(scratch_is_empty(&scratch));
}

#[test]
fn test_cdhit_without_clustered_fasta_is_an_error() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let exe = install(bin.path(), "cd-hit", CLSTR_ONLY_CDHIT);
    let mut records = ldo_records();
    records.truncate(1);

    let err = CdHit::new(exe.display().to_string(), 0.9)
        .with_temp_root(Some(scratch.path().to_path_buf()))
        .cluster(&records, "fake")
        .unwrap_err();
    match err {
        OdbError::ClusteringTool(message) => assert!(message.contains("ldos_clustered.fasta")),
        other => panic!("Expected ClusteringTool error, got {:?}", other),
    }
    assert!(scratch_is_empty(&scratch));
}

#[test]
fn test_cdhit_without_any_output_is_an_error() {
    let bin = TempDir::new().unwrap();
    let exe = install(bin.path(), "cd-hit", SILENT_TOOL);

    let err = CdHit::new(exe.display().to_string(), 0.9)
        .cluster(&ldo_records(), "fake")
        .unwrap_err();
    assert!(matches!(err, OdbError::ClusteringTool(_)));
}

#[test]
fn test_cdhit_keeps_sequences_at_the_default_cutoff() {
    let bin = TempDir::new().unwrap();
    let exe = install(bin.path(), "cd-hit", LENGTH_CUTOFF_CDHIT);
    let mut records = IndexMap::new();
    for (id, sequence) in [
        (QUERY, base_sequence(20)),
        ("10090_0:00a001", base_sequence(9)),
        ("7955_0:00b003", base_sequence(10)),
    ] {
        records.insert(id.to_string(), SequenceRecord::new(id, sequence));
    }

    let output = CdHit::new(exe.display().to_string(), 0.9)
        .cluster(&records, "short")
        .unwrap();
    assert!(output.command.contains("-l 8"));
    assert_eq!(output.clusters.len(), 3);
    assert_eq!(
        output.clusters.members("10090_0:00a001").unwrap(),
        &["10090_0:00a001".to_string()]
    );
}

#[test]
fn test_mafft_failure_removes_staging() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let exe = install(bin.path(), "mafft", FAILING_TOOL);
    let records = ldo_records();
    let refs: Vec<&SequenceRecord> = records.values().collect();

    let err = Mafft::new(exe.display().to_string())
        .with_temp_root(Some(scratch.path().to_path_buf()))
        .align(&refs, "fake")
        .unwrap_err();
    match err {
        OdbError::AlignmentTool(message) => assert!(message.contains("out of memory")),
        other => panic!("Expected AlignmentTool error, got {:?}", other),
    }
    assert!(scratch_is_empty(&scratch));
}

#[test]
fn test_mafft_without_output_is_an_error() {
    let bin = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let exe = install(bin.path(), "mafft", SILENT_TOOL);
    let records = ldo_records();
    let refs: Vec<&SequenceRecord> = records.values().collect();

    let err = Mafft::new(exe.display().to_string())
        .with_temp_root(Some(scratch.path().to_path_buf()))
        .align(&refs, "fake")
        .unwrap_err();
    assert!(matches!(err, OdbError::AlignmentTool(_)));
    assert!(scratch_is_empty(&scratch));
}
