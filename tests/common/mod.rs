//! Common fixtures for odbgroup integration tests
//!
//! `scenario_db` builds a small in-memory OrthoDB release around the human
//! query gene `9606_0:001c7b`. `write_release` writes the same data as
//! OrthoDB flat files so the loaders can be exercised.
#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use odbgroup::bio::sequence::{SequenceRecord, STANDARD_AMINO_ACIDS};
use odbgroup::storage::OrthoDatabase;

pub const QUERY: &str = "9606_0:001c7b";
pub const QUERY_UNIPROT: &str = "P69905";
pub const GROUP: &str = "1234at7742";
pub const QUERY_LEN: usize = 100;

/// Deterministic protein of `len` standard residues
pub fn base_sequence(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| STANDARD_AMINO_ACIDS[(i * 7 + 3) % 20])
        .collect()
}

/// Substitute `count` evenly spaced residues with a different amino acid
pub fn mutate(sequence: &[u8], count: usize) -> Vec<u8> {
    let mut out = sequence.to_vec();
    if count == 0 {
        return out;
    }
    let step = out.len() / count;
    for i in 0..count {
        let pos = i * step + 1;
        let idx = STANDARD_AMINO_ACIDS
            .iter()
            .position(|&c| c == out[pos])
            .unwrap_or(0);
        out[pos] = STANDARD_AMINO_ACIDS[(idx + 10) % 20];
    }
    out
}

/// (gene id, sequence) of the ten group members
///
/// Three species. One human paralog is 40% of the query length; every other
/// member is at least 85% of it.
pub fn scenario_members() -> Vec<(&'static str, Vec<u8>)> {
    let base = base_sequence(QUERY_LEN);
    vec![
        (QUERY, base.clone()),
        ("9606_0:001c7c", mutate(&base, 30)),
        ("9606_0:001c7d", base[..40].to_vec()),
        ("9606_0:001c7e", mutate(&base[..95], 3)),
        ("10090_0:00a001", mutate(&base, 5)),
        ("10090_0:00a002", base[..90].to_vec()),
        ("10090_0:00a003", mutate(&base, 20)),
        ("7955_0:00b001", mutate(&base, 25)),
        ("7955_0:00b002", base[..85].to_vec()),
        ("7955_0:00b003", mutate(&base, 10)),
    ]
}

/// Expected least divergent orthologs of the scenario, sorted
pub fn expected_ldos() -> Vec<String> {
    vec![
        "10090_0:00a001".to_string(),
        "7955_0:00b003".to_string(),
        QUERY.to_string(),
    ]
}

pub fn scenario_db() -> OrthoDatabase {
    let mut db = OrthoDatabase::new();
    db.add_level(2759, "Eukaryota", 1952);
    db.add_level(7742, "Vertebrata", 470);
    db.add_level(40674, "Mammalia", 200);
    db.add_species("9606_0", "Homo sapiens");
    db.add_species("10090_0", "Mus musculus");
    db.add_species("7955_0", "Danio rerio");

    db.add_group("77at2759", 2759, "Globin");
    db.add_group(GROUP, 7742, "Hemoglobin subunit alpha");
    db.add_group("900at40674", 40674, "Hemoglobin subunit alpha");
    db.add_membership("77at2759", QUERY);
    db.add_membership("900at40674", QUERY);

    for (id, sequence) in scenario_members() {
        db.add_membership(GROUP, id);
        db.add_sequence(SequenceRecord::new(id, sequence));
    }
    db.add_uniprot(QUERY, QUERY_UNIPROT);
    db
}

fn write_tab(path: &Path, rows: &[Vec<String>]) {
    let mut file = std::fs::File::create(path).unwrap();
    for row in rows {
        writeln!(file, "{}", row.join("\t")).unwrap();
    }
}

fn row(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// Write the scenario as an `odb11v0` release into `dir`, FASTA gzipped
pub fn write_release(dir: &Path) {
    write_tab(
        &dir.join("odb11v0_levels.tab"),
        &[
            row(&["2759", "Eukaryota", "1000000", "50000", "1952"]),
            row(&["7742", "Vertebrata", "400000", "20000", "470"]),
            row(&["40674", "Mammalia", "200000", "18000", "200"]),
        ],
    );
    write_tab(
        &dir.join("odb11v0_species.tab"),
        &[
            row(&["9606", "9606_0", "Homo sapiens", "GCF_000001405.39", "20000", "1", "C"]),
            row(&["10090", "10090_0", "Mus musculus", "GCF_000001635.27", "22000", "1", "C"]),
            row(&["7955", "7955_0", "Danio rerio", "GCF_000002035.6", "26000", "1", "C"]),
        ],
    );
    write_tab(
        &dir.join("odb11v0_OGs.tab"),
        &[
            row(&["77at2759", "2759", "Globin"]),
            row(&[GROUP, "7742", "Hemoglobin subunit alpha"]),
            row(&["900at40674", "40674", "Hemoglobin subunit alpha"]),
        ],
    );

    let mut og2genes = vec![row(&["77at2759", QUERY]), row(&["900at40674", QUERY])];
    let members = scenario_members();
    og2genes.extend(members.iter().map(|(id, _)| row(&[GROUP, id])));
    write_tab(&dir.join("odb11v0_OG2genes.tab"), &og2genes);

    let genes: Vec<Vec<String>> = members
        .iter()
        .map(|(id, _)| {
            let organism = id.split(':').next().unwrap_or("");
            let uniprot = if *id == QUERY { QUERY_UNIPROT } else { "\\N" };
            row(&[id, organism, "orig", "", uniprot, "", "", ""])
        })
        .collect();
    write_tab(&dir.join("odb11v0_genes.tab"), &genes);

    write_tab(
        &dir.join("odb11v0_gene_xrefs.tab"),
        &[
            row(&["10090_0:00a001", "Q91VB8", "UniProt"]),
            row(&["10090_0:00a001", "ENSMUSG00000069919", "Ensembl"]),
        ],
    );

    let file = std::fs::File::create(dir.join("odb11v0_all_og_fasta.tab.gz")).unwrap();
    let mut gz = GzEncoder::new(file, Compression::default());
    for (id, sequence) in &members {
        writeln!(gz, ">{}\t{}", id, "fixture").unwrap();
        gz.write_all(sequence).unwrap();
        writeln!(gz).unwrap();
    }
    gz.finish().unwrap();
}
