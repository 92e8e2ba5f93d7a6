/// In-memory OrthoDB index loaded from the OrthoDB flat-file release
use crate::bio::fasta;
use crate::bio::sequence::{species_of, GeneId, SequenceRecord};
use crate::core::config::DatabaseConfig;
use crate::storage::traits::{
    not_found, GroupMembership, OrthologGroup, SequenceStore, UniProtXref,
};
use crate::{OdbError, Result};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct LevelInfo {
    name: String,
    species_count: usize,
}

#[derive(Debug, Clone)]
struct GroupInfo {
    level_id: u32,
    name: String,
}

/// Read-only orthology database.
///
/// Construct it once (from files or through the `add_*` builders) and pass it
/// by reference to every component that needs it.
#[derive(Debug, Default)]
pub struct OrthoDatabase {
    sequences: HashMap<GeneId, SequenceRecord>,
    levels: HashMap<u32, LevelInfo>,
    groups: HashMap<String, GroupInfo>,
    group_members: HashMap<String, Vec<GeneId>>,
    gene_groups: HashMap<GeneId, Vec<String>>,
    gene_uniprot: HashMap<GeneId, String>,
    uniprot_genes: HashMap<String, Vec<GeneId>>,
    xref_genes: HashMap<String, Vec<GeneId>>,
    /// Smallest xref accession per gene
    gene_xref: HashMap<GeneId, String>,
    species_names: HashMap<String, String>,
}

/// Resolved locations of the OrthoDB release files
#[derive(Debug, Clone)]
pub struct OrthoDbFiles {
    pub levels: PathBuf,
    pub species: PathBuf,
    pub groups: PathBuf,
    pub group_genes: PathBuf,
    pub genes: PathBuf,
    pub gene_xrefs: Option<PathBuf>,
    pub fasta: PathBuf,
}

impl OrthoDbFiles {
    /// Locate the release files in `config.dir`, accepting `.gz` variants.
    pub fn locate(config: &DatabaseConfig) -> Result<Self> {
        let dir = config.dir.as_ref().ok_or_else(|| {
            OdbError::Config("database.dir must point at an OrthoDB release directory".to_string())
        })?;
        let prefix = &config.release_prefix;

        let required = |suffix: &str| -> Result<PathBuf> {
            find_table(dir, &format!("{}_{}", prefix, suffix)).ok_or_else(|| {
                OdbError::Database(format!(
                    "missing OrthoDB file {}_{} in {}",
                    prefix,
                    suffix,
                    dir.display()
                ))
            })
        };

        Ok(Self {
            levels: required("levels.tab")?,
            species: required("species.tab")?,
            groups: required("OGs.tab")?,
            group_genes: required("OG2genes.tab")?,
            genes: required("genes.tab")?,
            gene_xrefs: find_table(dir, &format!("{}_gene_xrefs.tab", prefix)),
            fasta: required("all_og_fasta.tab")?,
        })
    }
}

fn find_table(dir: &Path, name: &str) -> Option<PathBuf> {
    let plain = dir.join(name);
    if plain.exists() {
        return Some(plain);
    }
    let gz = dir.join(format!("{}.gz", name));
    gz.exists().then_some(gz)
}

/// Stream a headerless tab-separated file, one callback per row.
fn for_each_row<F>(path: &Path, min_columns: usize, mut f: F) -> Result<usize>
where
    F: FnMut(&csv::StringRecord) -> Result<()>,
{
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut tsv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut rows = 0;
    for record in tsv.records() {
        let record = record?;
        if record.len() < min_columns {
            return Err(OdbError::Database(format!(
                "{}: expected at least {} columns, found {} on row {}",
                path.display(),
                min_columns,
                record.len(),
                rows + 1
            )));
        }
        f(&record)?;
        rows += 1;
    }
    Ok(rows)
}

fn present(value: &str) -> Option<&str> {
    let value = value.trim();
    match value {
        "" | "\\N" | "NA" => None,
        v => Some(v),
    }
}

fn parse_count(path: &Path, value: &str) -> Result<usize> {
    value.trim().parse::<usize>().map_err(|e| {
        OdbError::Database(format!("{}: invalid count '{}': {}", path.display(), value, e))
    })
}

fn parse_taxid(path: &Path, value: &str) -> Result<u32> {
    value.trim().parse::<u32>().map_err(|e| {
        OdbError::Database(format!("{}: invalid tax id '{}': {}", path.display(), value, e))
    })
}

impl OrthoDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every table of an OrthoDB release into memory
    pub fn load(config: &DatabaseConfig) -> Result<Self> {
        let files = OrthoDbFiles::locate(config)?;
        Self::from_files(&files)
    }

    pub fn from_files(files: &OrthoDbFiles) -> Result<Self> {
        let start = Instant::now();
        let mut db = Self::new();

        let rows = for_each_row(&files.levels, 5, |row| {
            let level_id = parse_taxid(&files.levels, &row[0])?;
            let species_count = parse_count(&files.levels, &row[4])?;
            db.add_level(level_id, &row[1], species_count);
            Ok(())
        })?;
        debug!("Loaded {} levels from {}", rows, files.levels.display());

        let rows = for_each_row(&files.species, 3, |row| {
            db.add_species(&row[1], &row[2]);
            Ok(())
        })?;
        debug!("Loaded {} species from {}", rows, files.species.display());

        let rows = for_each_row(&files.groups, 3, |row| {
            let level_id = parse_taxid(&files.groups, &row[1])?;
            db.add_group(&row[0], level_id, &row[2]);
            Ok(())
        })?;
        debug!("Loaded {} ortholog groups from {}", rows, files.groups.display());

        let rows = for_each_row(&files.group_genes, 2, |row| {
            db.add_membership(&row[0], &row[1]);
            Ok(())
        })?;
        debug!("Loaded {} memberships from {}", rows, files.group_genes.display());

        let rows = for_each_row(&files.genes, 5, |row| {
            if let Some(accession) = present(&row[4]) {
                db.add_uniprot(&row[0], accession);
            }
            Ok(())
        })?;
        debug!("Loaded {} genes from {}", rows, files.genes.display());

        if let Some(xrefs) = &files.gene_xrefs {
            let rows = for_each_row(xrefs, 3, |row| {
                if row[2].trim().eq_ignore_ascii_case("uniprot") {
                    if let Some(accession) = present(&row[1]) {
                        db.add_xref(accession, &row[0]);
                    }
                }
                Ok(())
            })?;
            debug!("Loaded {} xrefs from {}", rows, xrefs.display());
        } else {
            warn!("No gene xref table found; UniProt lookups use the gene table only");
        }

        for record in fasta::parse_fasta(&files.fasta)? {
            db.add_sequence(record);
        }

        info!(
            "Loaded OrthoDB index: {} sequences, {} groups, {} levels in {:.1}s",
            db.sequences.len(),
            db.groups.len(),
            db.levels.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(db)
    }

    pub fn add_level(&mut self, level_id: u32, name: &str, species_count: usize) {
        self.levels.insert(
            level_id,
            LevelInfo {
                name: name.to_string(),
                species_count,
            },
        );
    }

    pub fn add_species(&mut self, organism_id: &str, name: &str) {
        self.species_names
            .insert(organism_id.to_string(), name.to_string());
    }

    pub fn add_group(&mut self, group_id: &str, level_id: u32, name: &str) {
        self.groups.insert(
            group_id.to_string(),
            GroupInfo {
                level_id,
                name: name.to_string(),
            },
        );
    }

    pub fn add_membership(&mut self, group_id: &str, gene_id: &str) {
        self.group_members
            .entry(group_id.to_string())
            .or_default()
            .push(gene_id.to_string());
        self.gene_groups
            .entry(gene_id.to_string())
            .or_default()
            .push(group_id.to_string());
    }

    /// Record the gene table's UniProt accession for a gene
    pub fn add_uniprot(&mut self, gene_id: &str, accession: &str) {
        self.gene_uniprot
            .insert(gene_id.to_string(), accession.to_string());
        self.uniprot_genes
            .entry(accession.to_string())
            .or_default()
            .push(gene_id.to_string());
    }

    /// Record a UniProt entry from the xref table
    pub fn add_xref(&mut self, accession: &str, gene_id: &str) {
        let genes = self.xref_genes.entry(accession.to_string()).or_default();
        if !genes.iter().any(|g| g == gene_id) {
            genes.push(gene_id.to_string());
        }
        let current = self
            .gene_xref
            .entry(gene_id.to_string())
            .or_insert_with(|| accession.to_string());
        if accession < current.as_str() {
            *current = accession.to_string();
        }
    }

    pub fn add_sequence(&mut self, record: SequenceRecord) {
        self.sequences.insert(record.id.clone(), record);
    }

    /// Scientific name of the organism a gene belongs to
    pub fn species_name(&self, gene_id: &str) -> Option<&str> {
        self.species_names
            .get(species_of(gene_id))
            .map(String::as_str)
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl SequenceStore for OrthoDatabase {
    fn get(&self, gene_id: &str) -> Result<SequenceRecord> {
        self.sequences
            .get(gene_id)
            .cloned()
            .ok_or_else(|| not_found(gene_id))
    }

    fn contains(&self, gene_id: &str) -> bool {
        self.sequences.contains_key(gene_id)
    }
}

impl GroupMembership for OrthoDatabase {
    fn list_groups(&self, gene_id: &str) -> Result<Vec<OrthologGroup>> {
        let Some(group_ids) = self.gene_groups.get(gene_id) else {
            return Ok(Vec::new());
        };

        let mut groups = Vec::with_capacity(group_ids.len());
        for group_id in group_ids {
            let info = self.groups.get(group_id).ok_or_else(|| {
                OdbError::Database(format!(
                    "group {} listed for {} is missing from the OG table",
                    group_id, gene_id
                ))
            })?;
            let (level_name, species_count) = match self.levels.get(&info.level_id) {
                Some(level) => (level.name.clone(), level.species_count),
                None => {
                    warn!("Level {} of group {} is not in the levels table", info.level_id, group_id);
                    (info.level_id.to_string(), 0)
                }
            };
            groups.push(OrthologGroup {
                group_id: group_id.clone(),
                level_id: info.level_id,
                level_name,
                member_count: self.group_members.get(group_id).map_or(0, Vec::len),
                species_count,
                name: info.name.clone(),
            });
        }
        Ok(groups)
    }

    fn list_members(&self, group_id: &str) -> Result<Vec<GeneId>> {
        self.group_members
            .get(group_id)
            .cloned()
            .ok_or_else(|| OdbError::NotFound(format!("ortholog group {}", group_id)))
    }

    fn uniprot_of(&self, gene_id: &str) -> Result<Option<String>> {
        if let Some(accession) = self.gene_uniprot.get(gene_id) {
            return Ok(Some(accession.clone()));
        }
        Ok(self.gene_xref.get(gene_id).cloned())
    }
}

impl UniProtXref for OrthoDatabase {
    fn resolve(&self, uniprot_id: &str) -> Result<Vec<GeneId>> {
        if let Some(genes) = self.uniprot_genes.get(uniprot_id) {
            return Ok(genes.clone());
        }
        debug!("{} not found in gene key table, searching in xref table", uniprot_id);
        Ok(self.xref_genes.get(uniprot_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_db() -> OrthoDatabase {
        let mut db = OrthoDatabase::new();
        db.add_level(7742, "Vertebrata", 470);
        db.add_level(2759, "Eukaryota", 1952);
        db.add_group("100at7742", 7742, "BRCA2");
        db.add_group("200at2759", 2759, "BRCA2 family");
        db.add_membership("100at7742", "9606_0:001c7b");
        db.add_membership("100at7742", "10090_0:000abc");
        db.add_membership("200at2759", "9606_0:001c7b");
        db.add_sequence(SequenceRecord::new("9606_0:001c7b", b"MKT".to_vec()));
        db.add_uniprot("9606_0:001c7b", "P51587");
        db.add_xref("Q00000", "10090_0:000abc");
        db.add_species("9606_0", "Homo sapiens");
        db
    }

    #[test]
    fn test_list_groups() {
        let db = small_db();
        let groups = db.list_groups("9606_0:001c7b").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_id, "100at7742");
        assert_eq!(groups[0].level_name, "Vertebrata");
        assert_eq!(groups[0].member_count, 2);
        assert_eq!(groups[1].level_name, "Eukaryota");
        assert!(db.list_groups("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_sequence() {
        let db = small_db();
        assert!(db.get("9606_0:001c7b").is_ok());
        match db.get("10090_0:000abc") {
            Err(OdbError::NotFound(id)) => assert_eq!(id, "10090_0:000abc"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_uniprot_lookups() {
        let db = small_db();
        assert_eq!(db.resolve("P51587").unwrap(), vec!["9606_0:001c7b".to_string()]);
        assert_eq!(db.resolve("Q00000").unwrap(), vec!["10090_0:000abc".to_string()]);
        assert!(db.resolve("P99999").unwrap().is_empty());
        assert_eq!(db.uniprot_of("9606_0:001c7b").unwrap().as_deref(), Some("P51587"));
        assert_eq!(db.uniprot_of("10090_0:000abc").unwrap().as_deref(), Some("Q00000"));
        assert_eq!(db.species_name("9606_0:001c7b"), Some("Homo sapiens"));
    }

    #[test]
    fn test_reverse_xref_prefers_smallest_accession() {
        let mut db = small_db();
        db.add_xref("Q9ZZZ9", "10090_0:000abc");
        db.add_xref("A0A000", "10090_0:000abc");
        db.add_xref("A0A000", "10090_0:000abc");
        assert_eq!(db.uniprot_of("10090_0:000abc").unwrap().as_deref(), Some("A0A000"));
        assert_eq!(db.resolve("A0A000").unwrap(), vec!["10090_0:000abc".to_string()]);
        assert_eq!(db.uniprot_of("7955_0:000001").unwrap(), None);
    }
}
