use crate::core::models::ids::EntityId;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const STRUCTURE_EXTENSION: &str = "pdb";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("No input found for entity '{0}'")]
    NotFound(EntityId),

    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The per-entity inputs of a batch, looked up by normalized identifier.
pub trait EntityCatalog: Send + Sync {
    fn contains(&self, id: &EntityId) -> bool;

    /// The size metric used for role assignment (residue count).
    fn size_of(&self, id: &EntityId) -> Result<usize, CatalogError>;
}

/// Structure files `<id>.pdb` in one directory, indexed case-insensitively by stem.
#[derive(Debug, Clone)]
pub struct StructureCatalog {
    dir: PathBuf,
    index: HashMap<EntityId, PathBuf>,
}

impl StructureCatalog {
    pub fn open(dir: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(STRUCTURE_EXTENSION))
            })
            .collect();
        entries.sort();

        let mut index = HashMap::new();
        for path in entries {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(id) = EntityId::parse(stem) else {
                warn!("Ignoring structure file with unusable entity name: {:?}", path);
                continue;
            };
            if let Some(existing) = index.get(&id) {
                warn!(
                    "Structure files {:?} and {:?} map to the same entity '{}'; keeping the first.",
                    existing, path, id
                );
                continue;
            }
            index.insert(id, path);
        }

        debug!(
            entities = index.len(),
            "Indexed structure directory {:?}.",
            dir
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            index,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, id: &EntityId) -> Option<&Path> {
        self.index.get(id).map(PathBuf::as_path)
    }

    pub fn file_name_of(&self, id: &EntityId) -> Option<&str> {
        self.path_of(id)
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl EntityCatalog for StructureCatalog {
    fn contains(&self, id: &EntityId) -> bool {
        self.path_of(id).is_some_and(Path::exists)
    }

    fn size_of(&self, id: &EntityId) -> Result<usize, CatalogError> {
        let path = self
            .path_of(id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        count_alpha_carbons(BufReader::new(file)).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Counts `ATOM` records of alpha carbons, one per residue.
pub fn count_alpha_carbons(reader: impl BufRead) -> io::Result<usize> {
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with("ATOM") && line.contains(" CA ") {
            count += 1;
        }
    }
    Ok(count)
}

/// Protein sequences from a FASTA file; the first header token is the identifier.
#[derive(Debug, Clone, Default)]
pub struct SequenceCatalog {
    sequences: HashMap<EntityId, String>,
}

impl SequenceCatalog {
    pub fn read_from(reader: impl BufRead) -> io::Result<Self> {
        let mut sequences = HashMap::new();
        let mut current: Option<(EntityId, String)> = None;

        let mut flush = |entry: Option<(EntityId, String)>| {
            if let Some((id, seq)) = entry {
                if sequences.contains_key(&id) {
                    warn!("Duplicate FASTA record for '{}'; keeping the first.", id);
                } else {
                    sequences.insert(id, seq);
                }
            }
        };

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if let Some(header) = line.strip_prefix('>') {
                flush(current.take());
                let token = header.split_whitespace().next().unwrap_or("");
                match EntityId::parse(token) {
                    Ok(id) => current = Some((id, String::new())),
                    Err(e) => warn!("Skipping FASTA record '{}': {}", header, e),
                }
            } else if let Some((_, seq)) = current.as_mut() {
                seq.push_str(line);
            }
        }
        flush(current.take());

        Ok(Self { sequences })
    }

    pub fn read_from_path(path: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        Self::read_from(BufReader::new(file)).map_err(io_err)
    }

    pub fn sequence_of(&self, id: &EntityId) -> Option<&str> {
        self.sequences.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl EntityCatalog for SequenceCatalog {
    fn contains(&self, id: &EntityId) -> bool {
        self.sequences.contains_key(id)
    }

    fn size_of(&self, id: &EntityId) -> Result<usize, CatalogError> {
        self.sequence_of(id)
            .map(str::len)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    const PDB_TWO_RESIDUES: &str = "\
HEADER    TEST
ATOM      1  N   ALA A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  C   ALA A   1      13.140   5.816  -5.231  1.00  0.00           C
ATOM      4  CA  GLY A   2      14.500   5.000  -4.000  1.00  0.00           C
HETATM    5  CA  CA  B   1       0.000   0.000   0.000  1.00  0.00          CA
END
";

    fn id(raw: &str) -> EntityId {
        EntityId::parse(raw).unwrap()
    }

    #[test]
    fn count_alpha_carbons_ignores_other_atoms_and_hetero_records() {
        let count = count_alpha_carbons(Cursor::new(PDB_TWO_RESIDUES)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn structure_catalog_indexes_case_insensitively() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("at1g01010.pdb"), PDB_TWO_RESIDUES).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = StructureCatalog::open(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(&id("AT1G01010")));
        assert_eq!(catalog.file_name_of(&id("At1g01010")), Some("at1g01010.pdb"));
        assert_eq!(catalog.size_of(&id("AT1G01010")).unwrap(), 2);
    }

    #[test]
    fn structure_files_named_like_pairs_are_not_indexed() {
        let dir = tempdir().unwrap();
        for name in ["A-B.pdb", "B-C.pdb", "A.pdb", "C.pdb"] {
            fs::write(dir.path().join(name), PDB_TWO_RESIDUES).unwrap();
        }

        let catalog = StructureCatalog::open(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(&id("A")));
        assert!(catalog.contains(&id("C")));
    }

    #[test]
    fn structure_catalog_reports_missing_entities() {
        let dir = tempdir().unwrap();
        let catalog = StructureCatalog::open(dir.path()).unwrap();
        assert!(!catalog.contains(&id("P1")));
        assert!(matches!(
            catalog.size_of(&id("P1")),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn structure_catalog_fails_on_missing_directory() {
        let dir = tempdir().unwrap();
        let result = StructureCatalog::open(&dir.path().join("absent"));
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn sequence_catalog_parses_multiline_records() {
        let fasta = ">p1 some description\nMKT\nAYI\n>P2\nMA\n>bad/id\nXXX\n";
        let catalog = SequenceCatalog::read_from(Cursor::new(fasta)).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.sequence_of(&id("P1")), Some("MKTAYI"));
        assert_eq!(catalog.size_of(&id("p2")).unwrap(), 2);
        assert!(!catalog.contains(&id("P3")));
    }

    #[test]
    fn sequence_catalog_keeps_the_first_duplicate_record() {
        let fasta = ">P1\nAAAA\n>p1\nCC\n";
        let catalog = SequenceCatalog::read_from(Cursor::new(fasta)).unwrap();
        assert_eq!(catalog.sequence_of(&id("P1")), Some("AAAA"));
    }
}
