use medrag_core::{Passage, PassageMetadata};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info};

use crate::error::IndexError;
use crate::scoring::cosine_similarity;

/// File holding the raw vectors.
pub const VECTORS_FILE: &str = "index.vec";
/// File holding passage text and metadata, parallel to the vectors.
pub const METADATA_FILE: &str = "index.json";

const MAGIC: &[u8; 4] = b"MRIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

/// One indexed chunk of the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexEntry {
    pub text: String,
    #[serde(default)]
    pub metadata: PassageMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// In-memory flat index: every query is scored against every vector.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
    entries: Vec<IndexEntry>,
}

impl VectorStore {
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Append one embedded chunk.
    pub fn add(
        &mut self,
        text: impl Into<String>,
        metadata: PassageMetadata,
        vector: Vec<f32>,
    ) -> Result<(), IndexError> {
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        self.vectors.push(vector);
        self.entries.push(IndexEntry {
            text: text.into(),
            metadata,
        });
        Ok(())
    }

    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Load an index directory written by [`VectorStore::save`].
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        if !dir.is_dir() {
            return Err(IndexError::MissingDirectory(dir.to_path_buf()));
        }

        let vectors_path = dir.join(VECTORS_FILE);
        let metadata_path = dir.join(METADATA_FILE);
        for path in [&vectors_path, &metadata_path] {
            if !path.is_file() {
                return Err(IndexError::MissingFile(path.clone()));
            }
        }

        info!("Loading vector store from {}", dir.display());

        let bytes = std::fs::read(&vectors_path)?;
        let (dimensions, vectors) =
            decode_vectors(&bytes).map_err(|reason| IndexError::Corrupt {
                path: vectors_path.clone(),
                reason,
            })?;

        let metadata: MetadataFile = serde_json::from_slice(&std::fs::read(&metadata_path)?)?;
        if metadata.dimensions != dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                actual: metadata.dimensions,
            });
        }
        if metadata.entries.len() != vectors.len() {
            return Err(IndexError::Corrupt {
                path: metadata_path,
                reason: format!(
                    "{} metadata entries for {} vectors",
                    metadata.entries.len(),
                    vectors.len()
                ),
            });
        }

        info!(
            "Vector store loaded: {} passages, {} dimensions",
            vectors.len(),
            dimensions
        );

        Ok(Self {
            dimensions,
            vectors,
            entries: metadata.entries,
        })
    }

    /// Write both index files into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        std::fs::create_dir_all(dir)?;

        let vectors_path = dir.join(VECTORS_FILE);
        let bytes = encode_vectors(self.dimensions, &self.vectors).map_err(|reason| {
            IndexError::Corrupt {
                path: vectors_path.clone(),
                reason,
            }
        })?;
        std::fs::write(&vectors_path, bytes)?;

        let metadata = MetadataFile {
            dimensions: self.dimensions,
            entries: self.entries.clone(),
        };
        std::fs::write(
            dir.join(METADATA_FILE),
            serde_json::to_vec_pretty(&metadata)?,
        )?;

        info!("Saved vector store with {} passages to {}", self.len(), dir.display());
        Ok(())
    }

    /// Top-`k` passages by cosine similarity, best first. Ties keep
    /// insertion order.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<Passage>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .par_iter()
            .enumerate()
            .map(|(i, vector)| (i, cosine_similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        debug!("Vector search returned {} of {} passages", scored.len(), self.len());

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &self.entries[i];
                Passage {
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                    score: score as f32,
                }
            })
            .collect())
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, String> {
    offset
        .checked_add(4)
        .and_then(|end| bytes.get(offset..end))
        .and_then(|slice| <[u8; 4]>::try_from(slice).ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| format!("truncated header at byte {offset}"))
}

fn decode_vectors(bytes: &[u8]) -> Result<(usize, Vec<Vec<f32>>), String> {
    if bytes.len() < HEADER_LEN {
        return Err("truncated header".to_string());
    }
    if bytes.get(..4) != Some(MAGIC.as_slice()) {
        return Err("bad magic bytes".to_string());
    }
    let version = read_u32(bytes, 4)?;
    if version != FORMAT_VERSION {
        return Err(format!("unsupported format version {version}"));
    }

    let dimensions = read_u32(bytes, 8)? as usize;
    let count = read_u32(bytes, 12)? as usize;
    if dimensions == 0 {
        return Err("zero dimensions".to_string());
    }

    let expected = dimensions
        .checked_mul(count)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| "vector count overflows".to_string())?;
    if bytes.len() != expected {
        return Err(format!("expected {expected} bytes, found {}", bytes.len()));
    }

    let floats: Vec<f32> = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok((
        dimensions,
        floats.chunks(dimensions).map(<[f32]>::to_vec).collect(),
    ))
}

fn encode_vectors(dimensions: usize, vectors: &[Vec<f32>]) -> Result<Vec<u8>, String> {
    let dims = u32::try_from(dimensions).map_err(|_| "too many dimensions".to_string())?;
    let count = u32::try_from(vectors.len()).map_err(|_| "too many vectors".to_string())?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + dimensions * vectors.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dims.to_le_bytes());
    bytes.extend_from_slice(&count.to_le_bytes());
    for value in vectors.iter().flatten() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, page: u32) -> PassageMetadata {
        PassageMetadata {
            source: Some(source.to_string()),
            page: Some(page),
        }
    }

    fn sample_store() -> VectorStore {
        let mut store = VectorStore::new(3);
        store
            .add("Diabetes raises blood glucose.", meta("diabetes.pdf", 1), vec![1.0, 0.0, 0.0])
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .add("Hypertension is high blood pressure.", meta("heart.pdf", 7), vec![0.0, 1.0, 0.0])
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .add("Insulin lowers glucose.", meta("diabetes.pdf", 2), vec![0.9, 0.1, 0.0])
            .unwrap_or_else(|e| panic!("{e}"));
        store
    }

    #[test]
    fn search_orders_by_similarity() {
        let store = sample_store();
        let results = store
            .search_vector(&[1.0, 0.0, 0.0], 2)
            .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "Diabetes raises blood glucose.");
        assert_eq!(results[1].text, "Insulin lowers glucose.");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn search_ties_keep_insertion_order() {
        let mut store = VectorStore::new(2);
        for text in ["first", "second", "third"] {
            store
                .add(text, PassageMetadata::default(), vec![1.0, 1.0])
                .unwrap_or_else(|e| panic!("{e}"));
        }
        let results = store
            .search_vector(&[1.0, 1.0], 3)
            .unwrap_or_else(|e| panic!("{e}"));
        let texts: Vec<&str> = results.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let store = sample_store();
        let results = store
            .search_vector(&[0.0, 0.0, 1.0], 10)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn add_rejects_wrong_dimensions() {
        let mut store = VectorStore::new(3);
        let err = store.add("x", PassageMetadata::default(), vec![1.0]);
        assert!(matches!(
            err,
            Err(IndexError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn search_rejects_wrong_query_dimensions() {
        let store = sample_store();
        assert!(store.search_vector(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn save_then_load_preserves_passages() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("db_index");
        let store = sample_store();
        store.save(&path).unwrap_or_else(|e| panic!("{e}"));

        let loaded = VectorStore::load(&path).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.entries(), store.entries());
        assert_eq!(loaded.vectors, store.vectors);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let err = VectorStore::load(&dir.path().join("absent"));
        assert!(matches!(err, Err(IndexError::MissingDirectory(_))));
    }

    #[test]
    fn missing_metadata_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        sample_store().save(dir.path()).unwrap_or_else(|e| panic!("{e}"));
        std::fs::remove_file(dir.path().join(METADATA_FILE)).unwrap_or_else(|e| panic!("{e}"));

        let err = VectorStore::load(dir.path());
        assert!(matches!(err, Err(IndexError::MissingFile(p)) if p.ends_with(METADATA_FILE)));
    }

    #[test]
    fn truncated_vectors_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        sample_store().save(dir.path()).unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join(VECTORS_FILE);
        let bytes = std::fs::read(&path).unwrap_or_else(|e| panic!("{e}"));
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap_or_else(|e| panic!("{e}"));

        let err = VectorStore::load(dir.path());
        assert!(matches!(err, Err(IndexError::Corrupt { .. })));
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut bytes = encode_vectors(2, &[vec![1.0, 2.0]]).unwrap_or_default();
        bytes[0] = b'X';
        assert_eq!(decode_vectors(&bytes), Err("bad magic bytes".to_string()));
    }

    #[test]
    fn header_reads_past_the_end_are_errors() {
        let bytes = [b'M', b'R', b'I', b'X', 1, 0];
        assert_eq!(read_u32(&bytes, 0), Ok(u32::from_le_bytes(*b"MRIX")));
        assert!(read_u32(&bytes, 4).is_err());
        assert!(read_u32(&bytes, usize::MAX - 1).is_err());
        assert_eq!(decode_vectors(&bytes), Err("truncated header".to_string()));
    }
}
