use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, saving or searching the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("No vector store found at path: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Vector store file missing: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Vector store file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vector store metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = IndexError::MissingFile(PathBuf::from("vectorstore/db_index/index.vec"));
        assert_eq!(
            err.to_string(),
            "Vector store file missing: vectorstore/db_index/index.vec"
        );

        let err = IndexError::DimensionMismatch {
            expected: 1536,
            actual: 3,
        };
        assert!(err.to_string().contains("1536"));
    }
}
