use async_trait::async_trait;
use medrag_core::{DocumentIndex, Embedder, Passage};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::IndexError;
use crate::store::VectorStore;

/// Document index backed by an index directory on disk.
///
/// The directory is read on first use and kept once it loads successfully;
/// a failed load is retried on the next call so that an index written
/// after startup is picked up without a restart.
pub struct DiskIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    store: OnceCell<VectorStore>,
}

impl DiskIndex {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path: path.into(),
            embedder,
            store: OnceCell::new(),
        }
    }

    /// Wrap an already-loaded store.
    #[must_use]
    pub fn from_store(store: VectorStore, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path: PathBuf::new(),
            embedder,
            store: OnceCell::new_with(Some(store)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn store(&self) -> Result<&VectorStore, IndexError> {
        self.store
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let store = tokio::task::spawn_blocking(move || VectorStore::load(&path))
                    .await
                    .map_err(|e| IndexError::Io(std::io::Error::other(e)))??;

                if store.dimensions() != self.embedder.dimensions() {
                    return Err(IndexError::DimensionMismatch {
                        expected: store.dimensions(),
                        actual: self.embedder.dimensions(),
                    });
                }
                Ok(store)
            })
            .await
    }
}

#[async_trait]
impl DocumentIndex for DiskIndex {
    async fn ensure_loaded(&self) -> anyhow::Result<usize> {
        let store = self.store().await?;
        Ok(store.len())
    }

    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Passage>> {
        let store = self.store().await?;
        let embedding = self.embedder.embed(query).await?;
        let passages = store.search_vector(&embedding, k)?;
        debug!("Retrieved {} passages for query", passages.len());
        if let Some(best) = passages.first() {
            info!("Best match: {} (score {:.3})", best.source_label(), best.score);
        }
        Ok(passages)
    }
}
