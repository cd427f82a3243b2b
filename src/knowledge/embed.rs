//! Local query embedding with the model the search index was built with

use super::{KnowledgeError, QueryEmbedder, EMBEDDING_DIMENSIONS};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task;

/// Sentence model behind the index's `embedding` field (all-MiniLM-L6-v2)
pub const EMBEDDING_MODEL: EmbeddingModel = EmbeddingModel::AllMiniLML6V2;

/// all-MiniLM-L6-v2 run in-process through ONNX
pub struct MiniLmEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl MiniLmEmbedder {
    /// Load the model, downloading it into `cache_dir` on first use
    pub fn new(cache_dir: PathBuf) -> Result<Self, KnowledgeError> {
        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            KnowledgeError::Embedding(format!(
                "Failed to create model cache {}: {e}",
                cache_dir.display()
            ))
        })?;
        let model = TextEmbedding::try_new(InitOptions::new(EMBEDDING_MODEL).with_cache_dir(cache_dir))
            .map_err(|e| KnowledgeError::Embedding(format!("Failed to load embedding model: {e}")))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl QueryEmbedder for MiniLmEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        let model = self.model.clone();
        let text = text.to_string();

        let embeddings = task::spawn_blocking(move || {
            let mut model = model.blocking_lock();
            model.embed(vec![text], None)
        })
        .await
        .map_err(|e| KnowledgeError::Embedding(format!("Embedding task failed: {e}")))?
        .map_err(|e| KnowledgeError::Embedding(e.to_string()))?;

        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::Embedding("No embedding generated".to_string()))?;
        check_dimensions(vector)
    }
}

/// Reject vectors the index's `embedding` field cannot hold
pub fn check_dimensions(vector: Vec<f32>) -> Result<Vec<f32>, KnowledgeError> {
    if vector.len() == EMBEDDING_DIMENSIONS {
        Ok(vector)
    } else {
        Err(KnowledgeError::Embedding(format!(
            "Expected {EMBEDDING_DIMENSIONS} dimensions, got {}",
            vector.len()
        )))
    }
}
