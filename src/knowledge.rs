//! Knowledge responder
//!
//! Answers free-form card questions from the user guide. The question is
//! embedded locally with all-MiniLM-L6-v2, the model the index was built
//! with. The closest guide passages are fetched from the search index and the
//! LLM answers using only those passages.

mod embed;
mod search;

pub use embed::MiniLmEmbedder;
pub use search::{SearchConfig, SearchIndexClient};

use crate::llm::{LlmError, LlmRequest, LlmService};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Dimension of the index's `embedding` field
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Number of passages retrieved per question
pub const TOP_K: usize = 3;

/// Completion budget for a knowledge answer
const ANSWER_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Query embedding failed: {0}")]
    Embedding(String),
    #[error("Search request failed: {0}")]
    Search(String),
}

/// Answers a question in natural language
#[async_trait]
pub trait KnowledgeResponder: Send + Sync {
    async fn answer(&self, query: &str) -> Result<String, KnowledgeError>;
}

/// Turns a question into a vector in the index's embedding space
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError>;
}

/// Source of passages relevant to an embedded query
#[async_trait]
pub trait PassageSearch: Send + Sync {
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<String>, KnowledgeError>;
}

/// Retrieval-augmented responder over a vector search index
pub struct SearchIndexResponder {
    llm: Arc<dyn LlmService>,
    embedder: Arc<dyn QueryEmbedder>,
    search: Arc<dyn PassageSearch>,
}

impl SearchIndexResponder {
    pub fn new(
        llm: Arc<dyn LlmService>,
        embedder: Arc<dyn QueryEmbedder>,
        search: Arc<dyn PassageSearch>,
    ) -> Self {
        Self {
            llm,
            embedder,
            search,
        }
    }
}

#[async_trait]
impl KnowledgeResponder for SearchIndexResponder {
    async fn answer(&self, query: &str) -> Result<String, KnowledgeError> {
        tracing::debug!(query, "Searching knowledge base");
        let vector = self.embedder.embed(query).await?;
        let passages = self.search.nearest(&vector, TOP_K).await?;
        tracing::debug!(passages = passages.len(), "Retrieved knowledge passages");

        let request = LlmRequest::prompt(None, answer_prompt(query, &passages))
            .with_max_tokens(ANSWER_MAX_TOKENS);
        let response = self.llm.complete(&request).await?;
        let answer = response.text.trim().to_string();
        tracing::info!(query, answer = %answer, "Knowledge base answered");
        Ok(answer)
    }
}

fn answer_prompt(query: &str, passages: &[String]) -> String {
    let knowledge = passages.join("\n\n");
    format!(
        "Answer the question using only the information below.\n\n\
         ### Knowledge:\n{knowledge}\n\n\
         ### Question:\n{query}\n\n\
         ### Answer:\n"
    )
}
