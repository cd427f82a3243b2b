//! Test doubles for the collaborators of the dialogue controller
//!
//! These let the router, classifier and ledger be exercised without network
//! or filesystem access.

use crate::knowledge::{KnowledgeError, KnowledgeResponder, QueryEmbedder, EMBEDDING_DIMENSIONS};
use crate::ledger::{LedgerSnapshot, LedgerStore, StoreError};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock LLM
// ============================================================================

/// LLM double that replays queued completions and records every call
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful completion
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a failed completion
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock knowledge responder
// ============================================================================

/// Knowledge double with queued answers
pub struct MockKnowledge {
    answers: Mutex<VecDeque<Result<String, KnowledgeError>>>,
    queries: Mutex<Vec<String>>,
}

impl MockKnowledge {
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_answer(&self, answer: Result<String, KnowledgeError>) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeResponder for MockKnowledge {
    async fn answer(&self, query: &str) -> Result<String, KnowledgeError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(KnowledgeError::Search("No mock answer queued".to_string())))
    }
}

// ============================================================================
// Mock query embedder
// ============================================================================

/// Embedder returning a one-hot index-width vector per query
pub struct MockEmbedder {
    queries: Mutex<Vec<String>>,
    fail_next: Mutex<bool>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            fail_next: Mutex::new(false),
        }
    }

    /// The vector returned for `text`
    pub fn vector_for(text: &str) -> Vec<f32> {
        let hot = text.len() % EMBEDDING_DIMENSIONS;
        (0..EMBEDDING_DIMENSIONS)
            .map(|i| if i == hot { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEmbedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        self.queries.lock().unwrap().push(text.to_string());
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(KnowledgeError::Embedding("model unavailable".to_string()));
        }
        Ok(Self::vector_for(text))
    }
}

// ============================================================================
// Ledger stores
// ============================================================================

/// In-memory store; clones share the same slot
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<LedgerSnapshot>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn saved(&self) -> Option<LedgerSnapshot> {
        self.slot.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, StoreError> {
        Ok(self.saved())
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = Some(snapshot.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// Store whose every read and write fails
pub struct FailingStore;

impl FailingStore {
    fn error() -> StoreError {
        StoreError::Io {
            path: PathBuf::from("/unwritable/card_states.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only filesystem"),
        }
    }
}

impl LedgerStore for FailingStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, StoreError> {
        Err(Self::error())
    }

    fn save(&self, _: &LedgerSnapshot) -> Result<(), StoreError> {
        Err(Self::error())
    }
}
