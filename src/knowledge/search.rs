//! Azure AI Search vector queries

use super::{KnowledgeError, PassageSearch};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2023-11-01";

/// Connection settings for the search service
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index: String,
    pub timeout: Duration,
}

/// Client for the `docs/search` endpoint of one index
pub struct SearchIndexClient {
    client: Client,
    url: String,
    api_key: String,
}

impl SearchIndexClient {
    pub fn new(config: &SearchConfig) -> Result<Self, KnowledgeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| KnowledgeError::Search(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: search_url(&config.endpoint, &config.index),
            api_key: config.api_key.clone(),
        })
    }
}

fn search_url(endpoint: &str, index: &str) -> String {
    format!(
        "{}/indexes/{index}/docs/search?api-version={API_VERSION}",
        endpoint.trim_end_matches('/')
    )
}

fn search_request(vector: &[f32], k: usize) -> SearchRequest<'_> {
    SearchRequest {
        search: "*",
        vector_queries: vec![VectorQuery {
            kind: "vector",
            vector,
            k,
            fields: "embedding",
        }],
        top: k,
        select: "content",
    }
}

#[async_trait]
impl PassageSearch for SearchIndexClient {
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<String>, KnowledgeError> {
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&search_request(vector, k))
            .send()
            .await
            .map_err(|e| KnowledgeError::Search(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KnowledgeError::Search(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(KnowledgeError::Search(format!("HTTP {status}: {body}")));
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| KnowledgeError::Search(format!("Failed to parse response: {e}")))?;
        Ok(parsed.value.into_iter().filter_map(|doc| doc.content).collect())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search: &'static str,
    vector_queries: Vec<VectorQuery<'a>>,
    top: usize,
    select: &'static str,
}

#[derive(Debug, Serialize)]
struct VectorQuery<'a> {
    kind: &'static str,
    vector: &'a [f32],
    k: usize,
    fields: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchDocument>,
}

#[derive(Debug, Deserialize)]
struct SearchDocument {
    #[serde(default)]
    content: Option<String>,
}
