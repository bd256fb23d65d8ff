//! Context retrieval from the documentation search index.

use askrc_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Context blob used when the index has nothing for a query.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Separator placed between fragments in the context blob.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

const DEFAULT_API_VERSION: &str = "2023-11-01";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ordered fragments returned for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievedContext {
    fragments: Vec<String>,
}

impl RetrievedContext {
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments }
    }

    /// The "nothing matched" context. Not an error.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments joined into the single blob the prompt and validator see.
    pub fn to_blob(&self) -> String {
        if self.fragments.is_empty() {
            NO_RELEVANT_INFORMATION.to_string()
        } else {
            self.fragments.join(FRAGMENT_SEPARATOR)
        }
    }
}

/// Source of supporting documentation for a question.
///
/// Implementations return [`RetrievedContext::empty`] when nothing matches and
/// `AppError::Retrieval` for transport or auth failures. They never retry.
#[async_trait::async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Fetch at most `top_k` fragments for the cleaned query.
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<RetrievedContext>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchDocument>,
}

/// Only `content` matters; a missing or null field counts as empty text.
#[derive(Debug, Deserialize)]
struct SearchDocument {
    #[serde(default)]
    content: Option<String>,
}

impl SearchResponse {
    fn into_context(self) -> RetrievedContext {
        RetrievedContext::new(
            self.value
                .into_iter()
                .map(|doc| doc.content.unwrap_or_default())
                .collect(),
        )
    }
}

/// Azure Cognitive Search retriever using the REST query API.
#[derive(Debug, Clone)]
pub struct AzureSearchRetriever {
    endpoint: String,
    index: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
}

impl AzureSearchRetriever {
    /// Create a retriever for `{endpoint}/indexes/{index}`.
    pub fn new(
        endpoint: impl Into<String>,
        index: impl Into<String>,
        api_key: impl Into<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Retrieval(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            index: index.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client,
        })
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, self.api_version
        )
    }
}

#[async_trait::async_trait]
impl ContextRetriever for AzureSearchRetriever {
    fn name(&self) -> &str {
        "azure-search"
    }

    #[instrument(skip(self, query), fields(index = %self.index))]
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<RetrievedContext> {
        if top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        let url = self.search_url();
        debug!("Querying search index at {}", url);

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&SearchRequest { search: query, top: top_k })
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to reach search index: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Retrieval(format!(
                "Search API error ({}): {}",
                status, error_text
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse search response: {}", e)))?;

        let context = body.into_context();
        info!(
            response_count = context.len(),
            context_length = context.to_blob().len(),
            "Retrieved context"
        );

        Ok(context)
    }
}
