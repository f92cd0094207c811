//! Services module - external collaborators behind the capability adapters
//!
//! The agent never talks to a model, index or database directly. Adapters in
//! `crate::tools` hold `Arc` handles to these traits, which makes them cheap to
//! share across concurrent sessions.

pub mod corpus;
pub mod memory;
pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::Backend;
use crate::core::{AdapterError, Config, Document, Entities, SearchHit};

pub use memory::{FlatIndex, HashingEmbedder, InMemoryStore};
pub use ollama::OllamaClient;

/// Result type returned by external services
pub type ServiceResult<T> = std::result::Result<T, AdapterError>;

/// Selection criteria for `DocumentStore::query`
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Restrict to these ids
    pub ids: Option<Vec<String>>,
    /// Only documents that do (or do not) carry a summary
    pub has_summary: Option<bool>,
    /// Only documents that do (or do not) carry extracted entities
    pub has_entities: Option<bool>,
    /// Case-insensitive substring of the text
    pub text_contains: Option<String>,
    pub limit: Option<usize>,
}

impl DocumentFilter {
    /// Check a single document against the filter (limit is not applied)
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(ref ids) = self.ids {
            if !ids.iter().any(|id| id == &doc.id) {
                return false;
            }
        }
        if let Some(want) = self.has_summary {
            if doc.summary.is_some() != want {
                return false;
            }
        }
        if let Some(want) = self.has_entities {
            if doc.entities.is_some() != want {
                return false;
            }
        }
        if let Some(ref needle) = self.text_contains {
            if !doc.text.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Persistent document storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document
    async fn put(&self, doc: Document) -> ServiceResult<()>;

    /// Fetch a document by id
    async fn get(&self, id: &str) -> ServiceResult<Option<Document>>;

    /// Documents matching the filter, ordered by id
    async fn query(&self, filter: &DocumentFilter) -> ServiceResult<Vec<Document>>;

    /// Attach a summary and/or entities to an existing document.
    ///
    /// Idempotent: writing the same annotation twice leaves the store unchanged.
    /// Returns whether the stored document changed.
    async fn annotate(
        &self,
        id: &str,
        summary: Option<String>,
        entities: Option<Entities>,
    ) -> ServiceResult<bool>;
}

/// Opaque nearest-neighbour index
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Up to `k` nearest documents, best first
    async fn search(&self, embedding: &[f32], k: usize) -> ServiceResult<Vec<SearchHit>>;

    /// Insert or replace the vector of a document
    async fn upsert(&self, id: &str, embedding: Vec<f32>) -> ServiceResult<()>;
}

/// Text embedding model
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;
}

/// Generative text model
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> ServiceResult<String>;
}

/// Handles to every external service the adapters need
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub index: Arc<dyn SearchIndex>,
    pub embedder: Arc<dyn Embedder>,
    /// Absent when running fully offline
    pub model: Option<Arc<dyn TextModel>>,
}

impl Services {
    /// Build services for the configured backend
    pub fn from_config(config: &Config) -> crate::core::Result<Self> {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let index: Arc<dyn SearchIndex> = Arc::new(FlatIndex::new());

        let services = match config.models.backend {
            Backend::Local => Self {
                store,
                index,
                embedder: Arc::new(HashingEmbedder::new(config.models.hashing_dims)),
                model: None,
            },
            Backend::Ollama => {
                let client = Arc::new(OllamaClient::from_config(config)?);
                Self {
                    store,
                    index,
                    embedder: client.clone(),
                    model: Some(client),
                }
            }
        };

        Ok(services)
    }

    /// Fully offline services with the given embedding dimensions
    pub fn local(dims: usize) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            index: Arc::new(FlatIndex::new()),
            embedder: Arc::new(HashingEmbedder::new(dims)),
            model: None,
        }
    }
}
