//! In-process implementations of the storage, index and embedding services
//!
//! Used for local corpora and tests. All state sits behind `tokio::sync::RwLock`
//! so the services can be shared by concurrent sessions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::text;
use crate::core::{rank_hits, AdapterError, Document, Entities, SearchHit};
use crate::services::{DocumentFilter, DocumentStore, Embedder, SearchIndex, ServiceResult};

/// Document store backed by an ordered map
#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<String, Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn put(&self, doc: Document) -> ServiceResult<()> {
        if doc.id.trim().is_empty() {
            return Err(AdapterError::permanent("document id must not be empty"));
        }
        self.docs.write().await.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn get(&self, id: &str) -> ServiceResult<Option<Document>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn query(&self, filter: &DocumentFilter) -> ServiceResult<Vec<Document>> {
        let docs = self.docs.read().await;
        let matching = docs.values().filter(|d| filter.matches(d)).cloned();

        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn annotate(
        &self,
        id: &str,
        summary: Option<String>,
        entities: Option<Entities>,
    ) -> ServiceResult<bool> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| AdapterError::permanent(format!("document '{}' not found", id)))?;

        let mut changed = false;
        if let Some(summary) = summary {
            if doc.summary.as_ref() != Some(&summary) {
                doc.summary = Some(summary);
                changed = true;
            }
        }
        if let Some(entities) = entities {
            if doc.entities.as_ref() != Some(&entities) {
                doc.entities = Some(entities);
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Exhaustive cosine-similarity index
#[derive(Debug, Default)]
pub struct FlatIndex {
    vectors: RwLock<BTreeMap<String, Vec<f32>>>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl SearchIndex for FlatIndex {
    async fn search(&self, embedding: &[f32], k: usize) -> ServiceResult<Vec<SearchHit>> {
        let vectors = self.vectors.read().await;
        let mut hits = Vec::with_capacity(vectors.len());

        for (id, vector) in vectors.iter() {
            if vector.len() != embedding.len() {
                return Err(AdapterError::permanent(format!(
                    "query has {} dimensions, index has {}",
                    embedding.len(),
                    vector.len()
                )));
            }
            let score = cosine(embedding, vector);
            // Orthogonal vectors share no terms with the query
            if score > 0.0 {
                hits.push(SearchHit::new(id.clone(), score));
            }
        }

        rank_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn upsert(&self, id: &str, embedding: Vec<f32>) -> ServiceResult<()> {
        if embedding.is_empty() {
            return Err(AdapterError::permanent("cannot index an empty vector"));
        }
        self.vectors.write().await.insert(id.to_string(), embedding);
        Ok(())
    }
}

/// Offline embedder using signed feature hashing of content terms
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// FNV-1a; stable across runs and platforms
    fn hash(term: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in term.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    /// Embed synchronously; the async trait method delegates here
    pub fn embed_now(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for term in text::content_terms(text) {
            let stem = term.trim_end_matches('s');
            let hash = Self::hash(stem);
            let bucket = (hash % self.dims as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        Ok(self.embed_now(text))
    }
}
