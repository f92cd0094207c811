//! Corpus loading
//!
//! Reads documents produced by the ingestion pipeline (one JSON object per
//! line) and loads them into the document store and the search index.

use std::fs;
use std::path::Path;

use crate::core::{Document, NewsroomError, Result};
use crate::services::{ServiceResult, Services};

/// Parse a JSON-lines corpus. Blank lines and `#` comments are skipped.
pub fn parse_corpus(content: &str) -> Result<Vec<Document>> {
    let mut docs = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let doc: Document = serde_json::from_str(line).map_err(|e| {
            NewsroomError::Other(format!("corpus line {}: {}", line_no + 1, e))
        })?;
        docs.push(doc);
    }

    Ok(docs)
}

/// Read and parse a corpus file
pub fn read_corpus(path: &Path) -> Result<Vec<Document>> {
    let content = fs::read_to_string(path)?;
    parse_corpus(&content)
}

/// Store and index documents, embedding those that arrive without a vector.
///
/// A document that fails to embed, index or store is skipped with a warning.
/// Returns the number of documents loaded.
pub async fn ingest(services: &Services, docs: Vec<Document>) -> Result<usize> {
    let total = docs.len();
    let mut loaded = 0;

    for doc in docs {
        let id = doc.id.clone();
        match load_document(services, doc).await {
            Ok(()) => loaded += 1,
            Err(e) => tracing::warn!(doc = %id, error = %e, "skipping document"),
        }
    }

    tracing::info!(documents = loaded, skipped = total - loaded, "corpus loaded");
    Ok(loaded)
}

async fn load_document(services: &Services, mut doc: Document) -> ServiceResult<()> {
    if doc.embedding.is_empty() {
        doc.embedding = services.embedder.embed(&doc.text).await?;
    }

    services.index.upsert(&doc.id, doc.embedding.clone()).await?;
    tracing::debug!(doc = %doc.id, dims = doc.embedding.len(), "indexed document");
    services.store.put(doc).await
}
