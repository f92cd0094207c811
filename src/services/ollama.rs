//! Ollama client implementation
//!
//! Async HTTP client for the Ollama API, serving as both the generative model
//! behind summarization/extraction and the embedding model behind retrieval.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::text::preview;
use crate::core::{AdapterError, Config, NewsroomError, Result};
use crate::services::{Embedder, ServiceResult, TextModel};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    generative_model: String,
    embedding_model: String,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: OllamaMessage,
}

/// Ollama embeddings request
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Ollama embeddings response
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.timeout_secs))
            .build()
            .map_err(|e| NewsroomError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.ollama_url(),
            generative_model: config.models.generative.clone(),
            embedding_model: config.models.embedding.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List models installed in Ollama
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NewsroomError::Other(format!(
                "Failed to list models ({})",
                response.status()
            )));
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models.models.into_iter().map(|m| m.name).collect())
    }

    /// Check that both configured models are installed
    pub async fn check_models(&self) -> Result<()> {
        let models = self.list_models().await?;
        for wanted in [&self.generative_model, &self.embedding_model] {
            let found = models
                .iter()
                .any(|m| m == wanted || m.split(':').next() == wanted.split(':').next());
            if !found {
                return Err(NewsroomError::config(format!(
                    "Model '{}' not available in Ollama. Run: ollama pull {}",
                    wanted, wanted
                )));
            }
        }
        Ok(())
    }

    /// POST a JSON body and decode the JSON response, classifying failures
    async fn post_json<B, R>(&self, path: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::from_http(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AdapterError::from_status(status.as_u16(), error_text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AdapterError::from_http(&e))?;
        tracing::trace!(path, response = %preview(&text, 500), "ollama response");

        serde_json::from_str(&text)
            .map_err(|e| AdapterError::permanent(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl TextModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> ServiceResult<String> {
        let request = ChatRequest {
            model: &self.generative_model,
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            options: Some(OllamaOptions {
                temperature: Some(0.2),
            }),
            stream: false,
        };

        let response: ChatResponse = self.post_json("/api/chat", &request).await?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        let response: EmbeddingResponse = self.post_json("/api/embeddings", &request).await?;
        if response.embedding.is_empty() {
            return Err(AdapterError::permanent("embedding model returned an empty vector"));
        }
        Ok(response.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let mut config = Config::default();
        config.ollama.host = "localhost".to_string();
        config.ollama.port = 11434;
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "qwen3:8b",
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            options: None,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["stream"], false);
        assert!(json.get("options").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let mut config = Config::default();
        config.ollama.host = "127.0.0.1".to_string();
        config.ollama.port = 9;
        config.ollama.timeout_secs = 2;
        let client = OllamaClient::from_config(&config).unwrap();

        let err = client.generate("hi").await.unwrap_err();
        assert!(err.is_transient());
    }
}
