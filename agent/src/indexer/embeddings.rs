//! Azure OpenAI embeddings client used by the index loader.

use super::IndexerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Characters of source text quoted in embedding failure messages.
const ERROR_SNIPPET_CHARS: usize = 200;

#[async_trait]
pub trait EmbeddingsModel: Send + Sync {
    /// Returns the embedding vector for `text`.
    async fn create_embedding(&self, text: &str) -> Result<Vec<f32>, IndexerError>;
}

/// Embeddings client for an Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureOpenAiEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl AzureOpenAiEmbeddings {
    pub fn new(api_key: String, azure_endpoint: &str, deployment: &str, api_version: &str) -> Self {
        let endpoint = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            azure_endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

fn embedding_error(text: &str, detail: Option<String>) -> IndexerError {
    let snippet: String = text.chars().take(ERROR_SNIPPET_CHARS).collect();
    IndexerError::Embedding {
        snippet: format!("{snippet}..."),
        detail,
    }
}

#[async_trait]
impl EmbeddingsModel for AzureOpenAiEmbeddings {
    async fn create_embedding(&self, text: &str) -> Result<Vec<f32>, IndexerError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: [text] })
            .send()
            .await
            .map_err(|e| embedding_error(text, Some(e.to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(embedding_error(text, Some(format!("{status}: {body}"))));
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| embedding_error(text, Some(e.to_string())))?;
        parsed.data.sort_by_key(|entry| entry.index);
        parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| embedding_error(text, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use warp::Filter;

    #[tokio::test]
    async fn test_create_embedding_returns_first_vector() {
        let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::default();
        let sink = seen.clone();
        let route = warp::post()
            .and(warp::path!("openai" / "deployments" / String / "embeddings"))
            .and(warp::header::<String>("api-key"))
            .and(warp::body::json())
            .map(move |_deployment: String, key: String, body: Value| {
                sink.lock().unwrap().push((key, body));
                warp::reply::json(&json!({
                    "data": [{ "embedding": [0.1, 0.2, 0.3], "index": 0 }]
                }))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let embeddings =
            AzureOpenAiEmbeddings::new("key".into(), &format!("http://{addr}/"), "embed", "2024-02-01");
        let vector = embeddings.create_embedding("PerksPlus").await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "key");
        assert_eq!(seen[0].1, json!({ "input": ["PerksPlus"] }));
    }

    #[tokio::test]
    async fn test_service_error_quotes_text_snippet() {
        let route = warp::any().map(|| {
            warp::reply::with_status("deployment not found", warp::http::StatusCode::NOT_FOUND)
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let embeddings =
            AzureOpenAiEmbeddings::new("key".into(), &format!("http://{addr}"), "missing", "2024-02-01");
        let text = "x".repeat(300);
        let err = embeddings.create_embedding(&text).await.unwrap_err();
        let message = err.to_string();

        assert!(message.contains(&format!("<{}...>", "x".repeat(200))));
        assert!(message.contains("deployment not found"));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let route = warp::any().map(|| warp::reply::json(&json!({ "data": [] })));
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let embeddings =
            AzureOpenAiEmbeddings::new("key".into(), &format!("http://{addr}"), "embed", "2024-02-01");
        let err = embeddings.create_embedding("short").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to generate embeddings for description: <short...>"
        );
    }
}
