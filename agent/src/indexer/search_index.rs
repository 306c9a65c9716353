//! Azure AI Search REST calls: index creation and document upserts.

use super::IndexerError;
use crate::models::IndexedDocument;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

pub const SEARCH_API_VERSION: &str = "2023-11-01";
pub const VECTOR_DIMENSIONS: usize = 1536;
pub const VECTOR_PROFILE: &str = "my-vector-config";
pub const VECTOR_ALGORITHM: &str = "my-algorithms-config";

/// Index definition with the document fields and an HNSW vector profile.
pub fn index_definition(name: &str) -> Value {
    json!({
        "name": name,
        "fields": [
            { "name": "docId", "type": "Edm.String", "key": true, "searchable": false },
            { "name": "docTitle", "type": "Edm.String", "searchable": false },
            { "name": "description", "type": "Edm.String", "searchable": true },
            {
                "name": "descriptionVector",
                "type": "Collection(Edm.Single)",
                "searchable": true,
                "retrievable": true,
                "dimensions": VECTOR_DIMENSIONS,
                "vectorSearchProfile": VECTOR_PROFILE
            }
        ],
        "scoringProfiles": [],
        "corsOptions": { "allowedOrigins": ["*"] },
        "vectorSearch": {
            "profiles": [{ "name": VECTOR_PROFILE, "algorithm": VECTOR_ALGORITHM }],
            "algorithms": [{ "name": VECTOR_ALGORITHM, "kind": "hnsw" }]
        }
    })
}

#[derive(Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(flatten)]
    document: &'a IndexedDocument,
}

#[derive(Serialize)]
struct IndexBatch<'a> {
    value: Vec<IndexAction<'a>>,
}

#[derive(Debug, Deserialize)]
struct IndexBatchResult {
    #[serde(default)]
    value: Vec<IndexingResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexingResult {
    key: String,
    status: bool,
    error_message: Option<String>,
}

#[derive(Clone)]
pub struct SearchIndexClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SearchIndexClient {
    pub fn new(endpoint: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api-version={}", self.endpoint, path, SEARCH_API_VERSION)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, IndexerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(IndexerError::SearchService {
            status: status.as_u16(),
            body,
        })
    }

    /// Creates the index, or updates it in place when it already exists.
    pub async fn create_or_update_index(&self, name: &str) -> Result<(), IndexerError> {
        let resp = self
            .client
            .put(self.url(&format!("indexes/{}", urlencoding::encode(name))))
            .header("api-key", &self.api_key)
            .json(&index_definition(name))
            .send()
            .await?;
        Self::check(resp).await?;
        info!("Index '{}' created or updated", name);
        Ok(())
    }

    /// Upserts `documents`, returning how many the service accepted.
    pub async fn merge_or_upload_documents(
        &self,
        index_name: &str,
        documents: &[IndexedDocument],
    ) -> Result<usize, IndexerError> {
        let batch = IndexBatch {
            value: documents
                .iter()
                .map(|document| IndexAction {
                    action: "mergeOrUpload",
                    document,
                })
                .collect(),
        };

        let resp = self
            .client
            .post(self.url(&format!("indexes/{}/docs/index", urlencoding::encode(index_name))))
            .header("api-key", &self.api_key)
            .json(&batch)
            .send()
            .await?;
        let result: IndexBatchResult = Self::check(resp).await?.json().await?;

        let mut accepted = 0;
        for item in &result.value {
            if item.status {
                accepted += 1;
            } else {
                warn!(
                    "Document {} was rejected: {}",
                    item.key,
                    item.error_message.as_deref().unwrap_or("no reason given")
                );
            }
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use warp::Filter;

    #[test]
    fn test_index_definition_schema() {
        let index = index_definition("docs");
        assert_eq!(index["name"], "docs");

        let fields = index["fields"].as_array().unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["docId", "docTitle", "description", "descriptionVector"]);
        assert_eq!(fields[0]["key"], true);
        assert_eq!(fields[2]["searchable"], true);
        assert_eq!(fields[3]["dimensions"], 1536);
        assert_eq!(fields[3]["vectorSearchProfile"], VECTOR_PROFILE);

        assert_eq!(index["vectorSearch"]["profiles"][0]["algorithm"], VECTOR_ALGORITHM);
        assert_eq!(index["vectorSearch"]["algorithms"][0]["kind"], "hnsw");
        assert_eq!(index["corsOptions"]["allowedOrigins"][0], "*");
    }

    #[tokio::test]
    async fn test_upsert_sends_merge_or_upload_batch() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let sink = seen.clone();
        let route = warp::post()
            .and(warp::path!("indexes" / String / "docs" / "index"))
            .and(warp::body::json())
            .map(move |_index: String, body: Value| {
                *sink.lock().unwrap() = Some(body);
                warp::reply::json(&json!({
                    "value": [
                        { "key": "1", "status": true, "statusCode": 201 },
                        { "key": "2", "status": false, "statusCode": 400, "errorMessage": "bad vector" }
                    ]
                }))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let docs = vec![
            IndexedDocument {
                doc_id: "1".into(),
                doc_title: "One".into(),
                description: "first".into(),
                description_vector: vec![0.0; 3],
            },
            IndexedDocument {
                doc_id: "2".into(),
                doc_title: "Two".into(),
                description: "second".into(),
                description_vector: vec![],
            },
        ];
        let client = SearchIndexClient::new(&format!("http://{addr}/"), "key".into());
        let accepted = client.merge_or_upload_documents("docs", &docs).await.unwrap();

        assert_eq!(accepted, 1);
        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["value"][0]["@search.action"], "mergeOrUpload");
        assert_eq!(body["value"][0]["docId"], "1");
        assert_eq!(body["value"][1]["docTitle"], "Two");
    }

    #[tokio::test]
    async fn test_create_index_failure_is_reported() {
        let route = warp::any().map(|| {
            warp::reply::with_status("invalid api key", warp::http::StatusCode::FORBIDDEN)
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let client = SearchIndexClient::new(&format!("http://{addr}"), "bad".into());
        match client.create_or_update_index("docs").await {
            Err(IndexerError::SearchService { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
