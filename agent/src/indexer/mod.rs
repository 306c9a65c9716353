//! Offline loader that embeds the bundled documents and upserts them into
//! the Azure AI Search index the agent answers from.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod documents;
pub mod embeddings;
pub mod search_index;

use embeddings::AzureOpenAiEmbeddings;
use search_index::SearchIndexClient;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Failed to generate embeddings for description: <{snippet}>{}", detail_suffix(.detail))]
    Embedding {
        snippet: String,
        detail: Option<String>,
    },

    #[error("{0}")]
    ServiceRequest(#[from] reqwest::Error),

    #[error("Search service returned {status}: {body}")]
    SearchService { status: u16, body: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not set")]
    MissingConfig(&'static str),
}

impl IndexerError {
    /// Errors that point at keys, endpoints or deployment names being wrong.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            IndexerError::ServiceRequest(_) | IndexerError::SearchService { .. }
        )
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|detail| format!("\n\nError: {detail}"))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub search_endpoint: String,
    pub search_api_key: String,
    pub openai_endpoint: Option<String>,
    pub embedding_deployment: Option<String>,
    pub openai_api_key: String,
    pub openai_api_version: String,
    pub index_name: String,
    pub data_dir: PathBuf,
    /// Pause after creating the index so it is visible before the upsert.
    pub settle_delay: Duration,
}

/// Creates the index, embeds the source documents and upserts them.
/// Returns the number of documents the service accepted.
pub async fn setup(options: &SetupOptions) -> Result<usize, IndexerError> {
    info!("Using search endpoint: {}", options.search_endpoint);

    let index_client = SearchIndexClient::new(&options.search_endpoint, options.search_api_key.clone());
    index_client.create_or_update_index(&options.index_name).await?;

    info!(
        "Create index succeeded. If it does not exist, wait for {} seconds...",
        options.settle_delay.as_secs()
    );
    tokio::time::sleep(options.settle_delay).await;

    let openai_endpoint = options
        .openai_endpoint
        .as_deref()
        .ok_or(IndexerError::MissingConfig("AZURE_OPENAI_ENDPOINT"))?;
    let deployment = options
        .embedding_deployment
        .as_deref()
        .ok_or(IndexerError::MissingConfig("AZURE_OPENAI_EMBEDDING_DEPLOYMENT"))?;
    let embeddings = AzureOpenAiEmbeddings::new(
        options.openai_api_key.clone(),
        openai_endpoint,
        deployment,
        &options.openai_api_version,
    );

    let data = documents::get_doc_data(&options.data_dir, &embeddings).await?;
    let accepted = index_client
        .merge_or_upload_documents(&options.index_name, &data)
        .await?;

    info!("Upload new documents succeeded. If they do not exist, wait for several seconds...");
    Ok(accepted)
}
