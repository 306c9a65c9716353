//! The fixed set of source documents pushed into the search index.

use super::embeddings::EmbeddingsModel;
use super::IndexerError;
use crate::models::IndexedDocument;
use std::path::Path;
use tracing::info;

pub struct SourceDocument {
    pub doc_id: &'static str,
    pub doc_title: &'static str,
}

impl SourceDocument {
    pub fn file_name(&self) -> String {
        format!("{}.md", self.doc_title)
    }
}

pub const SOURCE_DOCUMENTS: [SourceDocument; 3] = [
    SourceDocument {
        doc_id: "1",
        doc_title: "Contoso_Electronics_PerkPlus_Program",
    },
    SourceDocument {
        doc_id: "2",
        doc_title: "Contoso_Electronics_Company_Overview",
    },
    SourceDocument {
        doc_id: "3",
        doc_title: "Contoso_Electronics_Plan_Benefits",
    },
];

/// Reads every source document from `data_dir` and embeds it, one at a time.
pub async fn get_doc_data(
    data_dir: &Path,
    embeddings: &dyn EmbeddingsModel,
) -> Result<Vec<IndexedDocument>, IndexerError> {
    info!("Loading documents from: {}", data_dir.display());

    let mut documents = Vec::with_capacity(SOURCE_DOCUMENTS.len());
    for source in &SOURCE_DOCUMENTS {
        let path = data_dir.join(source.file_name());
        info!("Loading: {}", path.display());
        let description = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| IndexerError::Io {
                path: path.clone(),
                source: err,
            })?;
        let description_vector = embeddings.create_embedding(&description).await?;

        documents.push(IndexedDocument {
            doc_id: source.doc_id.to_string(),
            doc_title: source.doc_title.to_string(),
            description,
            description_vector,
        });
    }

    info!("Successfully loaded {} documents", documents.len());
    Ok(documents)
}
