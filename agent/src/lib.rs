//! Teams agent that answers questions from an Azure AI Search index with
//! cited snippets, plus the offline loader that fills that index.

pub mod agents;
pub mod api;
pub mod citations;
pub mod config;
pub mod connector;
pub mod error;
pub mod indexer;
pub mod metrics;
pub mod models;
