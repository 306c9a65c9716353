use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_INDEX_NAME: &str = "saeshav-test-teams-agent";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-01";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub bot_id: Option<String>,
    pub bot_password: Option<String>,
    pub bot_tenant_id: String,
    pub azure_openai_api_key: String,
    pub azure_openai_endpoint: String,
    pub azure_openai_model_deployment_name: String,
    pub azure_openai_api_version: String,
    pub azure_search_key: String,
    pub azure_search_endpoint: String,
    pub azure_search_index: String,
    pub prompts_dir: PathBuf,
    pub feedback_loop_enabled: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| anyhow!("{key} is not set"));

        Ok(Config {
            port: var("PORT")
                .unwrap_or_else(|| "3978".to_string())
                .parse()?,
            bot_id: var("BOT_ID"),
            bot_password: var("BOT_PASSWORD"),
            bot_tenant_id: var("BOT_TENANT_ID")
                .unwrap_or_else(|| "botframework.com".to_string()),
            azure_openai_api_key: required("AZURE_OPENAI_API_KEY")?,
            azure_openai_endpoint: required("AZURE_OPENAI_ENDPOINT")?,
            azure_openai_model_deployment_name: required("AZURE_OPENAI_MODEL_DEPLOYMENT_NAME")?,
            azure_openai_api_version: var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
            azure_search_key: required("AZURE_SEARCH_KEY")?,
            azure_search_endpoint: required("AZURE_SEARCH_ENDPOINT")?,
            azure_search_index: var("AZURE_SEARCH_INDEX")
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            prompts_dir: var("PROMPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("prompts")),
            feedback_loop_enabled: var("FEEDBACK_LOOP_ENABLED")
                .map(|value| value.parse::<bool>())
                .transpose()?
                .unwrap_or(true),
            log_level: var("LOG_LEVEL")
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}
