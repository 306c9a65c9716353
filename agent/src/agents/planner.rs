// Planner: asks the Azure OpenAI deployment for an answer grounded on the search index

use crate::config::Config;
use crate::error::AgentError;
use crate::models::ResponsePayload;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_PROMPT: &str = "chat";

#[async_trait]
pub trait Planner: Send + Sync {
    /// Produces the model answer for one user utterance.
    async fn plan(&self, user_text: &str) -> Result<ResponsePayload, AgentError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub top_p: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            top_p: 0.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PromptConfigFile {
    #[serde(default)]
    completion: CompletionConfig,
}

/// A prompt folder: `skprompt.txt` holds the system text, `config.json` the completion settings.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: String,
    pub text: String,
    pub completion: CompletionConfig,
}

impl PromptTemplate {
    pub fn load(prompts_dir: &Path, name: &str) -> anyhow::Result<Self> {
        let dir = prompts_dir.join(name);
        let text_path = dir.join("skprompt.txt");
        let text = std::fs::read_to_string(&text_path)
            .with_context(|| format!("failed to read prompt {}", text_path.display()))?;

        let config_path = dir.join("config.json");
        let completion = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            serde_json::from_str::<PromptConfigFile>(&raw)
                .with_context(|| format!("invalid prompt config {}", config_path.display()))?
                .completion
        } else {
            CompletionConfig::default()
        };

        Ok(Self {
            name: name.to_string(),
            text,
            completion,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchDataSource {
    pub endpoint: String,
    pub index_name: String,
    pub api_key: String,
}

pub struct AzureOpenAiPlanner {
    client: reqwest::Client,
    completions_url: String,
    api_key: String,
    prompt: PromptTemplate,
    data_source: SearchDataSource,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl AzureOpenAiPlanner {
    pub fn new(config: &Config, prompt: PromptTemplate) -> Self {
        let completions_url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.azure_openai_endpoint.trim_end_matches('/'),
            config.azure_openai_model_deployment_name,
            config.azure_openai_api_version
        );
        info!("Planner using prompt '{}' against {}", prompt.name, completions_url);

        Self {
            client: reqwest::Client::new(),
            completions_url,
            api_key: config.azure_openai_api_key.clone(),
            prompt,
            data_source: SearchDataSource {
                endpoint: config.azure_search_endpoint.clone(),
                index_name: config.azure_search_index.clone(),
                api_key: config.azure_search_key.clone(),
            },
        }
    }

    fn request_body(&self, user_text: &str) -> Value {
        let completion = &self.prompt.completion;
        json!({
            "messages": [
                { "role": "system", "content": self.prompt.text },
                { "role": "user", "content": user_text }
            ],
            "max_tokens": completion.max_tokens,
            "temperature": completion.temperature,
            "top_p": completion.top_p,
            "presence_penalty": completion.presence_penalty,
            "frequency_penalty": completion.frequency_penalty,
            "data_sources": [{
                "type": "azure_search",
                "parameters": {
                    "endpoint": self.data_source.endpoint,
                    "index_name": self.data_source.index_name,
                    "authentication": {
                        "type": "api_key",
                        "key": self.data_source.api_key
                    },
                    "fields_mapping": {
                        "content_fields": ["description"],
                        "title_field": "docTitle",
                        "vector_fields": ["descriptionVector"]
                    },
                    "query_type": "simple",
                    "in_scope": true
                }
            }]
        })
    }
}

#[async_trait]
impl Planner for AzureOpenAiPlanner {
    async fn plan(&self, user_text: &str) -> Result<ResponsePayload, AgentError> {
        debug!("Planner: sending {} chars of user input", user_text.len());

        let resp = self
            .client
            .post(&self.completions_url)
            .header("api-key", &self.api_key)
            .json(&self.request_body(user_text))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::ModelService { status, body });
        }

        let completion: ChatCompletionResponse = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        Ok(ResponsePayload { content })
    }
}
