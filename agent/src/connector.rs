//! Outbound Bot Framework connector.
//!
//! Replies are posted to the channel's `serviceUrl`. When the bot has an app
//! id and password, a client-credentials token is fetched from the Microsoft
//! identity platform and cached until shortly before it expires.

use crate::error::AgentError;
use crate::models::{Activity, ChannelAccount, ConversationAccount, DisplayMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const BOT_FRAMEWORK_SCOPE: &str = "https://api.botframework.com/.default";

/// Refresh tokens this long before the identity platform says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[async_trait]
pub trait ConversationSender: Send + Sync {
    /// Sends `message` into the conversation the `turn` activity came from.
    async fn send_activity(&self, turn: &Activity, message: &DisplayMessage) -> Result<(), AgentError>;
}

#[derive(Debug, Clone)]
pub struct BotCredentials {
    pub app_id: String,
    pub app_password: String,
    pub token_url: String,
}

impl BotCredentials {
    pub fn new(app_id: String, app_password: String, tenant_id: &str) -> Self {
        Self {
            app_id,
            app_password,
            token_url: format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"),
        }
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundActivity<'a> {
    #[serde(flatten)]
    message: &'a DisplayMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a ChannelAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient: Option<&'a ChannelAccount>,
    conversation: &'a ConversationAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<&'a str>,
    timestamp: DateTime<Utc>,
}

pub struct ConnectorClient {
    http: reqwest::Client,
    credentials: Option<BotCredentials>,
    token: Mutex<Option<CachedToken>>,
}

impl ConnectorClient {
    pub fn new(credentials: Option<BotCredentials>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<Option<String>, AgentError> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(Some(token.access_token.clone()));
            }
        }

        debug!("Requesting bot connector token for app {}", credentials.app_id);
        let resp = self
            .http
            .post(&credentials.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.app_id.as_str()),
                ("client_secret", credentials.app_password.as_str()),
                ("scope", BOT_FRAMEWORK_SCOPE),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::AuthenticationError(format!("{status}: {body}")));
        }

        let token: TokenResponse = resp.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + lifetime,
        });
        Ok(Some(access_token))
    }
}

/// Builds the reply URL for a turn, threading onto the inbound activity id when present.
fn reply_url(turn: &Activity) -> Result<String, AgentError> {
    let service_url = turn
        .service_url
        .as_deref()
        .ok_or_else(|| AgentError::ConnectorError("activity has no serviceUrl".to_string()))?;
    let conversation = turn
        .conversation
        .as_ref()
        .ok_or_else(|| AgentError::ConnectorError("activity has no conversation".to_string()))?;

    let base = format!(
        "{}/v3/conversations/{}/activities",
        service_url.trim_end_matches('/'),
        urlencoding::encode(&conversation.id)
    );
    Ok(match turn.id.as_deref() {
        Some(id) => format!("{base}/{}", urlencoding::encode(id)),
        None => base,
    })
}

#[async_trait]
impl ConversationSender for ConnectorClient {
    async fn send_activity(&self, turn: &Activity, message: &DisplayMessage) -> Result<(), AgentError> {
        let url = reply_url(turn)?;
        let conversation = turn
            .conversation
            .as_ref()
            .ok_or_else(|| AgentError::ConnectorError("activity has no conversation".to_string()))?;

        let body = OutboundActivity {
            message,
            from: turn.recipient.as_ref(),
            recipient: turn.from.as_ref(),
            conversation,
            reply_to_id: turn.id.as_deref(),
            channel_id: turn.channel_id.as_deref(),
            timestamp: Utc::now(),
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::ConnectorError(format!(
                "send to {url} failed ({status}): {text}"
            )));
        }

        info!(
            "Sent message with {} citation(s) to conversation {}",
            message.citations().len(),
            conversation.id
        );
        Ok(())
    }
}
