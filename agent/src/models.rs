use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const MS_TEAMS_CHANNEL: &str = "msteams";
pub const AI_GENERATED_CONTENT: &str = "AIGeneratedContent";

static MENTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<at[^>]*>.*?</at>").expect("mention pattern is valid"));

// Bot Framework activity models (only the fields this agent reads)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub id: Option<String>,
    pub channel_id: Option<String>,
    pub service_url: Option<String>,
    pub conversation: Option<ConversationAccount>,
    pub from: Option<ChannelAccount>,
    pub recipient: Option<ChannelAccount>,
    pub text: Option<String>,
    pub name: Option<String>,
    pub value: Option<serde_json::Value>,
    pub reply_to_id: Option<String>,
}

impl Activity {
    pub fn is_teams_channel(&self) -> bool {
        self.channel_id.as_deref() == Some(MS_TEAMS_CHANNEL)
    }

    /// Message text with `<at>...</at>` mentions removed.
    pub fn user_text(&self) -> String {
        let text = self.text.as_deref().unwrap_or_default();
        MENTION_TAG.replace_all(text, "").trim().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

// Model answer payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub content: Option<String>,
}

impl ResponsePayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }
}

/// One entry of the `results` array in a structured answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResult {
    pub answer: String,
    pub citation_title: Option<String>,
    pub citation_url: Option<String>,
    pub citation_content: Option<String>,
}

impl ParsedResult {
    /// Reads each field on its own so one mistyped field does not cost the
    /// entry its citation. A non-string `answer` is rendered as JSON text,
    /// `null` as empty; non-string citation fields count as absent.
    pub fn from_value(item: &serde_json::Value) -> Self {
        let text = |key: &str| item.get(key).and_then(serde_json::Value::as_str).map(str::to_string);
        let answer = match item.get("answer") {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(answer)) => answer.clone(),
            Some(other) => other.to_string(),
        };
        Self {
            answer,
            citation_title: text("citationTitle"),
            citation_url: text("citationUrl"),
            citation_content: text("citationContent"),
        }
    }
}

// Outbound message models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(rename = "@type")]
    pub schema_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCitation {
    #[serde(rename = "@type")]
    pub schema_type: String,
    pub position: u32,
    pub appearance: Appearance,
}

impl ClientCitation {
    pub fn new(position: u32, name: String, url: Option<String>, abstract_text: String) -> Self {
        Self {
            schema_type: "Claim".to_string(),
            position,
            appearance: Appearance {
                schema_type: "DigitalDocument".to_string(),
                name,
                url,
                abstract_text,
            },
        }
    }

    /// The reference marker that points at this citation inside message text.
    pub fn marker(&self) -> String {
        format!("[{}]", self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "additionalType")]
    pub additional_type: Vec<String>,
    pub citation: Vec<ClientCitation>,
}

impl AiEntity {
    pub fn ai_generated(citation: Vec<ClientCitation>) -> Self {
        Self {
            entity_type: "https://schema.org/Message".to_string(),
            schema_type: "Message".to_string(),
            context: "https://schema.org".to_string(),
            id: String::new(),
            additional_type: vec![AI_GENERATED_CONTENT.to_string()],
            citation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    pub feedback_loop_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMessage {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<AiEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<ChannelData>,
}

impl DisplayMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            activity_type: "message".to_string(),
            text: text.into(),
            entities: Vec::new(),
            channel_data: None,
        }
    }

    /// Citations attached through the AI entity, if any.
    pub fn citations(&self) -> &[ClientCitation] {
        self.entities
            .first()
            .map(|entity| entity.citation.as_slice())
            .unwrap_or_default()
    }
}

// Feedback loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackLoopData {
    pub action_name: String,
    pub action_value: FeedbackActionValue,
    #[serde(default)]
    pub reply_to_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackActionValue {
    pub reaction: String,
    #[serde(default)]
    pub feedback: serde_json::Value,
}

// Search index records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub doc_id: String,
    pub doc_title: String,
    pub description: String,
    pub description_vector: Vec<f32>,
}
