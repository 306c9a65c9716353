// Say command: turns a model answer into a Teams-ready message with citations

use crate::citations::{format_citations_response, get_used_citations, snippet, MAX_PREVIEW_CHARS};
use crate::connector::ConversationSender;
use crate::error::AgentError;
use crate::metrics;
use crate::models::{
    Activity, AiEntity, ChannelData, ClientCitation, DisplayMessage, ParsedResult, ResponsePayload,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Builds the message for `payload`, or `None` when there is nothing to say.
pub fn format_response(
    payload: &ResponsePayload,
    is_teams_channel: bool,
    feedback_loop_enabled: bool,
) -> Option<DisplayMessage> {
    let raw = payload.content.as_deref().filter(|content| !content.is_empty())?;
    let channel_data = is_teams_channel.then_some(ChannelData {
        feedback_loop_enabled,
    });

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Response is not valid JSON, sending the raw text. error: {}", e);
            metrics::PLAIN_TEXT_FALLBACKS.inc();
            let mut message = DisplayMessage::text(raw);
            message.entities = vec![AiEntity::ai_generated(Vec::new())];
            message.channel_data = channel_data;
            return Some(message);
        }
    };

    let results: Vec<ParsedResult> = parsed
        .get("results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(ParsedResult::from_value)
                .collect()
        })
        .unwrap_or_default();

    let mut citations = Vec::new();
    let mut content = String::new();
    if results.is_empty() {
        content.push_str(raw);
    } else {
        let mut position = 1u32;
        for item in &results {
            match item.citation_title.as_deref().filter(|title| !title.is_empty()) {
                Some(title) => {
                    let preview = snippet(
                        item.citation_content.as_deref().unwrap_or_default(),
                        MAX_PREVIEW_CHARS,
                    );
                    citations.push(ClientCitation::new(
                        position,
                        title.to_string(),
                        item.citation_url.clone(),
                        preview,
                    ));
                    content.push_str(&format!("{}[{}]<br>", item.answer, position));
                    position += 1;
                }
                None => content.push_str(&format!("{}<br>", item.answer)),
            }
        }
    }

    if is_teams_channel {
        content = content.replace('\n', "<br>");
    }

    let (text, referenced) = if citations.is_empty() {
        (format_citations_response(&content), Vec::new())
    } else {
        let referenced = get_used_citations(&content, &citations);
        (content, referenced)
    };
    debug!(
        "Built {} citation(s), {} referenced in text",
        citations.len(),
        referenced.len()
    );

    let mut message = DisplayMessage::text(text);
    message.entities = vec![AiEntity::ai_generated(referenced)];
    message.channel_data = channel_data;
    Some(message)
}

/// Sends the formatted answer into the conversation. The returned string is
/// always empty; it is the action result handed back to the planner loop.
pub async fn say_command(
    sender: &dyn ConversationSender,
    activity: &Activity,
    payload: &ResponsePayload,
    feedback_loop_enabled: bool,
) -> Result<String, AgentError> {
    let Some(message) = format_response(payload, activity.is_teams_channel(), feedback_loop_enabled) else {
        debug!("Empty model response, nothing to send");
        return Ok(String::new());
    };

    sender.send_activity(activity, &message).await?;
    metrics::CITATIONS_SENT.inc_by(message.citations().len() as u64);
    Ok(String::new())
}
