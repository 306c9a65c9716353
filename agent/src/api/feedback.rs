use crate::metrics;
use crate::models::{Activity, FeedbackLoopData};
use tracing::{info, warn};
use warp::http::StatusCode;

pub const SUBMIT_ACTION_INVOKE: &str = "message/submitAction";
pub const FEEDBACK_ACTION: &str = "feedback";

/// Handles invoke activities. Only feedback-loop submissions are understood.
pub fn handle_invoke(activity: &Activity) -> StatusCode {
    if activity.name.as_deref() != Some(SUBMIT_ACTION_INVOKE) {
        warn!("Unhandled invoke '{}'", activity.name.as_deref().unwrap_or_default());
        return StatusCode::NOT_IMPLEMENTED;
    }

    let Some(value) = activity.value.clone() else {
        warn!("Feedback invoke without a value");
        return StatusCode::BAD_REQUEST;
    };

    let mut data: FeedbackLoopData = match serde_json::from_value(value) {
        Ok(data) => data,
        Err(e) => {
            warn!("Malformed feedback payload: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    if data.action_name != FEEDBACK_ACTION {
        warn!("Unhandled submit action '{}'", data.action_name);
        return StatusCode::NOT_IMPLEMENTED;
    }
    if data.reply_to_id.is_none() {
        data.reply_to_id = activity.reply_to_id.clone();
    }

    on_feedback(&data);
    StatusCode::OK
}

// Custom feedback processing hooks in here.
fn on_feedback(data: &FeedbackLoopData) {
    metrics::FEEDBACK_RECEIVED.inc();
    match serde_json::to_string_pretty(data) {
        Ok(pretty) => info!("Your feedback is:\n{}", pretty),
        Err(e) => warn!("Could not render feedback record: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoke(name: &str, value: serde_json::Value) -> Activity {
        Activity {
            activity_type: "invoke".into(),
            name: Some(name.into()),
            value: Some(value),
            reply_to_id: Some("msg-7".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_feedback_accepted() {
        let activity = invoke(
            SUBMIT_ACTION_INVOKE,
            json!({
                "actionName": "feedback",
                "actionValue": { "reaction": "like", "feedback": "{\"feedbackText\":\"great\"}" }
            }),
        );
        assert_eq!(handle_invoke(&activity), StatusCode::OK);
    }

    #[test]
    fn test_other_invoke_not_implemented() {
        let activity = invoke("adaptiveCard/action", json!({}));
        assert_eq!(handle_invoke(&activity), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_other_submit_action_not_implemented() {
        let activity = invoke(
            SUBMIT_ACTION_INVOKE,
            json!({ "actionName": "share", "actionValue": { "reaction": "like" } }),
        );
        assert_eq!(handle_invoke(&activity), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_malformed_feedback_rejected() {
        let activity = invoke(SUBMIT_ACTION_INVOKE, json!({ "actionName": "feedback" }));
        assert_eq!(handle_invoke(&activity), StatusCode::BAD_REQUEST);
    }
}
