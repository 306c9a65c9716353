use super::{feedback, AgentState};
use crate::agents::say_command;
use crate::error::AgentError;
use crate::metrics;
use crate::models::{Activity, DisplayMessage};
use serde_json::json;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

pub const TURN_ERROR_MESSAGE: &str = "The agent encountered an error or bug.";

pub async fn handle_activity(
    activity: Activity,
    state: AgentState,
) -> Result<impl Reply, Rejection> {
    let turn_id = Uuid::new_v4();
    let span = info_span!(
        "turn",
        %turn_id,
        activity_type = %activity.activity_type,
        channel = activity.channel_id.as_deref().unwrap_or("unknown"),
    );

    let status = async {
        match activity.activity_type.as_str() {
            "message" => {
                metrics::TURNS_HANDLED.inc();
                if let Err(e) = on_message(&activity, &state).await {
                    on_turn_error(&activity, &state, &e).await;
                }
                StatusCode::OK
            }
            "invoke" => feedback::handle_invoke(&activity),
            other => {
                debug!("Ignoring activity of type '{}'", other);
                StatusCode::OK
            }
        }
    }
    .instrument(span)
    .await;

    Ok(warp::reply::with_status(warp::reply::json(&json!({})), status))
}

async fn on_message(activity: &Activity, state: &AgentState) -> Result<(), AgentError> {
    let text = activity.user_text();
    info!("Processing message ({} chars)", text.len());

    let payload = state.planner.plan(&text).await?;
    say_command(
        state.sender.as_ref(),
        activity,
        &payload,
        state.feedback_loop_enabled,
    )
    .await?;
    Ok(())
}

async fn on_turn_error(activity: &Activity, state: &AgentState, err: &AgentError) {
    metrics::TURN_ERRORS.inc();
    error!("[on_turn_error] unhandled error: {:?}", err);

    let message = DisplayMessage::text(TURN_ERROR_MESSAGE);
    if let Err(send_err) = state.sender.send_activity(activity, &message).await {
        error!("Failed to send error message to the user: {}", send_err);
    }
}
