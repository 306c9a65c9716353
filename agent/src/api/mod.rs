use crate::agents::Planner;
use crate::connector::ConversationSender;
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

mod feedback;
mod messages;

/// Largest inbound activity body accepted.
const MAX_ACTIVITY_BYTES: u64 = 256 * 1024;

#[derive(Clone)]
pub struct AgentState {
    pub planner: Arc<dyn Planner>,
    pub sender: Arc<dyn ConversationSender>,
    pub feedback_loop_enabled: bool,
}

pub fn routes(
    state: AgentState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("api")
        .and(warp::path("messages"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_ACTIVITY_BYTES))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(messages::handle_activity)
}

fn with_state(
    state: AgentState,
) -> impl Filter<Extract = (AgentState,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::models::{Activity, DisplayMessage, ResponsePayload};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use warp::http::StatusCode;

    struct StubPlanner {
        answer: Option<String>,
        calls: AtomicUsize,
    }

    impl StubPlanner {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Planner for StubPlanner {
        async fn plan(&self, _user_text: &str) -> Result<ResponsePayload, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Some(answer) => Ok(ResponsePayload::new(answer.clone())),
                None => Err(AgentError::ModelService {
                    status: 500,
                    body: "boom".into(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<DisplayMessage>>,
    }

    #[async_trait]
    impl ConversationSender for RecordingSender {
        async fn send_activity(&self, _turn: &Activity, message: &DisplayMessage) -> Result<(), AgentError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn state(planner: Arc<StubPlanner>, sender: Arc<RecordingSender>) -> AgentState {
        AgentState {
            planner,
            sender,
            feedback_loop_enabled: true,
        }
    }

    fn teams_message(text: &str) -> serde_json::Value {
        json!({
            "type": "message",
            "id": "act-1",
            "channelId": "msteams",
            "serviceUrl": "https://smba.example/",
            "conversation": { "id": "conv-1" },
            "text": text
        })
    }

    #[tokio::test]
    async fn test_message_turn_sends_cited_answer() {
        let planner = Arc::new(StubPlanner::answering(
            r#"{"results":[{"answer":"PerksPlus covers gym fees.","citationTitle":"Contoso_Electronics_PerkPlus_Program","citationContent":"PerksPlus..."}]}"#,
        ));
        let sender = Arc::new(RecordingSender::default());
        let api = routes(state(planner.clone(), sender.clone()));

        let resp = warp::test::request()
            .method("POST")
            .path("/api/messages")
            .json(&teams_message("what is PerksPlus?"))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(planner.calls.load(Ordering::SeqCst), 1);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "PerksPlus covers gym fees.[1]<br>");
        assert_eq!(sent[0].citations().len(), 1);
        assert_eq!(
            sent[0].channel_data.as_ref().map(|data| data.feedback_loop_enabled),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_planner_failure_sends_generic_error() {
        let planner = Arc::new(StubPlanner::failing());
        let sender = Arc::new(RecordingSender::default());
        let api = routes(state(planner, sender.clone()));

        let resp = warp::test::request()
            .method("POST")
            .path("/api/messages")
            .json(&teams_message("hello"))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, messages::TURN_ERROR_MESSAGE);
        assert!(sent[0].entities.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_invoke_skips_planner() {
        let planner = Arc::new(StubPlanner::answering("unused"));
        let sender = Arc::new(RecordingSender::default());
        let api = routes(state(planner.clone(), sender.clone()));

        let resp = warp::test::request()
            .method("POST")
            .path("/api/messages")
            .json(&json!({
                "type": "invoke",
                "name": "message/submitAction",
                "channelId": "msteams",
                "replyToId": "act-1",
                "value": {
                    "actionName": "feedback",
                    "actionValue": { "reaction": "dislike", "feedback": "{\"feedbackText\":\"wrong doc\"}" }
                }
            }))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_activity_types_are_acknowledged() {
        let planner = Arc::new(StubPlanner::answering("unused"));
        let sender = Arc::new(RecordingSender::default());
        let api = routes(state(planner.clone(), sender));

        let resp = warp::test::request()
            .method("POST")
            .path("/api/messages")
            .json(&json!({ "type": "conversationUpdate", "channelId": "msteams" }))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected() {
        let planner = Arc::new(StubPlanner::answering("unused"));
        let sender = Arc::new(RecordingSender::default());
        let api = routes(state(planner, sender)).recover(crate::error::handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/messages")
            .header("content-type", "application/json")
            .body("not json")
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let planner = Arc::new(StubPlanner::answering("unused"));
        let sender = Arc::new(RecordingSender::default());
        let api = routes(state(planner, sender.clone())).recover(crate::error::handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/messages")
            .header("content-type", "application/json")
            .body(vec![b' '; MAX_ACTIVITY_BYTES as usize + 1])
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"], "Activity too large");
        assert!(sender.sent.lock().unwrap().is_empty());
    }
}
