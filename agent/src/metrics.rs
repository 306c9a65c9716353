use prometheus::{register_int_counter, IntCounter};
use std::sync::LazyLock;

pub static TURNS_HANDLED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("agent_turns_total", "Message activities handled")
        .expect("agent_turns_total registers once")
});

pub static TURN_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("agent_turn_errors_total", "Turns that ended in the error handler")
        .expect("agent_turn_errors_total registers once")
});

pub static PLAIN_TEXT_FALLBACKS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "agent_plain_text_fallbacks_total",
        "Model answers that were not JSON and were sent as plain text"
    )
    .expect("agent_plain_text_fallbacks_total registers once")
});

pub static CITATIONS_SENT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("agent_citations_sent_total", "Citations attached to outbound messages")
        .expect("agent_citations_sent_total registers once")
});

pub static FEEDBACK_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("agent_feedback_total", "Feedback loop submissions received")
        .expect("agent_feedback_total registers once")
});

/// Renders the default registry in the Prometheus text format.
pub fn render() -> anyhow::Result<(Vec<u8>, String)> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((buffer, encoder.format_type().to_string()))
}
