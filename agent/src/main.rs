use search_agent::agents::{planner::DEFAULT_PROMPT, AzureOpenAiPlanner, PromptTemplate};
use search_agent::api::{self, AgentState};
use search_agent::config::Config;
use search_agent::connector::{BotCredentials, ConnectorClient};
use search_agent::error::handle_rejection;
use search_agent::metrics;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level))
        )
        .json()
        .init();

    info!("Starting Azure AI Search Teams agent");

    let prompt = PromptTemplate::load(&config.prompts_dir, DEFAULT_PROMPT)?;
    info!("Prompt '{}' loaded from {}", prompt.name, config.prompts_dir.display());
    let planner = AzureOpenAiPlanner::new(&config, prompt);

    let credentials = match (&config.bot_id, &config.bot_password) {
        (Some(app_id), Some(password)) => Some(BotCredentials::new(
            app_id.clone(),
            password.clone(),
            &config.bot_tenant_id,
        )),
        _ => {
            warn!("BOT_ID/BOT_PASSWORD not set, replies are sent without a connector token");
            None
        }
    };

    let state = AgentState {
        planner: Arc::new(planner),
        sender: Arc::new(ConnectorClient::new(credentials)),
        feedback_loop_enabled: config.feedback_loop_enabled,
    };

    // Build API routes
    let api_routes = api::routes(state)
        .with(warp::log("api"))
        .recover(handle_rejection);

    // Health check route
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "healthy"})));

    // Metrics route
    let metrics_route = warp::path("metrics")
        .and(warp::get())
        .map(|| match metrics::render() {
            Ok((buffer, content_type)) => warp::http::Response::builder()
                .header("Content-Type", content_type)
                .body(buffer),
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                warp::http::Response::builder()
                    .status(warp::http::StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Vec::new())
            }
        });

    let routes = health
        .or(metrics_route)
        .or(api_routes);

    // Start server
    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes)
        .run(addr)
        .await;

    Ok(())
}
