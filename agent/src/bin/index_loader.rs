use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use search_agent::config::{DEFAULT_INDEX_NAME, DEFAULT_OPENAI_API_VERSION};
use search_agent::indexer::{setup, SetupOptions};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "index-loader",
    about = "Embed the bundled documents and upsert them into the Azure AI Search index"
)]
struct LoaderCli {
    /// Azure OpenAI API key for authentication
    #[arg(long)]
    api_key: String,

    /// AI Search key for authentication
    #[arg(long)]
    ai_search_key: String,

    /// Env file with endpoint and deployment settings
    #[arg(long, default_value = "env/.env.local.user")]
    env_file: PathBuf,

    /// Directory holding the source markdown documents
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Search index to create and fill
    #[arg(long, default_value = DEFAULT_INDEX_NAME)]
    index_name: String,

    /// Seconds to wait after creating the index
    #[arg(long, default_value_t = 5)]
    settle_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let cli = LoaderCli::parse();

    info!("Loading environment from: {}", cli.env_file.display());
    if let Err(e) = dotenvy::from_path_override(&cli.env_file) {
        warn!("Could not load {}: {}", cli.env_file.display(), e);
    }

    let search_endpoint = std::env::var("AZURE_SEARCH_ENDPOINT").ok().filter(|v| !v.is_empty());
    let openai_endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").ok().filter(|v| !v.is_empty());
    let embedding_deployment = std::env::var("AZURE_OPENAI_EMBEDDING_DEPLOYMENT")
        .ok()
        .filter(|v| !v.is_empty());
    info!(
        "AZURE_SEARCH_ENDPOINT: {:?}, AZURE_OPENAI_ENDPOINT: {:?}, AZURE_OPENAI_EMBEDDING_DEPLOYMENT: {:?}",
        search_endpoint, openai_endpoint, embedding_deployment
    );

    let Some(search_endpoint) = search_endpoint else {
        error!("AZURE_SEARCH_ENDPOINT is not set!");
        error!("Check your environment file at: {}", cli.env_file.display());
        return ExitCode::FAILURE;
    };

    let key_prefix: String = cli.ai_search_key.chars().take(10).collect();
    info!("Using search key: {}...", key_prefix);

    let options = SetupOptions {
        search_endpoint,
        search_api_key: cli.ai_search_key,
        openai_endpoint,
        embedding_deployment,
        openai_api_key: cli.api_key,
        openai_api_version: std::env::var("AZURE_OPENAI_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_OPENAI_API_VERSION.to_string()),
        index_name: cli.index_name,
        data_dir: cli.data_dir,
        settle_delay: Duration::from_secs(cli.settle_secs),
    };

    // Setup failures are reported but do not change the exit status.
    match setup(&options).await {
        Ok(accepted) => info!("Setup finished successfully! {} document(s) indexed", accepted),
        Err(e) if e.is_service_error() => {
            error!("Setup index failed due to a service request error: {}", e);
            error!(
                "Please check your keys, models and endpoints in {}",
                cli.env_file.display()
            );
        }
        Err(e) => error!("Setup failed with error: {}", e),
    }
    ExitCode::SUCCESS
}
