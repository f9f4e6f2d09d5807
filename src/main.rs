use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use prompt_relay::backend::{ChatBackend, OllamaBackend, OpenAiBackend};
use prompt_relay::config::{Cli, Config};
use prompt_relay::server::routes::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "prompt_relay=debug,tower_http=debug"
    } else {
        "prompt_relay=info,tower_http=info"
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("prompt-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Config::load(&cli.config)?;

    info!(
        ollama_url = %config.ollama.base_url,
        ollama_model = %config.ollama.model,
        max_window_size = config.memory.max_window_size,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    // Build the remote backends. OpenAI is optional.
    let ollama: Arc<dyn ChatBackend> = Arc::new(OllamaBackend::new(&config.ollama)?);
    let openai: Option<Arc<dyn ChatBackend>> = match OpenAiBackend::new(&config.openai) {
        Ok(backend) => {
            info!(model = %config.openai.model, "OpenAI backend enabled");
            Some(Arc::new(backend) as Arc<dyn ChatBackend>)
        }
        Err(e) => {
            warn!("OpenAI backend disabled: {e}");
            None
        }
    };

    // Build application state and the HTTP router.
    let state = Arc::new(AppState::new(&config, ollama, openai)?);
    let app = build_router(state);

    // Start the server.
    let listen_addr = cli.listen.unwrap_or_else(|| config.server.listen.clone());
    info!(addr = %listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
