//! Atelier application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Build the category catalog and the completion client
//! 3. Open a chat session and render every update to stdout
//! 4. Forward stdin lines to the session until `/close` or EOF, rejecting
//!    input while a reply is pending

mod cli;
mod repl;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use atelier_chat::{Catalog, CompletionClient, SessionController};
use atelier_core::config::BackendProvider;
use atelier_core::AtelierConfig;

use cli::CliArgs;
use repl::Renderer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = if config_file.exists() {
        AtelierConfig::load(&config_file)?
    } else {
        AtelierConfig::default()
    };

    // Tracing. Logs go to stderr so they stay out of the transcript.
    let log_level = args.resolve_log_level(&config);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Atelier v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    let category = args.resolve_category(&config)?;

    // Catalog.
    let catalog = Arc::new(Catalog::load_or_builtin(
        config.assistant.catalog_path.as_deref().map(Path::new),
    ));

    // Completion client. A missing credential degrades to canned replies.
    let mut backend_config = config.backend.clone();
    if args.offline {
        backend_config.provider = BackendProvider::Scripted;
    }
    let client = match CompletionClient::init(&backend_config) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Completion backend unavailable, continuing without it");
            CompletionClient::unavailable(e.to_string())
        }
    };
    let client = Arc::new(client);

    let controller = SessionController::new(Arc::clone(&client), Arc::clone(&catalog))
        .with_history_window(config.assistant.history_window);

    // Renderer.
    let mut updates = controller.subscribe();
    let mut renderer = Renderer::new(args.json);
    let render_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(view) => {
                    for line in renderer.render(view.as_ref()) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind, skipped updates");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    controller.open_session(category)?;
    if !args.json {
        println!("Type /help for commands.");
    }

    // Input loop.
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    repl::run(&controller, stdin).await?;

    // Shutdown.
    controller.close();
    drop(controller);
    if let Err(e) = render_task.await {
        tracing::warn!(error = %e, "Render task failed");
    }
    client.shutdown().await;
    tracing::info!("Atelier stopped");

    Ok(())
}
