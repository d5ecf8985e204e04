mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matcher::api_client::{ApiClient, ConsoleEvents};
use matcher::auth::AuthStore;
use matcher::config::Config;
use matcher::docs::DocsService;
use matcher::storage::{CredentialStore, FileStore};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Fails early when no backend URL is configured
    let config = Config::load(cli.api_url.clone())?.with_storage_path(cli.storage.clone());

    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting matcher v{}", env!("CARGO_PKG_VERSION"));

    let backend = FileStore::open(&config.storage_path);
    debug!("Credentials stored in {}", backend.path().display());
    let store = CredentialStore::new(Arc::new(backend));

    let client = ApiClient::builder(config.api_url.clone(), store)
        .events(Arc::new(ConsoleEvents))
        .build()?;
    info!("API client ready ({})", client.base_url());

    let auth = AuthStore::new(client.clone());
    let docs = DocsService::new(client);

    if let Err(e) = cli::run(cli.command, &auth, &docs).await {
        if !e.is_reported() {
            eprintln!("error: {e}");
        }
        std::process::exit(e.exit_code());
    }

    Ok(())
}
