mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pressroom_core::store;
use pressroom_core::{ConnectionConfig, DiagnosticResult, LockManager, SyncEngine};
use pressroom_github::GitHubClient;
use pressroom_local::{default_store_dir, JsonFileStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::{Command, Config};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging (stderr, so stdout stays machine-readable)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    let store_dir = match config.store_dir.clone() {
        Some(dir) => dir,
        None => default_store_dir().context("No platform data directory, pass --store-dir")?,
    };
    let store = Arc::new(JsonFileStore::open(store_dir.clone()).await?);
    debug!("Working store at {}", store_dir.display());

    let mut connection = store::load_config(store.as_ref()).await?;
    if let Some(token) = &config.token {
        connection.access_token = token.trim().to_string();
    }

    let result = match config.command.clone() {
        Command::Configure(args) => {
            let saved = store::save_config(store.as_ref(), args.apply(connection)).await?;
            info!("Saved settings for {}", saved.repo());
            DiagnosticResult::ok(format!("Settings saved: {}", describe(&saved)))
        }
        Command::Show => DiagnosticResult::ok(describe(&connection)),
        Command::Discover => {
            let files = build_engine(&config, connection, store)
                .find_json_files()
                .await;
            if config.json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else {
                for file in &files {
                    println!("{}", file);
                }
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Verify => {
            let engine = build_engine(&config, connection, store);
            DiagnosticResult::from(engine.verify_connection().await)
        }
        Command::Publish { message } => {
            let engine = build_engine(&config, connection, store);
            DiagnosticResult::from(engine.publish_with_message(message.as_deref()).await)
        }
        Command::Retrieve => {
            let engine = build_engine(&config, connection, store);
            DiagnosticResult::from(engine.retrieve().await)
        }
    };

    print_result(&result, config.json)?;
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_engine(
    config: &Config,
    connection: ConnectionConfig,
    store: Arc<JsonFileStore>,
) -> SyncEngine {
    let client = GitHubClient::with_base_url(config.api_url.as_str())
        .with_tree_limit(config.tree_limit);
    SyncEngine::new(
        connection,
        Arc::new(client),
        store,
        Arc::new(LockManager::new()),
    )
}

/// One-line summary of the settings with the token masked.
fn describe(connection: &ConnectionConfig) -> String {
    let token = if connection.access_token.is_empty() {
        "not set"
    } else {
        "set"
    };
    format!(
        "{}, branch \"{}\", file \"{}\", token {}",
        connection.repo(),
        connection.branch,
        connection.file_path,
        token
    )
}

fn print_result(result: &DiagnosticResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
    }
    Ok(())
}
