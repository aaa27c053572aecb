// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! Process entry point (§12): `serve`, `validate`, and `migrate` subcommands.

mod config;
mod ingress;
mod validate;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use karya_core::model::JobRequest;
use karya_core::store::{ActionStoreRef, JobStoreRef};
use karya_store::{bootstrap_schema, DbPool, PgActionStore, PgJobStore, PoolConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::ingress::AppState;
use crate::validate::validate_workflow;

#[derive(Parser)]
#[command(name = "karya")]
#[command(version, about = "Durable, resumable HTTP workflow execution engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration directory (holds default.toml / local.toml)
    #[arg(long, global = true, default_value = "config")]
    config_dir: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load settings, bootstrap the store, and serve the HTTP ingress
    Serve,

    /// Structurally validate a workflow submission document, without touching the store
    Validate {
        /// Path to a JSON file shaped like `{workflow_name, parameters, steps}`
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Run schema bootstrap against the configured database and exit
    Migrate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Serve => serve(&cli.config_dir).await,
        Commands::Validate { file } => validate_file(&file),
        Commands::Migrate => migrate(&cli.config_dir).await,
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "command failed");
        eprintln!("{} {}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("karya={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_settings(config_dir: &str) -> Result<Settings> {
    let settings = Settings::load_from_path(config_dir)
        .with_context(|| format!("failed to load configuration from {config_dir}"))?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(settings)
}

async fn connect_pool(settings: &Settings) -> Result<DbPool> {
    DbPool::connect(&PoolConfig {
        url: settings.database.url.clone(),
        min_connections: settings.database.min_connections,
        max_connections: settings.database.max_connections,
        acquire_timeout: settings.database.acquire_timeout(),
        idle_timeout: settings.database.idle_timeout(),
    })
    .await
    .with_context(|| "failed to connect to the database")
}

async fn serve(config_dir: &str) -> Result<()> {
    let settings = load_settings(config_dir)?;
    tracing::info!(
        host = %settings.server.host,
        port = settings.server.port,
        "configuration loaded"
    );

    let db_pool = connect_pool(&settings).await?;
    bootstrap_schema(db_pool.pool())
        .await
        .with_context(|| "schema bootstrap failed")?;
    tracing::info!("schema bootstrap complete");

    let job_store: JobStoreRef = Arc::new(PgJobStore::new(db_pool.clone()));
    let action_store: ActionStoreRef = Arc::new(PgActionStore::new(db_pool.clone()));
    let http_client = reqwest::Client::new();
    let invoker_timeout = settings.invoker.request_timeout();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let resumer_handle = karya_core::resumer::spawn_poll_loop(
        job_store.clone(),
        action_store.clone(),
        http_client.clone(),
        settings.resumer.poll_interval(),
        invoker_timeout,
        settings.resumer.max_jobs_per_tick,
        shutdown_rx,
    );

    let state = AppState {
        job_store,
        action_store,
        db_pool,
        http_client,
        invoker_timeout,
    };
    let app = ingress::create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .with_context(|| "invalid server host/port")?;
    tracing::info!(addr = %addr, "starting HTTP ingress");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    resumer_handle.await.ok();
    tracing::info!("karya server stopped");
    Ok(())
}

async fn migrate(config_dir: &str) -> Result<()> {
    let settings = load_settings(config_dir)?;
    let db_pool = connect_pool(&settings).await?;
    bootstrap_schema(db_pool.pool())
        .await
        .with_context(|| "schema bootstrap failed")?;
    println!("{}", "Schema bootstrap complete".green().bold());
    Ok(())
}

fn validate_file(file_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read workflow file: {file_path}"))?;
    let request: JobRequest = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse workflow JSON: {file_path}"))?;

    let errors = validate_workflow(&request);
    if errors.is_empty() {
        println!("{}", "✓ Workflow is valid".green().bold());
        println!("  Name: {}", request.workflow_name);
        println!("  Steps: {}", request.steps.len());
        Ok(())
    } else {
        println!("{}", "✗ Workflow is invalid".red().bold());
        for error in &errors {
            println!("  - {error}");
        }
        anyhow::bail!("{} structural error(s) found", errors.len());
    }
}

/// Waits for ctrl-c or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
    tracing::info!("initiating graceful shutdown");
}
