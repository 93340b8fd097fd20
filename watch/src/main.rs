//! Uni record watcher
//!
//! Binds one record of a Uni back-end, reloads it on an interval and
//! reports when someone else changes it. The current binder state is
//! served as JSON so other tools can follow it.
//!
//! Usage:
//!   uni-watch --server http://localhost:8000 --endpoint /user --id 42

use std::{path::PathBuf, sync::Arc, time::Duration};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use uni_api::{ApiConfig, EntityEndpoint, HttpClient, TOKEN_STORAGE_KEY};
use uni_entity::{BinderConfig, EntityBinder, SavePolicy};
use uni_events::{EventBus, KvStore, UniEvent};
use uni_types::Token;
use uni_watch::{build_router, LogNotifier};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "uni-watch")]
#[command(about = "Watch a Uni record for remote changes")]
struct Args {
    /// Back-end base URL
    #[arg(short, long, default_value = "http://localhost:8000")]
    server: String,

    /// Entity module path, e.g. /user
    #[arg(short, long)]
    endpoint: String,

    /// Record id to watch
    #[arg(long)]
    id: String,

    /// Reload interval in milliseconds (0 disables polling)
    #[arg(long, default_value = "5000")]
    interval_ms: u64,

    /// Session token sent with every request
    #[arg(long)]
    token: Option<String>,

    /// Log in with this user name (requires --password)
    #[arg(long, requires = "password")]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// JSON file to keep the session token in across runs
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, default_value = "4010")]
    http_port: u16,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Uni watcher starting...");

    let bus = EventBus::new();
    let store = match &args.state_file {
        Some(path) => KvStore::open(path, bus.clone())
            .with_context(|| format!("Failed to open state file {}", path.display()))?,
        None => KvStore::in_memory(bus.clone()),
    };
    let store = Arc::new(store);

    let config = ApiConfig {
        server_url: args.server.clone(),
        ..Default::default()
    };
    let client = HttpClient::new(config, store).context("Failed to build HTTP client")?;

    if let Some(token) = &args.token {
        client.set_token(Some(&Token::new(token.as_str())));
    }
    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        client
            .login(user, password)
            .await
            .with_context(|| format!("Login as {} failed", user))?;
        info!("Logged in as {}", user);
    }

    let mut session = bus.subscribe_key(TOKEN_STORAGE_KEY);
    tokio::spawn(async move {
        while let Some(event) = session.recv().await {
            if let UniEvent::StorageDelete { .. } = event {
                warn!("Session token cleared, requests are now anonymous");
            }
        }
    });

    let endpoint = EntityEndpoint::new(Arc::new(client), args.endpoint.clone()).with_bus(bus);
    let binder = EntityBinder::<Value>::bind(
        endpoint,
        args.id.clone(),
        Arc::new(LogNotifier),
        BinderConfig {
            save_policy: SavePolicy::Reject,
        },
    )
    .await;
    info!("Watching {} {} ({})", args.endpoint, args.id, binder.status().await);

    let poll = binder.poll(Duration::from_millis(args.interval_ms));

    let app = build_router(binder.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.http_port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.http_port))?;
    info!("HTTP API listening on port {}", args.http_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down after {} reload(s)", poll.runs());
    poll.shutdown().await;
    binder.close();
    Ok(())
}
