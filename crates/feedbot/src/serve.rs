// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `feedbot serve`: wires storage, the Telegram transport, and the
//! controller together and runs until a shutdown signal arrives.

use std::sync::Arc;

use feedbot_config::FeedbotConfig;
use feedbot_control::{Controller, install_signal_handler};
use feedbot_core::{FeedbotError, HealthStatus, PluginAdapter, SubscriptionStore};
use feedbot_opml::XmlOpmlCodec;
use feedbot_storage::SqliteStorage;
use feedbot_telegram::TelegramTransport;
use tracing::{info, warn};

/// Runs the bot until SIGINT/SIGTERM.
pub async fn run_serve(config: FeedbotConfig) -> Result<(), FeedbotError> {
    init_tracing(&config.bot.log_level);

    info!(name = %config.bot.name, "starting feedbot serve");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage = Arc::new(storage);
    info!(path = %config.storage.database_path, "storage initialized");

    let transport = Arc::new(TelegramTransport::new(config.telegram.clone())?);
    let username = transport.bot_username().await?;
    info!(username = %username, "connected to Telegram");

    if let HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) =
        storage.health_check().await?
    {
        warn!(reason = %reason, "storage is not healthy");
    }

    let controller = Arc::new(
        Controller::new(
            storage.clone(),
            transport.clone(),
            Arc::new(XmlOpmlCodec),
            config.feed.clone(),
        )
        .with_bot_username(username),
    );

    let cancel = install_signal_handler();
    transport.run(controller, cancel).await;

    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "transport shutdown failed");
    }
    storage.close().await?;
    info!("feedbot stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise feedbot crates log at the configured level and
/// everything else at `warn`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("feedbot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
