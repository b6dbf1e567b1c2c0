mod cli;

use crate::cli::{Cli, StorageBackendArg};
use anyhow::Context;
use clap::Parser;
use snip_core::{NoopNotifier, Notifier, Repository, Shortener};
use snip_gateway::{App, AppState};
use snip_generator::DigestGenerator;
use snip_notifier::{GoogleChatSink, NotificationDispatcher, NotificationSink, TelegramSink};
use snip_shortener::{ShortenerService, ShortenerSettings};
use snip_storage::{InMemoryRepository, PostgresRepository};
use snip_telemetry::TelemetryConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const NOTIFIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let config = Cli::parse();

    let telemetry = TelemetryConfig::builder()
        .service_name(config.service_name.clone())
        .log_format(config.log_format.into())
        .otlp_endpoint(config.otlp_endpoint.clone())
        .build();
    let _telemetry = snip_telemetry::init(&telemetry)?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        "starting gateway server"
    );

    let (notifier, notifier_worker) = build_notifier(&config)?;
    let settings = ShortenerSettings::builder()
        .base_url(config.base_url.clone())
        .max_attempts(config.max_attempts)
        .reserved_aliases(App::reserved_aliases())
        .build();

    let shortener = match config.storage {
        StorageBackendArg::InMemory => {
            build_shortener(InMemoryRepository::new(), notifier, settings)
        }
        StorageBackendArg::Postgres => {
            let dsn = config
                .postgres_dsn
                .as_deref()
                .context("postgres dsn is required when storage backend is postgres")?;
            let repository = PostgresRepository::connect(dsn, config.postgres_max_connections)
                .await
                .context("failed to connect to postgres")?;
            repository.ensure_schema().await?;
            build_shortener(repository, notifier, settings)
        }
    };

    let app = App::router(AppState::new(shortener));
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router owned the last dispatcher handle, so the worker now drains
    // what is queued and exits.
    if let Some(worker) = notifier_worker {
        if tokio::time::timeout(NOTIFIER_DRAIN_TIMEOUT, worker)
            .await
            .is_err()
        {
            warn!("notification worker did not drain in time");
        }
    }

    info!("gateway stopped");
    Ok(())
}

fn build_shortener<R: Repository>(
    repository: R,
    notifier: Arc<dyn Notifier>,
    settings: ShortenerSettings,
) -> Arc<dyn Shortener> {
    Arc::new(ShortenerService::new(
        repository,
        DigestGenerator::new(),
        notifier,
        settings,
    ))
}

fn build_notifier(config: &Cli) -> anyhow::Result<(Arc<dyn Notifier>, Option<JoinHandle<()>>)> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();

    if let Some(webhook) = &config.google_chat_webhook {
        sinks.push(Arc::new(GoogleChatSink::new(webhook)?));
    }
    if let (Some(token), Some(chat_id)) = (&config.telegram_bot_token, &config.telegram_chat_id) {
        sinks.push(Arc::new(TelegramSink::new(token, chat_id.clone())?));
    }

    if sinks.is_empty() {
        info!("no notification sinks configured");
        return Ok((Arc::new(NoopNotifier), None));
    }

    let names: Vec<_> = sinks.iter().map(|sink| sink.name()).collect();
    info!(sinks = ?names, "notifications enabled");

    let (dispatcher, worker) = NotificationDispatcher::spawn(sinks, config.notify_queue_capacity);
    Ok((Arc::new(dispatcher), Some(worker)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
