use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitch_helix::HelixClient;

use stream_indexer::config::{Config, USAGE};
use stream_indexer::handlers;
use stream_indexer::jobs::{CycleSettings, PollCycle, Scheduler};
use stream_indexer::services::{
    DocumentStore, ElasticsearchTransport, EnrichmentPolicy, StreamPlatform,
};
use stream_indexer::TimeBucket;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}\n", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    init_tracing(config.verbose);
    info!("Starting stream-indexer");
    info!(
        language = %config.twitch_language,
        elasticsearch = %config.elasticsearch_url,
        index_prefix = %config.elasticsearch_index,
        poll_enabled = config.poll_enabled,
        poll_interval_secs = config.poll_interval_secs,
        min_viewer_count = config.min_viewer_count,
        "Configuration loaded and validated"
    );

    // The bucket is computed here, before the first write can happen.
    let bucket = Arc::new(TimeBucket::new());
    let (bucket_shutdown, bucket_handle) =
        Arc::clone(&bucket).spawn_refresher(config.bucket_refresh_interval());

    let scheduler = if config.poll_enabled {
        Some(build_scheduler(&config, Arc::clone(&bucket)).await?.spawn())
    } else {
        info!("Polling disabled, serving liveness probe only");
        None
    };

    info!("Starting HTTP server on 0.0.0.0:{}", config.http_port);
    let server = HttpServer::new(|| App::new().configure(handlers::configure))
        .disable_signals()
        .bind(("0.0.0.0", config.http_port))
        .context("Failed to bind HTTP server")?
        .run();
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    let exit_code = match scheduler {
        Some((scheduler_shutdown, mut scheduler_handle)) => {
            tokio::select! {
                _ = shutdown_signal() => {
                    info!("Shutdown signal received, stopping gracefully...");
                    let _ = scheduler_shutdown.send(());
                    match scheduler_handle.await {
                        Ok(Err(e)) => {
                            error!(error = %e, "Scheduler stopped with error");
                            1
                        }
                        Err(e) => {
                            error!(error = %e, "Scheduler task failed");
                            1
                        }
                        Ok(Ok(())) => 0,
                    }
                }
                joined = &mut scheduler_handle => match joined {
                    Ok(Ok(())) => 0,
                    Ok(Err(e)) => {
                        error!(error = %e, "Terminating: store rejected a document");
                        1
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduler task failed");
                        1
                    }
                },
            }
        }
        None => {
            shutdown_signal().await;
            info!("Shutdown signal received, stopping gracefully...");
            0
        }
    };

    let _ = bucket_shutdown.send(());
    if let Err(e) = bucket_handle.await {
        warn!(error = %e, "Bucket refresher task failed");
    }

    server_handle.stop(true).await;
    match server_task.await {
        Ok(Err(e)) => warn!(error = %e, "HTTP server stopped with error"),
        Err(e) => warn!(error = %e, "HTTP server task failed"),
        Ok(Ok(())) => {}
    }

    info!("stream-indexer stopped");
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn load_config() -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{level},stream_indexer={level},twitch_helix={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_scheduler(config: &Config, bucket: Arc<TimeBucket>) -> Result<Scheduler> {
    let helix = HelixClient::new(&config.twitch_client_id, &config.twitch_client_secret)
        .with_endpoints(&config.twitch_api_url, &config.twitch_token_url)
        .with_timeout(config.request_timeout())
        .context("Failed to build Twitch client")?;
    let platform: Arc<dyn StreamPlatform> = Arc::new(helix);
    info!("Twitch client initialized");

    let transport = ElasticsearchTransport::new(
        &config.elasticsearch_urls(),
        config.elasticsearch_credentials(),
        config.request_timeout(),
    )
    .context("Failed to build Elasticsearch client")?;

    if let Err(e) = transport.ping().await {
        warn!(error = %e, "Elasticsearch is not reachable yet");
    }
    if let Err(e) = transport
        .ensure_index_template(&config.elasticsearch_index)
        .await
    {
        warn!(error = %e, "Could not ensure index template");
    }
    info!(bucket = %bucket.current(), "Elasticsearch client initialized");

    let store = DocumentStore::new(Arc::new(transport), bucket);
    let policy = EnrichmentPolicy::new(Arc::clone(&platform), config.min_viewer_count);
    let cycle = PollCycle::new(
        platform,
        policy,
        store,
        CycleSettings {
            language: config.twitch_language.clone(),
            batch_size: config.stream_batch_size,
            index_prefix: config.elasticsearch_index.clone(),
        },
    );

    Ok(Scheduler::new(cycle, config.poll_interval()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
