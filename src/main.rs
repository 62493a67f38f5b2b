//! faxmirror daemon.
//!
//! Startup order: parse CLI → init tracing → authenticate (the only fatal
//! failure) → initial population poll → hand the engine to the scheduler
//! until a shutdown signal arrives.

#![warn(clippy::all)]

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use faxmirror::cli::Cli;
use faxmirror::config::Config;
use faxmirror::listing::{HttpListingSource, ListingSource};
use faxmirror::mirror::MirrorStore;
use faxmirror::raster::ImageRasterizer;
use faxmirror::scheduler::Scheduler;
use faxmirror::shutdown;
use faxmirror::sync::{EngineOptions, SyncEngine, SyncEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(cli)?;
    tracing::info!(
        directory = %config.directory.display(),
        gateway = %config.base_url,
        "starting faxmirror"
    );

    let password = match config.password.clone() {
        Some(pw) => pw,
        None => tokio::task::block_in_place(|| rpassword::prompt_password("Gateway password: "))?,
    };

    let source = Arc::new(HttpListingSource::new(
        &config.base_url,
        &config.username,
        password,
    )?);
    if !source.authenticate().await? {
        anyhow::bail!(
            "the gateway rejected authentication for user '{}'",
            config.username
        );
    }
    tracing::info!("authenticated");

    let engine = Arc::new(SyncEngine::new(
        source,
        Arc::new(ImageRasterizer),
        MirrorStore::new(config.directory.clone()),
        EngineOptions {
            start_date: config.start_date,
            retry: Default::default(),
        },
    ));

    // Log alert batches. A notification or printing front end would
    // subscribe the same way instead of living in this binary.
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Created { entries, initial }) => {
                    let names: Vec<&str> =
                        entries.iter().map(|e| e.display_name.as_str()).collect();
                    if initial {
                        tracing::info!(count = entries.len(), "mirror populated");
                    } else {
                        tracing::info!(count = entries.len(), ?names, "new documents received");
                    }
                }
                Ok(SyncEvent::Modified { entries }) => {
                    tracing::info!(count = entries.len(), "documents changed remotely");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Initial population. A fetch failure here is as transient as anywhere
    // else: log it and let the scheduled polls catch up.
    match engine.poll(true).await {
        Ok(outcome) => {
            tracing::info!(mirrored = outcome.created.len(), "initial pass complete");
        }
        Err(e) => tracing::error!(error = %e, "initial listing fetch failed"),
    }

    if config.once {
        return Ok(());
    }

    let token = shutdown::install_signal_handler();
    Scheduler::new(engine, config.poll_interval, config.debounce)
        .run(token)
        .await
}
