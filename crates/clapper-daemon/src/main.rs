//! Clapper daemon binary.
//!
//! Wires together the counter, its durable store, the increment and
//! persistence loops, and the HTTP/`WebSocket` server, then runs until
//! Ctrl-C or a fatal error.
//!
//! # Startup Sequence
//!
//! 1. Load and validate configuration (`clapper.yaml` + environment)
//! 2. Initialize structured logging (tracing)
//! 3. Open the counter store and read the seed value
//! 4. Spawn the increment and persistence loops
//! 5. Start the HTTP server
//! 6. Wait for Ctrl-C, a server failure, or a persistence failure

mod error;

use std::sync::Arc;

use clapper_core::config::LogFormat;
use clapper_core::{
    ClapperConfig, Counter, PersistError, run_increment_loop, run_persistence_loop,
};
use clapper_server::{AppState, start_server};
use clapper_store::CounterStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::DaemonError;

/// Application entry point for the Clapper daemon.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the seed value cannot be
/// read, the server cannot bind, or a checkpoint write fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = ClapperConfig::load()?;
    config.validate()?;

    // 2. Initialize structured logging.
    init_tracing(config.logging.format);
    info!("clapper starting");
    info!(
        addr = %config.server.addr,
        max_sessions = config.server.max_sessions,
        allowed_origins = ?config.server.allowed_origins,
        tick_interval_ms = config.counter.tick_interval_ms,
        persist_interval_ms = config.persistence.interval_ms,
        "Configuration loaded"
    );

    // 3. Open the store and seed the counter.
    let store = Arc::new(CounterStore::from_path(config.persistence.path.clone()));
    let initial = store.read().await.map_err(DaemonError::from)?;
    let counter = Arc::new(Counter::new(initial, config.counter.tick_quantum_ms));
    info!(
        store = store.kind(),
        initial_ms = initial,
        display = %counter.display(),
        "Counter seeded"
    );

    // 4. Spawn the background loops.
    let shutdown = CancellationToken::new();
    let increment = tokio::spawn(run_increment_loop(
        Arc::clone(&counter),
        config.counter.tick_interval(),
        shutdown.clone(),
    ));
    let persistence = tokio::spawn(run_persistence_loop(
        Arc::clone(&counter),
        Arc::clone(&store),
        config.persistence.interval(),
        shutdown.clone(),
    ));

    // 5. Start the HTTP server.
    let state = AppState::new(Arc::clone(&counter), &config.server, config.session)
        .map_err(DaemonError::from)?;
    let state = Arc::new(state);
    let addr = config.server.addr;
    let server_shutdown = shutdown.clone();
    let mut server =
        tokio::spawn(async move { start_server(&addr, state, server_shutdown).await });

    // 6. Run until something ends the process.
    let outcome: Result<(), DaemonError> = tokio::select! {
        result = &mut server => {
            match result {
                Ok(Ok(())) => {
                    warn!("server stopped unexpectedly");
                    Ok(())
                }
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(e.into()),
            }
        }
        result = watch_persistence(persistence) => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown requested");
            Ok(())
        }
    };

    shutdown.cancel();
    // The server branch may already have consumed its handle.
    if !server.is_finished() {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "server stopped with error during shutdown"),
            Err(e) => warn!(error = %e, "server task did not stop cleanly"),
        }
    }
    if let Err(e) = increment.await {
        warn!(error = %e, "increment task did not stop cleanly");
    }

    match outcome {
        Ok(()) => {
            info!(final_display = %counter.display(), "clapper stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "clapper stopped on fatal error");
            Err(e.into())
        }
    }
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`.
fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Resolve only when the persistence loop fails.
///
/// A clean exit (no durable store, or shutdown) leaves nothing to watch, so
/// the future stays pending and lets the other branches decide.
async fn watch_persistence(
    handle: JoinHandle<Result<(), PersistError>>,
) -> Result<(), DaemonError> {
    handle.await??;
    std::future::pending().await
}
