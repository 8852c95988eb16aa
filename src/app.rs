//! # app: process assembly and lifecycle
//!
//! Wires configuration, logging, the catalog client, the pull pipeline
//! and the liveness server together, then supervises them: the process
//! runs until a termination signal arrives or the liveness server
//! fails, cancels the shared token, waits for the pipeline to drain and
//! closes the catalog exactly once.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::gcs::GcsCatalog;
use crate::logger;
use crate::puller::{DataPuller, PullerConfig};
use crate::server::{Server, ServerError};

pub struct App {
    catalog: Arc<GcsCatalog>,
    puller: Arc<DataPuller>,
    server: Server,
}

impl App {
    /// Build the application from the process arguments and
    /// environment. Any failure here is fatal; nothing has started yet.
    pub fn new() -> anyhow::Result<Self> {
        Self::from_config(Config::parse())
    }

    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        logger::init(&config.log_level, config.log_format).context("configuring logging")?;

        let auth_token = std::env::var("GCS_AUTH_TOKEN").ok();
        let catalog = Arc::new(GcsCatalog::new(auth_token));

        let puller_config = PullerConfig {
            bucket: config.bucket_name.clone(),
            prefix: config.bucket_prefix,
            dest_dir: config.dest_dir.clone(),
            parallelism: config.parallelism,
            read_interval: config.read_interval,
            read_timeout: config.read_timeout,
        };
        let puller = Arc::new(
            DataPuller::new(puller_config, catalog.clone() as Arc<dyn Catalog>)
                .context("constructing pull pipeline")?,
        );
        let server = Server::new(config.server_addr);

        info!(
            bucket = %config.bucket_name,
            dest_dir = %config.dest_dir.display(),
            "Application configured"
        );
        Ok(Self {
            catalog,
            puller,
            server,
        })
    }

    /// Run until shutdown, then wait for the pipeline's completion
    /// signal before returning.
    pub async fn start(&self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();

        let (server_err_tx, mut server_err_rx) = mpsc::channel::<ServerError>(1);
        let server_task = tokio::spawn({
            let server = self.server.clone();
            let shutdown = shutdown.clone();
            async move {
                if let Err(err) = server.start(shutdown).await {
                    let _ = server_err_tx.send(err).await;
                }
            }
        });

        let (done_tx, done_rx) = oneshot::channel();
        let puller_task = tokio::spawn(self.puller.clone().run(shutdown.clone(), done_tx));

        tokio::select! {
            _ = shutdown_signal() => info!("Termination signal received, shutting down"),
            Some(err) = server_err_rx.recv() => {
                error!(error = %err, "Liveness server failed, shutting down")
            }
        }

        shutdown.cancel();
        done_rx
            .await
            .context("pipeline ended without a completion signal")?;

        if let Err(err) = puller_task.await {
            warn!(error = %err, "Pipeline task panicked");
        }
        if let Err(err) = server_task.await {
            warn!(error = %err, "Liveness server task panicked");
        }
        Ok(())
    }

    /// Release external resources. Called exactly once, after `start`
    /// has returned.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.catalog
            .close()
            .await
            .context("closing catalog client")?;
        info!("Shutdown complete");
        Ok(())
    }
}

/// Resolves on SIGINT or, on unix, SIGTERM. A handler that cannot be
/// installed is logged and never resolves, leaving the other signal as
/// the shutdown path.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Could not listen for interrupt signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Could not install termination signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
