//! # puller: the continuous pull pipeline
//!
//! [`DataPuller`] runs one producer and a configurable pool of workers.
//! On every tick of its interval the producer enumerates the catalog and
//! hands descriptors to the workers over a single-slot channel, so
//! enumeration never runs ahead of what the pool can absorb. Workers
//! reconcile each object through the [`Materializer`], guarding against
//! two workers writing the same destination path at once.
//!
//! Shutdown is cooperative: cancelling the token stops the producer
//! without draining the current cycle, lets every worker finish the
//! object it holds, and only then fires the completion signal.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::materialize::{Materializer, Outcome};
use crate::object::ObjectDescriptor;

/// Lifecycle of the pipeline, observable over a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, `run` not yet called.
    Initialized,
    /// Producer and workers active.
    Running,
    /// Cancellation observed, workers finishing their current objects.
    Draining,
    /// All tasks joined; the completion signal has fired or is firing.
    Stopped,
}

/// Validated settings for one [`DataPuller`].
#[derive(Debug, Clone)]
pub struct PullerConfig {
    /// Bucket to mirror.
    pub bucket: String,
    /// Key prefix to restrict enumeration to. Empty mirrors the whole
    /// bucket.
    pub prefix: String,
    /// Local directory objects materialize under.
    pub dest_dir: PathBuf,
    /// Number of concurrent workers.
    pub parallelism: usize,
    /// Time between enumeration cycles.
    pub read_interval: Duration,
    /// Upper bound on one listing call and on one object transfer.
    pub read_timeout: Duration,
}

/// Construction-time failures for [`DataPuller`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PullerError {
    #[error("bucket name must not be empty")]
    EmptyBucket,
    #[error("parallelism must be at least 1, got {0}")]
    InvalidParallelism(usize),
}

/// Continuous catalog-to-filesystem mirroring pipeline.
pub struct DataPuller {
    catalog: Arc<dyn Catalog>,
    config: PullerConfig,
    materializer: Materializer,
    in_flight: Mutex<HashSet<PathBuf>>,
    state_tx: watch::Sender<PipelineState>,
}

impl DataPuller {
    pub fn new(config: PullerConfig, catalog: Arc<dyn Catalog>) -> Result<Self, PullerError> {
        if config.bucket.is_empty() {
            return Err(PullerError::EmptyBucket);
        }
        if config.parallelism == 0 {
            return Err(PullerError::InvalidParallelism(config.parallelism));
        }
        let materializer = Materializer::new(config.dest_dir.clone(), config.read_timeout);
        let (state_tx, _) = watch::channel(PipelineState::Initialized);
        Ok(Self {
            catalog,
            config,
            materializer,
            in_flight: Mutex::new(HashSet::new()),
            state_tx,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state_tx.borrow()
    }

    /// Receiver that observes every lifecycle transition.
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Run the pipeline until `shutdown` is cancelled. Fires `done` once
    /// every spawned task has returned.
    pub async fn run(
        self: Arc<Self>,
        shutdown: CancellationToken,
        done: oneshot::Sender<()>,
    ) {
        self.state_tx.send_replace(PipelineState::Running);
        info!(
            bucket = %self.config.bucket,
            prefix = %self.config.prefix,
            parallelism = self.config.parallelism,
            "Pull pipeline started"
        );

        let (tx, rx) = async_channel::bounded::<ObjectDescriptor>(1);

        let producer = tokio::spawn({
            let puller = Arc::clone(&self);
            let shutdown = shutdown.clone();
            async move { puller.run_producer(tx, shutdown).await }
        });

        let mut workers = Vec::with_capacity(self.config.parallelism);
        for id in 0..self.config.parallelism {
            let puller = Arc::clone(&self);
            let rx = rx.clone();
            let shutdown = shutdown.clone();
            workers.push(tokio::spawn(async move {
                puller.run_worker(id, rx, shutdown).await
            }));
        }
        drop(rx);

        shutdown.cancelled().await;
        self.state_tx.send_replace(PipelineState::Draining);
        debug!("Shutdown observed, draining workers");

        if let Err(err) = producer.await {
            error!(error = %err, "Producer task panicked");
        }
        for joined in join_all(workers).await {
            if let Err(err) = joined {
                error!(error = %err, "Worker task panicked");
            }
        }

        self.state_tx.send_replace(PipelineState::Stopped);
        info!("Pull pipeline stopped");
        if done.send(()).is_err() {
            warn!("Completion signal has no receiver");
        }
    }

    /// Enumerate the catalog on every tick and dispatch descriptors.
    /// The first cycle runs one full interval after start.
    async fn run_producer(&self, tx: Sender<ObjectDescriptor>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.read_interval,
            self.config.read_interval,
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Producer stopping");
                    // Dropping the sender closes the channel; workers
                    // drain whatever was already accepted.
                    return;
                }
                _ = ticker.tick() => {}
            }

            let listing = tokio::time::timeout(
                self.config.read_timeout,
                self.catalog
                    .list_objects(&self.config.bucket, &self.config.prefix),
            )
            .await;
            let objects = match listing {
                Ok(Ok(objects)) => objects,
                Ok(Err(err)) => {
                    error!(bucket = %self.config.bucket, error = %err, "Listing failed, skipping cycle");
                    continue;
                }
                Err(_) => {
                    error!(
                        bucket = %self.config.bucket,
                        timeout = ?self.config.read_timeout,
                        "Listing timed out, skipping cycle"
                    );
                    continue;
                }
            };
            debug!(count = objects.len(), "Enumerated objects for cycle");

            for object in objects {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Producer stopping mid-cycle");
                        return;
                    }
                    sent = tx.send(object) => {
                        if sent.is_err() {
                            warn!("Dispatch channel closed, producer stopping");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Receive descriptors until cancellation or until the channel is
    /// closed and drained.
    async fn run_worker(
        &self,
        id: usize,
        rx: Receiver<ObjectDescriptor>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(worker = id, "Worker stopping");
                    return;
                }
                received = rx.recv() => {
                    match received {
                        Ok(object) => self.process_object(id, object).await,
                        Err(_) => {
                            debug!(worker = id, "Dispatch channel closed and drained");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Materialize one object, absorbing its errors. The in-flight set
    /// keeps two workers from writing the same destination concurrently;
    /// a skipped duplicate is picked up again on a later cycle.
    async fn process_object(&self, worker: usize, object: ObjectDescriptor) {
        let path = self.materializer.dest_path(&object);

        {
            let mut in_flight = match self.in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !in_flight.insert(path.clone()) {
                debug!(
                    worker,
                    file = %path.display(),
                    "Destination already being written, skipping duplicate"
                );
                return;
            }
        }

        match self
            .materializer
            .sync_object(self.catalog.as_ref(), &object)
            .await
        {
            Ok(Outcome::Skipped) => {
                debug!(worker, file = %path.display(), "Object already current")
            }
            Ok(Outcome::Created) => info!(worker, file = %path.display(), "Object created"),
            Ok(Outcome::Replaced) => info!(worker, file = %path.display(), "Object replaced"),
            Err(err) => {
                error!(worker, object = %object.name(), error = %err, "Object sync failed")
            }
        }

        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&path);
    }
}
