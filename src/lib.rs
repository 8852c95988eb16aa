//! gcs-mirror: a continuous mirroring agent for Google Cloud Storage.
//!
//! On a fixed interval the agent enumerates the objects under a bucket
//! prefix and materializes any new or changed object into a local
//! directory tree, skipping objects whose local copy already matches the
//! remote CRC32C checksum. Alongside the pipeline the process serves a
//! small HTTP liveness endpoint.
//!
//! The library is split along component boundaries: [`catalog`] defines
//! the remote-store seam, [`gcs`] implements it, [`puller`] runs the
//! pipeline, [`app`] assembles the process.

pub mod app;
pub mod catalog;
pub mod config;
pub mod gcs;
pub mod logger;
pub mod materialize;
pub mod object;
pub mod puller;
pub mod server;
