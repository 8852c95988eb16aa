//! # config: process configuration
//!
//! All settings arrive as long flags with an environment-variable
//! fallback per field; a flag on the command line wins over its
//! variable. Parsing and validation happen once at startup, before any
//! component is constructed, so a bad value exits the process instead
//! of surfacing mid-pipeline.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Output format of the process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    Text,
}

/// Command-line and environment configuration of the mirroring agent.
#[derive(Debug, Parser)]
#[command(
    name = "gcs-mirror",
    version,
    about = "Continuously mirrors a Google Cloud Storage bucket into a local directory."
)]
pub struct Config {
    /// Bucket to mirror.
    #[arg(long, env = "GCS_BUCKET_NAME")]
    pub bucket_name: String,

    /// Only mirror objects whose name starts with this prefix.
    #[arg(long, env = "GCS_BUCKET_PREFIX", default_value = "")]
    pub bucket_prefix: String,

    /// Local directory objects are written under.
    #[arg(long, env = "DEST_DIR", default_value = ".")]
    pub dest_dir: PathBuf,

    /// Number of concurrent transfer workers.
    #[arg(long, env = "PARALLELISM", default_value_t = 1)]
    pub parallelism: usize,

    /// Time between bucket enumeration cycles, e.g. `60s` or `5m`.
    #[arg(long, env = "READ_INTERVAL", default_value = "60s", value_parser = humantime::parse_duration)]
    pub read_interval: Duration,

    /// Upper bound on one listing call or one object transfer.
    #[arg(long, env = "READ_TIMEOUT", default_value = "60s", value_parser = humantime::parse_duration)]
    pub read_timeout: Duration,

    /// Minimum level of emitted log events.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "json")]
    pub log_format: LogFormat,

    /// Address the liveness HTTP server binds to.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: SocketAddr,
}
