//! # materialize: reconcile one remote object with its local copy
//!
//! The [`Materializer`] owns the destination directory and decides, per
//! object, whether the local file is already current. A local copy is
//! current when its streamed CRC32C equals the checksum the catalog
//! reported; in that case nothing is written. Otherwise the remote
//! content is streamed over the local path, creating parent directories
//! as needed. The whole open-and-copy runs under a timeout so one stuck
//! transfer cannot wedge a worker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::catalog::{Catalog, CatalogError};
use crate::object::ObjectDescriptor;

/// What `sync_object` did for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Local copy already matched the remote checksum; nothing written.
    Skipped,
    /// No local copy existed; the file was created.
    Created,
    /// Local copy differed; the file was overwritten.
    Replaced,
}

/// Per-object failures. None of these are fatal to the pipeline; the
/// object is retried on a later cycle.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("could not stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not open remote object {object}: {source}")]
    Transfer {
        object: String,
        source: CatalogError,
    },
    #[error("transfer of {object} exceeded {timeout:?}")]
    Timeout { object: String, timeout: Duration },
}

/// Streams remote objects into a local directory tree.
#[derive(Debug, Clone)]
pub struct Materializer {
    dest_dir: PathBuf,
    read_timeout: Duration,
}

impl Materializer {
    pub fn new(dest_dir: impl Into<PathBuf>, read_timeout: Duration) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            read_timeout,
        }
    }

    /// Local path an object materializes to. Object names may contain
    /// `/` separators and map onto subdirectories.
    pub fn dest_path(&self, object: &ObjectDescriptor) -> PathBuf {
        self.dest_dir.join(object.name())
    }

    /// Bring the local copy of `object` up to date.
    pub async fn sync_object(
        &self,
        catalog: &dyn Catalog,
        object: &ObjectDescriptor,
    ) -> Result<Outcome, MaterializeError> {
        let path = self.dest_path(object);

        if file_exists(&path).await? {
            if compare_file_checksum(&path, object.crc32c()).await? {
                debug!(file = %path.display(), "Local copy is current, skipping");
                return Ok(Outcome::Skipped);
            }
            self.download(catalog, object, &path).await?;
            return Ok(Outcome::Replaced);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| MaterializeError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        self.download(catalog, object, &path).await?;
        Ok(Outcome::Created)
    }

    /// Stream the remote content over `path`, truncating any previous
    /// content, bounded by the read timeout.
    async fn download(
        &self,
        catalog: &dyn Catalog,
        object: &ObjectDescriptor,
        path: &Path,
    ) -> Result<(), MaterializeError> {
        let transfer = async {
            let mut reader = catalog.open_object(object).await.map_err(|source| {
                MaterializeError::Transfer {
                    object: object.name().to_owned(),
                    source,
                }
            })?;
            let mut file = File::create(path)
                .await
                .map_err(|source| MaterializeError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
            tokio::io::copy(&mut reader, &mut file)
                .await
                .map_err(|source| MaterializeError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            file.flush()
                .await
                .map_err(|source| MaterializeError::Write {
                    path: path.to_path_buf(),
                    source,
                })
        };
        tokio::time::timeout(self.read_timeout, transfer)
            .await
            .map_err(|_| MaterializeError::Timeout {
                object: object.name().to_owned(),
                timeout: self.read_timeout,
            })?
    }
}

/// Whether a regular file exists at `path`. A missing file is not an
/// error; any other stat failure is.
pub async fn file_exists(path: &Path) -> Result<bool, MaterializeError> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(MaterializeError::Stat {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Streamed CRC32C (Castagnoli) of the full file content.
pub async fn file_crc32c(path: &Path) -> Result<u32, MaterializeError> {
    let mut file = File::open(path)
        .await
        .map_err(|source| MaterializeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let mut buf = [0u8; 8192];
    let mut sum = 0u32;
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|source| MaterializeError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if n == 0 {
            break;
        }
        sum = crc32c::crc32c_append(sum, &buf[..n]);
    }
    Ok(sum)
}

/// Whether the file at `path` hashes to `expected`.
pub async fn compare_file_checksum(path: &Path, expected: u32) -> Result<bool, MaterializeError> {
    Ok(file_crc32c(path).await? == expected)
}
