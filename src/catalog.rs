//! # catalog: the remote object store boundary
//!
//! This module defines the [`Catalog`] trait, the single seam between the
//! pull pipeline and whatever remote store the objects live in. The
//! production implementor is [`crate::gcs::GcsCatalog`]; tests drive the
//! pipeline through the generated `MockCatalog`.
//!
//! The trait is annotated for `mockall` so consumers can generate
//! deterministic mocks for unit/integration tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::object::ObjectDescriptor;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::{automock, predicate::*};

/// Streaming handle over a single object's content.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Errors surfaced by catalog implementations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure talking to the remote store.
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The remote store answered with a non-success status.
    #[error("catalog request to {url} returned status {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    /// A listing entry could not be decoded into a descriptor.
    #[error("could not decode listing entry: {0}")]
    Decode(String),
}

/// Trait for enumerating and reading objects in a remote store.
/// Implemented by real clients and by test mocks.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Enumerate all objects under `prefix` in `bucket`, in the order the
    /// remote store lists them.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectDescriptor>, CatalogError>;

    /// Open a streaming reader over the content of `object`.
    async fn open_object(&self, object: &ObjectDescriptor) -> Result<ObjectReader, CatalogError>;

    /// Release any resources held by the catalog. Called exactly once,
    /// after the pipeline has stopped.
    async fn close(&self) -> Result<(), CatalogError>;
}
