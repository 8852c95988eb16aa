//! # gcs: Google Cloud Storage catalog client
//!
//! [`GcsCatalog`] implements [`Catalog`] against the GCS JSON API over
//! plain HTTPS. Listing walks the paginated `objects.list` endpoint with
//! attribute selection so only the fields the pipeline needs travel over
//! the wire; reads stream the object media directly into an `AsyncRead`
//! without buffering the whole body.
//!
//! The base URL is configurable so tests can point the client at a local
//! stub server. An optional bearer token covers private buckets; public
//! buckets work anonymously.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::warn;

use crate::catalog::{Catalog, CatalogError, ObjectReader};
use crate::object::ObjectDescriptor;

/// Public endpoint of the GCS JSON API.
pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

/// Attribute selection for listings: only the fields a descriptor needs,
/// plus the pagination token.
const LIST_FIELDS: &str = "items(name,bucket,crc32c),nextPageToken";

/// One page of an `objects.list` response.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListedObject>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// A single listing entry as the JSON API serialises it. The checksum
/// arrives base64-encoded, big-endian.
#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    bucket: String,
    crc32c: Option<String>,
}

/// GCS JSON API client implementing [`Catalog`].
#[derive(Debug, Clone)]
pub struct GcsCatalog {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl GcsCatalog {
    /// Client against the public GCS endpoint. `auth_token` is a bearer
    /// token for private buckets; `None` reads anonymously.
    pub fn new(auth_token: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, auth_token)
    }

    /// Client against a custom endpoint, e.g. a local stub in tests.
    pub fn with_base_url(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client: reqwest::Client::new(),
            base_url,
            auth_token,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Catalog for GcsCatalog {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectDescriptor>, CatalogError> {
        let url = format!(
            "{}/storage/v1/b/{}/o",
            self.base_url,
            urlencoding::encode(bucket)
        );

        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(&url)
                .query(&[("prefix", prefix), ("fields", LIST_FIELDS)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = self.authorize(request).send().await?;
            if !response.status().is_success() {
                return Err(CatalogError::Status {
                    status: response.status(),
                    url: response.url().to_string(),
                });
            }
            let page: ListResponse = response.json().await?;

            for item in page.items {
                let name = item.name.clone();
                match descriptor_from_listing(item) {
                    Ok(object) => objects.push(object),
                    // One malformed entry must not hide the rest of the
                    // bucket; skip it and keep listing.
                    Err(err) => {
                        warn!(object = %name, error = %err, "Skipping undecodable listing entry")
                    }
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(objects)
    }

    async fn open_object(&self, object: &ObjectDescriptor) -> Result<ObjectReader, CatalogError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(object.bucket()),
            urlencoding::encode(object.name())
        );
        let request = self.client.get(&url).query(&[("alt", "media")]);
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status(),
                url: response.url().to_string(),
            });
        }
        let stream = response
            .bytes_stream()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));
        Ok(Box::new(StreamReader::new(stream)))
    }

    async fn close(&self) -> Result<(), CatalogError> {
        // The HTTP client holds no resources beyond its connection pool,
        // which is released on drop.
        Ok(())
    }
}

/// Decode a listing entry into a validated descriptor.
fn descriptor_from_listing(item: ListedObject) -> Result<ObjectDescriptor, CatalogError> {
    let encoded = item
        .crc32c
        .ok_or_else(|| CatalogError::Decode("listing entry carries no crc32c".into()))?;
    let checksum = decode_crc32c(&encoded)?;
    ObjectDescriptor::new(item.name, item.bucket, checksum)
        .map_err(|err| CatalogError::Decode(err.to_string()))
}

/// Decode the base64 big-endian checksum attribute of a listing entry.
fn decode_crc32c(encoded: &str) -> Result<u32, CatalogError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|err| CatalogError::Decode(format!("checksum {encoded:?} is not base64: {err}")))?;
    let bytes: [u8; 4] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CatalogError::Decode(format!("checksum {encoded:?} is not 4 bytes")))?;
    Ok(u32::from_be_bytes(bytes))
}
