//! Object storage abstraction.
//!
//! Forecast input partitions are uploaded through this layer and export
//! partitions are listed and read back through it. S3 is the production
//! backend; the local filesystem backend serves tests and dry runs.

mod local;
mod s3;
mod url_parser;

pub use local::LocalConfig;
pub use s3::S3Config;
pub use url_parser::BackendConfig;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{ObjectStoreSnafu, StorageError};
use crate::metrics::events::{RequestStatus, StorageOperation, StorageRequest};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider over a bucket (or directory) and optional key prefix.
///
/// All paths passed in and returned are relative to the configured prefix.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.url_for(&Path::default()))
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options),
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// Absolute URL of a relative path, as handed to external services
    /// (e.g. `s3://bucket/prefix/input/run/days/metric.csv`).
    pub fn url_for(&self, path: &Path) -> String {
        let qualified = self.qualify_path(path);
        let base = match &self.config {
            BackendConfig::S3(config) => format!("s3://{}", config.bucket),
            BackendConfig::Local(config) => format!("file://{}", config.path.trim_end_matches('/')),
        };
        if qualified.parts().next().is_none() {
            base
        } else {
            format!("{base}/{qualified}")
        }
    }

    /// Get the contents of a file.
    pub async fn get(&self, path: &Path) -> Result<Bytes, StorageError> {
        let qualified = self.qualify_path(path);
        let start = Instant::now();
        let result = match self.object_store.get(&qualified).await {
            Ok(response) => response.bytes().await,
            Err(e) => Err(e),
        }
        .context(ObjectStoreSnafu);

        emit!(StorageRequest {
            operation: StorageOperation::Get,
            status: RequestStatus::of(&result),
            duration: start.elapsed(),
        });
        result
    }

    /// Put bytes to a path, replacing any existing object.
    pub async fn put(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        let qualified = self.qualify_path(path);
        let size = bytes.len();
        let start = Instant::now();
        let result = self
            .object_store
            .put(&qualified, PutPayload::from(bytes))
            .await
            .context(ObjectStoreSnafu);

        emit!(StorageRequest {
            operation: StorageOperation::Put,
            status: RequestStatus::of(&result),
            duration: start.elapsed(),
        });
        debug!(path = %qualified, bytes = size, "Uploaded object");
        result.map(|_| ())
    }

    /// List every object under `prefix` (relative to the configured key prefix).
    ///
    /// Returned paths are relative to the configured key prefix. The order is
    /// whatever the backend returns; callers that need an order must sort.
    pub async fn list_with_prefix(&self, prefix: &str) -> Result<Vec<Path>, StorageError> {
        let full_prefix = self.qualify_path(&Path::from(prefix)).into_owned();
        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let start = Instant::now();
        let result: Result<Vec<Path>, StorageError> = self
            .object_store
            .list(Some(&full_prefix))
            .map_ok(|meta| meta.location.parts().skip(key_part_count).collect())
            .try_collect()
            .await
            .context(ObjectStoreSnafu);

        emit!(StorageRequest {
            operation: StorageOperation::List,
            status: RequestStatus::of(&result),
            duration: start.elapsed(),
        });
        result
    }
}
