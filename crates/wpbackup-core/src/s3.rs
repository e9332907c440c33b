//! [`ObjectStore`] backed by Amazon S3 or an S3-compatible service.

use crate::error::{Error, Result};
use crate::storage::{object_key, ObjectStore};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::{debug, info, instrument};

/// Connection options. Explicit keys win over ambient credential resolution
/// (environment, shared profile, instance metadata).
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

pub struct S3Store {
    client: Client,
    bucket: String,
    runtime: Runtime,
}

fn storage_error<E: std::error::Error>(operation: &'static str, err: E) -> Error {
    Error::Storage {
        operation,
        message: DisplayErrorContext(err).to_string(),
    }
}

impl S3Store {
    pub fn connect(options: S3Options) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = options.region {
            loader = loader.region(Region::new(region));
        }
        if let (Some(access_key), Some(secret_key)) = (options.access_key, options.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "wpbackup",
            ));
        }
        if let Some(endpoint) = options.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = runtime.block_on(loader.load());

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(options.force_path_style)
            .build();
        let client = Client::from_conf(s3_config);

        info!(bucket = %options.bucket, "S3 client initialized.");
        Ok(Self {
            client,
            bucket: options.bucket,
            runtime,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl ObjectStore for S3Store {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    fn list(&self) -> Result<Vec<String>> {
        self.runtime.block_on(async {
            let mut keys = Vec::new();
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| storage_error("list", e))?;
                keys.extend(page.contents().iter().filter_map(|object| object.key().map(str::to_string)));
            }
            debug!(count = keys.len(), "Listed bucket.");
            Ok::<_, Error>(keys)
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    fn upload(&self, file: &Path) -> Result<String> {
        let key = object_key(file)?;
        self.runtime.block_on(async {
            let body = ByteStream::from_path(file)
                .await
                .map_err(|e| storage_error("upload", e))?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(body)
                .send()
                .await
                .map_err(|e| storage_error("upload", e))?;
            Ok::<_, Error>(())
        })?;
        info!(%key, "Uploaded archive.");
        Ok(key)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    fn delete(&self, key: &str) -> Result<()> {
        self.runtime.block_on(async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| storage_error("delete", e))
        })?;
        debug!(%key, "Deleted object.");
        Ok(())
    }
}
