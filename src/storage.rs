use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

/// External host for listing images. Uploads return the public URL of the object.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<String>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

/// Recovers the object key (`<folder>/<file>`) from a hosted image URL.
pub fn key_from_url(image_url: &str) -> Option<String> {
    let parsed = url::Url::parse(image_url).ok()?;
    let mut segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    let file = segments.pop()?;
    let folder = segments.pop()?;
    Some(format!("{}/{}", folder, file))
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

/// Image host kept in process memory. Backs `AppState::fake()`.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_deletes: bool,
    fail_put_at: Option<usize>,
    puts: AtomicUsize,
}

impl MemoryStorage {
    pub const BASE_URL: &'static str = "https://images.local";

    pub fn new() -> Self {
        Self::default()
    }

    /// Every `delete_object` call fails; uploads still succeed.
    pub fn with_failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    /// The `n`th `put_object` call (1-based) fails; all others succeed.
    pub fn with_failing_put(n: usize) -> Self {
        Self {
            fail_put_at: Some(n),
            ..Self::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        let nth = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_put_at == Some(nth) {
            anyhow::bail!("upload rejected for {}", key);
        }
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?
            .insert(key.to_string(), body);
        Ok(format!("{}/{}", Self::BASE_URL, key))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_deletes {
            anyhow::bail!("delete rejected for {}", key);
        }
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?
            .remove(key)
            .map(|_| ())
            .with_context(|| format!("no object {}", key))
    }
}
