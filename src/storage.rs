use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

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

use crate::config::MediaConfig;

/// Media host: stores a blob under a key and hands back a URL that stays valid.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    fn object_url(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct S3MediaStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3MediaStore {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
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
            public_base_url: cfg.public_base_url.clone(),
        })
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}

/// Keeps objects in process memory. Used by tests and for running without a media host.
#[derive(Default)]
pub struct InMemoryMediaStore {
    public_base_url: String,
    objects: Mutex<Vec<StoredObject>>,
    unavailable: AtomicBool,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub len: usize,
}

impl InMemoryMediaStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            objects: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every upload is refused as if the host were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .map(|objs| objs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("media host unavailable");
        }
        let mut objs = self
            .objects
            .lock()
            .map_err(|_| anyhow::anyhow!("media store lock poisoned"))?;
        objs.push(StoredObject {
            key: key.to_string(),
            content_type: content_type.to_string(),
            len: body.len(),
        });
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}

fn join_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}
