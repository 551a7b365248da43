//! S3-compatible object store source (AWS, Wasabi, MinIO, ...).
//!
//! The AWS SDK is async; the pipeline is not. `S3Archive` owns a private Tokio runtime
//! with a single IO worker, `block_on`s the control calls (HeadBucket, ListObjectsV2, GetObject) and
//! hands the object body to the decoder as a blocking `Read` through `SyncIoBridge`, so
//! the archive streams from the network without being buffered whole.

use crate::layout::ArchiveLayout;
use crate::source::{BlobHandle, BlobSource};
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use std::io::{BufReader, Read};
use time::Date;
use tokio::runtime::Runtime;
use tokio_util::io::SyncIoBridge;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Clone, Debug)]
pub struct S3Settings {
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores, e.g. `https://s3.wasabisys.com`.
    pub endpoint: Option<String>,
    /// Named profile from `~/.aws/config` / `~/.aws/credentials`.
    pub profile: Option<String>,
    pub region: Option<String>,
    pub layout: ArchiveLayout,
}

pub struct S3Archive {
    rt: Runtime,
    client: Client,
    bucket: String,
    layout: ArchiveLayout,
}

impl std::fmt::Debug for S3Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Archive").field("bucket", &self.bucket).finish()
    }
}

impl S3Archive {
    /// Build the client and check the bucket is reachable. Any failure here is a setup
    /// error: credentials, endpoint, bucket name or permissions.
    pub fn connect(settings: S3Settings) -> Result<Self> {
        // SyncIoBridge drives reads through Handle::block_on, which needs a worker thread
        // to run the IO driver.
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .context("start runtime for S3 client")?;

        let client = rt.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(
                settings.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()),
            ));
            if let Some(profile) = &settings.profile {
                loader = loader.profile_name(profile);
            }
            if let Some(endpoint) = &settings.endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            let sdk_config = loader.load().await;
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(settings.endpoint.is_some())
                .build();
            Client::from_conf(s3_config)
        });

        rt.block_on(client.head_bucket().bucket(&settings.bucket).send())
            .with_context(|| {
                format!(
                    "HeadBucket failed for s3://{} (endpoint: {}, profile: {}). \
                     Check bucket name, endpoint, credentials and permissions.",
                    settings.bucket,
                    settings.endpoint.as_deref().unwrap_or("default"),
                    settings.profile.as_deref().unwrap_or("default"),
                )
            })?;

        tracing::info!(bucket = %settings.bucket, "Connected to object store");
        Ok(Self { rt, client, bucket: settings.bucket, layout: settings.layout })
    }
}

impl BlobSource for S3Archive {
    fn list_daily_blobs(&self, day: Date) -> Result<Vec<BlobHandle>> {
        let prefix = self.layout.day_prefix(day);
        let mut found: Vec<(u32, BlobHandle)> = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let resp = self
                .rt
                .block_on(
                    self.client
                        .list_objects_v2()
                        .bucket(&self.bucket)
                        .prefix(&prefix)
                        .set_continuation_token(token.take())
                        .send(),
                )
                .with_context(|| format!("ListObjectsV2 s3://{}/{}", self.bucket, prefix))?;

            for obj in resp.contents() {
                let Some(key) = obj.key() else { continue };
                let name = key.rsplit('/').next().unwrap_or(key);
                if let Some(part) = self.layout.part_of(name, day) {
                    let size = obj.size().and_then(|s| u64::try_from(s).ok());
                    found.push((part, BlobHandle { key: key.to_string(), size }));
                }
            }

            match resp.next_continuation_token() {
                Some(t) if resp.is_truncated().unwrap_or(false) => token = Some(t.to_string()),
                _ => break,
            }
        }

        found.sort_by_key(|(part, _)| *part);
        Ok(found.into_iter().map(|(_, h)| h).collect())
    }

    fn open_blob_stream(&self, handle: &BlobHandle) -> Result<Box<dyn Read + '_>> {
        let resp = self
            .rt
            .block_on(self.client.get_object().bucket(&self.bucket).key(&handle.key).send())
            .with_context(|| format!("GetObject s3://{}/{}", self.bucket, handle.key))?;
        let body = BufReader::new(SyncIoBridge::new_with_handle(Box::pin(resp.body.into_async_read()), self.rt.handle().clone()));
        Ok(Box::new(body))
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
