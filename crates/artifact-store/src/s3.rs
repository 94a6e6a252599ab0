//! S3-compatible bucket backend (AWS, MinIO, R2).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::bucket::{BucketError, BucketStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

/// Bucket name used by `S3Config::default()`.
pub const DEFAULT_ARTIFACT_BUCKET: &str = "pipeline-artifacts";

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_ARTIFACT_BUCKET.to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

impl S3Config {
    /// Explicit keys for MinIO-style endpoints. Without both halves the SDK's
    /// ambient provider chain is used.
    fn static_credentials(&self) -> Option<SharedCredentialsProvider> {
        let access_key = self.access_key_id.as_deref()?;
        let secret_key = self.secret_access_key.as_deref()?;
        let credentials =
            Credentials::new(access_key, secret_key, None, None, "artifact-store-static");
        Some(SharedCredentialsProvider::new(credentials))
    }
}

/// Artifact bucket on S3 or any S3-compatible service.
#[derive(Clone)]
pub struct S3BucketStore {
    client: Client,
    bucket: String,
}

impl S3BucketStore {
    pub async fn new(config: S3Config) -> Result<Self, BucketError> {
        let bucket = config.bucket.trim();
        if bucket.is_empty() {
            return Err(BucketError::Configuration(
                "S3 artifact bucket name cannot be empty".into(),
            ));
        }
        let bucket = bucket.to_string();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(provider) = config.static_credentials() {
            loader = loader.credentials_provider(provider);
        }
        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        debug!(bucket = %bucket, region = %config.region, "configured S3 artifact bucket");
        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl BucketStore for S3BucketStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(BucketError::from_sdk)?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.is_no_such_key() => {
                    BucketError::NotFound(key.to_string())
                }
                _ => BucketError::from_sdk(&err),
            })?;

        let data = output.body.collect().await.map_err(BucketError::from_sdk)?;
        Ok(data.into_bytes())
    }

    async fn exists(&self, key: &str) -> Result<bool, BucketError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => match err.as_service_error() {
                Some(service_err) if service_err.is_not_found() => Ok(false),
                _ => Err(BucketError::from_sdk(&err)),
            },
        }
    }
}
