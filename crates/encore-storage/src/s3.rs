//! S3-compatible object storage implementation.

use async_trait::async_trait;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::time::Duration;

use encore_core::models::UploadPart;

use crate::client::{validate_parts, ObjectStorage, StorageError, StorageResult};

/// Presigned part URLs must outlive the whole upload, not a single part.
const PART_URL_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// S3 storage over any S3-compatible provider (AWS, DigitalOcean Spaces,
/// MinIO). Credentials come from the standard AWS environment/provider
/// chain.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    cdn_base_url: String,
}

impl S3Storage {
    /// Build a client for `bucket` in `region`. `endpoint_url` switches to
    /// an S3-compatible provider (path-style addressing); `cdn_url` is the
    /// public base URL objects are served from.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        cdn_url: String,
    ) -> Result<Self, anyhow::Error> {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .retry_config(retry_config)
            .load()
            .await;

        let client = match endpoint_url {
            Some(endpoint) => {
                let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(s3_config)
            }
            None => Client::new(&shared_config),
        };

        Ok(S3Storage {
            client,
            bucket,
            cdn_base_url: cdn_url.trim_end_matches('/').to_string(),
        })
    }

    fn presigning_config(ttl: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::builder()
            .expires_in(ttl)
            .build()
            .map_err(|e| StorageError::Presign(e.to_string()))
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key))]
    async fn create_multipart(&self, key: &str, content_type: &str) -> StorageResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Multipart(format!("create multipart upload: {}", e)))?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| StorageError::Multipart("no upload id returned".to_string()))?
            .to_string();

        tracing::info!(upload_id = %upload_id, "Multipart upload created");
        Ok(upload_id)
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key, parts = part_count))]
    async fn presign_part_urls(
        &self,
        key: &str,
        upload_id: &str,
        part_count: usize,
    ) -> StorageResult<Vec<String>> {
        let mut urls = Vec::with_capacity(part_count);
        for i in 0..part_count {
            let part_number = (i + 1) as i32;
            let presigned = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .presigned(Self::presigning_config(PART_URL_TTL)?)
                .await
                .map_err(|e| {
                    StorageError::Presign(format!("presign part {}: {}", part_number, e))
                })?;
            urls.push(presigned.uri().to_string());
        }
        Ok(urls)
    }

    #[tracing::instrument(skip(self, parts), fields(s3.bucket = %self.bucket, s3.key = %key, parts = parts.len()))]
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadPart],
    ) -> StorageResult<()> {
        validate_parts(parts)?;

        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.etag)
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| StorageError::Multipart(format!("complete multipart upload: {}", e)))?;

        tracing::info!("Multipart upload completed");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key))]
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StorageError::Multipart(format!("abort multipart upload: {}", e)))?;

        tracing::info!("Multipart upload aborted");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key))]
    async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning_config(ttl)?)
            .await
            .map_err(|e| StorageError::Presign(format!("presign GET for {}: {}", key, e)))?;

        Ok(presigned.uri().to_string())
    }

    #[tracing::instrument(skip(self, data), fields(s3.bucket = %self.bucket, s3.key = %key, size_bytes = data.len()))]
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "S3 upload failed");
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(self.cdn_url(key))
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key))]
    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        tracing::info!("S3 delete successful");
        Ok(())
    }

    fn cdn_url(&self, key: &str) -> String {
        format!("{}/{}", self.cdn_base_url, key)
    }
}
