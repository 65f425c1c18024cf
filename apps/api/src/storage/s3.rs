use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use super::{blob_path, BlobStore, StoredBlob};
use crate::errors::AppError;

/// Blob store backed by S3 (AWS in production, MinIO locally).
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn connect(
        bucket: &str,
        endpoint: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "resumark-static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .load()
            .await;

        // MinIO only understands path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        info!("S3 blob store ready (bucket: {bucket})");
        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredBlob, AppError> {
        let path = blob_path(name);
        let size = data.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&path)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        debug!("Uploaded s3://{}/{} ({size} bytes)", self.bucket, path);
        Ok(StoredBlob {
            path,
            name: name.to_string(),
            size,
        })
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, AppError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!("S3 read of '{path}' failed: {e}")));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("S3 body read of '{path}' failed: {e}")))?;

        Ok(Some(body.into_bytes()))
    }
}
