use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream};
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("bucket {0} not found")]
    BucketNotFound(String),
    #[error("put {key} failed: {message}")]
    Put { key: String, message: String },
}

/// Seam between the uploader and the object store. Production code uses
/// [`S3Store`]; tests substitute an in-memory map.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Writes objects to one configured S3 bucket. Single attempt per call, no
/// deletes, no touching of unrelated keys.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        S3Store {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        debug!("putting {} bytes at s3://{}/{}", bytes.len(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                if message.contains("NoSuchBucket") {
                    StorageError::BucketNotFound(self.bucket.clone())
                } else if message.contains("InvalidAccessKeyId")
                    || message.contains("SignatureDoesNotMatch")
                    || message.contains("credentials")
                {
                    StorageError::Auth(message)
                } else {
                    StorageError::Put {
                        key: key.to_string(),
                        message,
                    }
                }
            })?;

        info!("uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
