use aws_config::BehaviorVersion;
use aws_config::sts::AssumeRoleProvider;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;

use super::{ObjectStore, REGION};
use crate::error::StorageError;

const SESSION_NAME: &str = "riffraff-upload";
const ACCESS_DENIED: &str = "AccessDenied";

/// Amazon S3 via the AWS SDK
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Client for the default credential chain, optionally assuming `role_arn`
    pub async fn connect(role_arn: Option<&str>) -> Self {
        let region = Region::new(REGION);
        let base = aws_config::defaults(BehaviorVersion::latest())
            .region(region.clone())
            .load()
            .await;

        let config = match role_arn {
            None => base,
            Some(role_arn) => {
                tracing::debug!("Assuming role {}", role_arn);
                let provider = AssumeRoleProvider::builder(role_arn)
                    .session_name(SESSION_NAME)
                    .region(region.clone())
                    .configure(&base)
                    .build()
                    .await;
                aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(provider)
                    .load()
                    .await
            }
        };

        Self {
            client: Client::new(&config),
        }
    }
}

impl ObjectStore for S3Store {
    async fn put(&self, data: Vec<u8>, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| {
                if err.code() == Some(ACCESS_DENIED) {
                    StorageError::AccessDenied {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Put {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        message: DisplayErrorContext(&err).to_string(),
                    }
                }
            })?;
        Ok(())
    }
}
