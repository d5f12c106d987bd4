//! Cloudflare R2 backend for [`ObjectStore`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{clamp_ttl, validate_key, ObjectStore};

/// R2 ignores the signing region but the SDK requires one.
const DEFAULT_REGION: &str = "auto";

/// Connection settings for one R2 bucket.
#[derive(Clone)]
pub struct R2Config {
    /// S3 API endpoint of the account
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
}

impl fmt::Debug for R2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .finish()
    }
}

impl R2Config {
    /// Read `R2_ENDPOINT_URL`, `R2_ACCESS_KEY_ID`, `R2_SECRET_ACCESS_KEY`,
    /// `R2_BUCKET_NAME` and the optional `R2_REGION`.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`R2Config::from_env`] over an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| {
            value(name).ok_or_else(|| StorageError::config_error(format!("{} not set", name)))
        };

        Ok(Self {
            endpoint_url: required("R2_ENDPOINT_URL")?,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required("R2_BUCKET_NAME")?,
            region: value("R2_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

/// [`ObjectStore`] over an R2 bucket through the S3 API.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
}

impl R2Client {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "r2-static",
        );
        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        R2Config::from_env().map(Self::new)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fails unless the bucket answers a `HEAD` with the configured credentials.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| {
                StorageError::AwsSdk(format!(
                    "bucket {} unreachable: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(s) if s.is_no_such_key() => StorageError::not_found(key),
                _ => StorageError::download_failed(format!("{}: {}", key, DisplayErrorContext(&e))),
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(format!("{}: {}", key, e)))?
            .into_bytes()
            .to_vec();
        debug!(key, bytes = data.len(), "Fetched object");
        Ok(data)
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_key(key)?;
        let bytes = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, DisplayErrorContext(&e))))?;
        info!(key, bytes, content_type, "Stored object");
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        match head {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::AwsSdk(format!("{}: {}", key, DisplayErrorContext(&e)))),
        }
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        validate_key(key)?;
        let expiry = PresigningConfig::expires_in(clamp_ttl(ttl))
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(expiry)
            .await
            .map_err(|e| StorageError::PresignFailed(format!("{}: {}", key, DisplayErrorContext(&e))))?;
        Ok(request.uri().to_string())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(format!("{}: {}", key, DisplayErrorContext(&e))))?;
        debug!(key, "Deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const FULL: &[(&str, &str)] = &[
        ("R2_ENDPOINT_URL", "https://acct.r2.cloudflarestorage.com"),
        ("R2_ACCESS_KEY_ID", "AKID"),
        ("R2_SECRET_ACCESS_KEY", "hunter2"),
        ("R2_BUCKET_NAME", "reels"),
    ];

    #[test]
    fn test_config_defaults_region() {
        let config = R2Config::from_lookup(lookup(FULL)).unwrap();
        assert_eq!(config.bucket_name, "reels");
        assert_eq!(config.region, "auto");
    }

    #[test]
    fn test_config_requires_credentials() {
        let err = R2Config::from_lookup(lookup(&FULL[..2])).unwrap_err();
        assert!(err.to_string().contains("R2_SECRET_ACCESS_KEY"));

        let mut blank = FULL.to_vec();
        blank[3] = ("R2_BUCKET_NAME", "  ");
        assert!(R2Config::from_lookup(lookup(&blank)).is_err());
    }

    #[test]
    fn test_config_debug_hides_secret() {
        let config = R2Config::from_lookup(lookup(FULL)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("reels"));
    }
}
