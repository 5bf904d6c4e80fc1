//! Configuration management for bucketview.
//!
//! All configuration is driven by environment variables. Credentials are read
//! once at startup and never change for the life of the process.

use std::fmt;

use crate::error::{BucketViewError, BucketViewResult};
use crate::types::AwsRegion;

/// Process-wide configuration for bucketview.
#[derive(Clone)]
pub struct BucketViewConfig {
    /// Bind address for the HTTP server.
    pub listen_addr: String,
    /// Log level.
    pub log_level: String,
    /// Access key ID used to sign object-storage requests.
    pub access_key_id: String,
    /// Secret access key paired with `access_key_id`.
    pub secret_access_key: String,
    /// Region of the object-storage endpoint.
    pub region: AwsRegion,
    /// Base URL of the S3-compatible endpoint.
    pub object_storage_endpoint: String,
    /// Bucket whose objects are listed.
    pub bucket_name: String,
    /// Base URL of the image-resizing service that serves the bucket's images.
    pub static_domain: String,
}

impl Default for BucketViewConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: AwsRegion::default(),
            object_storage_endpoint: "https://eu-central.object.fastlystorage.app".to_owned(),
            bucket_name: "images".to_owned(),
            static_domain: String::new(),
        }
    }
}

impl fmt::Debug for BucketViewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketViewConfig")
            .field("listen_addr", &self.listen_addr)
            .field("log_level", &self.log_level)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("region", &self.region)
            .field("object_storage_endpoint", &self.object_storage_endpoint)
            .field("bucket_name", &self.bucket_name)
            .field("static_domain", &self.static_domain)
            .finish()
    }
}

impl BucketViewConfig {
    /// Load configuration from environment variables and validate it.
    pub fn from_env() -> BucketViewResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup and validate it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BucketViewResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("AWS_ACCESS_KEY_ID").or_else(|| lookup("ACCESS_KEY")) {
            config.access_key_id = v;
        }
        if let Some(v) = lookup("AWS_SECRET_ACCESS_KEY").or_else(|| lookup("SECRET_KEY")) {
            config.secret_access_key = v;
        }
        if let Some(v) = lookup("AWS_REGION") {
            config.region = AwsRegion::new(v);
        }
        if let Some(v) = lookup("OBJECT_STORAGE_ENDPOINT") {
            config.object_storage_endpoint = v;
        }
        if let Some(v) = lookup("BUCKET_NAME") {
            config.bucket_name = v;
        }
        if let Some(v) = lookup("STATIC_DOMAIN") {
            config.static_domain = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> BucketViewResult<()> {
        let required = [
            ("AWS_ACCESS_KEY_ID", self.access_key_id.as_str()),
            ("AWS_SECRET_ACCESS_KEY", self.secret_access_key.as_str()),
            ("AWS_REGION", self.region.as_str()),
            ("OBJECT_STORAGE_ENDPOINT", self.object_storage_endpoint.as_str()),
            ("BUCKET_NAME", self.bucket_name.as_str()),
            ("STATIC_DOMAIN", self.static_domain.as_str()),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BucketViewError::Config(format!("{name} must be set")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_should_create_default_config() {
        let config = BucketViewConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.region.as_str(), "eu-central");
        assert_eq!(config.bucket_name, "images");
        assert_eq!(
            config.object_storage_endpoint,
            "https://eu-central.object.fastlystorage.app"
        );
    }

    #[test]
    fn test_should_load_config_from_lookup() {
        let config = BucketViewConfig::from_lookup(lookup_from(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("STATIC_DOMAIN", "https://static.example.com"),
            ("BUCKET_NAME", "photos"),
        ]))
        .unwrap();

        assert_eq!(config.access_key_id, "AKID");
        assert_eq!(config.secret_access_key, "secret");
        assert_eq!(config.bucket_name, "photos");
        assert_eq!(config.static_domain, "https://static.example.com");
        assert_eq!(config.region.as_str(), "eu-central");
    }

    #[test]
    fn test_should_fall_back_to_short_credential_names() {
        let config = BucketViewConfig::from_lookup(lookup_from(&[
            ("ACCESS_KEY", "minio"),
            ("SECRET_KEY", "minio123"),
            ("STATIC_DOMAIN", "https://static.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.access_key_id, "minio");
        assert_eq!(config.secret_access_key, "minio123");
    }

    #[test]
    fn test_should_report_missing_secret_key() {
        let result = BucketViewConfig::from_lookup(lookup_from(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("STATIC_DOMAIN", "https://static.example.com"),
        ]));

        let err = result.unwrap_err();
        assert!(matches!(err, BucketViewError::Config(_)));
        assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));
    }

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let config = BucketViewConfig {
            secret_access_key: "super-secret".to_owned(),
            ..BucketViewConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }
}
