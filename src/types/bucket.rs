//! The bucket a multipart upload targets.

use crate::credentials::{AwsCredentials, EnvCredentials};
use crate::error::{ConfigurationError, RequestError, S3Error};
use crate::signing::canonical::uri_encode_path;
use url::Url;

/// Scheme used to reach the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// TLS.
    #[default]
    Https,
    /// Plain HTTP, for local S3-compatible stores.
    Http,
}

impl Protocol {
    /// URL scheme.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Http => "http",
        }
    }
}

/// How the bucket name appears in request URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UriStyle {
    /// `https://bucket.host/key`
    #[default]
    VirtualHost,
    /// `https://host/bucket/key`
    Path,
}

/// Host, bucket, credentials and addressing for one bucket.
#[derive(Debug, Clone)]
pub struct BucketContext {
    host_name: Option<String>,
    bucket_name: String,
    protocol: Protocol,
    uri_style: UriStyle,
    region: String,
    credentials: AwsCredentials,
}

impl BucketContext {
    /// Target `bucket` on AWS in `us-east-1`.
    pub fn new(bucket: impl Into<String>, credentials: AwsCredentials) -> Self {
        Self {
            host_name: None,
            bucket_name: bucket.into(),
            protocol: Protocol::default(),
            uri_style: UriStyle::default(),
            region: "us-east-1".to_string(),
            credentials,
        }
    }

    /// Target `bucket` using the standard AWS environment variables.
    ///
    /// Reads `AWS_REGION`/`AWS_DEFAULT_REGION`, the
    /// `AWS_ENDPOINT_URL_S3`/`AWS_ENDPOINT_URL` override and the credential
    /// variables. A custom endpoint switches to path-style addressing.
    pub fn from_env(bucket: impl Into<String>) -> Result<Self, S3Error> {
        Self::from_env_with(bucket, |name| std::env::var(name).ok())
    }

    /// Like [`BucketContext::from_env`] with an arbitrary variable lookup.
    pub fn from_env_with<F>(bucket: impl Into<String>, lookup: F) -> Result<Self, S3Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = EnvCredentials::new().load_with(&lookup)?;
        let mut context = Self::new(bucket, credentials);

        if let Some(region) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            context.region = region;
        }

        if let Some(endpoint) =
            lookup("AWS_ENDPOINT_URL_S3").or_else(|| lookup("AWS_ENDPOINT_URL"))
        {
            context = context.with_endpoint(&endpoint)?;
        }

        Ok(context)
    }

    /// Use an explicit host, e.g. `localhost:9000` or `s3.eu-west-1.amazonaws.com`.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host_name = Some(host.into());
        self
    }

    /// Use a custom endpoint URL; implies path-style addressing.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, S3Error> {
        let url = Url::parse(endpoint).map_err(|e| {
            S3Error::Configuration(ConfigurationError::InvalidEndpoint {
                url: endpoint.to_string(),
                details: e.to_string(),
            })
        })?;

        let host = url.host_str().ok_or_else(|| {
            S3Error::Configuration(ConfigurationError::InvalidEndpoint {
                url: endpoint.to_string(),
                details: "missing host".to_string(),
            })
        })?;

        self.protocol = match url.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            other => {
                return Err(S3Error::Configuration(ConfigurationError::InvalidEndpoint {
                    url: endpoint.to_string(),
                    details: format!("unsupported scheme '{}'", other),
                }))
            }
        };
        self.host_name = Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        });
        self.uri_style = UriStyle::Path;
        Ok(self)
    }

    /// Set the protocol.
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the addressing style.
    pub fn with_uri_style(mut self, uri_style: UriStyle) -> Self {
        self.uri_style = uri_style;
        self
    }

    /// Set the signing region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Bucket name.
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Endpoint host, derived from the region unless set explicitly.
    pub fn host_name(&self) -> String {
        self.host_name
            .clone()
            .unwrap_or_else(|| format!("s3.{}.amazonaws.com", self.region))
    }

    /// Protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Addressing style.
    pub fn uri_style(&self) -> UriStyle {
        self.uri_style
    }

    /// Signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Credentials used to sign requests.
    pub fn credentials(&self) -> &AwsCredentials {
        &self.credentials
    }

    /// Build the URL of `key` with a raw query string appended verbatim.
    pub fn object_url(&self, key: &str, query: &str) -> Result<Url, S3Error> {
        if self.bucket_name.is_empty() {
            return Err(S3Error::Request(RequestError::InvalidBucketName {
                bucket: String::new(),
                reason: "bucket name is empty".to_string(),
            }));
        }
        validate_key(key)?;

        let encoded_key = uri_encode_path(key);
        let mut url = match self.uri_style {
            UriStyle::VirtualHost => format!(
                "{}://{}.{}/{}",
                self.protocol.as_str(),
                self.bucket_name,
                self.host_name(),
                encoded_key
            ),
            UriStyle::Path => format!(
                "{}://{}/{}/{}",
                self.protocol.as_str(),
                self.host_name(),
                self.bucket_name,
                encoded_key
            ),
        };
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }

        Url::parse(&url).map_err(|e| {
            S3Error::Configuration(ConfigurationError::InvalidEndpoint {
                url,
                details: e.to_string(),
            })
        })
    }
}

/// Longest object key S3 accepts, in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

fn validate_key(key: &str) -> Result<(), S3Error> {
    let reason = if key.is_empty() {
        "object key is empty"
    } else if key.len() > MAX_KEY_LENGTH {
        "object key exceeds 1024 bytes"
    } else {
        return Ok(());
    };
    Err(S3Error::Request(RequestError::InvalidObjectKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn creds() -> AwsCredentials {
        AwsCredentials::new("AKID", "SECRET")
    }

    #[test]
    fn test_virtual_host_url() {
        let target = BucketContext::new("b", creds()).with_region("eu-west-1");
        let url = target.object_url("dir/my file.bin", "uploads").unwrap();
        assert_eq!(
            url.as_str(),
            "https://b.s3.eu-west-1.amazonaws.com/dir/my%20file.bin?uploads"
        );
    }

    #[test]
    fn test_path_style_url() {
        let target = BucketContext::new("b", creds())
            .with_host("localhost:9000")
            .with_protocol(Protocol::Http)
            .with_uri_style(UriStyle::Path);
        let url = target
            .object_url("k", "partNumber=7&uploadId=U1")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/b/k?partNumber=7&uploadId=U1"
        );
    }

    #[test]
    fn test_with_endpoint() {
        let target = BucketContext::new("b", creds())
            .with_endpoint("http://127.0.0.1:9000")
            .unwrap();
        assert_eq!(target.protocol(), Protocol::Http);
        assert_eq!(target.uri_style(), UriStyle::Path);
        assert_eq!(target.host_name(), "127.0.0.1:9000");

        assert!(BucketContext::new("b", creds())
            .with_endpoint("ftp://example.com")
            .is_err());
    }

    #[test]
    fn test_from_env_with() {
        let env: HashMap<&str, &str> = [
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "SECRET"),
            ("AWS_DEFAULT_REGION", "ap-south-1"),
        ]
        .into_iter()
        .collect();

        let target =
            BucketContext::from_env_with("b", |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(target.region(), "ap-south-1");
        assert_eq!(target.host_name(), "s3.ap-south-1.amazonaws.com");
        assert_eq!(target.credentials().access_key_id(), "AKID");
    }

    #[test]
    fn test_empty_bucket_is_rejected() {
        let target = BucketContext::new("", creds());
        assert!(target.object_url("k", "").is_err());
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        let target = BucketContext::new("b", creds());
        assert!(matches!(
            target.object_url("", "uploads").unwrap_err(),
            S3Error::Request(RequestError::InvalidObjectKey { .. })
        ));
        assert!(matches!(
            target.object_url(&"k".repeat(MAX_KEY_LENGTH + 1), "").unwrap_err(),
            S3Error::Request(RequestError::InvalidObjectKey { .. })
        ));
        assert!(target.object_url(&"k".repeat(MAX_KEY_LENGTH), "").is_ok());
    }
}
