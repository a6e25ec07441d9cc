//! Configuration for multipart orchestration and the default request engine.

use crate::error::{ConfigurationError, S3Error};
use crate::extract::DEFAULT_FIELD_CAPACITY;
use std::time::Duration;

/// Smallest part size S3 accepts for every part but the last.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
/// Largest part size S3 accepts.
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;
/// Largest part number S3 accepts.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// Multipart configuration.
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Capacity of each response field accumulator, in bytes.
    ///
    /// A field keeps at most `field_capacity - 1` bytes.
    pub field_capacity: usize,

    /// Part size used when splitting an object for upload.
    pub part_size: u64,

    /// Maximum number of parts in flight at once.
    pub concurrency: usize,

    /// Slice size requested from body producers.
    pub upload_chunk_size: usize,

    /// Maximum number of error-body bytes read for diagnostics.
    pub max_error_body: usize,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Read timeout for individual requests.
    pub read_timeout: Duration,

    /// Maximum number of retries for transient failures.
    pub max_retries: u32,

    /// Initial backoff delay for retries.
    pub initial_backoff: Duration,

    /// Maximum backoff delay.
    pub max_backoff: Duration,

    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Verify TLS certificates.
    pub verify_ssl: bool,

    /// Send a Content-MD5 header with every uploaded part.
    pub compute_part_md5: bool,

    /// User agent of the default transport.
    pub user_agent: String,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            field_capacity: DEFAULT_FIELD_CAPACITY,
            part_size: 8 * 1024 * 1024,
            concurrency: 4,
            upload_chunk_size: 64 * 1024,
            max_error_body: 64 * 1024,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(20),
            backoff_multiplier: 2.0,
            verify_ssl: true,
            compute_part_md5: false,
            user_agent: format!("s3-multipart/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl MultipartConfig {
    /// Create a new configuration builder.
    pub fn builder() -> MultipartConfigBuilder {
        MultipartConfigBuilder::default()
    }

    /// Number of parts `total` bytes split into.
    pub fn part_count(&self, total: u64) -> u64 {
        if total == 0 {
            1
        } else {
            total.div_ceil(self.part_size)
        }
    }
}

/// Builder for [`MultipartConfig`].
#[derive(Debug, Default)]
pub struct MultipartConfigBuilder {
    field_capacity: Option<usize>,
    part_size: Option<u64>,
    concurrency: Option<usize>,
    upload_chunk_size: Option<usize>,
    max_error_body: Option<usize>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_retries: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    backoff_multiplier: Option<f64>,
    verify_ssl: Option<bool>,
    compute_part_md5: Option<bool>,
    user_agent: Option<String>,
}

fn invalid(field: &str, message: impl Into<String>) -> S3Error {
    S3Error::Configuration(ConfigurationError::InvalidConfiguration {
        field: field.to_string(),
        message: message.into(),
    })
}

impl MultipartConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response field capacity.
    pub fn field_capacity(mut self, capacity: usize) -> Self {
        self.field_capacity = Some(capacity);
        self
    }

    /// Set the part size.
    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = Some(size);
        self
    }

    /// Set the part upload concurrency.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Set the body producer slice size.
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = Some(size);
        self
    }

    /// Set the error body read limit.
    pub fn max_error_body(mut self, size: usize) -> Self {
        self.max_error_body = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the initial backoff delay.
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    /// Set the maximum backoff delay.
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Enable or disable TLS verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Send Content-MD5 with uploaded parts.
    pub fn compute_part_md5(mut self, enabled: bool) -> Self {
        self.compute_part_md5 = Some(enabled);
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Load settings from environment variables.
    pub fn from_env(self) -> Self {
        self.from_env_with(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Unparseable values are ignored.
    pub fn from_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(capacity) = lookup("S3_MULTIPART_FIELD_CAPACITY").and_then(|v| v.parse().ok()) {
            self.field_capacity = Some(capacity);
        }
        if let Some(size) = lookup("S3_MULTIPART_PART_SIZE").and_then(|v| v.parse().ok()) {
            self.part_size = Some(size);
        }
        if let Some(concurrency) = lookup("S3_MULTIPART_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.concurrency = Some(concurrency);
        }
        if let Some(retries) = lookup("S3_MULTIPART_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.max_retries = Some(retries);
        }
        if let Some(ms) = lookup("S3_MULTIPART_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.read_timeout = Some(Duration::from_millis(ms));
        }
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<MultipartConfig, S3Error> {
        let defaults = MultipartConfig::default();

        let field_capacity = self.field_capacity.unwrap_or(defaults.field_capacity);
        if field_capacity == 0 {
            return Err(invalid("field_capacity", "must be at least 1"));
        }

        let part_size = self.part_size.unwrap_or(defaults.part_size);
        if part_size < MIN_PART_SIZE {
            return Err(invalid(
                "part_size",
                format!("Part size must be at least {} bytes", MIN_PART_SIZE),
            ));
        }
        if part_size > MAX_PART_SIZE {
            return Err(invalid(
                "part_size",
                format!("Part size must not exceed {} bytes", MAX_PART_SIZE),
            ));
        }

        let concurrency = self.concurrency.unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }

        let upload_chunk_size = self.upload_chunk_size.unwrap_or(defaults.upload_chunk_size);
        if upload_chunk_size == 0 {
            return Err(invalid("upload_chunk_size", "must be at least 1"));
        }

        let backoff_multiplier = self.backoff_multiplier.unwrap_or(defaults.backoff_multiplier);
        if backoff_multiplier < 1.0 {
            return Err(invalid("backoff_multiplier", "must be at least 1.0"));
        }

        Ok(MultipartConfig {
            field_capacity,
            part_size,
            concurrency,
            upload_chunk_size,
            max_error_body: self.max_error_body.unwrap_or(defaults.max_error_body),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            backoff_multiplier,
            verify_ssl: self.verify_ssl.unwrap_or(defaults.verify_ssl),
            compute_part_md5: self.compute_part_md5.unwrap_or(defaults.compute_part_md5),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        })
    }
}
