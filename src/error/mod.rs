//! Error types for multipart upload orchestration.
//!
//! Every failure, whether it comes from the transport, the server, the
//! response body or local resource exhaustion, is surfaced to the caller as
//! an [`S3Error`] through exactly one completion callback.

mod mapping;

pub use mapping::{map_http_status, map_s3_error_code, S3ErrorResponse};

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum S3Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// AWS signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Request validation errors.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Bucket or key addressed by the request is unusable.
    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    /// Multipart protocol errors.
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Access and authorization errors.
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Server-side errors.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Response parsing and extraction errors.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Body transfer errors.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Local resource exhaustion.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// A server error code with no dedicated variant.
    #[error("Service error (HTTP {status}): {} - {}", details.code, details.message)]
    Service {
        /// HTTP status of the response.
        status: u16,
        /// Parsed error document.
        details: S3ErrorResponse,
    },
}

impl S3Error {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            S3Error::Network(e) => e.is_retryable(),
            S3Error::Server(e) => e.is_retryable(),
            S3Error::Transfer(TransferError::StreamInterrupted { .. }) => true,
            S3Error::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the retry delay hint if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            S3Error::Server(ServerError::SlowDown { retry_after, .. })
            | S3Error::Server(ServerError::ServiceUnavailable { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }

    /// Returns the HTTP status code if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            S3Error::Access(_) => Some(403),
            S3Error::Target(TargetError::NoSuchBucket { .. }) => Some(404),
            S3Error::Target(TargetError::NoSuchKey { .. }) => Some(404),
            S3Error::Target(TargetError::PreconditionFailed { .. }) => Some(412),
            S3Error::Multipart(MultipartError::UploadNotFound { .. }) => Some(404),
            S3Error::Multipart(MultipartError::InvalidPartNumber { .. }) => None,
            S3Error::Multipart(_) => Some(400),
            S3Error::Request(_) => Some(400),
            S3Error::Server(ServerError::InternalError { .. }) => Some(500),
            S3Error::Server(ServerError::BadGateway { .. }) => Some(502),
            S3Error::Server(ServerError::ServiceUnavailable { .. }) => Some(503),
            S3Error::Server(ServerError::SlowDown { .. }) => Some(503),
            S3Error::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the S3 error code if available.
    pub fn s3_error_code(&self) -> Option<&str> {
        match self {
            S3Error::Target(e) => Some(e.code()),
            S3Error::Multipart(e) => e.code(),
            S3Error::Access(e) => Some(e.code()),
            S3Error::Server(e) => Some(e.code()),
            S3Error::Service { details, .. } => Some(details.code.as_str()),
            _ => None,
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            S3Error::Target(e) => e.request_id(),
            S3Error::Multipart(e) => e.request_id(),
            S3Error::Access(e) => e.request_id(),
            S3Error::Server(e) => e.request_id(),
            S3Error::Service { details, .. } => details.request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the parsed error document for unmapped server errors.
    pub fn details(&self) -> Option<&S3ErrorResponse> {
        match self {
            S3Error::Service { details, .. } => Some(details),
            _ => None,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {details}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Redirect response, usually a bucket in another region.
    #[error("Wrong region: bucket is not in region '{configured_region}'")]
    WrongRegion {
        /// The region that was configured.
        configured_region: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: {source_name} provided no credentials")]
    NotFound {
        /// Where the credentials were looked up.
        source_name: String,
    },

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },
}

/// AWS Signature V4 signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Signature calculation failed.
    #[error("Signature calculation failed: {message}")]
    CalculationFailed {
        /// Details about the calculation error.
        message: String,
    },

    /// The request URL cannot be signed.
    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl {
        /// The URL.
        url: String,
        /// Error message.
        message: String,
    },
}

/// Request validation errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// General validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Details about the validation error.
        message: String,
    },

    /// Invalid bucket name.
    #[error("Invalid bucket name '{bucket}': {reason}")]
    InvalidBucketName {
        /// The invalid bucket name.
        bucket: String,
        /// Reason why the name is invalid.
        reason: String,
    },

    /// Invalid object key.
    #[error("Invalid object key '{key}': {reason}")]
    InvalidObjectKey {
        /// The invalid object key.
        key: String,
        /// Reason why the key is invalid.
        reason: String,
    },

    /// Entity too large.
    #[error("Entity too large: {size} bytes exceeds maximum of {max_size} bytes")]
    EntityTooLarge {
        /// The size of the entity.
        size: u64,
        /// Maximum allowed size.
        max_size: u64,
    },
}

/// Errors about the bucket or key a request addressed.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Bucket not found.
    #[error("Bucket not found: '{bucket}'")]
    NoSuchBucket {
        /// The bucket name.
        bucket: String,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Object not found.
    #[error("Object not found: '{bucket}/{key}'")]
    NoSuchKey {
        /// The bucket name.
        bucket: String,
        /// The object key.
        key: String,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// A request condition (If-Match and friends) did not hold.
    #[error("Precondition failed for '{bucket}/{key}': {condition}")]
    PreconditionFailed {
        /// The bucket name.
        bucket: String,
        /// The object key.
        key: String,
        /// The condition that failed.
        condition: String,
        /// AWS request ID.
        request_id: Option<String>,
    },
}

impl TargetError {
    /// Returns the S3 error code.
    pub fn code(&self) -> &str {
        match self {
            TargetError::NoSuchBucket { .. } => "NoSuchBucket",
            TargetError::NoSuchKey { .. } => "NoSuchKey",
            TargetError::PreconditionFailed { .. } => "PreconditionFailed",
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            TargetError::NoSuchBucket { request_id, .. }
            | TargetError::NoSuchKey { request_id, .. }
            | TargetError::PreconditionFailed { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Multipart protocol errors.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// The upload id is unknown to the server, or was aborted or completed.
    #[error("Upload not found: upload_id '{upload_id}' for '{bucket}/{key}'")]
    UploadNotFound {
        /// The bucket name.
        bucket: String,
        /// The object key.
        key: String,
        /// The upload ID.
        upload_id: String,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// One of the committed parts is missing or its ETag does not match.
    #[error("Invalid part: {reason}")]
    InvalidPart {
        /// Server message.
        reason: String,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// The commit manifest is not in ascending part order.
    #[error("Invalid part order: parts must be in ascending order")]
    InvalidPartOrder {
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// A non-final part is below the server's minimum size.
    #[error("Part too small: {reason}")]
    PartTooSmall {
        /// Server message.
        reason: String,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Part numbers must lie in `1..=10000`. Raised before any request is made.
    #[error("Invalid part number {part_number}: must be between 1 and {max}")]
    InvalidPartNumber {
        /// The rejected part number.
        part_number: u32,
        /// Largest accepted part number.
        max: u32,
    },
}

impl MultipartError {
    /// Returns the S3 error code, if the error came from the server.
    pub fn code(&self) -> Option<&str> {
        match self {
            MultipartError::UploadNotFound { .. } => Some("NoSuchUpload"),
            MultipartError::InvalidPart { .. } => Some("InvalidPart"),
            MultipartError::InvalidPartOrder { .. } => Some("InvalidPartOrder"),
            MultipartError::PartTooSmall { .. } => Some("EntityTooSmall"),
            MultipartError::InvalidPartNumber { .. } => None,
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            MultipartError::UploadNotFound { request_id, .. }
            | MultipartError::InvalidPart { request_id, .. }
            | MultipartError::InvalidPartOrder { request_id }
            | MultipartError::PartTooSmall { request_id, .. } => request_id.as_deref(),
            MultipartError::InvalidPartNumber { .. } => None,
        }
    }
}

/// Access and authorization errors.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Access denied.
    #[error("Access denied")]
    AccessDenied {
        /// Additional message if available.
        message: Option<String>,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Invalid access key ID.
    #[error("Invalid access key ID")]
    InvalidAccessKeyId {
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Signature does not match.
    #[error("Signature does not match")]
    SignatureDoesNotMatch {
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Expired token.
    #[error("Token has expired")]
    ExpiredToken {
        /// AWS request ID.
        request_id: Option<String>,
    },
}

impl AccessError {
    /// Returns the S3 error code.
    pub fn code(&self) -> &str {
        match self {
            AccessError::AccessDenied { .. } => "AccessDenied",
            AccessError::InvalidAccessKeyId { .. } => "InvalidAccessKeyId",
            AccessError::SignatureDoesNotMatch { .. } => "SignatureDoesNotMatch",
            AccessError::ExpiredToken { .. } => "ExpiredToken",
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AccessError::AccessDenied { request_id, .. }
            | AccessError::InvalidAccessKeyId { request_id }
            | AccessError::SignatureDoesNotMatch { request_id }
            | AccessError::ExpiredToken { request_id } => request_id.as_deref(),
        }
    }
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },

    /// TLS/SSL error.
    #[error("TLS error: {message}")]
    TlsError {
        /// Error message.
        message: String,
    },

    /// Connection reset.
    #[error("Connection reset by peer")]
    ConnectionReset,
}

impl NetworkError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::Timeout { .. }
                | NetworkError::ConnectionReset
        )
    }
}

/// Server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Internal server error (500).
    #[error("Internal server error")]
    InternalError {
        /// Error message.
        message: Option<String>,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Service unavailable (503).
    #[error("Service unavailable")]
    ServiceUnavailable {
        /// Retry after duration hint.
        retry_after: Option<Duration>,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Slow down (503), the server is throttling.
    #[error("Slow down - reduce request rate")]
    SlowDown {
        /// Retry after duration hint.
        retry_after: Option<Duration>,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// Bad gateway (502).
    #[error("Bad gateway")]
    BadGateway {
        /// AWS request ID.
        request_id: Option<String>,
    },
}

impl ServerError {
    /// Returns the S3 error code.
    pub fn code(&self) -> &str {
        match self {
            ServerError::InternalError { .. } => "InternalError",
            ServerError::ServiceUnavailable { .. } => "ServiceUnavailable",
            ServerError::SlowDown { .. } => "SlowDown",
            ServerError::BadGateway { .. } => "BadGateway",
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ServerError::InternalError { request_id, .. }
            | ServerError::ServiceUnavailable { request_id, .. }
            | ServerError::SlowDown { request_id, .. }
            | ServerError::BadGateway { request_id } => request_id.as_deref(),
        }
    }

    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Response parsing and extraction errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The response body is not well-formed XML.
    #[error("XML parse error: {message}")]
    XmlParseError {
        /// Error message.
        message: String,
    },

    /// Invalid response format.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// Missing required field.
    #[error("Missing required field '{field}' in response")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// A field did not fit into its accumulator.
    #[error("Field '{field}' exceeds the {capacity}-byte field capacity")]
    FieldTruncated {
        /// The truncated field name.
        field: String,
        /// Capacity of the accumulator.
        capacity: usize,
    },
}

/// Body transfer errors.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Stream interrupted.
    #[error("Stream interrupted at byte {bytes_transferred}: {message}")]
    StreamInterrupted {
        /// Bytes successfully transferred before interruption.
        bytes_transferred: u64,
        /// Error message.
        message: String,
    },

    /// The body producer stopped before the declared size.
    #[error("Incomplete body: expected {expected} bytes, received {received} bytes")]
    IncompleteBody {
        /// Declared size.
        expected: u64,
        /// Produced size.
        received: u64,
    },

    /// Upload was aborted.
    #[error("Upload aborted: {reason}")]
    UploadAborted {
        /// Reason for abort.
        reason: String,
    },
}

/// Local resource exhaustion.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// An allocation could not be satisfied.
    #[error("Out of memory: could not reserve {requested} bytes for {purpose}")]
    OutOfMemory {
        /// Requested size in bytes.
        requested: usize,
        /// What the allocation was for.
        purpose: &'static str,
    },
}
