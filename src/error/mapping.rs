//! Error code mapping from S3 error documents to typed errors.

use super::*;

/// Parsed S3 `<Error>` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3ErrorResponse {
    /// S3 error code (e.g., "NoSuchUpload").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Affected bucket, if any.
    pub bucket: Option<String>,
    /// Affected key, if any.
    pub key: Option<String>,
    /// Affected upload, if any.
    pub upload_id: Option<String>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID.
    pub host_id: Option<String>,
}

fn non_empty(message: String) -> Option<String> {
    if message.is_empty() {
        None
    } else {
        Some(message)
    }
}

/// Map a parsed error document to a typed error.
///
/// Codes without a dedicated variant become [`S3Error::Service`], which
/// keeps the whole document so callers can still inspect it.
pub fn map_s3_error_code(status: u16, resp: S3ErrorResponse) -> S3Error {
    match resp.code.as_str() {
        "NoSuchBucket" => S3Error::Target(TargetError::NoSuchBucket {
            bucket: resp.bucket.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "NoSuchKey" => S3Error::Target(TargetError::NoSuchKey {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "PreconditionFailed" => S3Error::Target(TargetError::PreconditionFailed {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            condition: resp.message,
            request_id: resp.request_id,
        }),

        "NoSuchUpload" => S3Error::Multipart(MultipartError::UploadNotFound {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            upload_id: resp.upload_id.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "InvalidPart" => S3Error::Multipart(MultipartError::InvalidPart {
            reason: resp.message,
            request_id: resp.request_id,
        }),
        "InvalidPartOrder" => S3Error::Multipart(MultipartError::InvalidPartOrder {
            request_id: resp.request_id,
        }),
        "EntityTooSmall" => S3Error::Multipart(MultipartError::PartTooSmall {
            reason: resp.message,
            request_id: resp.request_id,
        }),

        "AccessDenied" => S3Error::Access(AccessError::AccessDenied {
            message: non_empty(resp.message),
            request_id: resp.request_id,
        }),
        "InvalidAccessKeyId" => S3Error::Access(AccessError::InvalidAccessKeyId {
            request_id: resp.request_id,
        }),
        "SignatureDoesNotMatch" => S3Error::Access(AccessError::SignatureDoesNotMatch {
            request_id: resp.request_id,
        }),
        "ExpiredToken" => S3Error::Access(AccessError::ExpiredToken {
            request_id: resp.request_id,
        }),

        "InternalError" => S3Error::Server(ServerError::InternalError {
            message: non_empty(resp.message),
            request_id: resp.request_id,
        }),
        "ServiceUnavailable" => S3Error::Server(ServerError::ServiceUnavailable {
            retry_after: None,
            request_id: resp.request_id,
        }),
        "SlowDown" => S3Error::Server(ServerError::SlowDown {
            retry_after: None,
            request_id: resp.request_id,
        }),

        "InvalidBucketName" => S3Error::Request(RequestError::InvalidBucketName {
            bucket: resp.bucket.unwrap_or_default(),
            reason: resp.message,
        }),
        "InvalidRequest" | "MalformedXML" | "InvalidArgument" => {
            S3Error::Request(RequestError::Validation {
                message: resp.message,
            })
        }
        "EntityTooLarge" => S3Error::Request(RequestError::EntityTooLarge {
            size: 0,
            max_size: 5 * 1024 * 1024 * 1024,
        }),

        _ => S3Error::Service {
            status,
            details: resp,
        },
    }
}

/// Map an HTTP status code to an error when the body carried no error document.
pub fn map_http_status(status: u16, request_id: Option<String>) -> S3Error {
    match status {
        301 | 307 => S3Error::Configuration(ConfigurationError::WrongRegion {
            configured_region: "unknown".to_string(),
        }),
        400 => S3Error::Request(RequestError::Validation {
            message: "Bad request".to_string(),
        }),
        403 => S3Error::Access(AccessError::AccessDenied {
            message: None,
            request_id,
        }),
        404 => S3Error::Target(TargetError::NoSuchKey {
            bucket: String::new(),
            key: String::new(),
            request_id,
        }),
        412 => S3Error::Target(TargetError::PreconditionFailed {
            bucket: String::new(),
            key: String::new(),
            condition: "Precondition failed".to_string(),
            request_id,
        }),
        500 => S3Error::Server(ServerError::InternalError {
            message: None,
            request_id,
        }),
        502 => S3Error::Server(ServerError::BadGateway { request_id }),
        503 => S3Error::Server(ServerError::ServiceUnavailable {
            retry_after: None,
            request_id,
        }),
        _ => S3Error::Service {
            status,
            details: S3ErrorResponse {
                code: format!("Http{}", status),
                request_id,
                ..Default::default()
            },
        },
    }
}
