//! S3 Multipart Upload Orchestration
//!
//! Client-side orchestration of the S3 multipart upload protocol: Initiate,
//! UploadPart, Commit and Abort, on top of a pluggable request engine.
//!
//! # Features
//!
//! - **Callback API**: [`MultipartService`] submits requests and reports
//!   results through caller-supplied handlers
//! - **Streaming extraction**: response fields are pulled out of XML bodies
//!   as chunks arrive, into bounded buffers
//! - **Exactly-once completion**: every request context is completed and
//!   released once, whatever the engine does
//! - **Awaitable client**: [`MultipartClient`] wraps the callbacks in futures
//!   and adds a concurrent one-call upload
//! - **AWS Signature V4**, retries with backoff, structured tracing
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use s3_multipart::{BucketContext, MultipartClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_multipart::S3Error> {
//!     let client = MultipartClient::builder().from_env().build()?;
//!     let target = BucketContext::from_env("my-bucket")?;
//!
//!     let data = Bytes::from(vec![0u8; 20 * 1024 * 1024]);
//!     let result = client.upload(&target, "big.bin", data, None).await?;
//!
//!     println!("Uploaded with ETag: {}", result.etag);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mocks;
pub mod request;
pub mod resilience;
pub mod services;
pub mod signing;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types at crate root
pub use client::{MultipartClient, MultipartClientBuilder};
pub use config::{MultipartConfig, MultipartConfigBuilder};
pub use context::{CommitContext, ContextStats, InitiateContext};
pub use credentials::{AwsCredentials, EnvCredentials};
pub use engine::{HttpEngine, RequestEngine};
pub use error::{
    AccessError, ConfigurationError, CredentialsError, MultipartError, NetworkError,
    RequestError, ResourceError, ResponseError, S3Error, S3ErrorResponse, ServerError,
    SigningError, TargetError, TransferError,
};
pub use extract::{FieldBuffer, ResponseExtractor};
pub use handlers::{
    BodyProducer, CommitHandler, InitiateHandler, ResponseHandler, UploadPartHandler,
};
pub use request::{HttpMethod, RequestCallbacks, RequestDescriptor};
pub use services::MultipartService;
pub use signing::{AwsSignerV4, RequestSigner};
pub use transport::{HttpRequest, HttpResponse, HttpTransport};
pub use types::{
    BucketContext, CannedAcl, CommitResult, CompletedPart, InitiateResult, PartDescriptor,
    Protocol, PutProperties, ResponseProperties, ServerSideEncryption, StorageClass,
    UploadSession, UriStyle,
};
pub use xml::{LeafTextHandler, XmlStream};

/// Result type alias for S3 operations.
pub type Result<T> = std::result::Result<T, S3Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _ = std::any::type_name::<S3Error>();
        let _ = std::any::type_name::<MultipartConfig>();
        let _ = std::any::type_name::<AwsCredentials>();
        let _ = std::any::type_name::<MultipartService>();
        let _ = std::any::type_name::<XmlStream<ResponseExtractor>>();
    }
}
