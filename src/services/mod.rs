//! S3 service implementations.
//!
//! The multipart service turns each operation into a
//! [`RequestDescriptor`](crate::request::RequestDescriptor) and submits it to
//! an engine.

mod multipart;

pub use multipart::MultipartService;
