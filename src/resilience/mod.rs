//! Resilience layer for S3 requests.
//!
//! Requests are retried with exponential backoff while no response body has
//! been handed to the caller yet.

mod retry;

pub use retry::{RetryConfig, RetryPolicy};
