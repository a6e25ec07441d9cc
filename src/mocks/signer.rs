//! Mock signer for testing.

use crate::credentials::AwsCredentials;
use crate::error::{S3Error, SigningError};
use crate::signing::RequestSigner;
use crate::transport::HttpRequest;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Recorded sign call.
#[derive(Debug, Clone)]
pub struct SignCall {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Region signed for.
    pub region: String,
    /// Access key used.
    pub access_key_id: String,
    /// Payload hash passed in.
    pub payload_hash: String,
}

/// Signer adding a fixed authorization header.
#[derive(Debug, Default)]
pub struct MockSigner {
    fail_with: Option<String>,
    sign_count: AtomicUsize,
    calls: Mutex<Vec<SignCall>>,
}

impl MockSigner {
    /// Create a new mock signer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock signer that always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of sign calls.
    pub fn sign_count(&self) -> usize {
        self.sign_count.load(Ordering::SeqCst)
    }

    /// Recorded sign calls.
    pub fn calls(&self) -> Vec<SignCall> {
        self.calls.lock().clone()
    }
}

impl RequestSigner for MockSigner {
    fn sign(
        &self,
        request: &mut HttpRequest,
        credentials: &AwsCredentials,
        region: &str,
        payload_hash: &str,
    ) -> Result<(), S3Error> {
        self.sign_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(SignCall {
            method: request.method.clone(),
            url: request.url.clone(),
            region: region.to_string(),
            access_key_id: credentials.access_key_id().to_string(),
            payload_hash: payload_hash.to_string(),
        });

        if let Some(message) = &self.fail_with {
            return Err(SigningError::CalculationFailed {
                message: message.clone(),
            }
            .into());
        }

        request.headers.insert(
            "authorization".to_string(),
            format!("AWS4-HMAC-SHA256 Credential={}/mock", credentials.access_key_id()),
        );
        request
            .headers
            .insert("x-amz-content-sha256".to_string(), payload_hash.to_string());
        Ok(())
    }
}
