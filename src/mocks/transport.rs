//! Mock HTTP transport for testing.

use crate::error::{NetworkError, S3Error};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body chunks.
    pub chunks: Vec<Bytes>,
    /// Fail the send with this network error instead of responding.
    pub network_error: Option<String>,
}

impl MockResponse {
    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            chunks: Vec::new(),
            network_error: None,
        }
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::ok().with_chunks(vec![body.into()])
    }

    /// Create an error response.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            ..Self::ok_with_body(body)
        }
    }

    /// Fail the send with a connection error.
    pub fn network_failure(message: impl Into<String>) -> Self {
        Self {
            network_error: Some(message.into()),
            ..Self::ok()
        }
    }

    /// Replace the body chunks.
    pub fn with_chunks(mut self, chunks: Vec<Bytes>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Mock HTTP transport for testing.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    default_response: Option<MockResponse>,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Create a mock transport with a default response.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            default_response: Some(response),
            ..Self::default()
        }
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, S3Error> {
        self.requests.lock().push(request);

        let response = self
            .responses
            .lock()
            .pop_front()
            .or_else(|| self.default_response.clone());

        match response {
            Some(MockResponse {
                network_error: Some(message),
                ..
            }) => Err(S3Error::Network(NetworkError::ConnectionFailed { message })),
            Some(mock) => Ok(HttpResponse::from_chunks(mock.status, mock.headers, mock.chunks)),
            None => Err(S3Error::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_queue_then_default() {
        let transport = MockTransport::with_default(MockResponse::ok());
        transport.queue_response(MockResponse::error(500, "boom"));

        let first = transport
            .send(HttpRequest::new("GET", "https://example.com/a"))
            .await
            .unwrap();
        assert_eq!(first.status, 500);

        let second = transport
            .send(HttpRequest::new("GET", "https://example.com/b"))
            .await
            .unwrap();
        assert_eq!(second.status, 200);

        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.last_request().unwrap().url, "https://example.com/b");
    }

    #[tokio::test]
    async fn test_mock_transport_network_failure() {
        let transport =
            MockTransport::with_responses(vec![MockResponse::network_failure("reset")]);
        let result = transport
            .send(HttpRequest::new("PUT", "https://example.com/k"))
            .await;
        assert!(matches!(result, Err(S3Error::Network(_))));

        // Nothing queued and no default.
        let result = transport
            .send(HttpRequest::new("PUT", "https://example.com/k"))
            .await;
        assert!(result.is_err());
    }
}
