//! Scripted request engine for testing.

use crate::engine::RequestEngine;
use crate::error::{map_http_status, map_s3_error_code, NetworkError, S3Error, S3ErrorResponse};
use crate::request::{drain_body, HttpMethod, RequestCallbacks, RequestDescriptor};
use crate::types::{PutProperties, ResponseProperties};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// How a scripted response fails.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Non-2xx status, with or without an error document.
    Status {
        /// HTTP status.
        status: u16,
        /// Parsed error document.
        error: Option<S3ErrorResponse>,
    },
    /// Transport failure before any response.
    Network(String),
}

/// One scripted response.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponse {
    /// Failure to report instead of a response.
    pub failure: Option<MockFailure>,
    /// Properties of a successful response.
    pub properties: ResponseProperties,
    /// Body chunks, delivered in order.
    pub chunks: Vec<Bytes>,
}

impl ScriptedResponse {
    /// Successful response with an empty body.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Successful response delivering `body` in one chunk.
    pub fn body(body: impl Into<Bytes>) -> Self {
        Self::ok().with_chunks(vec![body.into()])
    }

    /// Successful response delivering `body` cut at `points`.
    pub fn split(body: &str, points: &[usize]) -> Self {
        Self::ok().with_chunks(super::TestFixtures::split_at(body, points))
    }

    /// Failed response with status `status`.
    pub fn status(status: u16, error: Option<S3ErrorResponse>) -> Self {
        Self {
            failure: Some(MockFailure::Status { status, error }),
            ..Self::default()
        }
    }

    /// Failed response with an S3 error code.
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::status(
            status,
            Some(S3ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                ..Default::default()
            }),
        )
    }

    /// Transport failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            failure: Some(MockFailure::Network(message.into())),
            ..Self::default()
        }
    }

    /// Replace the body chunks.
    pub fn with_chunks(mut self, chunks: Vec<Bytes>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Set the ETag property.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.properties.etag = Some(etag.into());
        self
    }

    /// Set the request id property.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.properties.request_id = Some(request_id.into());
        self
    }
}

/// A request as the engine received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Sub-resource.
    pub sub_resource: Option<String>,
    /// Extra query parameters.
    pub query_params: Option<String>,
    /// Declared body size.
    pub upload_size: u64,
    /// Object properties.
    pub put_properties: Option<PutProperties>,
    /// Body pulled from the producer.
    pub body: Bytes,
}

impl RecordedRequest {
    /// Body as UTF-8 text.
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }
}

type Responder = Box<dyn Fn(&RecordedRequest) -> ScriptedResponse + Send + Sync>;

struct Pending {
    callbacks: Box<dyn RequestCallbacks>,
    response: ScriptedResponse,
}

#[derive(Default)]
struct State {
    script: VecDeque<ScriptedResponse>,
    requests: Vec<RecordedRequest>,
    pending: VecDeque<Pending>,
}

/// Engine answering requests from a script.
///
/// Responses come from the queued script first, then from the responder,
/// and default to an empty success. In inline mode a request is answered
/// inside `perform`. In deferred mode requests wait until the test delivers
/// them, in any order, or drops them without completion.
pub struct MockEngine {
    state: Mutex<State>,
    responder: Option<Responder>,
    deferred: bool,
    chunk_size: usize,
}

impl MockEngine {
    /// Engine answering inside `perform`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            responder: None,
            deferred: false,
            chunk_size: 8 * 1024,
        }
    }

    /// Engine holding requests until delivered.
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::new()
        }
    }

    /// Answer unscripted requests with `responder`.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> ScriptedResponse + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queue responses, answered in order.
    pub fn with_responses(self, responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        self.state.lock().script.extend(responses);
        self
    }

    /// Queue one response.
    pub fn push_response(&self, response: ScriptedResponse) {
        self.state.lock().script.push_back(response);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Requests waiting for delivery.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Deliver the oldest waiting request. Returns false if none waits.
    pub fn deliver_next(&self) -> bool {
        let pending = self.state.lock().pending.pop_front();
        match pending {
            Some(pending) => {
                Self::deliver(pending.callbacks, pending.response);
                true
            }
            None => false,
        }
    }

    /// Deliver the waiting request at `index`. Returns false if none is there.
    pub fn deliver_at(&self, index: usize) -> bool {
        let pending = self.state.lock().pending.remove(index);
        match pending {
            Some(pending) => {
                Self::deliver(pending.callbacks, pending.response);
                true
            }
            None => false,
        }
    }

    /// Deliver every waiting request, newest first.
    pub fn deliver_all_reversed(&self) {
        loop {
            let pending = self.state.lock().pending.pop_back();
            match pending {
                Some(pending) => Self::deliver(pending.callbacks, pending.response),
                None => break,
            }
        }
    }

    /// Deliver every waiting request in submission order.
    pub fn deliver_all(&self) {
        while self.deliver_next() {}
    }

    /// Discard the oldest waiting request without completing it.
    pub fn drop_next(&self) -> bool {
        let pending = self.state.lock().pending.pop_front();
        pending.is_some()
    }

    fn next_response(&self, request: &RecordedRequest) -> ScriptedResponse {
        let scripted = self.state.lock().script.pop_front();
        match (scripted, &self.responder) {
            (Some(response), _) => response,
            (None, Some(responder)) => responder(request),
            (None, None) => ScriptedResponse::ok(),
        }
    }

    fn deliver(mut callbacks: Box<dyn RequestCallbacks>, response: ScriptedResponse) {
        let outcome = Self::drive(&mut *callbacks, response);
        callbacks.on_complete(outcome);
    }

    fn drive(
        callbacks: &mut dyn RequestCallbacks,
        response: ScriptedResponse,
    ) -> Result<(), S3Error> {
        match response.failure {
            Some(MockFailure::Status { status, error }) => {
                return Err(match error {
                    Some(details) => map_s3_error_code(status, details),
                    None => map_http_status(status, None),
                })
            }
            Some(MockFailure::Network(message)) => {
                return Err(NetworkError::ConnectionFailed { message }.into())
            }
            None => {}
        }

        callbacks.on_properties(&response.properties)?;
        for chunk in &response.chunks {
            callbacks.on_body(chunk)?;
        }
        Ok(())
    }
}

impl RequestEngine for MockEngine {
    fn perform(&self, request: RequestDescriptor) {
        let RequestDescriptor {
            head,
            mut callbacks,
        } = request;

        let body = drain_body(&mut *callbacks, head.upload_size, self.chunk_size);
        let recorded = RecordedRequest {
            method: head.method,
            bucket: head.target.bucket_name().to_string(),
            key: head.key.clone(),
            sub_resource: head.sub_resource.clone(),
            query_params: head.query_params.clone(),
            upload_size: head.upload_size,
            put_properties: head.put_properties.clone(),
            body: body.as_ref().cloned().unwrap_or_default(),
        };

        if let Err(e) = body {
            self.state.lock().requests.push(recorded);
            callbacks.on_complete(Err(e));
            return;
        }

        let response = self.next_response(&recorded);
        {
            let mut state = self.state.lock();
            state.requests.push(recorded);
            if self.deferred {
                state.pending.push_back(Pending {
                    callbacks,
                    response,
                });
                return;
            }
        }
        Self::deliver(callbacks, response);
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockEngine")
            .field("deferred", &self.deferred)
            .field("requests", &state.requests.len())
            .field("pending", &state.pending.len())
            .finish_non_exhaustive()
    }
}
