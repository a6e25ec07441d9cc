//! Request descriptors handed to a [`RequestEngine`](crate::engine::RequestEngine).
//!
//! A descriptor is the complete, engine-independent description of one S3
//! request: what to send, and the [`RequestCallbacks`] that receive the
//! response. The callbacks are consumed by [`RequestCallbacks::on_complete`],
//! so an engine can complete a request at most once. Engines must complete it
//! exactly once, on success, failure or cancellation alike.

use crate::error::{RequestError, ResourceError, S3Error, TransferError};
use crate::types::{BucketContext, ByteRange, GetConditions, PutProperties, ResponseProperties};
use bytes::Bytes;
use std::fmt;
use url::Url;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// HEAD
    Head,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response sinks and body source of one request.
///
/// For a single request the engine calls these sequentially: optionally
/// `produce_body` until the declared size is reached, then `on_properties`,
/// then `on_body` for every chunk in arrival order, then `on_complete`. An
/// error returned from any of them aborts the request and becomes the
/// completion outcome.
pub trait RequestCallbacks: Send {
    /// Response headers of a successful response.
    fn on_properties(&mut self, _properties: &ResponseProperties) -> Result<(), S3Error> {
        Ok(())
    }

    /// Fill `buf` with the next request body bytes and return how many were
    /// written. Returning 0 before the declared size is reached is an error.
    fn produce_body(&mut self, _buf: &mut [u8]) -> Result<usize, S3Error> {
        Ok(0)
    }

    /// The whole request body at once, when it is already held in memory.
    /// Returning `None` makes the engine pull it through `produce_body`.
    fn take_body(&mut self) -> Option<Bytes> {
        None
    }

    /// Next slice of the response body.
    fn on_body(&mut self, _chunk: &[u8]) -> Result<(), S3Error> {
        Ok(())
    }

    /// Final outcome. Consumes the callbacks.
    fn on_complete(self: Box<Self>, outcome: Result<(), S3Error>);
}

/// Everything about a request except its callbacks.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// HTTP method.
    pub method: HttpMethod,
    /// Bucket, host, credentials and addressing.
    pub target: BucketContext,
    /// Object key.
    pub key: String,
    /// Operation marker placed first in the query string.
    pub sub_resource: Option<String>,
    /// Extra query parameters, already encoded.
    pub query_params: Option<String>,
    /// Conditional headers.
    pub conditions: Option<GetConditions>,
    /// Requested byte range.
    pub byte_range: Option<ByteRange>,
    /// Object properties to send.
    pub put_properties: Option<PutProperties>,
    /// Exact request body size pulled from `produce_body`.
    pub upload_size: u64,
}

impl RequestHead {
    /// Query string: the sub-resource followed by the extra parameters.
    pub fn query_string(&self) -> String {
        match (self.sub_resource.as_deref(), self.query_params.as_deref()) {
            (Some(sub), Some(params)) if !params.is_empty() => format!("{}&{}", sub, params),
            (Some(sub), _) => sub.to_string(),
            (None, Some(params)) => params.to_string(),
            (None, None) => String::new(),
        }
    }

    /// Full request URL.
    pub fn url(&self) -> Result<Url, S3Error> {
        self.target.object_url(&self.key, &self.query_string())
    }

    /// Headers implied by the properties, conditions and range.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(props) = &self.put_properties {
            headers.extend(props.to_headers());
        }
        if let Some(conditions) = &self.conditions {
            headers.extend(conditions.to_headers());
        }
        if let Some(range) = &self.byte_range {
            headers.push(("range".to_string(), range.to_header_value()));
        }
        headers
    }
}

/// A request ready for submission.
pub struct RequestDescriptor {
    /// What to send.
    pub head: RequestHead,
    /// Where the response goes.
    pub callbacks: Box<dyn RequestCallbacks>,
}

impl RequestDescriptor {
    /// A bodiless request for `key` with no sub-resource.
    pub fn new(
        method: HttpMethod,
        target: BucketContext,
        key: impl Into<String>,
        callbacks: Box<dyn RequestCallbacks>,
    ) -> Self {
        Self {
            head: RequestHead {
                method,
                target,
                key: key.into(),
                sub_resource: None,
                query_params: None,
                conditions: None,
                byte_range: None,
                put_properties: None,
                upload_size: 0,
            },
            callbacks,
        }
    }

    /// Set the sub-resource.
    pub fn with_sub_resource(mut self, sub_resource: impl Into<String>) -> Self {
        self.head.sub_resource = Some(sub_resource.into());
        self
    }

    /// Set extra query parameters.
    pub fn with_query_params(mut self, params: impl Into<String>) -> Self {
        self.head.query_params = Some(params.into());
        self
    }

    /// Set conditional headers.
    pub fn with_conditions(mut self, conditions: GetConditions) -> Self {
        self.head.conditions = Some(conditions);
        self
    }

    /// Set a byte range.
    pub fn with_byte_range(mut self, range: ByteRange) -> Self {
        self.head.byte_range = Some(range);
        self
    }

    /// Set object properties, if any.
    pub fn with_put_properties(mut self, props: Option<PutProperties>) -> Self {
        self.head.put_properties = props;
        self
    }

    /// Declare the request body size.
    pub fn with_upload_size(mut self, size: u64) -> Self {
        self.head.upload_size = size;
        self
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Pull exactly `upload_size` bytes out of `callbacks`, `chunk_size` at a time.
///
/// A body handed over whole by [`RequestCallbacks::take_body`] is sliced
/// without copying.
pub fn drain_body(
    callbacks: &mut dyn RequestCallbacks,
    upload_size: u64,
    chunk_size: usize,
) -> Result<Bytes, S3Error> {
    if upload_size == 0 {
        return Ok(Bytes::new());
    }

    let total = usize::try_from(upload_size).map_err(|_| RequestError::EntityTooLarge {
        size: upload_size,
        max_size: usize::MAX as u64,
    })?;

    if let Some(body) = callbacks.take_body() {
        if body.len() < total {
            return Err(TransferError::IncompleteBody {
                expected: upload_size,
                received: body.len() as u64,
            }
            .into());
        }
        return Ok(body.slice(..total));
    }

    let mut body = Vec::new();
    body.try_reserve_exact(total)
        .map_err(|_| ResourceError::OutOfMemory {
            requested: total,
            purpose: "request body",
        })?;

    let mut buf = vec![0u8; chunk_size.clamp(1, total)];
    while body.len() < total {
        let want = (total - body.len()).min(buf.len());
        let written = callbacks.produce_body(&mut buf[..want])?.min(want);
        if written == 0 {
            return Err(TransferError::IncompleteBody {
                expected: upload_size,
                received: body.len() as u64,
            }
            .into());
        }
        body.extend_from_slice(&buf[..written]);
    }

    Ok(Bytes::from(body))
}
