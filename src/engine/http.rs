//! HTTP request engine.

use super::RequestEngine;
use crate::config::MultipartConfig;
use crate::error::{map_http_status, map_s3_error_code, ConfigurationError, S3Error};
use crate::request::{drain_body, RequestCallbacks, RequestDescriptor, RequestHead};
use crate::resilience::{RetryConfig, RetryPolicy};
use crate::signing::{sha256_hex, AwsSignerV4, RequestSigner};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::ResponseProperties;
use crate::xml::parse_error_response;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, debug_span, warn};
use tracing_futures::Instrument;
use uuid::Uuid;

/// Performs requests over an [`HttpTransport`], one tokio task per request.
///
/// Failed attempts are retried while nothing has been delivered to the
/// callbacks yet; once the first property or body callback has run, an
/// error ends the request.
#[derive(Clone)]
pub struct HttpEngine {
    inner: Arc<Inner>,
    handle: Handle,
}

struct Inner {
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
    retry: RetryPolicy,
    config: Arc<MultipartConfig>,
}

impl HttpEngine {
    /// Create an engine spawning its requests on `handle`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn RequestSigner>,
        config: Arc<MultipartConfig>,
        handle: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                signer,
                retry: RetryPolicy::new(RetryConfig::from_config(&config)),
                config,
            }),
            handle,
        }
    }

    /// Create an engine with a reqwest transport and a SigV4 signer on the
    /// current tokio runtime.
    pub fn from_config(config: Arc<MultipartConfig>) -> Result<Self, S3Error> {
        let handle = Handle::try_current().map_err(|e| ConfigurationError::InvalidConfiguration {
            field: "runtime".to_string(),
            message: e.to_string(),
        })?;
        let transport = ReqwestTransport::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .verify_ssl(config.verify_ssl)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(AwsSignerV4::new()),
            config,
            handle,
        ))
    }
}

impl RequestEngine for HttpEngine {
    fn perform(&self, request: RequestDescriptor) {
        let span = debug_span!(
            "s3_request",
            method = %request.head.method,
            bucket = %request.head.target.bucket_name(),
            key = %request.head.key,
        );
        let inner = self.inner.clone();
        self.handle
            .spawn(async move { inner.execute(request).await }.instrument(span));
    }
}

impl fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEngine")
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl Inner {
    async fn execute(&self, request: RequestDescriptor) {
        let RequestDescriptor {
            head,
            mut callbacks,
        } = request;

        let outcome = self.run(&head, &mut *callbacks).await;
        match &outcome {
            Ok(()) => debug!("request completed"),
            Err(e) => warn!(error = %e, "request failed"),
        }
        callbacks.on_complete(outcome);
    }

    async fn run(
        &self,
        head: &RequestHead,
        callbacks: &mut dyn RequestCallbacks,
    ) -> Result<(), S3Error> {
        let body = drain_body(callbacks, head.upload_size, self.config.upload_chunk_size)?;
        let url = head.url()?;

        let mut request = HttpRequest::new(head.method.as_str(), url.as_str())
            .with_headers(head.headers())
            .with_header("content-length", body.len().to_string())
            .with_header("amz-sdk-invocation-id", Uuid::new_v4().to_string());
        let payload_hash = sha256_hex(&body);
        if !body.is_empty() {
            request.body = Some(body);
        }
        self.signer.sign(
            &mut request,
            head.target.credentials(),
            head.target.region(),
            &payload_hash,
        )?;

        let response = self
            .retry
            .execute(|| {
                let request = request.clone();
                async move { self.send(request).await }
            })
            .await?;

        let properties = ResponseProperties::from_headers(&response.headers);
        debug!(
            status = response.status,
            request_id = properties.request_id.as_deref().unwrap_or(""),
            "response received"
        );
        callbacks.on_properties(&properties)?;

        let mut stream = response.body;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !chunk.is_empty() {
                callbacks.on_body(&chunk)?;
            }
        }
        Ok(())
    }

    /// Send once, turning a non-2xx response into its error.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, S3Error> {
        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(self.error_from_response(response).await)
        }
    }

    async fn error_from_response(&self, mut response: HttpResponse) -> S3Error {
        let status = response.status;
        let request_id = response.request_id().map(String::from);

        let body = match response.read_to_limit(self.config.max_error_body).await {
            Ok(body) => body,
            Err(e) => return e,
        };
        if body.is_empty() {
            return map_http_status(status, request_id);
        }

        match parse_error_response(&String::from_utf8_lossy(&body)) {
            Ok(mut details) => {
                if details.request_id.is_none() {
                    details.request_id = request_id;
                }
                map_s3_error_code(status, details)
            }
            Err(e) => {
                debug!(status, error = %e, "unparseable error body");
                map_http_status(status, request_id)
            }
        }
    }
}
