//! Awaitable multipart client.
//!
//! [`MultipartClient`] drives the callback-based [`MultipartService`] through
//! reply handlers, so each operation can simply be awaited. It also offers a
//! one-call [`upload`](MultipartClient::upload) that splits a body into parts
//! and uploads them concurrently.

use crate::config::{MultipartConfig, MAX_PART_NUMBER};
use crate::context::ContextStats;
use crate::engine::{HttpEngine, RequestEngine};
use crate::error::{RequestError, ResponseError, S3Error};
use crate::handlers::{
    AbortReply, BytesProducer, CommitReply, InitiateReply, ManifestProducer, PartReply,
};
use crate::services::MultipartService;
use crate::types::{BucketContext, CommitResult, CompletedPart, PutProperties, UploadSession};
use base64::Engine as _;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use md5::{Digest, Md5};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Multipart upload client.
#[derive(Clone)]
pub struct MultipartClient {
    config: Arc<MultipartConfig>,
    engine: Arc<dyn RequestEngine>,
    service: MultipartService,
}

impl MultipartClient {
    /// Create a client submitting its requests to `engine`.
    pub fn new(config: MultipartConfig, engine: Arc<dyn RequestEngine>) -> Self {
        let config = Arc::new(config);
        Self {
            service: MultipartService::new(config.clone()),
            config,
            engine,
        }
    }

    /// Create a client builder.
    pub fn builder() -> MultipartClientBuilder {
        MultipartClientBuilder::new()
    }

    /// Client configuration.
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Underlying callback-based service.
    pub fn service(&self) -> &MultipartService {
        &self.service
    }

    /// Counters of the contexts created by this client.
    pub fn context_stats(&self) -> &Arc<ContextStats> {
        self.service.context_stats()
    }

    /// Start a multipart upload of `key`.
    pub async fn initiate(
        &self,
        target: &BucketContext,
        key: &str,
        properties: Option<PutProperties>,
    ) -> Result<UploadSession, S3Error> {
        let (handler, reply) = InitiateReply::new();
        self.service
            .initiate(target, key, properties, handler, self.engine.as_ref());
        let result = reply.recv().await?;

        if result.truncated {
            return Err(ResponseError::FieldTruncated {
                field: "UploadId".to_string(),
                capacity: self.config.field_capacity,
            }
            .into());
        }
        if result.upload_id.is_empty() {
            return Err(ResponseError::MissingField {
                field: "UploadId".to_string(),
            }
            .into());
        }

        debug!(key = %key, upload_id = %result.upload_id, "upload initiated");
        Ok(UploadSession::new(target.clone(), key, result.upload_id))
    }

    /// Upload `data` as part `part_number` of `session`.
    pub async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: u32,
        data: Bytes,
        properties: Option<PutProperties>,
    ) -> Result<CompletedPart, S3Error> {
        let properties = if self.config.compute_part_md5 {
            Some(properties.unwrap_or_default().with_md5(content_md5(&data)))
        } else {
            properties
        };

        let part = session.part(part_number, data.len() as u64);
        let (handler, reply) = PartReply::new(part_number, BytesProducer::new(data));
        self.service.upload_part(
            &session.target,
            &session.key,
            &part,
            properties,
            handler,
            self.engine.as_ref(),
        );
        reply.recv().await
    }

    /// Complete `session` from its uploaded parts.
    pub async fn commit(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<CommitResult, S3Error> {
        if parts.is_empty() {
            return Err(RequestError::Validation {
                message: "Cannot complete a multipart upload without parts".to_string(),
            }
            .into());
        }

        let manifest = ManifestProducer::new(parts);
        let content_length = manifest.len();
        let (handler, reply) = CommitReply::new(manifest);
        self.service.commit(
            &session.target,
            &session.key,
            &session.upload_id,
            content_length,
            handler,
            self.engine.as_ref(),
        );
        let result = reply.recv().await?;
        debug!(
            key = %session.key,
            upload_id = %session.upload_id,
            parts = parts.len(),
            "upload committed"
        );
        Ok(result)
    }

    /// Abort `session`, discarding its parts.
    pub async fn abort(&self, session: &UploadSession) -> Result<(), S3Error> {
        let (handler, reply) = AbortReply::new();
        self.service.abort(
            &session.target,
            &session.key,
            &session.upload_id,
            handler,
            self.engine.as_ref(),
        );
        reply.recv().await
    }

    /// Upload `data` to `key` as a multipart upload.
    ///
    /// The body is split into `part_size` parts, at most `concurrency` of
    /// which are in flight at once. Any failure aborts the upload.
    pub async fn upload(
        &self,
        target: &BucketContext,
        key: &str,
        data: Bytes,
        properties: Option<PutProperties>,
    ) -> Result<CommitResult, S3Error> {
        let total = data.len() as u64;
        let part_count = self.config.part_count(total);
        if part_count > u64::from(MAX_PART_NUMBER) {
            return Err(RequestError::EntityTooLarge {
                size: total,
                max_size: self.config.part_size.saturating_mul(u64::from(MAX_PART_NUMBER)),
            }
            .into());
        }

        let session = self.initiate(target, key, properties).await?;
        info!(
            key = %key,
            upload_id = %session.upload_id,
            size = total,
            parts = part_count,
            "multipart upload started"
        );

        match self.upload_parts(&session, data, part_count).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(upload_id = %session.upload_id, error = %e, "aborting multipart upload");
                if let Err(abort_error) = self.abort(&session).await {
                    warn!(
                        upload_id = %session.upload_id,
                        error = %abort_error,
                        "abort failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        session: &UploadSession,
        data: Bytes,
        part_count: u64,
    ) -> Result<CommitResult, S3Error> {
        let part_size = self.config.part_size as usize;
        let uploads = (0..part_count as usize).map(|index| {
            let start = index * part_size;
            let end = (start + part_size).min(data.len());
            self.upload_part(session, index as u32 + 1, data.slice(start..end), None)
        });

        let mut parts: Vec<CompletedPart> = stream::iter(uploads)
            .buffer_unordered(self.config.concurrency)
            .try_collect()
            .await?;
        parts.sort_by_key(|p| p.part_number);

        self.commit(session, &parts).await
    }
}

impl std::fmt::Debug for MultipartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Base64 MD5 digest of `data`, as sent in `Content-MD5`.
pub fn content_md5(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Md5::digest(data))
}

/// Builder for [`MultipartClient`].
#[derive(Default)]
pub struct MultipartClientBuilder {
    config: Option<MultipartConfig>,
    from_env: bool,
    engine: Option<Arc<dyn RequestEngine>>,
}

impl MultipartClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: MultipartConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Use a custom request engine.
    pub fn engine(mut self, engine: Arc<dyn RequestEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Build the client.
    ///
    /// Without an explicit engine, an [`HttpEngine`] is created on the
    /// current tokio runtime.
    pub fn build(self) -> Result<MultipartClient, S3Error> {
        let config = match self.config {
            Some(config) => config,
            None if self.from_env => MultipartConfig::builder().from_env().build()?,
            None => MultipartConfig::default(),
        };

        let engine: Arc<dyn RequestEngine> = match self.engine {
            Some(engine) => engine,
            None => Arc::new(HttpEngine::from_config(Arc::new(config.clone()))?),
        };

        Ok(MultipartClient::new(config, engine))
    }
}

impl std::fmt::Debug for MultipartClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartClientBuilder")
            .field("config", &self.config)
            .field("from_env", &self.from_env)
            .finish_non_exhaustive()
    }
}
