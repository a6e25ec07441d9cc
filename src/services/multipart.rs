//! Multipart upload operations.

use crate::config::{MultipartConfig, MAX_PART_NUMBER};
use crate::context::{CommitContext, ContextStats, Forwarder, InitiateContext, PartForwarder};
use crate::engine::RequestEngine;
use crate::error::{MultipartError, S3Error};
use crate::handlers::{CommitHandler, InitiateHandler, ResponseHandler, UploadPartHandler};
use crate::request::{HttpMethod, RequestDescriptor};
use crate::types::{
    upload_sub_resource, BucketContext, PartDescriptor, PutProperties, INITIATE_SUB_RESOURCE,
};
use std::sync::Arc;
use tracing::debug;

/// Builds and submits the requests of a multipart upload.
///
/// Every operation hands its request to a [`RequestEngine`] and returns
/// immediately; results reach the handler through its callbacks. Failures
/// that happen before submission are reported through the handler too, so a
/// handler always sees exactly one `on_complete`.
#[derive(Debug, Clone)]
pub struct MultipartService {
    config: Arc<MultipartConfig>,
    stats: Arc<ContextStats>,
}

impl MultipartService {
    /// Create a new multipart service.
    pub fn new(config: Arc<MultipartConfig>) -> Self {
        Self {
            config,
            stats: ContextStats::new(),
        }
    }

    /// Counters of the Initiate and Commit contexts this service created.
    pub fn context_stats(&self) -> &Arc<ContextStats> {
        &self.stats
    }

    /// Start a multipart upload of `key`.
    ///
    /// Sends `POST /<key>?uploads` with the given properties. The upload id
    /// arrives through [`InitiateHandler::on_initiated`].
    pub fn initiate<H>(
        &self,
        target: &BucketContext,
        key: &str,
        properties: Option<PutProperties>,
        handler: H,
        engine: &dyn RequestEngine,
    ) where
        H: InitiateHandler + 'static,
    {
        let capacity = self.config.field_capacity;
        let context = match InitiateContext::try_new(handler, capacity, self.stats.clone()) {
            Ok(context) => context.submit(),
            Err((mut handler, e)) => {
                handler.on_complete(Err(e));
                return;
            }
        };

        debug!(
            bucket = %target.bucket_name(),
            key = %key,
            context_id = context.lifecycle().id(),
            "submitting initiate"
        );
        let request = RequestDescriptor::new(
            HttpMethod::Post,
            target.clone(),
            key,
            Box::new(context),
        )
        .with_sub_resource(INITIATE_SUB_RESOURCE)
        .with_put_properties(properties);
        engine.perform(request);
    }

    /// Upload one part.
    ///
    /// Sends `PUT /<key>?partNumber=<N>&uploadId=<id>` with a body of exactly
    /// `part.content_length` bytes pulled from the handler. The part's ETag
    /// arrives through [`ResponseHandler::on_properties`].
    pub fn upload_part<H>(
        &self,
        target: &BucketContext,
        key: &str,
        part: &PartDescriptor,
        properties: Option<PutProperties>,
        mut handler: H,
        engine: &dyn RequestEngine,
    ) where
        H: UploadPartHandler + 'static,
    {
        if let Err(e) = check_part_number(part.sequence_number) {
            handler.on_complete(Err(e));
            return;
        }

        debug!(
            bucket = %target.bucket_name(),
            key = %key,
            part_number = part.sequence_number,
            content_length = part.content_length,
            "submitting part"
        );
        let request = RequestDescriptor::new(
            HttpMethod::Put,
            target.clone(),
            key,
            Box::new(PartForwarder::new(handler)),
        )
        .with_sub_resource(part.sub_resource())
        .with_put_properties(properties)
        .with_upload_size(part.content_length);
        engine.perform(request);
    }

    /// Complete a multipart upload.
    ///
    /// Sends `POST /<key>?uploadId=<id>` with a manifest of exactly
    /// `content_length` bytes pulled from the handler. The object's location
    /// and ETag arrive through [`CommitHandler::on_committed`].
    pub fn commit<H>(
        &self,
        target: &BucketContext,
        key: &str,
        upload_id: &str,
        content_length: u64,
        handler: H,
        engine: &dyn RequestEngine,
    ) where
        H: CommitHandler + 'static,
    {
        let capacity = self.config.field_capacity;
        let context = match CommitContext::try_new(handler, capacity, self.stats.clone()) {
            Ok(context) => context.submit(),
            Err((mut handler, e)) => {
                handler.on_complete(Err(e));
                return;
            }
        };

        debug!(
            bucket = %target.bucket_name(),
            key = %key,
            upload_id = %upload_id,
            context_id = context.lifecycle().id(),
            "submitting commit"
        );
        let request = RequestDescriptor::new(
            HttpMethod::Post,
            target.clone(),
            key,
            Box::new(context),
        )
        .with_sub_resource(upload_sub_resource(upload_id))
        .with_upload_size(content_length);
        engine.perform(request);
    }

    /// Abandon a multipart upload and discard its parts.
    ///
    /// Sends `DELETE /<key>?uploadId=<id>`.
    pub fn abort<H>(
        &self,
        target: &BucketContext,
        key: &str,
        upload_id: &str,
        handler: H,
        engine: &dyn RequestEngine,
    ) where
        H: ResponseHandler + 'static,
    {
        debug!(
            bucket = %target.bucket_name(),
            key = %key,
            upload_id = %upload_id,
            "submitting abort"
        );
        let request = RequestDescriptor::new(
            HttpMethod::Delete,
            target.clone(),
            key,
            Box::new(Forwarder::new(handler)),
        )
        .with_sub_resource(upload_sub_resource(upload_id));
        engine.perform(request);
    }
}

impl Default for MultipartService {
    fn default() -> Self {
        Self::new(Arc::new(MultipartConfig::default()))
    }
}

/// Rejects a part number outside `1..=10000`.
pub(crate) fn check_part_number(part_number: u32) -> Result<(), S3Error> {
    if part_number == 0 || part_number > MAX_PART_NUMBER {
        return Err(MultipartError::InvalidPartNumber {
            part_number,
            max: MAX_PART_NUMBER,
        }
        .into());
    }
    Ok(())
}
