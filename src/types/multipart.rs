//! Values exchanged by the multipart operations.

use super::BucketContext;
use serde::{Deserialize, Serialize};

/// Sub-resource selecting the Initiate operation.
pub const INITIATE_SUB_RESOURCE: &str = "uploads";

/// Sub-resource of an UploadPart request: `partNumber=<N>&uploadId=<id>`.
///
/// The part number is plain decimal and the upload id is used verbatim.
pub fn part_sub_resource(part_number: u32, upload_id: &str) -> String {
    format!("partNumber={}&uploadId={}", part_number, upload_id)
}

/// Sub-resource of Commit and Abort requests: `uploadId=<id>`.
pub fn upload_sub_resource(upload_id: &str) -> String {
    format!("uploadId={}", upload_id)
}

/// One multipart upload in progress.
///
/// Created from a successful Initiate. It is a plain value: nothing needs to
/// be released when it goes away.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Bucket the object is uploaded to.
    pub target: BucketContext,
    /// Object key.
    pub key: String,
    /// Server-issued upload id.
    pub upload_id: String,
}

impl UploadSession {
    /// Bundle a target, key and upload id.
    pub fn new(
        target: BucketContext,
        key: impl Into<String>,
        upload_id: impl Into<String>,
    ) -> Self {
        Self {
            target,
            key: key.into(),
            upload_id: upload_id.into(),
        }
    }

    /// Descriptor for part `sequence_number` of this upload.
    pub fn part(&self, sequence_number: u32, content_length: u64) -> PartDescriptor {
        PartDescriptor {
            sequence_number,
            upload_id: self.upload_id.clone(),
            content_length,
        }
    }
}

/// Position and size of one part.
///
/// Sequence numbers need not be contiguous; keeping them unique within an
/// upload is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// Part number, `1..=10000`.
    pub sequence_number: u32,
    /// Upload the part belongs to.
    pub upload_id: String,
    /// Exact number of body bytes.
    pub content_length: u64,
}

impl PartDescriptor {
    /// Sub-resource string for this part.
    pub fn sub_resource(&self) -> String {
        part_sub_resource(self.sequence_number, &self.upload_id)
    }
}

/// Parsed Initiate response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitiateResult {
    /// Upload id; empty if the response did not contain one.
    pub upload_id: String,
    /// Whether the upload id was cut to the field capacity.
    pub truncated: bool,
}

/// Parsed Commit response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResult {
    /// Location of the assembled object.
    pub location: String,
    /// ETag of the assembled object.
    pub etag: String,
    /// Whether `location` was cut to the field capacity.
    pub location_truncated: bool,
    /// Whether `etag` was cut to the field capacity.
    pub etag_truncated: bool,
}

impl CommitResult {
    /// Whether any field was truncated.
    pub fn is_truncated(&self) -> bool {
        self.location_truncated || self.etag_truncated
    }
}

/// A part as listed in the commit manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// Part number.
    pub part_number: u32,
    /// ETag returned by UploadPart.
    pub etag: String,
}

impl CompletedPart {
    /// Create a completed part.
    pub fn new(part_number: u32, etag: impl Into<String>) -> Self {
        Self {
            part_number,
            etag: etag.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AwsCredentials;

    #[test]
    fn test_part_sub_resource_is_exact() {
        assert_eq!(part_sub_resource(7, "U1"), "partNumber=7&uploadId=U1");
        assert_eq!(part_sub_resource(10_000, "a.b-c"), "partNumber=10000&uploadId=a.b-c");
        assert_eq!(upload_sub_resource("U1"), "uploadId=U1");
    }

    #[test]
    fn test_session_part() {
        let session = UploadSession::new(
            BucketContext::new("b", AwsCredentials::new("AKID", "SECRET")),
            "k",
            "U1",
        );
        let part = session.part(7, 1024);
        assert_eq!(part.sub_resource(), "partNumber=7&uploadId=U1");
        assert_eq!(part.content_length, 1024);
    }
}
