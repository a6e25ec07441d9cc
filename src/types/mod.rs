//! Types shared by the multipart operations.

mod bucket;
mod multipart;
mod properties;

pub use bucket::{BucketContext, Protocol, UriStyle};
pub use multipart::{
    part_sub_resource, upload_sub_resource, CommitResult, CompletedPart, InitiateResult,
    PartDescriptor, UploadSession, INITIATE_SUB_RESOURCE,
};
pub use properties::{
    ByteRange, CannedAcl, GetConditions, PutProperties, ResponseProperties,
    ServerSideEncryption, StorageClass,
};
