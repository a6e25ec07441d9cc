//! Request and response properties.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// S3 storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageClass {
    /// Standard storage for frequently accessed data.
    #[default]
    Standard,
    /// Reduced redundancy storage.
    ReducedRedundancy,
    /// Standard-IA for infrequently accessed data.
    StandardIa,
    /// One Zone-IA.
    OnezoneIa,
    /// Intelligent-Tiering.
    IntelligentTiering,
    /// Glacier Instant Retrieval.
    GlacierInstantRetrieval,
    /// Glacier Flexible Retrieval.
    Glacier,
    /// Glacier Deep Archive.
    DeepArchive,
}

impl StorageClass {
    /// Returns the S3 API string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Standard => "STANDARD",
            StorageClass::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClass::StandardIa => "STANDARD_IA",
            StorageClass::OnezoneIa => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClass::GlacierInstantRetrieval => "GLACIER_IR",
            StorageClass::Glacier => "GLACIER",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
        }
    }
}

/// Canned ACL applied to the object created by the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CannedAcl {
    /// Owner gets FULL_CONTROL.
    #[default]
    Private,
    /// Everyone else gets READ.
    PublicRead,
    /// Everyone else gets READ and WRITE.
    PublicReadWrite,
    /// Authenticated users get READ.
    AuthenticatedRead,
    /// Bucket owner gets READ.
    BucketOwnerRead,
    /// Bucket owner gets FULL_CONTROL.
    BucketOwnerFullControl,
}

impl CannedAcl {
    /// Returns the `x-amz-acl` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Server-side encryption requested for the object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerSideEncryption {
    /// S3-managed keys (SSE-S3).
    Aes256,
    /// KMS-managed keys (SSE-KMS).
    AwsKms {
        /// KMS key ID; the account default when absent.
        key_id: Option<String>,
    },
}

impl ServerSideEncryption {
    /// Returns the `x-amz-server-side-encryption` header value.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ServerSideEncryption::Aes256 => "AES256",
            ServerSideEncryption::AwsKms { .. } => "aws:kms",
        }
    }
}

/// Properties sent with Initiate and UploadPart requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutProperties {
    /// `Content-Type`.
    pub content_type: Option<String>,
    /// Base64 `Content-MD5` of the request body.
    pub md5: Option<String>,
    /// `Cache-Control`.
    pub cache_control: Option<String>,
    /// `Content-Disposition`.
    pub content_disposition: Option<String>,
    /// `Content-Encoding`.
    pub content_encoding: Option<String>,
    /// `Expires`, already formatted as an HTTP date.
    pub expires: Option<String>,
    /// `x-amz-acl`.
    pub canned_acl: Option<CannedAcl>,
    /// `x-amz-storage-class`.
    pub storage_class: Option<StorageClass>,
    /// `x-amz-server-side-encryption`.
    pub server_side_encryption: Option<ServerSideEncryption>,
    /// User metadata, sent as `x-amz-meta-<name>`.
    pub metadata: BTreeMap<String, String>,
}

impl PutProperties {
    /// Empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the body MD5.
    pub fn with_md5(mut self, md5: impl Into<String>) -> Self {
        self.md5 = Some(md5.into());
        self
    }

    /// Set the storage class.
    pub fn with_storage_class(mut self, class: StorageClass) -> Self {
        self.storage_class = Some(class);
        self
    }

    /// Set the canned ACL.
    pub fn with_canned_acl(mut self, acl: CannedAcl) -> Self {
        self.canned_acl = Some(acl);
        self
    }

    /// Request server-side encryption.
    pub fn with_server_side_encryption(mut self, sse: ServerSideEncryption) -> Self {
        self.server_side_encryption = Some(sse);
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Render as request headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        let mut put = |name: &str, value: Option<&str>| {
            if let Some(value) = value {
                headers.push((name.to_string(), value.to_string()));
            }
        };

        put("content-type", self.content_type.as_deref());
        put("content-md5", self.md5.as_deref());
        put("cache-control", self.cache_control.as_deref());
        put("content-disposition", self.content_disposition.as_deref());
        put("content-encoding", self.content_encoding.as_deref());
        put("expires", self.expires.as_deref());
        put("x-amz-acl", self.canned_acl.map(|a| a.as_str()));
        put("x-amz-storage-class", self.storage_class.map(|c| c.as_str()));
        put(
            "x-amz-server-side-encryption",
            self.server_side_encryption.as_ref().map(|s| s.as_header_value()),
        );
        if let Some(ServerSideEncryption::AwsKms { key_id: Some(key) }) =
            &self.server_side_encryption
        {
            put("x-amz-server-side-encryption-aws-kms-key-id", Some(key.as_str()));
        }

        for (name, value) in &self.metadata {
            headers.push((format!("x-amz-meta-{}", name.to_lowercase()), value.clone()));
        }
        headers
    }
}

/// Conditional request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetConditions {
    /// `If-Modified-Since`, as an HTTP date.
    pub if_modified_since: Option<String>,
    /// `If-Unmodified-Since`, as an HTTP date.
    pub if_unmodified_since: Option<String>,
    /// `If-Match`.
    pub if_match: Option<String>,
    /// `If-None-Match`.
    pub if_none_match: Option<String>,
}

impl GetConditions {
    /// Render as request headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        [
            ("if-modified-since", &self.if_modified_since),
            ("if-unmodified-since", &self.if_unmodified_since),
            ("if-match", &self.if_match),
            ("if-none-match", &self.if_none_match),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect()
    }
}

/// Inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte.
    pub start: u64,
    /// Number of bytes; to the end of the object when zero.
    pub count: u64,
}

impl ByteRange {
    /// `Range` header value.
    pub fn to_header_value(&self) -> String {
        if self.count == 0 {
            format!("bytes={}-", self.start)
        } else {
            format!("bytes={}-{}", self.start, self.start + self.count - 1)
        }
    }
}

/// Properties reported by the engine for a successful response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseProperties {
    /// `x-amz-request-id`.
    pub request_id: Option<String>,
    /// `x-amz-id-2`.
    pub request_id_2: Option<String>,
    /// `Content-Type`.
    pub content_type: Option<String>,
    /// `Content-Length`.
    pub content_length: Option<u64>,
    /// `Server`.
    pub server: Option<String>,
    /// `ETag`; for UploadPart this is the part's fingerprint.
    pub etag: Option<String>,
    /// `Last-Modified`.
    pub last_modified: Option<String>,
    /// `x-amz-meta-*` headers, names without the prefix.
    pub metadata: BTreeMap<String, String>,
    /// Whether `x-amz-server-side-encryption` was present.
    pub uses_server_side_encryption: bool,
}

impl ResponseProperties {
    /// Collect properties from response headers. Header names are matched
    /// case-insensitively.
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        let mut props = ResponseProperties::default();
        for (name, value) in headers {
            let lower = name.to_ascii_lowercase();
            let value = value.clone();
            match lower.as_str() {
                "x-amz-request-id" => props.request_id = Some(value),
                "x-amz-id-2" => props.request_id_2 = Some(value),
                "content-type" => props.content_type = Some(value),
                "content-length" => props.content_length = value.trim().parse().ok(),
                "server" => props.server = Some(value),
                "etag" => props.etag = Some(value),
                "last-modified" => props.last_modified = Some(value),
                "x-amz-server-side-encryption" => props.uses_server_side_encryption = true,
                _ => {
                    if let Some(meta) = lower.strip_prefix("x-amz-meta-") {
                        props.metadata.insert(meta.to_string(), value);
                    }
                }
            }
        }
        props
    }
}
