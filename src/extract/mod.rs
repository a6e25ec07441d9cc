//! Extraction of the few response fields the multipart protocol needs.
//!
//! A [`ResponseExtractor`] watches a fixed set of element paths and routes
//! the leaf text reported for them into bounded [`FieldBuffer`]s. Every other
//! path is ignored, so new elements in server responses are harmless.

pub mod field;

pub use field::{FieldBuffer, DEFAULT_FIELD_CAPACITY};

use crate::error::{ResourceError, S3Error};
use crate::types::{CommitResult, InitiateResult};
use crate::xml::LeafTextHandler;
use tracing::warn;

/// Upload id in an Initiate response.
pub const INITIATE_UPLOAD_ID: &str = "InitiateMultipartUploadResult/UploadId";
/// Object location in a Commit response.
pub const COMMIT_LOCATION: &str = "CompleteMultipartUploadResult/Location";
/// Object ETag in a Commit response.
pub const COMMIT_ETAG: &str = "CompleteMultipartUploadResult/ETag";

#[derive(Debug)]
struct WatchedField {
    path: &'static str,
    buffer: FieldBuffer,
    /// Whitespace seen after the last non-whitespace text, not yet stored.
    pending: String,
}

impl WatchedField {
    fn new(path: &'static str, capacity: usize) -> Result<Self, S3Error> {
        Ok(Self {
            path,
            buffer: FieldBuffer::try_with_capacity(capacity)?,
            pending: String::new(),
        })
    }

    /// Append one fragment, returning whether all of it fit.
    ///
    /// Leading whitespace is never stored and trailing whitespace is held
    /// back until more text follows, so padding around a value does not
    /// count against the capacity.
    fn append(&mut self, text: &str) -> bool {
        let text = if self.buffer.is_empty() && self.pending.is_empty() {
            text.trim_start()
        } else {
            text
        };
        let content = text.trim_end();
        let trailing = &text[content.len()..];

        if content.is_empty() {
            self.hold(trailing);
            return true;
        }

        let pending = std::mem::take(&mut self.pending);
        let fits = self.buffer.append(&pending) && self.buffer.append(content);
        self.hold(trailing);
        fits
    }

    /// Keep whitespace for later. Anything beyond what the buffer could still
    /// take is dropped, leaving enough to overflow it when flushed.
    fn hold(&mut self, whitespace: &str) {
        let limit = self.buffer.max_len() - self.buffer.len() + 4;
        for c in whitespace.chars() {
            if self.pending.len() + c.len_utf8() > limit {
                break;
            }
            self.pending.push(c);
        }
    }
}

/// Path-keyed leaf-text watcher.
#[derive(Debug)]
pub struct ResponseExtractor {
    fields: Vec<WatchedField>,
}

impl ResponseExtractor {
    /// Watch `paths`, each with its own buffer of `capacity` bytes.
    pub fn try_new(paths: &[&'static str], capacity: usize) -> Result<Self, S3Error> {
        let mut fields = Vec::new();
        fields
            .try_reserve_exact(paths.len())
            .map_err(|_| ResourceError::OutOfMemory {
                requested: paths.len() * std::mem::size_of::<WatchedField>(),
                purpose: "response extractor",
            })?;
        for &path in paths {
            fields.push(WatchedField::new(path, capacity)?);
        }
        Ok(Self { fields })
    }

    /// Extractor for an Initiate response.
    pub fn for_initiate(capacity: usize) -> Result<Self, S3Error> {
        Self::try_new(&[INITIATE_UPLOAD_ID], capacity)
    }

    /// Extractor for a Commit response.
    pub fn for_commit(capacity: usize) -> Result<Self, S3Error> {
        Self::try_new(&[COMMIT_LOCATION, COMMIT_ETAG], capacity)
    }

    /// Buffer of a watched path.
    pub fn field(&self, path: &str) -> Option<&FieldBuffer> {
        self.fields.iter().find(|f| f.path == path).map(|f| &f.buffer)
    }

    /// Whether any watched field was truncated.
    pub fn any_truncated(&self) -> bool {
        self.fields.iter().any(|f| f.buffer.is_truncated())
    }

    fn take(&mut self, path: &str) -> (String, bool) {
        match self.fields.iter().position(|f| f.path == path) {
            Some(index) => {
                let (value, truncated) = self.fields.swap_remove(index).buffer.into_parts();
                (value.trim().to_string(), truncated)
            }
            None => (String::new(), false),
        }
    }

    /// Build the Initiate result. A missing upload id yields an empty string.
    pub fn into_initiate_result(mut self) -> InitiateResult {
        let (upload_id, truncated) = self.take(INITIATE_UPLOAD_ID);
        InitiateResult {
            upload_id,
            truncated,
        }
    }

    /// Build the Commit result. Missing fields yield empty strings.
    pub fn into_commit_result(mut self) -> CommitResult {
        let (location, location_truncated) = self.take(COMMIT_LOCATION);
        let (etag, etag_truncated) = self.take(COMMIT_ETAG);
        CommitResult {
            location,
            etag,
            location_truncated,
            etag_truncated,
        }
    }
}

impl LeafTextHandler for ResponseExtractor {
    fn on_leaf_text(&mut self, path: &str, text: &str) -> Result<(), S3Error> {
        let Some(field) = self.fields.iter_mut().find(|f| f.path == path) else {
            return Ok(());
        };

        let was_truncated = field.buffer.is_truncated();
        if !field.append(text) && !was_truncated {
            warn!(
                path = field.path,
                capacity = field.buffer.capacity(),
                "response field exceeds capacity, value truncated"
            );
        }
        Ok(())
    }
}
