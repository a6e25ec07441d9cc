//! Caller-side capabilities of the multipart operations.
//!
//! Each operation takes one handler value implementing the traits it needs.
//! The handler is also where callers keep their own per-request data: it is
//! moved into the request and handed back through the callbacks.
//!
//! | Operation | Handler bound |
//! |---|---|
//! | Initiate | [`InitiateHandler`] |
//! | UploadPart | [`UploadPartHandler`] (`ResponseHandler + BodyProducer`) |
//! | Commit | [`CommitHandler`] |
//! | Abort | [`ResponseHandler`] |

mod producers;
mod reply;

pub use producers::{BytesProducer, ManifestProducer};
pub use reply::{AbortReply, CommitReply, InitiateReply, PartReply, ReplyReceiver};

use crate::error::S3Error;
use bytes::Bytes;
use crate::types::{CommitResult, InitiateResult, ResponseProperties};

/// Completion and property sink shared by every operation.
pub trait ResponseHandler: Send {
    /// Response properties, reported before any body data.
    fn on_properties(&mut self, _properties: &ResponseProperties) -> Result<(), S3Error> {
        Ok(())
    }

    /// Outcome of the request. Called exactly once.
    fn on_complete(&mut self, outcome: Result<(), S3Error>);
}

/// Source of request body bytes.
pub trait BodyProducer: Send {
    /// Fill `buf` and return the number of bytes written.
    fn produce(&mut self, buf: &mut [u8]) -> Result<usize, S3Error>;

    /// The rest of the body in one piece, when it is already in memory.
    /// Producers returning `None` are drained through [`produce`](Self::produce).
    fn take_bytes(&mut self) -> Option<Bytes> {
        None
    }
}

/// Handler of an Initiate request.
pub trait InitiateHandler: ResponseHandler {
    /// Parsed response, delivered right after [`ResponseHandler::on_complete`].
    fn on_initiated(&mut self, result: InitiateResult);
}

/// Handler of an UploadPart request. The part ETag arrives through
/// [`ResponseHandler::on_properties`].
pub trait UploadPartHandler: ResponseHandler + BodyProducer {}

impl<T: ResponseHandler + BodyProducer> UploadPartHandler for T {}

/// Handler of a Commit request; produces the manifest body.
pub trait CommitHandler: ResponseHandler + BodyProducer {
    /// Parsed response, delivered right after [`ResponseHandler::on_complete`].
    fn on_committed(&mut self, result: CommitResult);
}
