//! Handlers that turn callbacks into awaitable replies.

use super::{
    BodyProducer, BytesProducer, CommitHandler, InitiateHandler, ManifestProducer, ResponseHandler,
};
use crate::error::{ResponseError, S3Error, TransferError};
use crate::types::{CommitResult, CompletedPart, InitiateResult, ResponseProperties};
use bytes::Bytes;
use tokio::sync::oneshot;

/// Receiving side of a reply handler.
#[derive(Debug)]
pub struct ReplyReceiver<T> {
    rx: oneshot::Receiver<Result<T, S3Error>>,
}

impl<T> ReplyReceiver<T> {
    /// Wait for the request to complete.
    ///
    /// A request dropped without completing surfaces as
    /// [`TransferError::UploadAborted`].
    pub async fn recv(self) -> Result<T, S3Error> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(S3Error::Transfer(TransferError::UploadAborted {
                reason: "request was dropped before completing".to_string(),
            })),
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    tx: Option<oneshot::Sender<Result<T, S3Error>>>,
}

impl<T> Slot<T> {
    fn new() -> (Self, ReplyReceiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, ReplyReceiver { rx })
    }

    fn send(&mut self, value: Result<T, S3Error>) {
        if let Some(tx) = self.tx.take() {
            // The caller may have stopped waiting.
            let _ = tx.send(value);
        }
    }
}

/// Replies with the parsed Initiate result, or the failure.
#[derive(Debug)]
pub struct InitiateReply {
    slot: Slot<InitiateResult>,
}

impl InitiateReply {
    /// Create the handler and its receiver.
    pub fn new() -> (Self, ReplyReceiver<InitiateResult>) {
        let (slot, rx) = Slot::new();
        (Self { slot }, rx)
    }
}

impl ResponseHandler for InitiateReply {
    fn on_complete(&mut self, outcome: Result<(), S3Error>) {
        if let Err(e) = outcome {
            self.slot.send(Err(e));
        }
    }
}

impl InitiateHandler for InitiateReply {
    fn on_initiated(&mut self, result: InitiateResult) {
        self.slot.send(Ok(result));
    }
}

/// Uploads an in-memory part and replies with its [`CompletedPart`].
#[derive(Debug)]
pub struct PartReply {
    part_number: u32,
    producer: BytesProducer,
    etag: Option<String>,
    slot: Slot<CompletedPart>,
}

impl PartReply {
    /// Create the handler for part `part_number` with body `producer`.
    pub fn new(part_number: u32, producer: BytesProducer) -> (Self, ReplyReceiver<CompletedPart>) {
        let (slot, rx) = Slot::new();
        (
            Self {
                part_number,
                producer,
                etag: None,
                slot,
            },
            rx,
        )
    }
}

impl ResponseHandler for PartReply {
    fn on_properties(&mut self, properties: &ResponseProperties) -> Result<(), S3Error> {
        self.etag = properties.etag.clone();
        Ok(())
    }

    fn on_complete(&mut self, outcome: Result<(), S3Error>) {
        let reply = outcome.and_then(|()| {
            self.etag
                .take()
                .map(|etag| CompletedPart::new(self.part_number, etag))
                .ok_or_else(|| {
                    S3Error::Response(ResponseError::MissingField {
                        field: "ETag".to_string(),
                    })
                })
        });
        self.slot.send(reply);
    }
}

impl BodyProducer for PartReply {
    fn produce(&mut self, buf: &mut [u8]) -> Result<usize, S3Error> {
        self.producer.produce(buf)
    }

    fn take_bytes(&mut self) -> Option<Bytes> {
        self.producer.take_bytes()
    }
}

/// Sends a manifest and replies with the parsed Commit result.
#[derive(Debug)]
pub struct CommitReply {
    producer: ManifestProducer,
    slot: Slot<CommitResult>,
}

impl CommitReply {
    /// Create the handler for a commit of `producer`'s manifest.
    pub fn new(producer: ManifestProducer) -> (Self, ReplyReceiver<CommitResult>) {
        let (slot, rx) = Slot::new();
        (Self { producer, slot }, rx)
    }
}

impl ResponseHandler for CommitReply {
    fn on_complete(&mut self, outcome: Result<(), S3Error>) {
        if let Err(e) = outcome {
            self.slot.send(Err(e));
        }
    }
}

impl BodyProducer for CommitReply {
    fn produce(&mut self, buf: &mut [u8]) -> Result<usize, S3Error> {
        self.producer.produce(buf)
    }

    fn take_bytes(&mut self) -> Option<Bytes> {
        self.producer.take_bytes()
    }
}

impl CommitHandler for CommitReply {
    fn on_committed(&mut self, result: CommitResult) {
        self.slot.send(Ok(result));
    }
}

/// Replies with the outcome of an Abort.
#[derive(Debug)]
pub struct AbortReply {
    slot: Slot<()>,
}

impl AbortReply {
    /// Create the handler and its receiver.
    pub fn new() -> (Self, ReplyReceiver<()>) {
        let (slot, rx) = Slot::new();
        (Self { slot }, rx)
    }
}

impl ResponseHandler for AbortReply {
    fn on_complete(&mut self, outcome: Result<(), S3Error>) {
        self.slot.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initiate_reply_success() {
        let (mut handler, rx) = InitiateReply::new();
        handler.on_complete(Ok(()));
        handler.on_initiated(InitiateResult {
            upload_id: "U1".into(),
            truncated: false,
        });
        assert_eq!(rx.recv().await.unwrap().upload_id, "U1");
    }

    #[tokio::test]
    async fn test_failure_wins_over_parsed_result() {
        let (mut handler, rx) = InitiateReply::new();
        handler.on_complete(Err(S3Error::Transfer(TransferError::UploadAborted {
            reason: "test".into(),
        })));
        handler.on_initiated(InitiateResult::default());
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_part_reply_requires_etag() {
        let (mut handler, rx) = PartReply::new(3, BytesProducer::new(&b"abc"[..]));
        handler.on_complete(Ok(()));
        assert!(matches!(
            rx.recv().await,
            Err(S3Error::Response(ResponseError::MissingField { .. }))
        ));

        let (mut handler, rx) = PartReply::new(3, BytesProducer::new(&b"abc"[..]));
        handler
            .on_properties(&ResponseProperties {
                etag: Some("\"e3\"".into()),
                ..Default::default()
            })
            .unwrap();
        handler.on_complete(Ok(()));
        assert_eq!(rx.recv().await.unwrap(), CompletedPart::new(3, "\"e3\""));
    }

    #[tokio::test]
    async fn test_dropped_handler_is_aborted() {
        let (handler, rx) = AbortReply::new();
        drop(handler);
        assert!(matches!(
            rx.recv().await,
            Err(S3Error::Transfer(TransferError::UploadAborted { .. }))
        ));
    }
}
