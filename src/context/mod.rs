//! Per-request state of Initiate and Commit.
//!
//! A context owns the caller's handler and the streaming extractor for one
//! request. It is moved into the engine as the request's callbacks and
//! consumed by `on_complete`, which forwards the outcome and the parsed
//! result to the handler and then drops everything. Because completion takes
//! the context by value, a context can be completed at most once and cannot
//! be touched afterwards.
//!
//! Lifecycle: `Created -> Submitted -> Receiving* -> Completed -> released`.
//! Release is recorded when the context is dropped, so a context an engine
//! discards without completing is still released exactly once and is
//! counted as abandoned.

use crate::error::S3Error;
use crate::extract::ResponseExtractor;
use crate::handlers::{CommitHandler, InitiateHandler, ResponseHandler, UploadPartHandler};
use crate::request::RequestCallbacks;
use crate::types::ResponseProperties;
use crate::xml::XmlStream;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Allocation and release counters shared by a service and its contexts.
#[derive(Debug, Default)]
pub struct ContextStats {
    allocated: AtomicU64,
    released: AtomicU64,
    abandoned: AtomicU64,
}

impl ContextStats {
    /// Fresh counters.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Contexts created so far.
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::SeqCst)
    }

    /// Contexts dropped so far.
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Contexts dropped without having been completed.
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Contexts currently alive.
    pub fn live(&self) -> u64 {
        self.allocated().saturating_sub(self.released())
    }
}

/// Which operation a context serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Initiate.
    Initiate,
    /// Commit.
    Commit,
}

impl ContextKind {
    fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Initiate => "initiate",
            ContextKind::Commit => "commit",
        }
    }
}

/// Lifecycle state of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Allocated, not yet handed to an engine.
    Created,
    /// Handed to an engine.
    Submitted,
    /// At least one body chunk delivered.
    Receiving,
    /// Completion delivered.
    Completed,
}

/// Lifecycle bookkeeping. Dropping it records the release.
#[derive(Debug)]
pub struct ContextLifecycle {
    id: u64,
    kind: ContextKind,
    state: ContextState,
    stats: Arc<ContextStats>,
}

impl ContextLifecycle {
    fn new(kind: ContextKind, stats: Arc<ContextStats>) -> Self {
        let id = stats.allocated.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(context_id = id, kind = kind.as_str(), "context created");
        Self {
            id,
            kind,
            state: ContextState::Created,
            stats,
        }
    }

    /// Context id, unique per [`ContextStats`].
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    fn submitted(&mut self) {
        self.state = ContextState::Submitted;
    }

    fn receiving(&mut self) {
        if self.state != ContextState::Receiving {
            trace!(context_id = self.id, kind = self.kind.as_str(), "receiving body");
            self.state = ContextState::Receiving;
        }
    }

    fn completed(&mut self) {
        self.state = ContextState::Completed;
    }
}

impl Drop for ContextLifecycle {
    fn drop(&mut self) {
        if self.state != ContextState::Completed {
            self.stats.abandoned.fetch_add(1, Ordering::SeqCst);
            warn!(
                context_id = self.id,
                kind = self.kind.as_str(),
                state = ?self.state,
                "context released without completion"
            );
        }
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        trace!(context_id = self.id, kind = self.kind.as_str(), "context released");
    }
}

/// State of one Initiate request.
#[derive(Debug)]
pub struct InitiateContext<H> {
    handler: H,
    stream: XmlStream<ResponseExtractor>,
    lifecycle: ContextLifecycle,
}

impl<H: InitiateHandler> InitiateContext<H> {
    /// Allocate a context. On failure the handler is handed back untouched.
    pub fn try_new(
        handler: H,
        field_capacity: usize,
        stats: Arc<ContextStats>,
    ) -> Result<Self, (H, S3Error)> {
        let extractor = match ResponseExtractor::for_initiate(field_capacity) {
            Ok(extractor) => extractor,
            Err(e) => return Err((handler, e)),
        };
        Ok(Self {
            handler,
            stream: XmlStream::new(extractor),
            lifecycle: ContextLifecycle::new(ContextKind::Initiate, stats),
        })
    }

    /// Lifecycle bookkeeping.
    pub fn lifecycle(&self) -> &ContextLifecycle {
        &self.lifecycle
    }

    /// Mark the context as handed to an engine.
    pub fn submit(mut self) -> Self {
        self.lifecycle.submitted();
        self
    }
}

impl<H: InitiateHandler> RequestCallbacks for InitiateContext<H> {
    fn on_properties(&mut self, properties: &ResponseProperties) -> Result<(), S3Error> {
        self.handler.on_properties(properties)
    }

    fn on_body(&mut self, chunk: &[u8]) -> Result<(), S3Error> {
        self.lifecycle.receiving();
        self.stream.feed(chunk)
    }

    fn on_complete(self: Box<Self>, outcome: Result<(), S3Error>) {
        let InitiateContext {
            mut handler,
            stream,
            mut lifecycle,
        } = *self;
        lifecycle.completed();

        let end = stream.finish();
        if outcome.is_ok() && !end.complete {
            debug!(context_id = lifecycle.id(), "initiate response ended early");
        }
        let result = end.handler.into_initiate_result();
        if result.truncated {
            warn!(context_id = lifecycle.id(), "upload id truncated to field capacity");
        }

        debug!(
            context_id = lifecycle.id(),
            success = outcome.is_ok(),
            upload_id = %result.upload_id,
            "initiate completed"
        );
        handler.on_complete(outcome);
        handler.on_initiated(result);
        drop(handler);
        drop(lifecycle);
    }
}

/// State of one Commit request.
#[derive(Debug)]
pub struct CommitContext<H> {
    handler: H,
    stream: XmlStream<ResponseExtractor>,
    lifecycle: ContextLifecycle,
}

impl<H: CommitHandler> CommitContext<H> {
    /// Allocate a context. On failure the handler is handed back untouched.
    pub fn try_new(
        handler: H,
        field_capacity: usize,
        stats: Arc<ContextStats>,
    ) -> Result<Self, (H, S3Error)> {
        let extractor = match ResponseExtractor::for_commit(field_capacity) {
            Ok(extractor) => extractor,
            Err(e) => return Err((handler, e)),
        };
        Ok(Self {
            handler,
            stream: XmlStream::new(extractor),
            lifecycle: ContextLifecycle::new(ContextKind::Commit, stats),
        })
    }

    /// Lifecycle bookkeeping.
    pub fn lifecycle(&self) -> &ContextLifecycle {
        &self.lifecycle
    }

    /// Mark the context as handed to an engine.
    pub fn submit(mut self) -> Self {
        self.lifecycle.submitted();
        self
    }
}

impl<H: CommitHandler> RequestCallbacks for CommitContext<H> {
    fn on_properties(&mut self, properties: &ResponseProperties) -> Result<(), S3Error> {
        self.handler.on_properties(properties)
    }

    fn produce_body(&mut self, buf: &mut [u8]) -> Result<usize, S3Error> {
        self.handler.produce(buf)
    }

    fn take_body(&mut self) -> Option<Bytes> {
        self.handler.take_bytes()
    }

    fn on_body(&mut self, chunk: &[u8]) -> Result<(), S3Error> {
        self.lifecycle.receiving();
        self.stream.feed(chunk)
    }

    fn on_complete(self: Box<Self>, outcome: Result<(), S3Error>) {
        let CommitContext {
            mut handler,
            stream,
            mut lifecycle,
        } = *self;
        lifecycle.completed();

        let end = stream.finish();
        if outcome.is_ok() && !end.complete {
            debug!(context_id = lifecycle.id(), "commit response ended early");
        }
        let result = end.handler.into_commit_result();
        if result.is_truncated() {
            warn!(
                context_id = lifecycle.id(),
                location_truncated = result.location_truncated,
                etag_truncated = result.etag_truncated,
                "commit result truncated to field capacity"
            );
        }

        debug!(
            context_id = lifecycle.id(),
            success = outcome.is_ok(),
            etag = %result.etag,
            "commit completed"
        );
        handler.on_complete(outcome);
        handler.on_committed(result);
        drop(handler);
        drop(lifecycle);
    }
}

/// Stateless adapter routing UploadPart callbacks straight to the handler.
#[derive(Debug)]
pub struct PartForwarder<H> {
    handler: H,
}

impl<H> PartForwarder<H> {
    /// Wrap `handler`.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: UploadPartHandler> RequestCallbacks for PartForwarder<H> {
    fn on_properties(&mut self, properties: &ResponseProperties) -> Result<(), S3Error> {
        self.handler.on_properties(properties)
    }

    fn produce_body(&mut self, buf: &mut [u8]) -> Result<usize, S3Error> {
        self.handler.produce(buf)
    }

    fn take_body(&mut self) -> Option<Bytes> {
        self.handler.take_bytes()
    }

    fn on_complete(mut self: Box<Self>, outcome: Result<(), S3Error>) {
        self.handler.on_complete(outcome);
    }
}

/// Stateless adapter for bodiless requests such as Abort.
#[derive(Debug)]
pub struct Forwarder<H> {
    handler: H,
}

impl<H> Forwarder<H> {
    /// Wrap `handler`.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: ResponseHandler> RequestCallbacks for Forwarder<H> {
    fn on_properties(&mut self, properties: &ResponseProperties) -> Result<(), S3Error> {
        self.handler.on_properties(properties)
    }

    fn on_complete(mut self: Box<Self>, outcome: Result<(), S3Error>) {
        self.handler.on_complete(outcome);
    }
}
