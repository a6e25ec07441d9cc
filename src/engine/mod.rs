//! Request engines.
//!
//! An engine executes [`RequestDescriptor`]s. It pulls the request body from
//! the descriptor's callbacks, performs the request, and delivers the
//! response back through the same callbacks: properties first, then body
//! chunks in arrival order, then exactly one completion.
//!
//! [`HttpEngine`] performs requests over HTTP on a tokio runtime. The
//! [`MockEngine`](crate::mocks::MockEngine) scripts responses for tests.

mod http;

pub use http::HttpEngine;

use crate::request::RequestDescriptor;
use std::sync::Arc;

/// Executes requests and drives their callbacks.
///
/// `perform` must not block on the request. Every submitted descriptor's
/// callbacks are completed exactly once, or dropped uncompleted if the
/// engine itself is torn down first.
pub trait RequestEngine: Send + Sync {
    /// Submit a request.
    fn perform(&self, request: RequestDescriptor);
}

impl<E: RequestEngine + ?Sized> RequestEngine for Arc<E> {
    fn perform(&self, request: RequestDescriptor) {
        (**self).perform(request)
    }
}

impl<E: RequestEngine + ?Sized> RequestEngine for &E {
    fn perform(&self, request: RequestDescriptor) {
        (**self).perform(request)
    }
}
