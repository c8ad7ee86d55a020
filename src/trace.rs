//! Request lifecycle tracing.
//!
//! A client carries a list of [`TraceHandler`]s, frozen when it is built.
//! Each request clones the list into per-request [`Trace`]s so every
//! handler gets its own mutable [`TraceContext`]. Events fire in handler
//! registration order, awaited one at a time, and a handler error fails the
//! request it was observing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Method};
use url::Url;

use crate::connect::{BoxError, BoxFuture};
use crate::{Error, Response};

/// Per-handler, per-request mutable state.
///
/// `request_ctx` is the caller-supplied correlation value, shared by every
/// handler of the request. `state` is private to one handler, typically set
/// in `on_request_start` and read back in the end or exception event.
pub struct TraceContext {
    request_ctx: Option<Arc<dyn Any + Send + Sync>>,
    state: Option<Box<dyn Any + Send>>,
}

impl TraceContext {
    pub(crate) fn new(request_ctx: Option<Arc<dyn Any + Send + Sync>>) -> TraceContext {
        TraceContext {
            request_ctx,
            state: None,
        }
    }

    pub fn request_ctx(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.request_ctx.as_ref()
    }

    pub fn set_state(&mut self, state: Box<dyn Any + Send>) {
        self.state = Some(state);
    }

    pub fn state(&self) -> Option<&(dyn Any + Send)> {
        self.state.as_deref()
    }

    pub fn state_mut(&mut self) -> Option<&mut (dyn Any + Send)> {
        self.state.as_deref_mut()
    }
}

impl fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TraceContext")
            .field("request_ctx", &self.request_ctx.is_some())
            .field("state", &self.state.is_some())
            .finish()
    }
}

/// A request is about to acquire a connection.
#[derive(Debug)]
pub struct RequestStart<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub headers: &'a HeaderMap,
}

/// A redirect response arrived and is about to be followed (or to exhaust
/// the redirect limit).
#[derive(Debug)]
pub struct RequestRedirect<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub headers: &'a HeaderMap,
    pub response: &'a Response,
}

/// The final response head arrived.
#[derive(Debug)]
pub struct RequestEnd<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub headers: &'a HeaderMap,
    pub response: &'a Response,
}

/// The request failed after its start event had fired.
#[derive(Debug)]
pub struct RequestException<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub headers: &'a HeaderMap,
    pub error: &'a Error,
}

/// Observes the lifecycle of requests. All callbacks default to no-ops.
pub trait TraceHandler: Send + Sync {
    fn on_request_start<'a>(
        &'a self,
        _ctx: &'a mut TraceContext,
        _event: &'a RequestStart<'a>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async { Ok(()) })
    }

    fn on_request_redirect<'a>(
        &'a self,
        _ctx: &'a mut TraceContext,
        _event: &'a RequestRedirect<'a>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async { Ok(()) })
    }

    fn on_request_end<'a>(
        &'a self,
        _ctx: &'a mut TraceContext,
        _event: &'a RequestEnd<'a>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async { Ok(()) })
    }

    fn on_request_exception<'a>(
        &'a self,
        _ctx: &'a mut TraceContext,
        _event: &'a RequestException<'a>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async { Ok(()) })
    }
}

/// One handler bound to one request.
pub(crate) struct Trace {
    handler: Arc<dyn TraceHandler>,
    ctx: TraceContext,
}

impl Trace {
    pub(crate) fn new(handler: Arc<dyn TraceHandler>, ctx: TraceContext) -> Trace {
        Trace { handler, ctx }
    }

    pub(crate) async fn request_start(
        &mut self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<(), BoxError> {
        let event = RequestStart {
            method,
            url,
            headers,
        };
        self.handler.on_request_start(&mut self.ctx, &event).await
    }

    pub(crate) async fn request_redirect(
        &mut self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        response: &Response,
    ) -> Result<(), BoxError> {
        let event = RequestRedirect {
            method,
            url,
            headers,
            response,
        };
        self.handler
            .on_request_redirect(&mut self.ctx, &event)
            .await
    }

    pub(crate) async fn request_end(
        &mut self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        response: &Response,
    ) -> Result<(), BoxError> {
        let event = RequestEnd {
            method,
            url,
            headers,
            response,
        };
        self.handler.on_request_end(&mut self.ctx, &event).await
    }

    pub(crate) async fn request_exception(
        &mut self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        error: &Error,
    ) -> Result<(), BoxError> {
        let event = RequestException {
            method,
            url,
            headers,
            error,
        };
        self.handler
            .on_request_exception(&mut self.ctx, &event)
            .await
    }
}
