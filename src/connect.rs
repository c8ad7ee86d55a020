//! The Connection Provider boundary.
//!
//! This crate orchestrates the request lifecycle; it does not open sockets,
//! pool connections, or speak a wire protocol. All of that lives behind the
//! [`Connector`] and [`Connection`] traits. A provider hands out
//! connections; a connection carries exactly one request/response exchange
//! and is then released back, closed, or detached into a raw transport.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Request, Timeout};

pub use crate::error::BoxError;

/// A boxed dynamic future, as returned by the provider traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Marker for byte streams a detached connection can be reduced to.
pub trait AsyncTransport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncTransport for T {}

/// The raw byte stream underneath a detached connection.
pub type Transport = Box<dyn AsyncTransport>;

/// What the provider should verify about the peer on a TLS connection.
///
/// The orchestrator only carries this setting; establishing TLS is the
/// provider's job. `Context` is an opaque handle for a provider-specific
/// TLS configuration, downcast on the other side of the boundary.
#[derive(Clone)]
pub enum Ssl {
    /// The provider's default certificate validation.
    Default,
    /// Accept any certificate.
    Insecure,
    /// Require the peer certificate to match this digest.
    Fingerprint(Vec<u8>),
    /// A provider-specific TLS configuration.
    Context(Arc<dyn Any + Send + Sync>),
}

impl Default for Ssl {
    fn default() -> Ssl {
        Ssl::Default
    }
}

impl fmt::Debug for Ssl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ssl::Default => f.write_str("Default"),
            Ssl::Insecure => f.write_str("Insecure"),
            Ssl::Fingerprint(digest) => {
                f.debug_tuple("Fingerprint").field(&digest.len()).finish()
            }
            Ssl::Context(_) => f.write_str("Context"),
        }
    }
}

/// How a connection should treat the upcoming response.
#[derive(Debug, Clone, Default)]
pub struct ResponseParams {
    /// The response carries no payload (e.g. the request was a HEAD).
    pub skip_payload: bool,
    /// A missing framing is tolerated by reading until EOF.
    pub read_until_eof: bool,
    /// Content-codings should be decoded transparently.
    pub auto_decompress: bool,
    /// Ceiling on a single read from the peer.
    pub read_timeout: Option<Duration>,
}

/// The status line and headers of a response, before any body bytes.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
}

/// One request/response exchange on an established connection.
///
/// Errors are reported as [`BoxError`]; the orchestrator classifies them.
/// A typed [`Error`][crate::Error] passes through unchanged, an
/// [`io::Error`][std::io::Error] keeps its OS error code, and a
/// [`TimedOut`][crate::TimedOut] marker from `connect` becomes a
/// connect timeout.
pub trait Connection: Send + Sync {
    /// Applies the response-handling knobs before the request is sent.
    fn set_response_params(&mut self, params: ResponseParams);

    /// Writes the request head and body to the peer.
    fn send_request<'a>(&'a mut self, req: &'a Request) -> BoxFuture<'a, Result<(), BoxError>>;

    /// Reads the status line and headers of the response.
    fn read_head<'a>(&'a mut self) -> BoxFuture<'a, Result<ResponseHead, BoxError>>;

    /// Reads the remaining response payload to completion.
    fn read_body<'a>(&'a mut self) -> BoxFuture<'a, Result<Bytes, BoxError>>;

    /// Returns the connection to the provider for reuse.
    fn release(self: Box<Self>);

    /// Tears the connection down without reuse.
    fn close(self: Box<Self>);

    /// Surrenders the underlying byte stream, e.g. after a protocol
    /// upgrade. The provider forgets the connection.
    fn detach(self: Box<Self>) -> Transport;
}

/// Hands out connections for requests.
pub trait Connector: Send + Sync + 'static {
    /// Acquires a connection suitable for `req`. The policy's
    /// `sock_connect` ceiling is the provider's to enforce; `connect` is
    /// enforced by the caller around this future.
    fn connect<'a>(
        &'a self,
        req: &'a Request,
        timeout: &'a Timeout,
    ) -> BoxFuture<'a, Result<Box<dyn Connection>, BoxError>>;

    /// Tears down pooled resources. Called at most once, by the owning
    /// client.
    fn close<'a>(&'a self) -> BoxFuture<'a, ()>;

    /// Whether this provider has been shut down.
    fn is_closed(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("Connector")
    }
}

// keep the object types usable across threads
fn _assert_traits() {
    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_send<T: Send>() {}
    assert_send_sync::<Box<dyn Connection>>();
    assert_send_sync::<Box<dyn Connector>>();
    assert_send::<Transport>();
}
