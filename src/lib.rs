#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # arq
//!
//! The orchestration core of an asynchronous HTTP client. `arq` owns the
//! request lifecycle — redirects, hierarchical timeouts, cookie
//! coordination, lifecycle tracing, error classification and the
//! WebSocket opening handshake — over a pluggable connection provider.
//! Opening sockets, pooling, TLS and wire codecs are the provider's
//! business, behind the [`Connector`][connect::Connector] trait.
//!
//! ## Making requests
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn run(provider: Arc<dyn arq::connect::Connector>) -> Result<(), arq::Error> {
//! let client = arq::Client::builder()
//!     .connector(provider)
//!     .build()?;
//!
//! let body = client
//!     .get("https://www.rust-lang.org")
//!     .send()
//!     .await?
//!     .text()
//!     .await?;
//!
//! println!("body = {:?}", body);
//! # client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! A [`Client`] holds a connection provider, default headers, a timeout
//! policy and (optionally) a cookie store, so create one and **reuse** it.
//! Call [`Client::close`] when done; dropping an unclosed client leaks the
//! provider's pooled connections and logs a warning.
//!
//! ## Redirects
//!
//! 3xx responses are followed by default, up to 10 hops. 303 downgrades
//! everything but HEAD to GET, and the legacy 301/302 behavior downgrades
//! POST. Credentials never cross origins. See
//! [`RequestBuilder::allow_redirects`] and
//! [`RequestBuilder::max_redirects`].
//!
//! ## Timeouts
//!
//! A [`Timeout`] policy is hierarchical: the `total` budget is pinned when
//! the request starts and every phase of the request, body reads
//! included, races the same deadline, while `connect`, `sock_connect` and
//! `sock_read` put independent ceilings on single phases.
//!
//! ## WebSockets
//!
//! With the `websocket` feature (on by default),
//! [`Client::websocket`] performs an RFC 6455 opening handshake through
//! the same pipeline and returns a [`WebSocket`] implementing `Stream`
//! and `Sink`.
//!
//! ## Optional Features
//!
//! - **cookies** *(enabled by default)*: cookie session support.
//! - **websocket** *(enabled by default)*: the opening handshake and the
//!   `WebSocket` handle.
//! - **json**: `RequestBuilder::json` and `Response::json`.

pub use http::header;
pub use http::Method;
pub use http::{StatusCode, Version};
pub use url::Url;

pub use self::client::{Client, ClientBuilder, Pending};
pub use self::error::{Error, Result, TimedOut};
pub use self::into_url::IntoUrl;
pub use self::proxy::Proxy;
pub use self::request::{BasicAuth, Body, Request, RequestBuilder, RequestInfo};
pub use self::response::Response;
pub use self::timeout::{ScopeHandle, Timeout};
pub use self::trace::{
    RequestEnd, RequestException, RequestRedirect, RequestStart, TraceContext, TraceHandler,
};

#[cfg(feature = "websocket")]
pub use self::websocket::{
    derive_accept_key, Compression, Message, WebSocket, WebSocketRequestBuilder,
};

mod client;
pub mod connect;
#[cfg(feature = "cookies")]
pub mod cookies;
mod error;
mod into_url;
mod proxy;
pub mod redirect;
mod request;
mod response;
mod timeout;
mod trace;
mod util;
#[cfg(feature = "websocket")]
mod websocket;
