//! WebSocket opening handshake.
//!
//! The handshake request rides the ordinary request pipeline, with
//! redirects disabled and the handshake deadline as its total timeout.
//! After the `101` is validated the connection is detached from the
//! provider and wrapped into a frame codec.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_tungstenite::WebSocketStream;
use base64::prelude::{Engine, BASE64_STANDARD};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use http::header::{
    HeaderValue, CONNECTION, ORIGIN, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_EXTENSIONS,
    SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_PROTOCOL, SEC_WEBSOCKET_VERSION, UPGRADE,
};
use http::StatusCode;
use sha1::{Digest, Sha1};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tungstenite::protocol::{Role, WebSocketConfig};

use crate::connect::Transport;
use crate::{error, RequestBuilder, Response};

pub use tungstenite::Message;

/// Negotiated `permessage-deflate` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression {
    /// Server LZ77 window size, 9 to 15 bits.
    pub window_bits: u8,
    /// Whether the server resets its compression context between messages.
    pub no_context_takeover: bool,
}

/// Builds a WebSocket opening handshake.
///
/// Created with [`Client::websocket`][crate::Client::websocket].
#[must_use = "WebSocketRequestBuilder does nothing until you 'send' it"]
pub struct WebSocketRequestBuilder {
    inner: RequestBuilder,
    protocols: Vec<String>,
    origin: Option<HeaderValue>,
    compress: u8,
    timeout: Duration,
    receive_timeout: Option<Duration>,
    heartbeat: Option<Duration>,
    autoclose: bool,
    autoping: bool,
    max_message_size: usize,
    key: Option<[u8; 16]>,
}

impl WebSocketRequestBuilder {
    pub(crate) fn new(inner: RequestBuilder) -> WebSocketRequestBuilder {
        WebSocketRequestBuilder {
            inner,
            protocols: Vec::new(),
            origin: None,
            compress: 0,
            timeout: Duration::from_secs(10),
            receive_timeout: None,
            heartbeat: None,
            autoclose: true,
            autoping: true,
            max_message_size: 4 << 20,
            key: None,
        }
    }

    /// Subprotocols to offer, in preference order.
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `Origin` header of the handshake.
    pub fn origin(mut self, origin: HeaderValue) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Offer `permessage-deflate` with this server window size (9 to 15
    /// bits). Zero, the default, does not offer compression.
    pub fn compress(mut self, window_bits: u8) -> Self {
        self.compress = window_bits;
        self
    }

    /// Deadline for the whole handshake. Defaults to 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ceiling on waiting for a single incoming message, carried on the
    /// resulting handle.
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// Ping interval for whoever drives the connection.
    pub fn heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = Some(interval);
        self
    }

    /// Whether a server close frame should close the connection
    /// automatically. Defaults to true.
    pub fn autoclose(mut self, autoclose: bool) -> Self {
        self.autoclose = autoclose;
        self
    }

    /// Whether pings are answered automatically. Defaults to true.
    pub fn autoping(mut self, autoping: bool) -> Self {
        self.autoping = autoping;
        self
    }

    /// Largest incoming message tolerated. Defaults to 4 MiB.
    pub fn max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Fixes the 16-byte nonce instead of generating one.
    pub fn key(mut self, key: [u8; 16]) -> Self {
        self.key = Some(key);
        self
    }

    /// Set authentication credentials for the handshake request.
    pub fn auth(mut self, auth: crate::BasicAuth) -> Self {
        self.inner = self.inner.auth(auth);
        self
    }

    /// Route the handshake request through a proxy.
    pub fn proxy<U: crate::IntoUrl>(mut self, proxy: U) -> Self {
        self.inner = self.inner.proxy(proxy);
        self
    }

    /// Credentials for the proxy leg.
    pub fn proxy_auth(mut self, auth: crate::BasicAuth) -> Self {
        self.inner = self.inner.proxy_auth(auth);
        self
    }

    /// Extra headers for the proxy leg.
    pub fn proxy_headers(mut self, headers: http::HeaderMap) -> Self {
        self.inner = self.inner.proxy_headers(headers);
        self
    }

    /// TLS verification requirements, handed to the connection provider.
    pub fn ssl(mut self, ssl: crate::connect::Ssl) -> Self {
        self.inner = self.inner.ssl(ssl);
        self
    }

    /// Add a header to the handshake request.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        http::header::HeaderName: std::convert::TryFrom<K>,
        <http::header::HeaderName as std::convert::TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: std::convert::TryFrom<V>,
        <HeaderValue as std::convert::TryFrom<V>>::Error: Into<http::Error>,
    {
        self.inner = self.inner.header(key, value);
        self
    }

    /// Performs the handshake and returns the open WebSocket.
    pub async fn send(self) -> crate::Result<WebSocket> {
        let key_bytes: [u8; 16] = self.key.unwrap_or_else(rand::random);
        let sec_key = BASE64_STANDARD.encode(key_bytes);

        let (client, request) = self.inner.build_split();
        let mut request = request?;

        // ws/wss URLs ride the http pipeline
        let mapped = match request.url().scheme() {
            "ws" => Some("http"),
            "wss" => Some("https"),
            _ => None,
        };
        if let Some(scheme) = mapped {
            let url = request.url_mut();
            url.set_scheme(scheme)
                .map_err(|_| error::url_bad_scheme(url.clone()))?;
        }

        {
            let headers = request.headers_mut();
            if !headers.contains_key(UPGRADE) {
                headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
            }
            if !headers.contains_key(CONNECTION) {
                headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
            }
            if !headers.contains_key(SEC_WEBSOCKET_VERSION) {
                headers.insert(SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"));
            }
            headers.insert(
                SEC_WEBSOCKET_KEY,
                HeaderValue::from_str(&sec_key).map_err(error::builder)?,
            );
            if !self.protocols.is_empty() {
                headers.insert(
                    SEC_WEBSOCKET_PROTOCOL,
                    self.protocols
                        .join(",")
                        .parse()
                        .map_err(error::builder)?,
                );
            }
            if let Some(origin) = self.origin {
                headers.insert(ORIGIN, origin);
            }
            if self.compress > 0 {
                headers.insert(
                    SEC_WEBSOCKET_EXTENSIONS,
                    ws_ext_gen(self.compress).parse().map_err(error::builder)?,
                );
            }
        }

        request.allow_redirects = false;
        request.read_until_eof = false;
        request.timeout = Some(self.timeout);
        request.timeout_policy = None;

        let mut resp = client.execute_request(request).await?;

        let (protocol, compression) =
            match validate(&resp, &sec_key, &self.protocols, self.compress) {
                Ok(negotiated) => negotiated,
                Err(message) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    let url = resp.url().clone();
                    resp.close();
                    return Err(error::handshake(status, headers, message).with_url(url));
                }
            };

        let transport = resp.into_transport()?;
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(self.max_message_size);
        let inner =
            WebSocketStream::from_raw_socket(transport.compat(), Role::Client, Some(config))
                .await;

        Ok(WebSocket {
            inner,
            protocol,
            compression,
            receive_timeout: self.receive_timeout,
            heartbeat: self.heartbeat,
            autoclose: self.autoclose,
            autoping: self.autoping,
        })
    }
}

impl fmt::Debug for WebSocketRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WebSocketRequestBuilder")
            .field("protocols", &self.protocols)
            .field("compress", &self.compress)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Checks the server's side of the opening handshake, in protocol order:
/// status, upgrade token, connection token, challenge response, then the
/// negotiated subprotocol and extensions.
fn validate(
    resp: &Response,
    sec_key: &str,
    protocols: &[String],
    compress: u8,
) -> Result<(Option<String>, Option<Compression>), &'static str> {
    if resp.status() != StatusCode::SWITCHING_PROTOCOLS {
        return Err("invalid response status");
    }

    match resp.headers().get(UPGRADE) {
        Some(value) if value.as_bytes().eq_ignore_ascii_case(b"websocket") => {}
        _ => return Err("invalid upgrade header"),
    }

    let connection_ok = resp
        .headers()
        .get(CONNECTION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("upgrade"))
        .unwrap_or(false);
    if !connection_ok {
        return Err("invalid connection header");
    }

    let accept = derive_accept_key(sec_key.as_bytes());
    match resp.headers().get(SEC_WEBSOCKET_ACCEPT) {
        Some(value) if value.as_bytes() == accept.as_bytes() => {}
        _ => return Err("invalid challenge response"),
    }

    let protocol = resp
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            // first server-declared value the caller also offered
            value
                .split(',')
                .map(str::trim)
                .find(|offered| protocols.iter().any(|p| p == offered))
                .map(str::to_owned)
        });

    let compression = if compress > 0 {
        match resp
            .headers()
            .get(SEC_WEBSOCKET_EXTENSIONS)
            .and_then(|value| value.to_str().ok())
        {
            Some(value) => {
                let (window_bits, no_context_takeover) = ws_ext_parse(value)?;
                if window_bits == 0 {
                    None
                } else {
                    Some(Compression {
                        window_bits,
                        no_context_takeover,
                    })
                }
            }
            None => None,
        }
    } else {
        None
    };

    Ok((protocol, compression))
}

/// The `Sec-WebSocket-Accept` value for a key, per RFC 6455.
pub fn derive_accept_key(key: &[u8]) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key);
    sha1.update(b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11"); // magic string
    let result = sha1.finalize();
    BASE64_STANDARD.encode(&result[..])
}

/// Renders the client's `permessage-deflate` offer.
fn ws_ext_gen(window_bits: u8) -> String {
    let mut offer = String::from("permessage-deflate");
    if window_bits < 15 {
        offer.push_str(&format!("; server_max_window_bits={}", window_bits));
    }
    offer.push_str("; client_max_window_bits");
    offer
}

/// Parses the server's `Sec-WebSocket-Extensions` answer. Returns the
/// accepted window size (0 when `permessage-deflate` was not accepted) and
/// the `server_no_context_takeover` flag.
fn ws_ext_parse(value: &str) -> Result<(u8, bool), &'static str> {
    for ext in value.split(',') {
        let mut parts = ext.split(';').map(str::trim);
        if parts.next() != Some("permessage-deflate") {
            continue;
        }

        let mut window_bits = 15u8;
        let mut no_context_takeover = false;
        for param in parts {
            if param == "server_no_context_takeover" {
                no_context_takeover = true;
            } else if param == "client_no_context_takeover" {
                // the client side tolerates this unilaterally
            } else if let Some(bits) = param.strip_prefix("server_max_window_bits=") {
                let bits: u8 = bits
                    .trim()
                    .parse()
                    .map_err(|_| "invalid window size in extensions")?;
                if !(9..=15).contains(&bits) {
                    return Err("invalid window size in extensions");
                }
                window_bits = bits;
            } else if param.starts_with("client_max_window_bits") {
                // ours to pick; nothing to record
            } else {
                return Err("unsupported extension parameter");
            }
        }
        return Ok((window_bits, no_context_takeover));
    }
    Ok((0, false))
}

/// An open WebSocket connection, produced by a successful handshake.
///
/// Implements [`Stream`] of incoming messages and [`Sink`] for outgoing
/// ones.
pub struct WebSocket {
    inner: WebSocketStream<Compat<Transport>>,
    protocol: Option<String>,
    compression: Option<Compression>,
    receive_timeout: Option<Duration>,
    heartbeat: Option<Duration>,
    autoclose: bool,
    autoping: bool,
}

impl WebSocket {
    /// The subprotocol the server selected, if any.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// The negotiated `permessage-deflate` parameters, if any.
    pub fn compression(&self) -> Option<Compression> {
        self.compression
    }

    /// Ping interval requested when the handshake was built.
    pub fn heartbeat(&self) -> Option<Duration> {
        self.heartbeat
    }

    pub fn autoclose(&self) -> bool {
        self.autoclose
    }

    pub fn autoping(&self) -> bool {
        self.autoping
    }

    /// Receives the next message, bounded by the receive timeout when one
    /// was configured.
    pub async fn next_message(&mut self) -> Option<crate::Result<Message>> {
        match self.receive_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.next()).await {
                Ok(next) => next,
                Err(_) => Some(Err(error::request(error::TimedOut))),
            },
            None => self.next().await,
        }
    }

    /// Sends a message.
    pub async fn send_message(&mut self, message: Message) -> crate::Result<()> {
        self.send(message).await
    }

    /// Sends a close frame and flushes it.
    pub async fn close(&mut self) -> crate::Result<()> {
        self.inner.close(None).await.map_err(Into::into)
    }
}

impl Stream for WebSocket {
    type Item = crate::Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(msg))) => Poll::Ready(Some(Ok(msg))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err.into()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Sink<Message> for WebSocket {
    type Error = crate::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_ready(cx).map_err(Into::into)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        Pin::new(&mut self.inner)
            .start_send(item)
            .map_err(Into::into)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_close(cx).map_err(Into::into)
    }
}

impl fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WebSocket")
            .field("protocol", &self.protocol)
            .field("compression", &self.compression)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc6455_accept_vector() {
        assert_eq!(
            derive_accept_key(b"dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn ext_gen_offers() {
        assert_eq!(
            ws_ext_gen(15),
            "permessage-deflate; client_max_window_bits"
        );
        assert_eq!(
            ws_ext_gen(11),
            "permessage-deflate; server_max_window_bits=11; client_max_window_bits"
        );
    }

    #[test]
    fn ext_parse_accepts() {
        assert_eq!(ws_ext_parse("permessage-deflate"), Ok((15, false)));
        assert_eq!(
            ws_ext_parse("permessage-deflate; server_max_window_bits=10"),
            Ok((10, false))
        );
        assert_eq!(
            ws_ext_parse("permessage-deflate; server_no_context_takeover"),
            Ok((15, true))
        );
        // unknown extension entries are skipped
        assert_eq!(ws_ext_parse("x-webkit-deflate-frame"), Ok((0, false)));
    }

    #[test]
    fn ext_parse_rejects() {
        assert!(ws_ext_parse("permessage-deflate; server_max_window_bits=8").is_err());
        assert!(ws_ext_parse("permessage-deflate; server_max_window_bits=16").is_err());
        assert!(ws_ext_parse("permessage-deflate; server_max_window_bits=frog").is_err());
        assert!(ws_ext_parse("permessage-deflate; mystery_param").is_err());
    }
}
