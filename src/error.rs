#![cfg_attr(target_arch = "wasm32", allow(unused))]
use std::error::Error as StdError;
use std::fmt;
use std::io;

use http::StatusCode;
use url::Url;

/// A `Result` alias where the `Err` case is `arq::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed dynamic error, as produced by connection providers and trace
/// handlers.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The Errors that may occur when processing a `Request`.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                url: None,
            }),
        }
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Returns a mutable reference to the URL related to this error.
    ///
    /// This is useful if you need to remove sensitive information from the URL
    /// (e.g. an API key in the query), but do not want to remove the URL
    /// entirely.
    pub fn url_mut(&mut self) -> Option<&mut Url> {
        self.inner.url.as_mut()
    }

    /// Adds a url related to this error (overwriting any existing).
    pub fn with_url(mut self, url: Url) -> Error {
        self.inner.url = Some(url);
        self
    }

    /// Strips the related URL from this error (if, for example, it contains
    /// sensitive information).
    pub fn without_url(mut self) -> Error {
        self.inner.url = None;
        self
    }

    /// Returns true if the error is from a type `Builder`.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error came from an invalid or unsupported URL.
    pub fn is_invalid_url(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidUrl)
    }

    /// Returns true if the error is related to a timeout of any kind.
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::ConnectTimeout) {
            return true;
        }
        let mut source = self.source();
        while let Some(err) = source {
            if err.is::<TimedOut>() {
                return true;
            }
            if let Some(io) = err.downcast_ref::<io::Error>() {
                if io.kind() == io::ErrorKind::TimedOut {
                    return true;
                }
            }
            source = err.source();
        }
        false
    }

    /// Returns true if the error is a timeout that fired while establishing
    /// a connection.
    pub fn is_connect_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::ConnectTimeout)
    }

    /// Returns true if the error was produced while following redirects.
    pub fn is_redirect(&self) -> bool {
        matches!(self.inner.kind, Kind::Redirect)
    }

    /// Returns true if the redirect limit was exhausted.
    pub fn is_too_many_redirects(&self) -> bool {
        self.find_source::<crate::redirect::TooManyRedirects>().is_some()
    }

    /// Returns true if the error came from a redirect target with an
    /// unsupported scheme.
    pub fn is_redirect_scheme(&self) -> bool {
        self.is_redirect() && self.find_source::<BadScheme>().is_some()
    }

    /// The responses already followed when the redirect limit was exhausted,
    /// oldest first.
    pub fn redirect_history(&self) -> Option<&[crate::Response]> {
        self.find_source::<crate::redirect::TooManyRedirects>()
            .map(|e| e.history())
    }

    /// The request info of the first attempt, if this error carries it.
    pub fn redirect_request_info(&self) -> Option<&crate::RequestInfo> {
        self.find_source::<crate::redirect::TooManyRedirects>()
            .map(|e| e.request_info())
    }

    /// Returns true if the error surfaced from the operating system while
    /// talking to the peer.
    pub fn is_os_error(&self) -> bool {
        self.find_source::<io::Error>().is_some()
    }

    /// The OS error code, when [`is_os_error`][Error::is_os_error] is true
    /// and the underlying `io::Error` carries one.
    pub fn os_error_code(&self) -> Option<i32> {
        self.find_source::<io::Error>().and_then(io::Error::raw_os_error)
    }

    /// Returns true if the error is from `error_for_status` or a client
    /// configured to raise on error statuses.
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Status(_))
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::Status(code) => Some(code),
            #[cfg(feature = "websocket")]
            Kind::Handshake(code) => Some(code),
            _ => None,
        }
    }

    /// Returns true if the error is related to the request or response body.
    #[cfg(feature = "json")]
    pub fn is_body(&self) -> bool {
        matches!(self.inner.kind, Kind::Body)
    }

    /// Returns true if the error is related to a failed WebSocket opening
    /// handshake.
    #[cfg(feature = "websocket")]
    pub fn is_handshake(&self) -> bool {
        matches!(self.inner.kind, Kind::Handshake(_))
    }

    /// The response headers of the failed WebSocket handshake.
    #[cfg(feature = "websocket")]
    pub fn handshake_headers(&self) -> Option<&http::HeaderMap> {
        self.find_source::<HandshakeFailure>().map(|e| &e.headers)
    }

    fn find_source<E: StdError + 'static>(&self) -> Option<&E> {
        let mut source = self.source();
        while let Some(err) = source {
            if let Some(typed) = err.downcast_ref::<E>() {
                return Some(typed);
            }
            source = err.source();
        }
        None
    }

    fn description(&self) -> &str {
        match self.inner.kind {
            Kind::Builder => "builder error",
            Kind::InvalidUrl => "invalid URL",
            Kind::Request => "error sending request",
            Kind::ConnectTimeout => "connection timeout to host",
            Kind::Redirect => "error following redirect",
            Kind::Status(code) => {
                if code.is_client_error() {
                    "HTTP status client error"
                } else if code.is_server_error() {
                    "HTTP status server error"
                } else {
                    "HTTP status error"
                }
            }
            #[cfg(feature = "json")]
            Kind::Body => "request or response body error",
            Kind::Upgrade => "error upgrading connection",
            #[cfg(feature = "websocket")]
            Kind::Handshake(_) => "websocket handshake failed",
            #[cfg(feature = "websocket")]
            Kind::WebSocket => "websocket error",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("arq::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", url);
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())?;

        if let Kind::Status(code) = self.inner.kind {
            let prefix = if code.is_client_error() {
                "client error"
            } else {
                "server error"
            };
            write!(f, " ({} {})", prefix, code)?;
        }
        #[cfg(feature = "websocket")]
        if let Kind::Handshake(code) = self.inner.kind {
            write!(f, " (status {})", code)?;
        }

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({})", url.as_str())?;
        }

        if let Some(e) = &self.inner.source {
            write!(f, ": {}", e)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    InvalidUrl,
    Request,
    ConnectTimeout,
    Redirect,
    Status(StatusCode),
    #[cfg(feature = "json")]
    Body,
    Upgrade,
    #[cfg(feature = "websocket")]
    Handshake(StatusCode),
    #[cfg(feature = "websocket")]
    WebSocket,
}

// constructors

pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder, Some(e))
}

pub(crate) fn invalid_url<E: Into<BoxError>>(e: E, url: Url) -> Error {
    Error::new(Kind::InvalidUrl, Some(e)).with_url(url)
}

pub(crate) fn invalid_url_parse<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::InvalidUrl, Some(e))
}

pub(crate) fn url_bad_scheme(url: Url) -> Error {
    Error::new(Kind::InvalidUrl, Some(BadScheme)).with_url(url)
}

pub(crate) fn request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Request, Some(e))
}

pub(crate) fn os(e: io::Error) -> Error {
    Error::new(Kind::Request, Some(e))
}

pub(crate) fn timed_out(url: Url) -> Error {
    request(TimedOut).with_url(url)
}

pub(crate) fn connect_timeout(url: Url) -> Error {
    Error::new(Kind::ConnectTimeout, Some(TimedOut)).with_url(url)
}

pub(crate) fn redirect<E: Into<BoxError>>(e: E, url: Url) -> Error {
    Error::new(Kind::Redirect, Some(e)).with_url(url)
}

pub(crate) fn status_code(url: Url, status: StatusCode) -> Error {
    Error::new(Kind::Status(status), None::<Error>).with_url(url)
}

#[cfg(feature = "json")]
pub(crate) fn body<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Body, Some(e))
}

pub(crate) fn upgrade<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Upgrade, Some(e))
}

#[cfg(feature = "websocket")]
pub(crate) fn handshake(
    status: StatusCode,
    headers: http::HeaderMap,
    message: &'static str,
) -> Error {
    Error::new(Kind::Handshake(status), Some(HandshakeFailure { message, headers }))
}

/// Classifies a provider-side failure: typed errors pass through unchanged,
/// I/O errors keep their OS error code, anything else becomes a request
/// error.
pub(crate) fn cast(err: BoxError, url: &Url) -> Error {
    let err = match err.downcast::<Error>() {
        Ok(err) => return *err,
        Err(err) => err,
    };
    let err = match err.downcast::<io::Error>() {
        Ok(io) => return os(*io).with_url(url.clone()),
        Err(err) => err,
    };
    request(err).with_url(url.clone())
}

/// Like [`cast`], but a provider timeout marker becomes a connect timeout.
pub(crate) fn cast_connect(err: BoxError, url: &Url) -> Error {
    if err.is::<TimedOut>() {
        return connect_timeout(url.clone());
    }
    cast(err, url)
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Error {
        builder(e)
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(e: http::header::InvalidHeaderName) -> Error {
        builder(e)
    }
}

#[cfg(feature = "websocket")]
impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Error {
        Error::new(Kind::WebSocket, Some(e))
    }
}

/// A request exceeded a timeout.
#[derive(Debug)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("operation timed out")
    }
}

impl StdError for TimedOut {}

/// A URL carried a scheme this client cannot speak.
#[derive(Debug)]
pub struct BadScheme;

impl fmt::Display for BadScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("URL scheme is not allowed")
    }
}

impl StdError for BadScheme {}

/// The server refused or mangled a WebSocket opening handshake.
#[cfg(feature = "websocket")]
#[derive(Debug)]
pub(crate) struct HandshakeFailure {
    pub(crate) message: &'static str,
    pub(crate) headers: http::HeaderMap,
}

#[cfg(feature = "websocket")]
impl fmt::Display for HandshakeFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message)
    }
}

#[cfg(feature = "websocket")]
impl StdError for HandshakeFailure {}
