use std::fmt;

use bytes::Bytes;
use http::{Method, StatusCode, Version};
use url::Url;

use crate::connect::{Connection, ResponseHead};
use crate::header::HeaderMap;
use crate::timeout::Budget;
use crate::{error, RequestInfo};

#[cfg(feature = "websocket")]
use crate::connect::Transport;

/// A Response to a submitted `Request`.
///
/// While the response holds its connection, the connection is checked out
/// of the provider. Reading the body to completion releases it back;
/// dropping the response does too. `close` tears the connection down
/// instead.
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
    method: Method,
    request_headers: HeaderMap,
    conn: Option<Box<dyn Connection>>,
    history: Vec<Response>,
    budget: Option<Budget>,
}

impl Response {
    pub(crate) fn new(
        head: ResponseHead,
        info: RequestInfo,
        conn: Option<Box<dyn Connection>>,
    ) -> Response {
        Response {
            status: head.status,
            version: head.version,
            headers: head.headers,
            url: info.url,
            method: info.method,
            request_headers: info.headers,
            conn,
            history: Vec::new(),
            budget: None,
        }
    }

    /// Get the `StatusCode` of this `Response`.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP `Version` of this `Response`.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the `Headers` of this `Response`.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the final `Url` of this `Response`.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The method of the request that produced this response, after any
    /// redirect downgrades.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The redirect responses followed on the way here, oldest first.
    /// Empty when the request was not redirected.
    #[inline]
    pub fn history(&self) -> &[Response] {
        &self.history
    }

    /// The request info of the attempt that produced this response.
    pub fn request_info(&self) -> RequestInfo {
        RequestInfo {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.request_headers.clone(),
        }
    }

    /// Retrieve the cookies contained in the response.
    ///
    /// Note that invalid 'Set-Cookie' headers will be ignored.
    #[cfg(feature = "cookies")]
    pub fn cookies<'a>(&'a self) -> impl Iterator<Item = crate::cookies::Cookie<'a>> + 'a {
        crate::cookies::extract_response_cookies(&self.headers).filter_map(Result::ok)
    }

    /// Get the content length, as declared by the peer.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Whether this response still holds its connection.
    pub fn holds_connection(&self) -> bool {
        self.conn.is_some()
    }

    /// Read the full response body.
    ///
    /// The read is bounded by what is left of the request's total timeout
    /// budget. On success the connection is released for reuse; on failure
    /// it is torn down.
    pub async fn bytes(mut self) -> crate::Result<Bytes> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => return Ok(Bytes::new()),
        };
        let budget = self.budget.take();
        let url = self.url.clone();

        let read = async { conn.read_body().await.map_err(|e| error::cast(e, &url)) };
        let result = match &budget {
            Some(budget) => budget.within(&url, read).await,
            None => read.await,
        };
        if let Some(budget) = budget {
            budget.cancel();
        }

        match result {
            Ok(bytes) => {
                conn.release();
                Ok(bytes)
            }
            Err(err) => {
                conn.close();
                Err(err)
            }
        }
    }

    /// Get the response text, decoded as lossy UTF-8.
    pub async fn text(self) -> crate::Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Try to deserialize the response body as JSON.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> crate::Result<T> {
        let url = self.url.clone();
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| error::body(e).with_url(url))
    }

    /// Turn a response into an error if the server returned an error
    /// status.
    pub fn error_for_status(mut self) -> crate::Result<Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            self.release();
            Err(error::status_code(self.url.clone(), self.status))
        } else {
            Ok(self)
        }
    }

    /// Turn a reference to a response into an error if the server returned
    /// an error status.
    pub fn error_for_status_ref(&self) -> crate::Result<&Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(error::status_code(self.url.clone(), self.status))
        } else {
            Ok(self)
        }
    }

    /// Return the connection to the provider without reading the body.
    pub fn release(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.release();
        }
        if let Some(budget) = self.budget.take() {
            budget.cancel();
        }
    }

    /// Tear the connection down without reuse.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close();
        }
        if let Some(budget) = self.budget.take() {
            budget.cancel();
        }
    }

    pub(crate) fn set_history(&mut self, history: Vec<Response>) {
        self.history = history;
    }

    pub(crate) fn arm_budget(&mut self, budget: Budget) {
        self.budget = Some(budget);
    }

    /// Surrenders the raw byte stream of the connection, e.g. after a
    /// successful protocol upgrade.
    #[cfg(feature = "websocket")]
    pub(crate) fn into_transport(mut self) -> crate::Result<Transport> {
        if let Some(budget) = self.budget.take() {
            budget.cancel();
        }
        match self.conn.take() {
            Some(conn) => Ok(conn.detach()),
            None => Err(error::upgrade("response has no associated connection")
                .with_url(self.url.clone())),
        }
    }
}

impl Drop for Response {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}
