use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Method;
use pin_project_lite::pin_project;
use url::Url;

use crate::connect::{BoxFuture, Connector, ResponseParams, Ssl};
use crate::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH};
use crate::redirect::{self, TooManyRedirects};
use crate::request::{Body, RequestInfo};
use crate::timeout::{self, Timeout, TimeoutScope};
use crate::trace::{Trace, TraceContext, TraceHandler};
use crate::{error, proxy, util, BasicAuth, Error, Proxy, Request, RequestBuilder, Response};

#[cfg(feature = "cookies")]
use crate::cookies::{self, CookieStore, Jar};

/// An asynchronous `Client` to make Requests with.
///
/// The client drives the full request lifecycle over a pluggable
/// connection provider: redirects, timeouts, cookies, tracing and error
/// classification. It holds the provider, default headers and cookie
/// store internally, so it is advised to create one and **reuse** it.
///
/// `Client` is cheap to clone; clones share the same internals.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientRef>,
}

/// A `ClientBuilder` can be used to create a `Client` with custom
/// configuration.
#[must_use]
pub struct ClientBuilder {
    config: Config,
}

struct Config {
    connector: Option<Arc<dyn Connector>>,
    connector_owner: bool,
    headers: HeaderMap,
    skip_auto_headers: HashSet<HeaderName>,
    default_auth: Option<BasicAuth>,
    timeout: Timeout,
    raise_for_status: bool,
    requote_redirect_url: bool,
    trust_env: bool,
    auto_decompress: bool,
    #[cfg(feature = "cookies")]
    cookie_store: Option<Arc<dyn CookieStore>>,
    trace_handlers: Vec<Arc<dyn TraceHandler>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Constructs a new `ClientBuilder`.
    pub fn new() -> ClientBuilder {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        ClientBuilder {
            config: Config {
                connector: None,
                connector_owner: true,
                headers,
                skip_auto_headers: HashSet::new(),
                default_auth: None,
                timeout: Timeout::default(),
                raise_for_status: false,
                requote_redirect_url: true,
                trust_env: false,
                auto_decompress: true,
                #[cfg(feature = "cookies")]
                cookie_store: None,
                trace_handlers: Vec::new(),
            },
        }
    }

    /// Returns a `Client` that uses this `ClientBuilder` configuration.
    ///
    /// # Errors
    ///
    /// This method fails if no connection provider was supplied.
    pub fn build(self) -> crate::Result<Client> {
        let config = self.config;
        let connector = config
            .connector
            .ok_or_else(|| error::builder("a connection provider is required"))?;

        Ok(Client {
            inner: Arc::new(ClientRef {
                connector,
                connector_owner: config.connector_owner,
                closed: AtomicBool::new(false),
                headers: config.headers,
                skip_auto_headers: config.skip_auto_headers,
                default_auth: config.default_auth,
                timeout: config.timeout,
                raise_for_status: config.raise_for_status,
                requote_redirect_url: config.requote_redirect_url,
                trust_env: config.trust_env,
                auto_decompress: config.auto_decompress,
                #[cfg(feature = "cookies")]
                cookie_store: config.cookie_store,
                trace_handlers: config.trace_handlers,
            }),
        })
    }

    /// Use `connector` to acquire connections.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> ClientBuilder {
        self.config.connector = Some(connector);
        self
    }

    /// Whether closing the client tears the provider down too. Defaults to
    /// true.
    pub fn connector_owner(mut self, owner: bool) -> ClientBuilder {
        self.config.connector_owner = owner;
        self
    }

    /// Sets the default headers for every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> ClientBuilder {
        for (key, value) in headers.iter() {
            self.config.headers.insert(key, value.clone());
        }
        self
    }

    /// Credentials applied to any request that carries none of its own.
    pub fn default_auth(mut self, auth: BasicAuth) -> ClientBuilder {
        self.config.default_auth = Some(auth);
        self
    }

    /// Header names the connection provider must never synthesize.
    pub fn skip_auto_headers<I>(mut self, names: I) -> ClientBuilder
    where
        I: IntoIterator<Item = HeaderName>,
    {
        self.config.skip_auto_headers.extend(names);
        self
    }

    /// The timeout policy applied to every request. Defaults to a total
    /// of 300 seconds.
    pub fn timeout(mut self, timeout: Timeout) -> ClientBuilder {
        self.config.timeout = timeout;
        self
    }

    /// Turn final responses with 4xx/5xx statuses into errors.
    pub fn raise_for_status(mut self, raise: bool) -> ClientBuilder {
        self.config.raise_for_status = raise;
        self
    }

    /// Re-encode redirect targets instead of requiring them to arrive as
    /// complete URLs. Defaults to true.
    pub fn requote_redirect_url(mut self, requote: bool) -> ClientBuilder {
        self.config.requote_redirect_url = requote;
        self
    }

    /// Honor `http_proxy`/`https_proxy` environment variables for
    /// requests without an explicit proxy.
    pub fn trust_env(mut self, trust: bool) -> ClientBuilder {
        self.config.trust_env = trust;
        self
    }

    /// Ask the provider to decode content-codings transparently. Defaults
    /// to true.
    pub fn auto_decompress(mut self, enabled: bool) -> ClientBuilder {
        self.config.auto_decompress = enabled;
        self
    }

    /// Enable a persistent cookie store for the client.
    ///
    /// By default, no cookie store is used.
    #[cfg(feature = "cookies")]
    pub fn cookie_store(mut self, enable: bool) -> ClientBuilder {
        if enable {
            self.cookie_provider(Arc::new(Jar::default()))
        } else {
            self.config.cookie_store = None;
            self
        }
    }

    /// Set a specific cookie store implementation for the client.
    #[cfg(feature = "cookies")]
    pub fn cookie_provider(mut self, store: Arc<dyn CookieStore>) -> ClientBuilder {
        self.config.cookie_store = Some(store);
        self
    }

    /// Register a trace handler, called in registration order for every
    /// request. The list is frozen when the client is built.
    pub fn trace(mut self, handler: Arc<dyn TraceHandler>) -> ClientBuilder {
        self.config.trace_handlers.push(handler);
        self
    }
}

impl Client {
    /// Creates a `ClientBuilder` to configure a `Client`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Convenience method to make a `GET` request to a URL.
    pub fn get<U: crate::IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    pub fn post<U: crate::IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Convenience method to make a `PUT` request to a URL.
    pub fn put<U: crate::IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Convenience method to make a `PATCH` request to a URL.
    pub fn patch<U: crate::IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Convenience method to make a `DELETE` request to a URL.
    pub fn delete<U: crate::IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Convenience method to make a `HEAD` request to a URL. Redirects
    /// are not followed by default.
    pub fn head<U: crate::IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url).allow_redirects(false)
    }

    /// Convenience method to make an `OPTIONS` request to a URL.
    pub fn options<U: crate::IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::OPTIONS, url)
    }

    /// Start building a `Request` with the `Method` and `Url`.
    pub fn request<U: crate::IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        let req = url.into_url().map(move |url| Request::new(method, url));
        RequestBuilder::new(self.clone(), req)
    }

    /// Start a WebSocket opening handshake with the `Url`.
    #[cfg(feature = "websocket")]
    pub fn websocket<U: crate::IntoUrl>(&self, url: U) -> crate::WebSocketRequestBuilder {
        crate::WebSocketRequestBuilder::new(self.request(Method::GET, url))
    }

    /// Executes a `Request`.
    pub fn execute(&self, request: Request) -> Pending {
        self.execute_request(request)
    }

    pub(crate) fn execute_request(&self, req: Request) -> Pending {
        if self.is_closed() {
            return Pending::new_err(
                error::builder("client is closed").with_url(req.url().clone()),
            );
        }
        match req.url().scheme() {
            "http" | "https" => (),
            _ => return Pending::new_err(error::url_bad_scheme(req.url().clone())),
        }
        if req.timeout.is_some() && req.timeout_policy.is_some() {
            return Pending::new_err(
                error::builder("timeout and timeout_policy are mutually exclusive")
                    .with_url(req.url().clone()),
            );
        }

        Pending::new(Box::pin(run(self.inner.clone(), req)))
    }

    /// Closes the client. With an owned provider, pooled connections are
    /// torn down. Idempotent; in-flight requests are not cancelled.
    pub async fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) && self.inner.connector_owner {
            self.inner.connector.close().await;
        }
    }

    /// Marks the client closed without touching the provider, leaving its
    /// teardown to whoever else owns it.
    pub fn detach(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the client or its provider has been shut down.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst) || self.inner.connector.is_closed()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("Client");
        self.inner.fmt_fields(&mut builder);
        builder.finish()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("ClientBuilder");
        builder
            .field("timeout", &self.config.timeout)
            .field("default_headers", &self.config.headers)
            .field("raise_for_status", &self.config.raise_for_status)
            .field("trust_env", &self.config.trust_env)
            .finish()
    }
}

struct ClientRef {
    connector: Arc<dyn Connector>,
    connector_owner: bool,
    closed: AtomicBool,
    headers: HeaderMap,
    skip_auto_headers: HashSet<HeaderName>,
    default_auth: Option<BasicAuth>,
    timeout: Timeout,
    raise_for_status: bool,
    requote_redirect_url: bool,
    trust_env: bool,
    auto_decompress: bool,
    #[cfg(feature = "cookies")]
    cookie_store: Option<Arc<dyn CookieStore>>,
    trace_handlers: Vec<Arc<dyn TraceHandler>>,
}

impl ClientRef {
    fn fmt_fields(&self, f: &mut fmt::DebugStruct<'_, '_>) {
        f.field("timeout", &self.timeout)
            .field("default_headers", &self.headers)
            .field("raise_for_status", &self.raise_for_status)
            .field("requote_redirect_url", &self.requote_redirect_url)
            .field("trust_env", &self.trust_env)
            .field("auto_decompress", &self.auto_decompress);
    }
}

impl Drop for ClientRef {
    fn drop(&mut self) {
        if self.connector_owner && !self.closed.load(Ordering::SeqCst) {
            log::warn!("unclosed client dropped; call `Client::close()` to tear down the connection provider");
        }
    }
}

/// Everything about the in-flight request that a redirect hop may rewrite.
struct RequestState {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Body>,
    auth: Option<BasicAuth>,
    #[cfg(feature = "cookies")]
    cookies: Vec<(String, String)>,
    #[cfg(feature = "cookies")]
    header_cookies: Vec<(String, String)>,
    skip_auto_headers: HashSet<HeaderName>,
    version: http::Version,
    compress: bool,
    chunked: Option<bool>,
    expect100: bool,
    read_until_eof: bool,
    allow_redirects: bool,
    max_redirects: u32,
    proxy: Option<Proxy>,
    proxy_headers: HeaderMap,
    ssl: Ssl,
    timeout: Timeout,
}

async fn run(inner: Arc<ClientRef>, req: Request) -> crate::Result<Response> {
    let url = req.url().clone();

    let timeout = match (req.timeout, req.timeout_policy) {
        (Some(_), Some(_)) => {
            return Err(
                error::builder("timeout and timeout_policy are mutually exclusive").with_url(url),
            )
        }
        (Some(total), None) => Timeout::total_only(total),
        (None, Some(policy)) => policy,
        (None, None) => inner.timeout,
    };

    let mut skip_auto_headers = inner.skip_auto_headers.clone();
    skip_auto_headers.extend(req.skip_auto_headers.iter().cloned());

    let proxy = match req.proxy {
        Some(proxy_url) => Some(Proxy::from_parts(proxy_url, req.proxy_auth)),
        None if inner.trust_env => proxy::for_scheme(url.scheme()),
        None => None,
    };

    let raise_override = req.raise_for_status;
    let trace_ctx: Option<Arc<dyn Any + Send + Sync>> = req.trace_ctx;

    #[cfg_attr(not(feature = "cookies"), allow(unused_mut))]
    let mut headers = util::merge_headers(&inner.headers, &req.headers);
    // a caller-supplied Cookie header is the base layer of every hop's
    // outgoing cookies
    #[cfg(feature = "cookies")]
    let header_cookies = match headers.remove(crate::header::COOKIE) {
        Some(value) => cookies::parse_header(&value),
        None => Vec::new(),
    };

    let st = RequestState {
        method: req.method,
        url,
        headers,
        body: req.body,
        auth: req.auth,
        #[cfg(feature = "cookies")]
        cookies: req.cookies,
        #[cfg(feature = "cookies")]
        header_cookies,
        skip_auto_headers,
        version: req.version,
        compress: req.compress,
        chunked: req.chunked,
        expect100: req.expect100,
        read_until_eof: req.read_until_eof,
        allow_redirects: req.allow_redirects,
        max_redirects: req.max_redirects,
        proxy,
        proxy_headers: req.proxy_headers,
        ssl: req.ssl,
        timeout,
    };

    let scope = TimeoutScope::start(&timeout);

    let mut traces: Vec<Trace> = inner
        .trace_handlers
        .iter()
        .map(|handler| Trace::new(handler.clone(), TraceContext::new(trace_ctx.clone())))
        .collect();

    // the start event precedes the failure-reporting region: a handler
    // that fails here sees no exception event
    for trace in traces.iter_mut() {
        trace
            .request_start(&st.method, &st.url, &st.headers)
            .await
            .map_err(|e| error::cast(e, &st.url))?;
    }

    let exc_info = (st.method.clone(), st.url.clone(), st.headers.clone());
    match inner.drive(&scope, &mut traces, st, raise_override).await {
        Ok(resp) => Ok(resp),
        Err(err) => {
            scope.handle().cancel();
            for trace in traces.iter_mut() {
                if let Err(trace_err) = trace
                    .request_exception(&exc_info.0, &exc_info.1, &exc_info.2, &err)
                    .await
                {
                    log::debug!("trace exception handler failed: {}", trace_err);
                }
            }
            Err(err)
        }
    }
}

impl ClientRef {
    async fn drive(
        &self,
        scope: &TimeoutScope,
        traces: &mut [Trace],
        mut st: RequestState,
        raise_override: Option<bool>,
    ) -> crate::Result<Response> {
        let mut redirects: u32 = 0;
        let mut history: Vec<Response> = Vec::new();
        let mut first_request: Option<RequestInfo> = None;

        loop {
            // prepare the attempt
            let auth_from_url = crate::request::strip_auth_from_url(&mut st.url)?;
            if st.auth.is_some() && auth_from_url.is_some() {
                return Err(error::builder(
                    "cannot combine explicit auth with credentials in the URL",
                )
                .with_url(st.url.clone()));
            }
            if st.auth.is_none() {
                st.auth = auth_from_url;
            }
            if st.auth.is_none() {
                st.auth = self.default_auth.clone();
            }
            if st.auth.is_some() && st.headers.contains_key(AUTHORIZATION) {
                return Err(error::builder(
                    "cannot combine an Authorization header with auth credentials",
                )
                .with_url(st.url.clone()));
            }

            #[cfg(feature = "cookies")]
            self.apply_cookies(&mut st);

            let attempt = self.build_attempt(&st);
            let attempt_info = attempt.request_info();
            if first_request.is_none() {
                first_request = Some(attempt_info.clone());
            }

            // acquire a connection, under the connect ceiling
            let mut conn = scope
                .within(&st.url, async {
                    let connecting = self.connector.connect(&attempt, &st.timeout);
                    match timeout::ceil(st.timeout.connect, connecting).await {
                        Ok(Ok(conn)) => Ok(conn),
                        Ok(Err(err)) => Err(error::cast_connect(err, &st.url)),
                        Err(_) => Err(error::connect_timeout(st.url.clone())),
                    }
                })
                .await?;

            conn.set_response_params(ResponseParams {
                skip_payload: st.method == Method::HEAD,
                read_until_eof: st.read_until_eof,
                auto_decompress: self.auto_decompress,
                read_timeout: st.timeout.sock_read,
            });

            // send and await the head
            let sent = scope
                .within(&st.url, async {
                    conn.send_request(&attempt)
                        .await
                        .map_err(|e| error::cast(e, &st.url))?;
                    conn.read_head().await.map_err(|e| error::cast(e, &st.url))
                })
                .await;
            let head = match sent {
                Ok(head) => head,
                Err(err) => {
                    conn.close();
                    return Err(err);
                }
            };

            #[cfg(feature = "cookies")]
            {
                if let Some(store) = self.cookie_store.as_ref() {
                    let mut cookies =
                        cookies::extract_response_cookie_headers(&head.headers).peekable();
                    if cookies.peek().is_some() {
                        store.set_cookies(&mut cookies, &st.url);
                    }
                }
            }

            let mut resp = Response::new(head, attempt_info, Some(conn));

            if st.allow_redirects && redirect::is_redirect(resp.status()) {
                for trace in traces.iter_mut() {
                    trace
                        .request_redirect(&st.method, &st.url, &st.headers, &resp)
                        .await
                        .map_err(|e| error::cast(e, &st.url))?;
                }

                redirects += 1;
                if redirects >= st.max_redirects {
                    resp.close();
                    let request_info = first_request
                        .take()
                        .unwrap_or_else(|| resp.request_info());
                    history.push(resp);
                    return Err(error::redirect(
                        TooManyRedirects::new(request_info, history),
                        st.url.clone(),
                    ));
                }

                if redirect::downgrades_to_get(resp.status(), &st.method) {
                    st.method = Method::GET;
                    st.body = None;
                    st.headers.remove(CONTENT_LENGTH);
                }

                if let Some(raw) = redirect::redirect_location(resp.headers()).cloned() {
                    let next =
                        match redirect::resolve_target(&raw, &st.url, self.requote_redirect_url) {
                            Ok(next) => next,
                            Err(err) => {
                                resp.close();
                                return Err(err);
                            }
                        };
                    resp.release();
                    if !redirect::same_origin(&st.url, &next) {
                        st.auth = None;
                        st.headers.remove(AUTHORIZATION);
                    }
                    log::debug!("redirecting '{}' to '{}'", st.url, next);
                    st.url = next;
                    history.push(resp);
                    continue;
                }
                // no Location or URI header: the 3xx is the final response
                log::debug!("redirect response without a target at '{}'", st.url);
            }

            // finalize
            if raise_override.unwrap_or(self.raise_for_status) {
                if let Err(err) = resp.error_for_status_ref() {
                    resp.release();
                    return Err(err);
                }
            }
            resp.set_history(history);
            if resp.holds_connection() {
                resp.arm_budget(scope.budget());
            } else {
                scope.handle().cancel();
            }
            for trace in traces.iter_mut() {
                trace
                    .request_end(&st.method, &st.url, &st.headers, &resp)
                    .await
                    .map_err(|e| error::cast(e, &st.url))?;
            }
            return Ok(resp);
        }
    }

    /// Builds the immutable request handed to the connection provider for
    /// one attempt. Credentials go in as an `Authorization` header here,
    /// never into the carried state, so cross-origin hops can drop them.
    fn build_attempt(&self, st: &RequestState) -> Request {
        let mut req = Request::new(st.method.clone(), st.url.clone());
        req.headers = st.headers.clone();
        if let Some(auth) = &st.auth {
            req.headers.insert(AUTHORIZATION, auth.header_value());
        }
        req.body = st.body.clone();
        req.version = st.version;
        req.skip_auto_headers = st.skip_auto_headers.clone();
        req.compress = st.compress;
        req.chunked = st.chunked;
        req.expect100 = st.expect100;
        req.read_until_eof = st.read_until_eof;
        req.proxy = st.proxy.as_ref().map(|p| p.url().clone());
        req.proxy_auth = st.proxy.as_ref().and_then(|p| p.auth().cloned());
        req.proxy_headers = st.proxy_headers.clone();
        req.ssl = st.ssl.clone();
        req
    }

    /// Lays the caller's `Cookie` header pairs, the session cookies that
    /// match the URL, and the request-scoped cookies over one another, in
    /// that order, into the `Cookie` header.
    #[cfg(feature = "cookies")]
    fn apply_cookies(&self, st: &mut RequestState) {
        use crate::header::COOKIE;

        // a stale header from the previous hop must not leak across origins
        st.headers.remove(COOKIE);

        let mut pairs = st.header_cookies.clone();
        if let Some(store) = self.cookie_store.as_ref() {
            pairs = cookies::overlay(pairs, store.filter_cookies(&st.url));
        }
        if !st.cookies.is_empty() {
            let jar = Jar::default();
            for (name, value) in &st.cookies {
                jar.add_cookie_str(&format!("{}={}", name, value), &st.url);
            }
            pairs = cookies::overlay(pairs, jar.filter_cookies(&st.url));
        }
        if let Some(value) = cookies::render_header(&pairs) {
            st.headers.insert(COOKIE, value);
        }
    }
}

pin_project! {
    /// A `Future` that will resolve to a `Response`.
    pub struct Pending {
        #[pin]
        inner: PendingInner,
    }
}

pin_project! {
    #[project = PendingInnerProj]
    enum PendingInner {
        Request {
            #[pin]
            fut: BoxFuture<'static, crate::Result<Response>>,
        },
        Error {
            error: Option<Error>,
        },
    }
}

impl Pending {
    pub(crate) fn new(fut: BoxFuture<'static, crate::Result<Response>>) -> Pending {
        Pending {
            inner: PendingInner::Request { fut },
        }
    }

    pub(crate) fn new_err(error: Error) -> Pending {
        Pending {
            inner: PendingInner::Error { error: Some(error) },
        }
    }
}

impl Future for Pending {
    type Output = crate::Result<Response>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        match self.project().inner.project() {
            PendingInnerProj::Request { fut } => fut.poll(cx),
            PendingInnerProj::Error { error } => Poll::Ready(Err(error
                .take()
                .unwrap_or_else(|| error::builder("Pending polled after completion")))),
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner {
            PendingInner::Request { .. } => f.debug_struct("Pending").finish(),
            PendingInner::Error { ref error } => {
                f.debug_struct("Pending").field("error", error).finish()
            }
        }
    }
}

impl tower_service::Service<Request> for Client {
    type Response = Response;
    type Error = Error;
    type Future = Pending;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        self.execute_request(req)
    }
}

impl tower_service::Service<Request> for &'_ Client {
    type Response = Response;
    type Error = Error;
    type Future = Pending;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        self.execute_request(req)
    }
}
