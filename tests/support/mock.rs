//! A scripted connection provider.
//!
//! Each scripted [`Exchange`] answers one connection acquisition; the
//! provider records everything the client does to it so tests can assert
//! on the exact sequence of lifecycle calls.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arq::connect::{
    BoxError, BoxFuture, Connection, Connector, ResponseHead, ResponseParams, Transport,
};
use arq::header::{HeaderMap, HeaderName, HeaderValue};
use arq::{Request, StatusCode, Timeout, Version};
use bytes::Bytes;

#[derive(Debug, Clone)]
pub enum Event {
    Connect {
        url: String,
    },
    Params {
        skip_payload: bool,
        read_until_eof: bool,
        auto_decompress: bool,
        read_timeout: Option<Duration>,
    },
    Send {
        method: String,
        url: String,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    },
    Release,
    Close,
    Detach,
}

/// One scripted request/response exchange.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    pub connect_delay: Option<Duration>,
    pub head_delay: Option<Duration>,
    pub body_delay: Option<Duration>,
    pub connect_os_error: Option<i32>,
    pub head_os_error: Option<i32>,
}

impl Exchange {
    pub fn status(status: u16) -> Exchange {
        Exchange {
            status,
            ..Exchange::default()
        }
    }

    pub fn ok() -> Exchange {
        Exchange::status(200)
    }

    pub fn redirect(status: u16, location: &str) -> Exchange {
        Exchange::status(status).header("location", location)
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Exchange {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Exchange {
        self.body = body.into();
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Exchange {
        self.connect_delay = Some(delay);
        self
    }

    pub fn head_delay(mut self, delay: Duration) -> Exchange {
        self.head_delay = Some(delay);
        self
    }

    pub fn body_delay(mut self, delay: Duration) -> Exchange {
        self.body_delay = Some(delay);
        self
    }

    pub fn connect_os_error(mut self, code: i32) -> Exchange {
        self.connect_os_error = Some(code);
        self
    }

    pub fn head_os_error(mut self, code: i32) -> Exchange {
        self.head_os_error = Some(code);
        self
    }
}

pub struct MockConnector {
    script: Mutex<VecDeque<Exchange>>,
    events: Arc<Mutex<Vec<Event>>>,
    pub connect_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockConnector {
    pub fn new(script: Vec<Exchange>) -> Arc<MockConnector> {
        Arc::new(MockConnector {
            script: Mutex::new(script.into()),
            events: Arc::new(Mutex::new(Vec::new())),
            connect_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// The requests written to the wire, in order.
    pub fn sent(&self) -> Vec<(String, String, Vec<(String, String)>, Option<Vec<u8>>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Send {
                    method,
                    url,
                    headers,
                    body,
                } => Some((method, url, headers, body)),
                _ => None,
            })
            .collect()
    }

    pub fn header_of(&self, attempt: usize, name: &str) -> Option<String> {
        self.sent()
            .get(attempt)
            .and_then(|(_, _, headers, _)| {
                headers
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.clone())
            })
    }
}

impl Connector for MockConnector {
    fn connect<'a>(
        &'a self,
        req: &'a Request,
        _timeout: &'a Timeout,
    ) -> BoxFuture<'a, Result<Box<dyn Connection>, BoxError>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let exchange = self.script.lock().unwrap().pop_front();
        let events = self.events.clone();
        let url = req.url().to_string();

        Box::pin(async move {
            events.lock().unwrap().push(Event::Connect { url });
            let exchange: Exchange = match exchange {
                Some(exchange) => exchange,
                None => return Err("mock script exhausted".into()),
            };
            if let Some(delay) = exchange.connect_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(code) = exchange.connect_os_error {
                return Err(Box::new(io::Error::from_raw_os_error(code)) as BoxError);
            }
            Ok(Box::new(MockConnection { exchange, events }) as Box<dyn Connection>)
        })
    }

    fn close<'a>(&'a self) -> BoxFuture<'a, ()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(async {})
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockConnection {
    exchange: Exchange,
    events: Arc<Mutex<Vec<Event>>>,
}

impl MockConnection {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Connection for MockConnection {
    fn set_response_params(&mut self, params: ResponseParams) {
        self.push(Event::Params {
            skip_payload: params.skip_payload,
            read_until_eof: params.read_until_eof,
            auto_decompress: params.auto_decompress,
            read_timeout: params.read_timeout,
        });
    }

    fn send_request<'a>(&'a mut self, req: &'a Request) -> BoxFuture<'a, Result<(), BoxError>> {
        self.push(Event::Send {
            method: req.method().to_string(),
            url: req.url().to_string(),
            headers: req
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_owned(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: req.body().map(|body| body.as_bytes().to_vec()),
        });
        Box::pin(async { Ok(()) })
    }

    fn read_head<'a>(&'a mut self) -> BoxFuture<'a, Result<ResponseHead, BoxError>> {
        Box::pin(async move {
            if let Some(delay) = self.exchange.head_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(code) = self.exchange.head_os_error {
                return Err(Box::new(io::Error::from_raw_os_error(code)) as BoxError);
            }

            let mut headers = HeaderMap::new();
            for (name, value) in &self.exchange.headers {
                headers.append(
                    name.parse::<HeaderName>().expect("mock header name"),
                    HeaderValue::from_str(value).expect("mock header value"),
                );
            }
            Ok(ResponseHead {
                status: StatusCode::from_u16(self.exchange.status).expect("mock status"),
                version: Version::HTTP_11,
                headers,
            })
        })
    }

    fn read_body<'a>(&'a mut self) -> BoxFuture<'a, Result<Bytes, BoxError>> {
        Box::pin(async move {
            if let Some(delay) = self.exchange.body_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Bytes::from(self.exchange.body.clone()))
        })
    }

    fn release(self: Box<Self>) {
        self.push(Event::Release);
    }

    fn close(self: Box<Self>) {
        self.push(Event::Close);
    }

    fn detach(self: Box<Self>) -> Transport {
        self.push(Event::Detach);
        let (near, _far) = tokio::io::duplex(64);
        Box::new(near)
    }
}
