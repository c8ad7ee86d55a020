//! HTTP Cookies

use std::convert::TryInto;
use std::fmt;
use std::sync::RwLock;
use std::time::SystemTime;

use crate::header::{HeaderValue, SET_COOKIE};
use bytes::Bytes;
use url::Url;

/// Actions for a persistent cookie store providing session support.
pub trait CookieStore: Send + Sync {
    /// Store a set of Set-Cookie header values received from `url`.
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url);
    /// The name/value pairs that apply to `url`, in store order.
    fn filter_cookies(&self, url: &Url) -> Vec<(String, String)>;
}

/// A single HTTP cookie.
pub struct Cookie<'a>(cookie_crate::Cookie<'a>);

impl<'a> Cookie<'a> {
    fn parse(value: &'a HeaderValue) -> Result<Cookie<'a>, CookieParseError> {
        std::str::from_utf8(value.as_bytes())
            .map_err(cookie_crate::ParseError::from)
            .and_then(cookie_crate::Cookie::parse)
            .map_err(CookieParseError)
            .map(Cookie)
    }

    /// The name of the cookie.
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// The value of the cookie.
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Returns true if the 'HttpOnly' directive is enabled.
    pub fn http_only(&self) -> bool {
        self.0.http_only().unwrap_or(false)
    }

    /// Returns true if the 'Secure' directive is enabled.
    pub fn secure(&self) -> bool {
        self.0.secure().unwrap_or(false)
    }

    /// Returns the path directive of the cookie, if set.
    pub fn path(&self) -> Option<&str> {
        self.0.path()
    }

    /// Returns the domain directive of the cookie, if set.
    pub fn domain(&self) -> Option<&str> {
        self.0.domain()
    }

    /// Get the Max-Age information.
    pub fn max_age(&self) -> Option<std::time::Duration> {
        self.0.max_age().map(|d| {
            d.try_into()
                .expect("time::Duration into std::time::Duration")
        })
    }

    /// The cookie expiration time.
    pub fn expires(&self) -> Option<SystemTime> {
        match self.0.expires() {
            Some(cookie_crate::Expiration::DateTime(offset)) => Some(SystemTime::from(offset)),
            None | Some(cookie_crate::Expiration::Session) => None,
        }
    }
}

impl<'a> fmt::Debug for Cookie<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error representing a parse failure of a 'Set-Cookie' header.
pub(crate) struct CookieParseError(cookie_crate::ParseError);

impl fmt::Debug for CookieParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CookieParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for CookieParseError {}

pub(crate) fn extract_response_cookie_headers<'a>(
    headers: &'a crate::header::HeaderMap,
) -> impl Iterator<Item = &'a HeaderValue> + 'a {
    headers.get_all(SET_COOKIE).iter()
}

pub(crate) fn extract_response_cookies<'a>(
    headers: &'a crate::header::HeaderMap,
) -> impl Iterator<Item = Result<Cookie<'a>, CookieParseError>> + 'a {
    headers.get_all(SET_COOKIE).iter().map(Cookie::parse)
}

/// A good default `CookieStore` implementation.
///
/// This is the implementation used when simply calling `cookie_store(true)`.
/// This type is exposed to allow creating one and filling it with some
/// existing cookies more easily, before creating a `Client`.
#[derive(Debug, Default)]
pub struct Jar(RwLock<cookie_store::CookieStore>);

impl Jar {
    /// Add a cookie to this jar.
    ///
    /// # Example
    ///
    /// ```
    /// use arq::{cookies::Jar, Url};
    ///
    /// let cookie = "foo=bar; Domain=yolo.local";
    /// let url = "https://yolo.local".parse::<Url>().unwrap();
    ///
    /// let jar = Jar::default();
    /// jar.add_cookie_str(cookie, &url);
    ///
    /// // and now add to a `ClientBuilder`?
    /// ```
    pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
        let cookies = cookie_crate::Cookie::parse(cookie)
            .ok()
            .map(|c| c.into_owned())
            .into_iter();
        self.0
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .store_response_cookies(cookies, url);
    }
}

impl CookieStore for Jar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let iter = cookie_headers.filter_map(|val| {
            std::str::from_utf8(val.as_bytes())
                .map_err(cookie_crate::ParseError::from)
                .and_then(cookie_crate::Cookie::parse)
                .map(|c| c.into_owned())
                .ok()
        });

        self.0
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .store_response_cookies(iter, url);
    }

    fn filter_cookies(&self, url: &Url) -> Vec<(String, String)> {
        self.0
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get_request_values(url)
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect()
    }
}

/// Parses a `Cookie` request header into name/value pairs, in order.
/// Malformed pieces are skipped.
pub(crate) fn parse_header(value: &HeaderValue) -> Vec<(String, String)> {
    let raw = match std::str::from_utf8(value.as_bytes()) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    raw.split(';')
        .filter_map(|piece| {
            let (name, value) = piece.trim().split_once('=')?;
            Some((name.to_owned(), value.to_owned()))
        })
        .collect()
}

/// Merges request-scoped cookies over the session pairs, last write wins,
/// matching by exact (case-sensitive) name. Insertion order is preserved.
pub(crate) fn overlay(
    mut base: Vec<(String, String)>,
    request: Vec<(String, String)>,
) -> Vec<(String, String)> {
    for (name, value) in request {
        match base.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => base.push((name, value)),
        }
    }
    base
}

/// Renders pairs into a single `Cookie` header value.
pub(crate) fn render_header(pairs: &[(String, String)]) -> Option<HeaderValue> {
    if pairs.is_empty() {
        return None;
    }
    let value = pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");
    HeaderValue::from_maybe_shared(Bytes::from(value)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://example.local/").unwrap()
    }

    #[test]
    fn jar_roundtrip() {
        let jar = Jar::default();
        jar.add_cookie_str("a=1", &url());
        jar.add_cookie_str("b=2; Path=/elsewhere", &url());

        let pairs = jar.filter_cookies(&url());
        assert!(pairs.contains(&("a".into(), "1".into())));
        assert!(!pairs.iter().any(|(n, _)| n == "b"));
    }

    #[test]
    fn overlay_is_case_sensitive_last_write_wins() {
        let base = vec![
            ("session".to_string(), "abc".to_string()),
            ("Theme".to_string(), "dark".to_string()),
        ];
        let request = vec![
            ("theme".to_string(), "light".to_string()),
            ("session".to_string(), "xyz".to_string()),
        ];

        let merged = overlay(base, request);
        assert_eq!(
            merged,
            vec![
                ("session".to_string(), "xyz".to_string()),
                ("Theme".to_string(), "dark".to_string()),
                ("theme".to_string(), "light".to_string()),
            ]
        );
    }

    #[test]
    fn parse_header_splits_pairs() {
        let value = HeaderValue::from_static("a=1; b=2=3;c=; broken");
        assert_eq!(
            parse_header(&value),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2=3".to_string()),
                ("c".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn render_header_joins_pairs() {
        let pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        let value = render_header(&pairs).unwrap();
        assert_eq!(value.to_str().unwrap(), "a=1; b=2");

        assert!(render_header(&[]).is_none());
    }
}
