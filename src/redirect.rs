//! Redirect handling.
//!
//! The pure rules of HTTP redirection live here: which statuses redirect,
//! when a method downgrades to GET, which header names the target, how a
//! raw target resolves against the current URL, and what counts as a
//! cross-origin hop. The orchestrator in `client` drives these rules.

use std::fmt;

use http::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use http::{Method, StatusCode};
use once_cell::sync::Lazy;
use url::Url;

use crate::error::{self, BadScheme};
use crate::{RequestInfo, Response};

/// Non-standard fallback for the redirect target, honored when `Location`
/// is absent.
static URI: Lazy<HeaderName> = Lazy::new(|| HeaderName::from_static("uri"));

pub(crate) fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Whether following `status` rewrites the method to GET and drops the
/// body. 303 converts everything but HEAD; the legacy 301/302 behavior
/// converts POST.
pub(crate) fn downgrades_to_get(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => *method != Method::HEAD,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *method == Method::POST,
        _ => false,
    }
}

/// The raw redirect target, `Location` first, the `URI` fallback second.
pub(crate) fn redirect_location(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers.get(LOCATION).or_else(|| headers.get(&*URI))
}

/// Resolves a raw target against the URL that produced it.
///
/// Relative references are joined against `base` in both modes. With
/// `requote` (the default) the target goes through full normalization;
/// without it an absolute target is parsed as-is, keeping the escapes the
/// server sent. Only `http`, `https` and scheme-relative targets are
/// acceptable.
pub(crate) fn resolve_target(raw: &HeaderValue, base: &Url, requote: bool) -> crate::Result<Url> {
    let raw = std::str::from_utf8(raw.as_bytes())
        .map_err(|e| error::invalid_url(e, base.clone()))?;

    let next = if requote {
        base.join(raw)
            .map_err(|e| error::invalid_url(e, base.clone()))?
    } else {
        match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => base
                .join(raw)
                .map_err(|e| error::invalid_url(e, base.clone()))?,
            Err(e) => return Err(error::invalid_url(e, base.clone())),
        }
    };

    match next.scheme() {
        "http" | "https" => Ok(next),
        _ => Err(error::redirect(BadScheme, next)),
    }
}

/// Origin comparison for deciding whether credentials survive a hop.
pub(crate) fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// The redirect limit was exhausted. Carries the request info of the first
/// attempt and every response followed on the way, oldest first.
pub struct TooManyRedirects {
    request_info: RequestInfo,
    history: Vec<Response>,
}

impl TooManyRedirects {
    pub(crate) fn new(request_info: RequestInfo, history: Vec<Response>) -> TooManyRedirects {
        TooManyRedirects {
            request_info,
            history,
        }
    }

    pub fn request_info(&self) -> &RequestInfo {
        &self.request_info
    }

    pub fn history(&self) -> &[Response] {
        &self.history
    }
}

impl fmt::Debug for TooManyRedirects {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TooManyRedirects")
            .field("url", &self.request_info.url)
            .field("hops", &self.history.len())
            .finish()
    }
}

impl fmt::Display for TooManyRedirects {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "too many redirects ({} hops)", self.history.len())
    }
}

impl std::error::Error for TooManyRedirects {}

#[cfg(test)]
mod tests {
    use super::*;

    fn hv(s: &str) -> HeaderValue {
        HeaderValue::from_str(s).unwrap()
    }

    #[test]
    fn redirect_statuses() {
        for code in &[301u16, 302, 303, 307, 308] {
            assert!(is_redirect(StatusCode::from_u16(*code).unwrap()));
        }
        for code in &[200u16, 201, 300, 304, 400, 500] {
            assert!(!is_redirect(StatusCode::from_u16(*code).unwrap()));
        }
    }

    #[test]
    fn downgrade_rules() {
        assert!(downgrades_to_get(StatusCode::SEE_OTHER, &Method::POST));
        assert!(downgrades_to_get(StatusCode::SEE_OTHER, &Method::PUT));
        assert!(!downgrades_to_get(StatusCode::SEE_OTHER, &Method::HEAD));

        assert!(downgrades_to_get(StatusCode::FOUND, &Method::POST));
        assert!(!downgrades_to_get(StatusCode::FOUND, &Method::PUT));
        assert!(downgrades_to_get(StatusCode::MOVED_PERMANENTLY, &Method::POST));

        assert!(!downgrades_to_get(StatusCode::TEMPORARY_REDIRECT, &Method::POST));
        assert!(!downgrades_to_get(StatusCode::PERMANENT_REDIRECT, &Method::POST));
    }

    #[test]
    fn location_falls_back_to_uri() {
        let mut headers = HeaderMap::new();
        assert!(redirect_location(&headers).is_none());

        headers.insert(&*URI, hv("/other"));
        assert_eq!(redirect_location(&headers).unwrap(), "/other");

        headers.insert(LOCATION, hv("/preferred"));
        assert_eq!(redirect_location(&headers).unwrap(), "/preferred");
    }

    #[test]
    fn resolve_relative_target() {
        let base = Url::parse("http://example.local/a/b?x=1").unwrap();
        let next = resolve_target(&hv("../c"), &base, true).unwrap();
        assert_eq!(next.as_str(), "http://example.local/c");
    }

    #[test]
    fn resolve_scheme_relative_target() {
        let base = Url::parse("https://example.local/a").unwrap();
        let next = resolve_target(&hv("//other.local/b"), &base, true).unwrap();
        assert_eq!(next.as_str(), "https://other.local/b");
    }

    #[test]
    fn resolve_rejects_bad_scheme() {
        let base = Url::parse("http://example.local/").unwrap();
        let err = resolve_target(&hv("ftp://example.local/pub"), &base, true).unwrap_err();
        assert!(err.is_redirect());
        assert!(err.is_redirect_scheme());
    }

    #[test]
    fn resolve_without_requote_joins_and_preserves_encoding() {
        let base = Url::parse("http://example.local/dir/page").unwrap();
        let next = resolve_target(&hv("/next%2Fkeep"), &base, false).unwrap();
        assert_eq!(next.as_str(), "http://example.local/next%2Fkeep");

        let next = resolve_target(&hv("http://example.local/%2Fkeep"), &base, false).unwrap();
        assert_eq!(next.path(), "/%2Fkeep");
    }

    #[test]
    fn origin_check() {
        let a = Url::parse("http://example.local/a").unwrap();
        let b = Url::parse("http://example.local:80/b").unwrap();
        let c = Url::parse("https://example.local/a").unwrap();
        let d = Url::parse("http://other.local/a").unwrap();

        assert!(same_origin(&a, &b));
        assert!(!same_origin(&a, &c));
        assert!(!same_origin(&a, &d));
    }
}
