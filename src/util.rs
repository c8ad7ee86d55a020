use crate::header::{HeaderMap, HeaderValue};

pub(crate) fn basic_auth<U, P>(username: U, password: Option<P>) -> HeaderValue
where
    U: std::fmt::Display,
    P: std::fmt::Display,
{
    use base64::prelude::BASE64_STANDARD;
    use base64::write::EncoderWriter;
    use std::io::Write;

    let mut buf = b"Basic ".to_vec();
    {
        let mut encoder = EncoderWriter::new(&mut buf, &BASE64_STANDARD);
        let _ = write!(encoder, "{}:", username);
        if let Some(password) = password {
            let _ = write!(encoder, "{}", password);
        }
    }
    let mut header = HeaderValue::from_bytes(&buf).expect("base64 is always valid HeaderValue");
    header.set_sensitive(true);
    header
}

/// Layers per-request headers over the client defaults.
///
/// For each header name the request mentions, its first value replaces the
/// defaults and every further value is appended, so a request can both
/// override a default and send multi-valued headers. Defaults the request
/// never mentions pass through untouched.
pub(crate) fn merge_headers(defaults: &HeaderMap, request: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    // values of one name are yielded contiguously
    let mut prev: Option<crate::header::HeaderName> = None;
    for (key, value) in request.iter() {
        if Some(key) != prev.as_ref() {
            merged.insert(key.clone(), value.clone());
            prev = Some(key.clone());
        } else {
            merged.append(key.clone(), value.clone());
        }
    }
    merged
}
