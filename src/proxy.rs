use std::collections::HashMap;
use std::env;
use std::fmt;

use once_cell::sync::Lazy;
use url::Url;

use crate::request::strip_auth_from_url;
use crate::{BasicAuth, IntoUrl};

/// A proxy endpoint and its credentials.
#[derive(Clone)]
pub struct Proxy {
    url: Url,
    auth: Option<BasicAuth>,
}

impl Proxy {
    /// A proxy at `url`. Credentials embedded in the URL's userinfo are
    /// stripped out and kept as the proxy's auth.
    pub fn new<U: IntoUrl>(url: U) -> crate::Result<Proxy> {
        let mut url = url.into_url()?;
        let auth = strip_auth_from_url(&mut url)?;
        Ok(Proxy { url, auth })
    }

    pub(crate) fn from_parts(url: Url, auth: Option<BasicAuth>) -> Proxy {
        Proxy { url, auth }
    }

    /// Override the credentials for this proxy.
    pub fn basic_auth(mut self, auth: BasicAuth) -> Proxy {
        self.auth = Some(auth);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn auth(&self) -> Option<&BasicAuth> {
        self.auth.as_ref()
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("url", &self.url)
            .field("auth", &self.auth.is_some())
            .finish()
    }
}

/// The environment-configured proxy for `scheme`, if any. The environment
/// is read once per process.
pub(crate) fn for_scheme(scheme: &str) -> Option<Proxy> {
    SYS_PROXIES.get(scheme).cloned()
}

static SYS_PROXIES: Lazy<HashMap<String, Proxy>> =
    Lazy::new(|| from_env_with(|name| env::var(name).ok()));

/// Reads `http_proxy`/`https_proxy` (either case) with `all_proxy` as the
/// fallback for both schemes.
fn from_env_with<F>(get: F) -> HashMap<String, Proxy>
where
    F: Fn(&str) -> Option<String>,
{
    let mut proxies = HashMap::new();

    let lookup = |names: &[&str]| -> Option<Proxy> {
        names
            .iter()
            .filter_map(|name| get(name))
            .find(|value| !value.is_empty())
            .and_then(|value| parse_env_proxy(&value))
    };

    if let Some(proxy) = lookup(&["http_proxy", "HTTP_PROXY", "all_proxy", "ALL_PROXY"]) {
        proxies.insert("http".to_owned(), proxy);
    }
    if let Some(proxy) = lookup(&["https_proxy", "HTTPS_PROXY", "all_proxy", "ALL_PROXY"]) {
        proxies.insert("https".to_owned(), proxy);
    }

    proxies
}

fn parse_env_proxy(value: &str) -> Option<Proxy> {
    let mut url = Url::parse(value).ok()?;
    let auth = strip_auth_from_url(&mut url).ok()?;
    Some(Proxy { url, auth })
}
