mod support;

use std::sync::Arc;

use arq::cookies::{CookieStore, Jar};
use arq::Client;
use support::mock::{Exchange, MockConnector};

fn cookie_client(script: Vec<Exchange>) -> (Client, Arc<MockConnector>) {
    let connector = MockConnector::new(script);
    let client = Client::builder()
        .connector(connector.clone())
        .cookie_store(true)
        .build()
        .unwrap();
    (client, connector)
}

#[tokio::test]
async fn response_cookies_flow_into_the_next_request() {
    let (client, connector) = cookie_client(vec![
        Exchange::ok().header("set-cookie", "key=value"),
        Exchange::ok(),
    ]);

    client.get("http://example.local/a").send().await.unwrap();
    assert_eq!(connector.header_of(0, "cookie"), None);

    client.get("http://example.local/b").send().await.unwrap();
    assert_eq!(connector.header_of(1, "cookie").as_deref(), Some("key=value"));
    client.close().await;
}

#[tokio::test]
async fn redirect_hops_refilter_cookies_per_url() {
    let (client, connector) = cookie_client(vec![
        Exchange::ok().header("set-cookie", "local=1"),
        Exchange::redirect(302, "http://other.local/landing"),
        Exchange::ok(),
    ]);

    // seed a cookie scoped to example.local
    client.get("http://example.local/").send().await.unwrap();

    client.get("http://example.local/go").send().await.unwrap();
    assert_eq!(connector.header_of(1, "cookie").as_deref(), Some("local=1"));
    // the cross-origin hop must not leak it
    assert_eq!(connector.header_of(2, "cookie"), None);
    client.close().await;
}

#[tokio::test]
async fn request_cookies_overlay_the_session_store() {
    let jar = Jar::default();
    let url = "http://example.local/".parse::<arq::Url>().unwrap();
    jar.add_cookie_str("key=session", &url);
    jar.add_cookie_str("keep=1", &url);

    let connector = MockConnector::new(vec![Exchange::ok()]);
    let client = Client::builder()
        .connector(connector.clone())
        .cookie_provider(Arc::new(jar))
        .build()
        .unwrap();

    client
        .get("http://example.local/")
        .cookie("key", "override")
        .cookie("extra", "2")
        .send()
        .await
        .unwrap();

    let header = connector.header_of(0, "cookie").unwrap();
    assert!(header.contains("key=override"));
    assert!(header.contains("keep=1"));
    assert!(header.contains("extra=2"));
    assert!(!header.contains("key=session"));
    client.close().await;
}

#[tokio::test]
async fn cookie_names_match_case_sensitively() {
    let jar = Jar::default();
    let url = "http://example.local/".parse::<arq::Url>().unwrap();
    jar.add_cookie_str("Session=upper", &url);

    let connector = MockConnector::new(vec![Exchange::ok()]);
    let client = Client::builder()
        .connector(connector.clone())
        .cookie_provider(Arc::new(jar))
        .build()
        .unwrap();

    client
        .get("http://example.local/")
        .cookie("session", "lower")
        .send()
        .await
        .unwrap();

    let header = connector.header_of(0, "cookie").unwrap();
    assert!(header.contains("Session=upper"));
    assert!(header.contains("session=lower"));
    client.close().await;
}

#[tokio::test]
async fn cookie_header_on_the_request_is_preserved() {
    let (client, connector) = cookie_client(vec![Exchange::ok()]);

    client
        .get("http://example.local/")
        .header("cookie", "a=1")
        .send()
        .await
        .unwrap();

    assert_eq!(connector.header_of(0, "cookie").as_deref(), Some("a=1"));
    client.close().await;
}

#[tokio::test]
async fn session_cookies_override_header_cookies() {
    let jar = Jar::default();
    let url = "http://example.local/".parse::<arq::Url>().unwrap();
    jar.add_cookie_str("a=jar", &url);

    let connector = MockConnector::new(vec![Exchange::ok()]);
    let client = Client::builder()
        .connector(connector.clone())
        .cookie_provider(Arc::new(jar))
        .build()
        .unwrap();

    client
        .get("http://example.local/")
        .header("cookie", "a=hdr; b=2")
        .send()
        .await
        .unwrap();

    let header = connector.header_of(0, "cookie").unwrap();
    assert!(header.contains("a=jar"));
    assert!(header.contains("b=2"));
    assert!(!header.contains("a=hdr"));
    client.close().await;
}

#[tokio::test]
async fn request_cookies_work_without_a_session_store() {
    let connector = MockConnector::new(vec![Exchange::ok()]);
    let client = Client::builder()
        .connector(connector.clone())
        .build()
        .unwrap();

    client
        .get("http://example.local/")
        .cookie("solo", "1")
        .send()
        .await
        .unwrap();

    assert_eq!(connector.header_of(0, "cookie").as_deref(), Some("solo=1"));
    client.close().await;
}

#[tokio::test]
async fn response_exposes_parsed_cookies() {
    let (client, _connector) = cookie_client(vec![
        Exchange::ok()
            .header("set-cookie", "a=1; HttpOnly; Path=/")
            .header("set-cookie", "b=2"),
    ]);

    let resp = client.get("http://example.local/").send().await.unwrap();
    let cookies: Vec<_> = resp.cookies().collect();
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies[0].name(), "a");
    assert_eq!(cookies[0].value(), "1");
    assert!(cookies[0].http_only());
    assert_eq!(cookies[0].path(), Some("/"));
    assert_eq!(cookies[1].name(), "b");
    client.close().await;
}

#[test]
fn jar_implements_the_store_trait() {
    let jar = Jar::default();
    let url = "http://example.local/".parse::<arq::Url>().unwrap();
    jar.add_cookie_str("k=v", &url);

    let pairs = jar.filter_cookies(&url);
    assert_eq!(pairs, vec![("k".to_string(), "v".to_string())]);

    let other = "http://elsewhere.local/".parse::<arq::Url>().unwrap();
    assert!(jar.filter_cookies(&other).is_empty());
}
