use crate::{sitemap_index, urlset};
use cache_warmer::config::{HeaderConfig, WarmupConfig};
use cache_warmer::sitemap::SitemapResolver;
use cache_warmer::warmer::{Fetcher, HttpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_warmup() -> WarmupConfig {
    WarmupConfig {
        retry_backoff_ms: [0, 5],
        pacing_ms: [0, 0],
        ..WarmupConfig::default()
    }
}

fn fetcher(warmup: &WarmupConfig) -> Fetcher {
    let transport = HttpTransport::new(&HeaderConfig::default(), warmup).unwrap();
    Fetcher::new(Arc::new(transport), warmup)
}

async fn requests_to(server: &MockServer, target: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == target)
        .count()
}

#[tokio::test]
async fn test_warm_sends_browser_headers() {
    let server = MockServer::start().await;
    let headers = HeaderConfig {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) TestWarmer/1.0".to_string(),
        accept_language: "de-DE".to_string(),
        accept_encoding: "br".to_string(),
        ..HeaderConfig::default()
    };

    Mock::given(method("GET"))
        .and(path("/product/blue-mug"))
        .and(header("user-agent", "Mozilla/5.0 (X11; Linux x86_64) TestWarmer/1.0"))
        .and(header("accept-language", "de-DE"))
        .and(header("accept-encoding", "br"))
        .and(header_exists("accept"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>mug</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let warmup = fast_warmup();
    let transport = HttpTransport::new(&headers, &warmup).unwrap();
    let result = Fetcher::new(Arc::new(transport), &warmup)
        .warm(&[format!("{}/product/blue-mug", server.uri())], 5)
        .await;

    assert_eq!(result.ok, 1);
    assert_eq!(result.fail, 0);
}

#[tokio::test]
async fn test_retryable_status_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = fetcher(&fast_warmup())
        .warm(&[format!("{}/busy", server.uri())], 5)
        .await;

    assert_eq!(result.ok, 1);
    assert_eq!(result.fail, 0);
    assert_eq!(requests_to(&server, "/busy").await, 3);
}

#[tokio::test]
async fn test_persistent_503_fails_once_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let urls = vec![
        format!("{}/down", server.uri()),
        format!("{}/up", server.uri()),
    ];
    let result = fetcher(&fast_warmup()).warm(&urls, 2).await;

    assert_eq!(result.ok, 1);
    assert_eq!(result.fail, 1);
    assert_eq!(result.total, 2);
    // One initial request plus three retries
    assert_eq!(requests_to(&server, "/down").await, 4);
    assert_eq!(requests_to(&server, "/up").await, 1);
}

#[tokio::test]
async fn test_terminal_status_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = fetcher(&fast_warmup())
        .warm_sequential(&[format!("{}/gone", server.uri())])
        .await;

    assert_eq!(result.fail, 1);
    assert_eq!(requests_to(&server, "/gone").await, 1);
}

#[tokio::test]
async fn test_redirects_followed_within_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let urls = vec![
        format!("{}/old", server.uri()),
        format!("{}/loop", server.uri()),
    ];
    let result = fetcher(&fast_warmup()).warm(&urls, 2).await;

    assert_eq!(result.ok, 1);
    assert_eq!(result.fail, 1);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let warmup = WarmupConfig {
        timeout_secs: 1,
        connect_timeout_secs: 1,
        ..fast_warmup()
    };
    let transport = HttpTransport::new(&HeaderConfig::default(), &warmup).unwrap();

    assert!(transport
        .get_status(&format!("{}/slow", server.uri()))
        .await
        .is_err());

    let result = fetcher(&warmup)
        .warm(&[format!("{}/slow", server.uri())], 1)
        .await;
    assert_eq!(result.fail, 1);
}

#[tokio::test]
async fn test_resolver_walks_index_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_index(
            &base,
            &["/post-sitemap.xml", "/missing-sitemap.xml", "/page-sitemap.xml"],
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/post-sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(
            &base,
            &["/hello-world/".to_string(), "/news/".to_string()],
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page-sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(urlset(&base, &["/about/".to_string()])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing-sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HeaderConfig::default(), &fast_warmup()).unwrap();
    let resolver = SitemapResolver::new(Arc::new(transport), 100);
    let urls = resolver
        .resolve(&[format!("{}/sitemap_index.xml", base)], 5000)
        .await;

    assert_eq!(
        urls,
        vec![
            format!("{}/hello-world/", base),
            format!("{}/news/", base),
            format!("{}/about/", base),
        ]
    );
}
