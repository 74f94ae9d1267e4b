use crate::urlset;
use cache_warmer::config::{Config, HeaderConfig, StorageBackend};
use cache_warmer::state::WarmQueue;
use cache_warmer::storage::{KeyValueStore, MemoryStore};
use cache_warmer::warmer::HttpTransport;
use cache_warmer::{Runner, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock site
fn create_test_config(base: &str, batch_size: usize) -> Config {
    let mut config = Config::for_site(base);
    config.warmup.batch_size = batch_size;
    config.warmup.concurrency = 5;
    config.warmup.pacing_ms = [0, 0];
    config.warmup.retry_backoff_ms = [0, 0];
    config.warmup.reschedule_delay_secs = 0;
    config
}

fn page_paths(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("/product/{}/", i)).collect()
}

/// Mounts a single-level sitemap listing `paths` and answers every product page with 200
async fn mount_site(server: &MockServer, paths: &[String]) {
    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&server.uri(), paths)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/product/\d+/$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
}

async fn product_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p.starts_with("/product/"))
        .collect()
}

fn memory_runner(config: Config, store: Arc<dyn KeyValueStore>) -> Runner {
    let transport = HttpTransport::new(&HeaderConfig::default(), &config.warmup).unwrap();
    Runner::new(config, Some("test-hash".to_string()), store, Arc::new(transport))
}

#[tokio::test]
async fn test_three_ticks_drain_120_urls() {
    let server = MockServer::start().await;
    mount_site(&server, &page_paths(120)).await;

    let runner = memory_runner(create_test_config(&server.uri(), 50), Arc::new(MemoryStore::new()));

    assert_eq!(
        runner.tick().await.unwrap(),
        TickOutcome::Batch {
            processed: 50,
            remaining: 70,
            next_tick_in: Duration::ZERO
        }
    );
    let status = runner.status().unwrap();
    assert_eq!(status.queued, Some(70));
    let result = status.result.unwrap();
    assert_eq!((result.ok, result.total), (50, 120));
    assert!(result.ended_at.is_none());

    assert_eq!(
        runner.tick().await.unwrap(),
        TickOutcome::Batch {
            processed: 50,
            remaining: 20,
            next_tick_in: Duration::ZERO
        }
    );
    assert!(runner.status().unwrap().result.unwrap().ended_at.is_none());

    let TickOutcome::Completed { result } = runner.tick().await.unwrap() else {
        panic!("third tick should complete the run");
    };
    assert_eq!(result.total, 120);
    assert_eq!(result.ok + result.fail, 120);
    assert_eq!(result.ok, 120);
    assert!(result.ended_at.is_some());
    assert_eq!(result.config_hash.as_deref(), Some("test-hash"));

    let status = runner.status().unwrap();
    assert_eq!(status.queued, None);
    assert_eq!(status.result, Some(result));

    let mut requested = product_requests(&server).await;
    assert_eq!(requested.len(), 120);
    requested.sort();
    requested.dedup();
    assert_eq!(requested.len(), 120);
}

#[tokio::test]
async fn test_failures_are_counted_not_fatal() {
    let server = MockServer::start().await;
    let mut paths = page_paths(8);
    paths.push("/broken/".to_string());
    paths.push("/busy/".to_string());

    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_site(&server, &paths).await;

    let runner = memory_runner(create_test_config(&server.uri(), 4), Arc::new(MemoryStore::new()));
    let TickOutcome::Completed { result } = runner.drain().await.unwrap() else {
        panic!("drain should complete");
    };

    assert_eq!(result.ok, 8);
    assert_eq!(result.fail, 2);
    assert_eq!(result.total, 10);
}

#[tokio::test]
async fn test_crash_after_pop_loses_only_that_batch() {
    let server = MockServer::start().await;
    let paths = page_paths(120);
    mount_site(&server, &paths).await;

    let config = create_test_config(&server.uri(), 50);
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    // A tick that rebuilt the queue and popped its batch, then died before warming
    let urls: Vec<String> = paths.iter().map(|p| format!("{}{}", server.uri(), p)).collect();
    let queue = WarmQueue::new(store.clone(), &config.storage);
    queue.rebuild(&urls, None).unwrap();
    let lost = queue.pop_batch(50).unwrap().unwrap();
    assert_eq!(lost.remaining, 70);

    let runner = memory_runner(config, store);
    let TickOutcome::Completed { result } = runner.drain().await.unwrap() else {
        panic!("drain should complete");
    };

    assert_eq!(result.total, 120);
    assert_eq!(result.ok, 70);
    assert_eq!(result.fail, 0);

    let requested = product_requests(&server).await;
    assert_eq!(requested.len(), 70);
    for path in &paths[..50] {
        assert!(!requested.contains(path), "{} was lost and must not be re-fetched", path);
    }
}

#[tokio::test]
async fn test_empty_sitemap_is_noop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let runner = memory_runner(create_test_config(&server.uri(), 50), Arc::new(MemoryStore::new()));

    assert_eq!(runner.tick().await.unwrap(), TickOutcome::NoUrls);
    assert_eq!(runner.drain().await.unwrap(), TickOutcome::NoUrls);
    assert_eq!(runner.status().unwrap().queued, None);
}

#[tokio::test]
async fn test_each_tick_can_run_in_a_fresh_process() {
    let server = MockServer::start().await;
    mount_site(&server, &page_paths(30)).await;
    let dir = TempDir::new().unwrap();

    for (backend, file) in [
        (StorageBackend::Sqlite, "warmer.db"),
        (StorageBackend::File, "warmer.json"),
    ] {
        let mut config = create_test_config(&server.uri(), 20);
        config.storage.backend = backend;
        config.storage.path = dir.path().join(file).to_string_lossy().into_owned();

        let first = Runner::from_config(config.clone(), None).unwrap();
        assert!(matches!(
            first.tick().await.unwrap(),
            TickOutcome::Batch { remaining: 10, .. }
        ));
        drop(first);

        let second = Runner::from_config(config, None).unwrap();
        let TickOutcome::Completed { result } = second.tick().await.unwrap() else {
            panic!("second tick should finish the run for {:?}", backend);
        };
        assert_eq!(result.ok, 30);
        assert_eq!(result.total, 30);
    }
}
