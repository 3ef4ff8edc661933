//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to stand in for the remote gallery API and test
//! the full crawl cycle end-to-end against an in-memory catalog.

use image_mirror::config::{Config, CrawlerConfig, RemoteConfig, StorageConfig};
use image_mirror::crawler::{Coordinator, ScheduleSettings, Scheduler};
use image_mirror::storage::{
    share, CatalogStore, InsertOutcome, NewImage, RunStatus, SqliteCatalog,
};
use image_mirror::MirrorService;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, image_root: &Path) -> Config {
    Config {
        remote: RemoteConfig::new(base_url),
        crawler: CrawlerConfig {
            default_limit: 20,
            full_sync_limit: 100,
            max_concurrent_downloads: 4,
            request_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
            image_root: image_root.display().to_string(),
        },
    }
}

fn create_service(base_url: &str, image_root: &Path) -> MirrorService {
    let config = create_test_config(base_url, image_root);
    let catalog = SqliteCatalog::new_in_memory().expect("Failed to open catalog");
    MirrorService::with_catalog(config, catalog).expect("Failed to build service")
}

fn entry(id: i64, title: &str, thumbnail: &str, filename: &str) -> Value {
    json!({
        "id": id,
        "thumbnail": thumbnail,
        "title": title,
        "filename": filename,
        "view_count": id * 10,
        "download_count": id,
        "duration": "图片",
        "image_type": "static",
        "mtime": 1_700_000_000 + id
    })
}

async fn mount_listing(server: &MockServer, images: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": images })))
        .mount(server)
        .await;
}

async fn mount_asset(server: &MockServer, asset_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(asset_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn image_count(service: &MirrorService) -> u64 {
    service.catalog().lock().unwrap().count_images().unwrap()
}

#[tokio::test]
async fn test_full_crawl_stores_all_entries() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        vec![
            entry(1, "红色的猪", "/thumb/1.jpg", "1.jpg"),
            entry(2, "蓝色的猪", "/thumb/2.png", "2.png"),
            entry(3, "绿色的猪", "/thumb/3.gif", "3.gif"),
        ],
    )
    .await;
    mount_asset(&mock_server, "/thumb/1.jpg", b"one").await;
    mount_asset(&mock_server, "/thumb/2.png", b"two").await;
    mount_asset(&mock_server, "/thumb/3.gif", b"three").await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let log = service.run_crawl(None).await.expect("Crawl failed");

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.images_found, 3);
    assert_eq!(log.images_downloaded, 3);
    assert!(log.error_message.is_none());
    assert_eq!(image_count(&service), 3);

    let record = service
        .catalog()
        .lock()
        .unwrap()
        .find_by_remote_id(2)
        .unwrap()
        .expect("record for remote id 2");
    assert_eq!(record.title, "蓝色的猪");
    assert_eq!(record.thumbnail_url, "/thumb/2.png");
    assert_eq!(record.view_count, 20);
    assert_eq!(record.duration_label, "图片");
    assert!(record.local_path.starts_with("2_"));
    assert!(record.local_path.ends_with(".png"));

    let bytes = std::fs::read(images_dir.path().join(&record.local_path)).unwrap();
    assert_eq!(bytes, b"two");
    assert_eq!(files_in(images_dir.path()).len(), 3);
}

#[tokio::test]
async fn test_second_crawl_is_idempotent() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        vec![
            entry(10, "a pig", "/thumb/10.jpg", "10.jpg"),
            entry(11, "b pig", "/thumb/11.jpg", "11.jpg"),
        ],
    )
    .await;

    // Assets must be fetched only by the first run
    Mock::given(method("GET"))
        .and(path("/thumb/10.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"10".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumb/11.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"11".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri(), images_dir.path());

    let first = service.run_crawl(None).await.unwrap();
    assert_eq!(first.images_downloaded, 2);

    let second = service.run_crawl(None).await.unwrap();
    assert_eq!(second.status, RunStatus::Success);
    assert_eq!(second.images_found, 2);
    assert_eq!(second.images_downloaded, 0);

    assert_eq!(image_count(&service), 2);
    assert_eq!(files_in(images_dir.path()).len(), 2);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        vec![
            entry(1, "ok one", "/thumb/1.jpg", "1.jpg"),
            entry(2, "broken", "/thumb/missing.jpg", "2.jpg"),
            entry(3, "ok three", "/thumb/3.jpg", "3.jpg"),
        ],
    )
    .await;
    mount_asset(&mock_server, "/thumb/1.jpg", b"one").await;
    mount_asset(&mock_server, "/thumb/3.jpg", b"three").await;
    Mock::given(method("GET"))
        .and(path("/thumb/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let log = service.run_crawl(None).await.unwrap();

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.images_found, 3);
    assert_eq!(log.images_downloaded, 2);

    let catalog = service.catalog().lock().unwrap();
    assert!(catalog.find_by_remote_id(1).unwrap().is_some());
    assert!(catalog.find_by_remote_id(2).unwrap().is_none());
    assert!(catalog.find_by_remote_id(3).unwrap().is_some());
}

#[tokio::test]
async fn test_failed_item_is_retried_by_next_run() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        vec![entry(5, "flaky", "/thumb/5.jpg", "5.jpg")],
    )
    .await;

    // First fetch fails, later fetches succeed
    Mock::given(method("GET"))
        .and(path("/thumb/5.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_asset(&mock_server, "/thumb/5.jpg", b"five").await;

    let service = create_service(&mock_server.uri(), images_dir.path());

    let first = service.run_crawl(None).await.unwrap();
    assert_eq!(first.status, RunStatus::Success);
    assert_eq!(first.images_downloaded, 0);

    let second = service.run_crawl(None).await.unwrap();
    assert_eq!(second.images_downloaded, 1);
    assert_eq!(image_count(&service), 1);
}

#[tokio::test]
async fn test_listing_failure_marks_run_failed() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let log = service.run_crawl(None).await.unwrap();

    assert_eq!(log.status, RunStatus::Failed);
    assert_eq!(log.images_found, 0);
    assert_eq!(log.images_downloaded, 0);
    let error = log.error_message.clone().expect("error message");
    assert!(error.contains("503"), "unexpected error: {}", error);

    let logs = service.list_run_logs(0, 10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0], log);
}

#[tokio::test]
async fn test_undecodable_listing_marks_run_failed() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let log = service.run_crawl(None).await.unwrap();

    assert_eq!(log.status, RunStatus::Failed);
    assert!(log.error_message.is_some());
}

#[tokio::test]
async fn test_listing_request_parameters() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .and(query_param("limit", "7"))
        .and(query_param("sort", "latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let log = service.run_crawl(Some(7)).await.unwrap();

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.images_found, 0);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_absolute_thumbnail_url_is_used_unchanged() {
    let mock_server = MockServer::start().await;
    let cdn_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    let absolute = format!("{}/cdn/pig.webp", cdn_server.uri());
    mount_listing(&mock_server, vec![entry(8, "cdn pig", &absolute, "pig.webp")]).await;

    Mock::given(method("GET"))
        .and(path("/cdn/pig.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"webp".to_vec()))
        .expect(1)
        .mount(&cdn_server)
        .await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let log = service.run_crawl(None).await.unwrap();

    assert_eq!(log.images_downloaded, 1);
    let record = service
        .catalog()
        .lock()
        .unwrap()
        .find_by_remote_id(8)
        .unwrap()
        .unwrap();
    assert_eq!(record.thumbnail_url, absolute);
    assert!(record.local_path.ends_with(".webp"));
    cdn_server.verify().await;
}

#[tokio::test]
async fn test_entries_without_asset_or_filename() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        vec![
            json!({ "id": 20, "title": "no thumbnail" }),
            json!({ "id": 21, "thumbnail": "/thumb/21" }),
            json!({ "title": "no id at all" }),
        ],
    )
    .await;
    mount_asset(&mock_server, "/thumb/21", b"twenty-one").await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let log = service.run_crawl(None).await.unwrap();

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.images_found, 3);
    assert_eq!(log.images_downloaded, 1);

    let record = service
        .catalog()
        .lock()
        .unwrap()
        .find_by_remote_id(21)
        .unwrap()
        .unwrap();
    assert_eq!(record.title, "Untitled");
    assert_eq!(record.image_type, "static");
    assert!(record.local_path.starts_with("21_"));
    assert!(record.local_path.ends_with(".jpg"));
}

#[tokio::test]
async fn test_concurrent_runs_store_each_item_once() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    let entries: Vec<Value> = (1..=6)
        .map(|i| entry(i, &format!("pig {}", i), &format!("/thumb/{}.jpg", i), "x.jpg"))
        .collect();
    mount_listing(&mock_server, entries).await;
    for i in 1..=6 {
        Mock::given(method("GET"))
            .and(path(format!("/thumb/{}.jpg", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![i as u8; 16])
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&mock_server)
            .await;
    }

    let service = create_service(&mock_server.uri(), images_dir.path());
    let (a, b) = tokio::join!(service.run_crawl(None), service.run_crawl(None));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.status, RunStatus::Success);
    assert_eq!(b.status, RunStatus::Success);
    assert_eq!(a.images_downloaded + b.images_downloaded, 6);
    assert_eq!(image_count(&service), 6);

    // Losers of an insert race remove the file they wrote
    assert_eq!(files_in(images_dir.path()).len(), 6);
}

#[tokio::test]
async fn test_trigger_crawl_returns_immediately() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(&mock_server, vec![entry(1, "pig", "/thumb/1.jpg", "1.jpg")]).await;
    mount_asset(&mock_server, "/thumb/1.jpg", b"one").await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let handle = service.trigger_crawl(None);
    handle.await.expect("crawl task panicked");

    let logs = service.list_run_logs(0, 10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, RunStatus::Success);
    assert_eq!(logs[0].images_downloaded, 1);
}

#[tokio::test]
async fn test_scheduler_runs_full_sync_on_empty_catalog() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images": [entry(1, "pig", "/thumb/1.jpg", "1.jpg")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_asset(&mock_server, "/thumb/1.jpg", b"one").await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let mut scheduler = service.start_scheduler().unwrap();
    let initial = scheduler
        .take_initial_crawl()
        .expect("empty catalog should trigger a full sync");
    initial.await.unwrap();
    scheduler.shutdown().await;

    assert_eq!(image_count(&service), 1);
    assert_eq!(service.list_run_logs(0, 10).unwrap().len(), 1);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_scheduler_skips_full_sync_when_catalog_has_images() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(&mock_server, vec![entry(1, "pig", "/thumb/1.jpg", "1.jpg")]).await;
    mount_asset(&mock_server, "/thumb/1.jpg", b"one").await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    service.run_crawl(None).await.unwrap();

    let mut scheduler = service.start_scheduler().unwrap();
    assert!(scheduler.take_initial_crawl().is_none());
    scheduler.shutdown().await;

    assert_eq!(service.list_run_logs(0, 10).unwrap().len(), 1);
}

#[tokio::test]
async fn test_scheduler_ticks_until_shutdown() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(&mock_server, vec![]).await;

    let config = create_test_config(&mock_server.uri(), images_dir.path());
    let catalog = share(SqliteCatalog::new_in_memory().unwrap());
    let coordinator = std::sync::Arc::new(Coordinator::new(&config, catalog.clone()).unwrap());

    let settings = ScheduleSettings {
        interval: Duration::from_millis(100),
        limit: 5,
        full_sync_limit: 50,
    };
    let mut scheduler = Scheduler::start(coordinator, settings).unwrap();
    if let Some(initial) = scheduler.take_initial_crawl() {
        initial.await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(450)).await;
    scheduler.shutdown().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let count_after_shutdown = catalog.lock().unwrap().list_run_logs(0, 100).unwrap().len();
    // Startup full sync plus several ticks
    assert!(
        count_after_shutdown >= 3,
        "expected at least 3 runs, got {}",
        count_after_shutdown
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    let count_later = catalog.lock().unwrap().list_run_logs(0, 100).unwrap().len();
    assert_eq!(count_after_shutdown, count_later);
}

#[tokio::test]
async fn test_delete_image_removes_record_and_file() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(&mock_server, vec![entry(1, "pig", "/thumb/1.jpg", "1.jpg")]).await;
    mount_asset(&mock_server, "/thumb/1.jpg", b"one").await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    service.run_crawl(None).await.unwrap();

    let record = service
        .catalog()
        .lock()
        .unwrap()
        .find_by_remote_id(1)
        .unwrap()
        .unwrap();
    let file = images_dir.path().join(&record.local_path);
    assert!(file.exists());

    let removed = service.delete_image(record.id).await.unwrap();
    assert_eq!(removed.map(|r| r.id), Some(record.id));
    assert!(!file.exists());
    assert_eq!(image_count(&service), 0);

    assert!(service.delete_image(record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_images_pages() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    let entries: Vec<Value> = (1..=5)
        .map(|i| entry(i, "pig", &format!("/thumb/{}.jpg", i), "p.jpg"))
        .collect();
    mount_listing(&mock_server, entries).await;
    for i in 1..=5 {
        mount_asset(&mock_server, &format!("/thumb/{}.jpg", i), b"p").await;
    }

    let service = create_service(&mock_server.uri(), images_dir.path());
    service.run_crawl(None).await.unwrap();

    let first = service.list_images(1, 2).unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.page, 1);
    assert_eq!(first.data.len(), 2);

    let last = service.list_images(3, 2).unwrap();
    assert_eq!(last.data.len(), 1);

    let zero = service.list_images(0, 2).unwrap();
    assert_eq!(zero.page, 1);
    assert_eq!(zero.data, first.data);
}

#[tokio::test]
async fn test_scheduler_shutdown_waits_for_startup_crawl() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    mount_listing(&mock_server, vec![entry(1, "slow pig", "/thumb/1.jpg", "1.jpg")]).await;
    Mock::given(method("GET"))
        .and(path("/thumb/1.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"one".to_vec())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri(), images_dir.path());
    let scheduler = service.start_scheduler().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.shutdown().await;

    let logs = service.list_run_logs(0, 10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, RunStatus::Success);
    assert_eq!(logs[0].images_downloaded, 1);
}

#[tokio::test]
async fn test_scheduler_shutdown_waits_for_scheduled_runs() {
    let mock_server = MockServer::start().await;
    let images_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "images": [] }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), images_dir.path());
    let catalog = share(SqliteCatalog::new_in_memory().unwrap());
    let coordinator = std::sync::Arc::new(Coordinator::new(&config, catalog.clone()).unwrap());

    let settings = ScheduleSettings {
        interval: Duration::from_millis(50),
        limit: 5,
        full_sync_limit: 50,
    };
    let scheduler = Scheduler::start(coordinator, settings).unwrap();

    // Startup sync plus a couple of ticks are in flight, none finished yet
    tokio::time::sleep(Duration::from_millis(130)).await;
    scheduler.shutdown().await;

    let logs = catalog.lock().unwrap().list_run_logs(0, 100).unwrap();
    assert!(logs.len() >= 2, "expected at least 2 runs, got {}", logs.len());
    for log in &logs {
        assert!(log.status.is_terminal(), "run {} left as {}", log.id, log.status);
    }
}

#[tokio::test]
async fn test_delete_image_succeeds_when_file_cannot_be_removed() {
    let images_dir = TempDir::new().unwrap();

    let mut catalog = SqliteCatalog::new_in_memory().unwrap();
    let outcome = catalog
        .insert_image(&NewImage {
            remote_id: 99,
            title: "stuck".to_string(),
            view_count: 0,
            download_count: 0,
            thumbnail_url: "/thumb/99.jpg".to_string(),
            local_path: "99_stuck".to_string(),
            filename: "99.jpg".to_string(),
            duration_label: "static".to_string(),
            image_type: "static".to_string(),
            mtime: 0,
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
        })
        .unwrap();
    let InsertOutcome::Inserted(record) = outcome else {
        panic!("expected insert");
    };

    // A directory in place of the file makes removal fail with something other than NotFound
    std::fs::create_dir_all(images_dir.path().join("99_stuck")).unwrap();

    let config = create_test_config("http://127.0.0.1:9", images_dir.path());
    let service = MirrorService::with_catalog(config, catalog).unwrap();

    let removed = service.delete_image(record.id).await.unwrap();
    assert_eq!(removed.map(|r| r.id), Some(record.id));
    assert_eq!(image_count(&service), 0);
}
