//! End-to-end tests for download sessions against a mock HLS origin.

use std::path::Path;
use std::sync::Arc;

use hls_fetcher::app::{
    find_missing_segments, Coordinator, CoordinatorConfig, HlsClient, LineClassifier, ManifestConfig,
    RetryPolicy, SegmentStatus,
};
use hls_fetcher::errors::{AppError, ManifestError};
use tempfile::TempDir;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Coordinator with immediate retries so failing tests stay fast
fn coordinator(workers: usize, attempts: u32) -> Coordinator {
    let client = Arc::new(HlsClient::new().expect("client"));
    let config = CoordinatorConfig::default()
        .with_worker_count(workers)
        .with_retry_policy(RetryPolicy::flat(attempts));
    Coordinator::new(config, client).expect("coordinator")
}

async fn mount_body(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

async fn read(dir: &Path, name: &str) -> String {
    tokio::fs::read_to_string(dir.join(name))
        .await
        .unwrap_or_else(|e| panic!("{} should exist: {}", name, e))
}

#[tokio::test]
async fn test_nested_manifest_tree_downloads_in_playback_order() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/live/root.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10,\nseg1.ts?token=A\n#EXTINF:10,\nseg2.ts?token=B\nchild.m3u8?token=C\n",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/live/child.m3u8"))
        .and(query_param("token", "C"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("#EXTM3U\n#EXTINF:10,\nseg3.ts?token=D\n#EXT-X-ENDLIST\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    for (name, token) in [("seg1", "A"), ("seg2", "B"), ("seg3", "D")] {
        Mock::given(method("GET"))
            .and(path(format!("/live/{}.ts", name)))
            .and(query_param("token", token))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{} bytes", name)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let result = coordinator(2, 3)
        .download(&url(&server, "/live/root.m3u8?token=R"), temp_dir.path())
        .await
        .expect("session should run");

    assert!(result.is_complete(), "failures: {:?}", result.failures().collect::<Vec<_>>());
    let order: Vec<_> = result.outcomes.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(order, vec!["seg1.ts", "seg2.ts", "seg3.ts"]);
    assert_eq!(result.succeeded, 3);

    assert_eq!(read(temp_dir.path(), "seg1.ts").await, "seg1 bytes");
    assert_eq!(read(temp_dir.path(), "seg3.ts").await, "seg3 bytes");

    let root = read(temp_dir.path(), "root.m3u8").await;
    assert!(root.contains("\nseg1.ts\n"));
    assert!(root.contains("\nchild.m3u8\n"));
    assert!(!root.contains('?'), "stored root still has queries: {}", root);

    let child = read(temp_dir.path(), "child.m3u8").await;
    assert!(child.contains("\nseg3.ts\n"));
    assert!(child.contains("#EXT-X-ENDLIST"));

    let mut entries = tokio::fs::read_dir(temp_dir.path()).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        let name = entry.file_name().to_string_lossy().into_owned();
        assert!(!name.ends_with(".tmp"), "leftover temp file {}", name);
    }
}

#[tokio::test]
async fn test_nested_segments_resolve_against_their_own_manifest() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/master.m3u8", "#EXTM3U\nvariants/hi/index.m3u8\n").await;
    mount_body(&server, "/variants/hi/index.m3u8", "#EXTM3U\nchunk0.ts\nchunk1.ts\n").await;
    mount_body(&server, "/variants/hi/chunk0.ts", "0").await;
    mount_body(&server, "/variants/hi/chunk1.ts", "1").await;

    let result = coordinator(4, 1)
        .download(&url(&server, "/master.m3u8"), temp_dir.path())
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(
        result.outcomes[0].url.path(),
        "/variants/hi/chunk0.ts",
        "segment must be resolved relative to the nested manifest"
    );
    assert_eq!(read(temp_dir.path(), "index.m3u8").await, "#EXTM3U\nchunk0.ts\nchunk1.ts\n");
    assert_eq!(read(temp_dir.path(), "master.m3u8").await, "#EXTM3U\nindex.m3u8\n");
}

#[tokio::test]
async fn test_cyclic_manifests_abort_before_segments() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/a.m3u8", "#EXTM3U\nseg1.ts\nb.m3u8\n").await;
    mount_body(&server, "/b.m3u8", "#EXTM3U\na.m3u8\n").await;
    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = coordinator(2, 3)
        .download(&url(&server, "/a.m3u8"), temp_dir.path())
        .await;

    match result {
        Err(AppError::Manifest(ManifestError::Cyclic { url })) => assert!(url.ends_with("a.m3u8")),
        other => panic!("Expected Cyclic error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unavailable_nested_manifest_is_fatal() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\nseg1.ts\nmissing.m3u8\n").await;
    Mock::given(method("GET"))
        .and(path("/missing.m3u8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = coordinator(2, 3)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await;

    match result {
        Err(AppError::Manifest(ManifestError::Unavailable { url, .. })) => {
            assert!(url.ends_with("missing.m3u8"))
        }
        other => panic!("Expected Unavailable error, got {:?}", other),
    }
    assert!(!temp_dir.path().join("seg1.ts").exists());
}

#[tokio::test]
async fn test_failed_segment_does_not_halt_batch() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\nseg1.ts\nseg2.ts\nseg3.ts\n").await;
    mount_body(&server, "/seg1.ts", "one").await;
    mount_body(&server, "/seg3.ts", "three").await;
    Mock::given(method("GET"))
        .and(path("/seg2.ts"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let result = coordinator(3, 2)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .expect("segment failures are not session errors");

    assert!(!result.is_complete());
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    let failed: Vec<_> = result.failures().map(|o| o.file_name.as_str()).collect();
    assert_eq!(failed, vec!["seg2.ts"]);
    assert!(matches!(result.outcomes[1].status, SegmentStatus::Failed { .. }));
    assert!(temp_dir.path().join("seg3.ts").exists());
    assert!(!temp_dir.path().join("seg2.ts").exists());
}

#[tokio::test]
async fn test_duplicate_segments_fetched_once() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(
        &server,
        "/root.m3u8",
        "#EXTM3U\nseg1.ts?token=a\nseg2.ts\nseg1.ts?token=b\n",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("one"))
        .expect(1)
        .mount(&server)
        .await;
    mount_body(&server, "/seg2.ts", "two").await;

    let result = coordinator(2, 1)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .unwrap();

    assert_eq!(result.segments.len(), 3);
    assert_eq!(result.outcomes.len(), 2);
    assert!(result.is_complete());
}

#[tokio::test]
async fn test_name_collision_rejected_before_fetch() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\nlow/seg1.ts\nhigh/seg1.ts\n").await;
    Mock::given(method("GET"))
        .and(path("/low/seg1.ts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = coordinator(2, 1)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await;

    match result {
        Err(AppError::Manifest(ManifestError::NameCollision { file_name, .. })) => {
            assert_eq!(file_name, "seg1.ts")
        }
        other => panic!("Expected NameCollision, got {:?}", other),
    }
}

#[tokio::test]
async fn test_progress_events_cover_every_segment() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\na.ts\nb.ts\nc.ts\nd.ts\n").await;
    for name in ["a", "b", "c", "d"] {
        mount_body(&server, &format!("/{}.ts", name), name).await;
    }

    let (tx, mut rx) = mpsc::channel(16);
    let session = coordinator(2, 1).with_progress(tx);
    let result = session
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .unwrap();
    drop(session);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(result.is_complete());
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.total == 4 && e.succeeded));
    let mut completed: Vec<_> = events.iter().map(|e| e.completed).collect();
    completed.sort_unstable();
    assert_eq!(completed, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_cancelled_session_skips_segments() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\nseg1.ts\nseg2.ts\n").await;
    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = coordinator(2, 3);
    session.cancellation_token().cancel();
    let result = session
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .unwrap();

    assert!(result.cancelled);
    assert!(!result.is_complete());
    assert_eq!(result.failed, 2);
}

#[tokio::test]
async fn test_empty_playlist_completes() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\n#EXT-X-ENDLIST\n").await;

    let result = coordinator(2, 1)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .unwrap();

    assert!(result.outcomes.is_empty());
    assert!(result.is_complete());
    assert!(temp_dir.path().join("root.m3u8").exists());
}

#[tokio::test]
async fn test_nested_segments_spliced_at_reference_point() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(
        &server,
        "/root.m3u8",
        "#EXTM3U\n#EXT-X-MAP:URI=\"init.ts?x=1\"\nseg1.ts?t=1\nchild.m3u8?t=2\nseg4.ts\n",
    )
    .await;
    mount_body(&server, "/child.m3u8", "#EXTM3U\nseg2.ts\nseg3.ts\n").await;
    Mock::given(method("GET"))
        .and(path("/init.ts"))
        .and(query_param("x", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("init"))
        .expect(1)
        .mount(&server)
        .await;
    for name in ["seg1", "seg2", "seg3", "seg4"] {
        mount_body(&server, &format!("/{}.ts", name), name).await;
    }

    let result = coordinator(3, 1)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .unwrap();

    assert!(result.is_complete());
    let order: Vec<_> = result.segments.iter().map(|s| s.file_name.as_str()).collect();
    assert_eq!(order, vec!["init.ts", "seg1.ts", "seg2.ts", "seg3.ts", "seg4.ts"]);
    assert_eq!(read(temp_dir.path(), "init.ts").await, "init");
    assert_eq!(
        read(temp_dir.path(), "root.m3u8").await,
        "#EXTM3U\n#EXT-X-MAP:URI=\"init.ts\"\nseg1.ts\nchild.m3u8\nseg4.ts\n"
    );
}

#[tokio::test]
async fn test_nested_manifest_cannot_overwrite_root() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/index.m3u8", "#EXTM3U\nhi/index.m3u8\n").await;
    Mock::given(method("GET"))
        .and(path("/hi/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\nhi_000.ts\n"))
        .expect(0)
        .mount(&server)
        .await;

    let result = coordinator(2, 1)
        .download(&url(&server, "/index.m3u8"), temp_dir.path())
        .await;

    match result {
        Err(AppError::Manifest(ManifestError::NameCollision { file_name, second, .. })) => {
            assert_eq!(file_name, "index.m3u8");
            assert!(second.ends_with("/hi/index.m3u8"));
        }
        other => panic!("Expected NameCollision, got {:?}", other),
    }
    assert!(read(temp_dir.path(), "index.m3u8").await.contains("hi/index.m3u8"));
}

#[tokio::test]
async fn test_sibling_variants_with_same_name_rejected() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/master.m3u8", "#EXTM3U\nlo/index.m3u8\nhi/index.m3u8\n").await;
    mount_body(&server, "/lo/index.m3u8", "#EXTM3U\nlo_000.ts\n").await;
    Mock::given(method("GET"))
        .and(path("/hi/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\nhi_000.ts\n"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lo/lo_000.ts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = coordinator(2, 1)
        .download(&url(&server, "/master.m3u8"), temp_dir.path())
        .await;

    match result {
        Err(AppError::Manifest(ManifestError::NameCollision { file_name, first, second })) => {
            assert_eq!(file_name, "index.m3u8");
            assert!(first.ends_with("/lo/index.m3u8"));
            assert!(second.ends_with("/hi/index.m3u8"));
        }
        other => panic!("Expected NameCollision, got {:?}", other),
    }
}

#[tokio::test]
async fn test_shared_child_manifest_is_not_a_collision() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\nchild.m3u8?t=1\nchild.m3u8?t=2\n").await;
    mount_body(&server, "/child.m3u8", "#EXTM3U\nseg1.ts\n").await;
    mount_body(&server, "/seg1.ts", "one").await;

    let result = coordinator(2, 1)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.segments.len(), 2);
    assert_eq!(result.outcomes.len(), 1);
}

#[tokio::test]
async fn test_encoded_segment_names_match_rewritten_manifest() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\nseg 1.ts?token=A\n").await;
    mount_body(&server, "/seg%201.ts", "spaced").await;

    let result = coordinator(1, 1)
        .download(&url(&server, "/root.m3u8"), temp_dir.path())
        .await
        .unwrap();

    assert!(result.is_complete(), "failures: {:?}", result.failures().collect::<Vec<_>>());
    let stored = &result.outcomes[0].file_name;
    assert_eq!(read(temp_dir.path(), stored).await, "spaced");
    assert_eq!(
        read(temp_dir.path(), "root.m3u8").await,
        format!("#EXTM3U\n{}\n", stored)
    );

    let classifier = LineClassifier::new(&ManifestConfig::default()).unwrap();
    let missing = find_missing_segments(&temp_dir.path().join("root.m3u8"), temp_dir.path(), &classifier)
        .await
        .unwrap();
    assert!(missing.is_empty(), "missing: {:?}", missing);
}

#[tokio::test]
async fn test_cancellation_applies_to_later_sessions() {
    let server = MockServer::start().await;
    let first_dir = TempDir::new().expect("failed to create temp dir");
    let second_dir = TempDir::new().expect("failed to create temp dir");

    mount_body(&server, "/root.m3u8", "#EXTM3U\nseg1.ts\n").await;
    Mock::given(method("GET"))
        .and(path("/seg1.ts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = coordinator(1, 1);
    session.cancellation_token().cancel();
    for dir in [&first_dir, &second_dir] {
        let result = session
            .download(&url(&server, "/root.m3u8"), dir.path())
            .await
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.failed, 1);
    }
}
