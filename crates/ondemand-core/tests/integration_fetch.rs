//! Integration tests: artifact fetches against a local HTTP server.
//!
//! Covers filename derivation, idempotence (request counting), failure cleanup,
//! credentials, checksum verification, progress events and concurrent callers.

mod common;

use common::artifact_server::{ArtifactServer, Route};
use ondemand_core::fetcher::{
    CacheIndex, CachePolicy, ChunkSize, DownloadRequest, FetchError, FetchOutcome, FetchSettings,
    Fetcher, NoProgress, ProgressSink,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::tempdir;

/// Visible files in `dir`, ignoring the cache index sidecar.
fn artifacts_in(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n != ondemand_core::fetcher::INDEX_FILE_NAME)
        .collect();
    names.sort();
    names
}

#[test]
fn downloads_under_url_path_name() {
    let server = ArtifactServer::start(vec![("/models/a.bin", Route::file("payload"))]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/models/a.bin?type=Model"), dir.path(), "a");

    let out = Fetcher::default().fetch(&req, &NoProgress).unwrap();

    let path = dir.path().join("a.bin");
    assert_eq!(
        out,
        FetchOutcome::Downloaded {
            path: path.clone(),
            bytes: 7
        }
    );
    assert_eq!(fs::read(&path).unwrap(), b"payload");
    assert_eq!(artifacts_in(dir.path()), vec!["a.bin"]);
}

#[test]
fn second_fetch_makes_no_request() {
    let server = ArtifactServer::start(vec![("/a.bin", Route::file("payload"))]);
    let dir = tempdir().unwrap();
    let fetcher = Fetcher::default();
    let req = DownloadRequest::new(server.url("/a.bin"), dir.path(), "a");

    let first = fetcher.fetch(&req, &NoProgress).unwrap();
    let second = fetcher.fetch(&req, &NoProgress).unwrap();

    assert!(!first.is_cached());
    assert_eq!(second, FetchOutcome::Cached(dir.path().join("a.bin")));
    assert_eq!(server.hits(), 1);
}

#[test]
fn existing_file_is_kept_and_body_not_stored() {
    let server = ArtifactServer::start(vec![("/a.bin", Route::file("new contents"))]);
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), b"old").unwrap();
    let fetcher = Fetcher::default();
    let req = DownloadRequest::new(server.url("/a.bin"), dir.path(), "a");

    let out = fetcher.fetch(&req, &NoProgress).unwrap();

    assert_eq!(out, FetchOutcome::Cached(dir.path().join("a.bin")));
    assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), b"old");
    assert_eq!(artifacts_in(dir.path()), vec!["a.bin"]);

    fetcher.fetch(&req, &NoProgress).unwrap();
    assert_eq!(server.hits(), 1);
}

#[test]
fn content_disposition_names_the_file() {
    let server = ArtifactServer::start(vec![(
        "/api/download/models/42",
        Route::attachment("w", "attachment; filename=\"detail.safetensors\""),
    )]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/api/download/models/42"), dir.path(), "d");

    let out = Fetcher::default().fetch(&req, &NoProgress).unwrap();

    assert_eq!(out.file_name().as_deref(), Some("detail.safetensors"));
}

#[test]
fn extended_filename_takes_precedence() {
    let server = ArtifactServer::start(vec![(
        "/dl",
        Route::attachment(
            "w",
            "attachment; filename=\"plain.bin\"; filename*=UTF-8''caf%C3%A9.safetensors",
        ),
    )]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/dl"), dir.path(), "c");

    let out = Fetcher::default().fetch(&req, &NoProgress).unwrap();

    assert_eq!(out.file_name().as_deref(), Some("café.safetensors"));
}

#[test]
fn redirect_uses_final_response_headers() {
    let server = ArtifactServer::start(vec![
        ("/download/7", Route::Redirect("/files/blob".to_string())),
        (
            "/files/blob",
            Route::attachment("weights", "attachment; filename=final.safetensors"),
        ),
    ]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/download/7"), dir.path(), "r");

    let out = Fetcher::default().fetch(&req, &NoProgress).unwrap();

    assert_eq!(out.path(), dir.path().join("final.safetensors"));
    assert_eq!(server.hits_for("/download/7"), 1);
    assert_eq!(server.hits_for("/files/blob"), 1);
}

#[test]
fn http_errors_leave_no_file() {
    let server = ArtifactServer::start(vec![("/down", Route::Status(503))]);
    let dir = tempdir().unwrap();
    let fetcher = Fetcher::default();

    let missing = DownloadRequest::new(server.url("/missing.bin"), dir.path(), "m");
    assert!(matches!(
        fetcher.fetch(&missing, &NoProgress),
        Err(FetchError::Http(404))
    ));

    let down = DownloadRequest::new(server.url("/down"), dir.path(), "d");
    assert!(matches!(
        fetcher.fetch(&down, &NoProgress),
        Err(FetchError::Http(503))
    ));

    assert!(artifacts_in(dir.path()).is_empty());
}

#[test]
fn truncated_body_leaves_no_file() {
    let server = ArtifactServer::start(vec![(
        "/big.bin",
        Route::Truncated {
            body: vec![1u8; 10],
            claimed_len: 1000,
        },
    )]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/big.bin"), dir.path(), "big");

    let err = Fetcher::default().fetch(&req, &NoProgress).unwrap_err();

    assert!(err.is_network(), "unexpected error: {}", err);
    assert!(artifacts_in(dir.path()).is_empty());
}

#[test]
fn unreachable_host_is_network_error() {
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new("http://127.0.0.1:9/a.bin", dir.path(), "a");
    let err = Fetcher::default().fetch(&req, &NoProgress).unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
    assert!(artifacts_in(dir.path()).is_empty());
}

#[test]
fn bearer_token_sent_when_non_empty() {
    let server = ArtifactServer::start(vec![("/private.bin", Route::protected("s", "tok"))]);
    let fetcher = Fetcher::default();

    let dir = tempdir().unwrap();
    let anon = DownloadRequest::new(server.url("/private.bin"), dir.path(), "p")
        .with_credential(Some(String::new()));
    assert!(matches!(
        fetcher.fetch(&anon, &NoProgress),
        Err(FetchError::Http(401))
    ));
    assert_eq!(server.last_authorization(), None);
    assert!(artifacts_in(dir.path()).is_empty());

    let authed = anon.with_credential(Some("tok".to_string()));
    fetcher.fetch(&authed, &NoProgress).unwrap();
    assert_eq!(server.last_authorization().as_deref(), Some("Bearer tok"));
}

#[test]
fn destination_directory_is_created() {
    let server = ArtifactServer::start(vec![("/a.bin", Route::file("x"))]);
    let root = tempdir().unwrap();
    let dir = root.path().join("models").join("loras");
    let req = DownloadRequest::new(server.url("/a.bin"), &dir, "a");

    Fetcher::default().fetch(&req, &NoProgress).unwrap();

    assert!(dir.join("a.bin").is_file());
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn verifying_fetcher() -> Fetcher {
    Fetcher::new(FetchSettings {
        cache_policy: CachePolicy::VerifySha256,
        ..FetchSettings::default()
    })
}

#[test]
fn checksum_mismatch_discards_download() {
    let server = ArtifactServer::start(vec![("/a.bin", Route::file("payload"))]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/a.bin"), dir.path(), "a")
        .with_expected_sha256(Some(sha256_hex(b"something else")));

    let err = verifying_fetcher().fetch(&req, &NoProgress).unwrap_err();

    assert!(matches!(err, FetchError::ChecksumMismatch { .. }));
    assert!(artifacts_in(dir.path()).is_empty());
}

#[test]
fn corrupt_cached_file_is_replaced_when_verifying() {
    let server = ArtifactServer::start(vec![("/a.bin", Route::file("payload"))]);
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), b"corrupt").unwrap();
    let req = DownloadRequest::new(server.url("/a.bin"), dir.path(), "a")
        .with_expected_sha256(Some(sha256_hex(b"payload")));
    let fetcher = verifying_fetcher();

    let out = fetcher.fetch(&req, &NoProgress).unwrap();
    assert!(!out.is_cached());
    assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), b"payload");

    let again = fetcher.fetch(&req, &NoProgress).unwrap();
    assert!(again.is_cached());
    assert_eq!(server.hits(), 1);
}

#[test]
fn trust_existing_ignores_digest() {
    let server = ArtifactServer::start(vec![("/a.bin", Route::file("payload"))]);
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), b"corrupt").unwrap();
    let req = DownloadRequest::new(server.url("/a.bin"), dir.path(), "a")
        .with_expected_sha256(Some(sha256_hex(b"payload")));

    let out = Fetcher::default().fetch(&req, &NoProgress).unwrap();

    assert!(out.is_cached());
    assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), b"corrupt");
}

#[test]
fn concurrent_fetches_download_once() {
    let body: Vec<u8> = (0u8..255).cycle().take(256 * 1024).collect();
    let server = ArtifactServer::start(vec![("/shared.bin", Route::file(body.clone()))]);
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(Fetcher::default());
    let url = server.url("/shared.bin");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let fetcher = Arc::clone(&fetcher);
            let req = DownloadRequest::new(url.clone(), dir.path(), format!("caller {}", i));
            thread::spawn(move || fetcher.fetch(&req, &NoProgress).unwrap())
        })
        .collect();
    let outcomes: Vec<FetchOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(outcomes.iter().filter(|o| !o.is_cached()).count(), 1);
    assert!(outcomes
        .iter()
        .all(|o| o.path() == dir.path().join("shared.bin")));
    assert_eq!(server.hits(), 1);
    assert_eq!(fs::read(dir.path().join("shared.bin")).unwrap(), body);
    assert_eq!(artifacts_in(dir.path()), vec!["shared.bin"]);
}

#[test]
fn long_attachment_name_is_stored_whole() {
    let long = format!("{}.safetensors", "a".repeat(238));
    assert_eq!(long.len(), 250);
    let server = ArtifactServer::start(vec![(
        "/api/download/models/7",
        Route::attachment("weights", &format!("attachment; filename=\"{}\"", long)),
    )]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/api/download/models/7"), dir.path(), "long");

    let out = Fetcher::default().fetch(&req, &NoProgress).unwrap();

    assert!(!out.is_cached());
    assert_eq!(out.file_name().as_deref(), Some(long.as_str()));
    assert_eq!(fs::read(dir.path().join(&long)).unwrap(), b"weights");
    assert_eq!(artifacts_in(dir.path()), vec![long]);
}

#[test]
fn concurrent_fetches_of_distinct_urls_keep_every_index_entry() {
    let paths: Vec<String> = (0..8).map(|i| format!("/lora{}.safetensors", i)).collect();
    let routes = paths
        .iter()
        .map(|p| (p.as_str(), Route::file(p.as_bytes().to_vec())))
        .collect();
    let server = ArtifactServer::start(routes);
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(Fetcher::default());

    let handles: Vec<_> = paths
        .iter()
        .map(|p| {
            let fetcher = Arc::clone(&fetcher);
            let req = DownloadRequest::new(server.url(p), dir.path(), p.clone());
            thread::spawn(move || fetcher.fetch(&req, &NoProgress).unwrap())
        })
        .collect();
    for h in handles {
        assert!(!h.join().unwrap().is_cached());
    }
    assert_eq!(server.hits(), 8);

    let index = CacheIndex::open(dir.path());
    for p in &paths {
        assert_eq!(index.lookup(&server.url(p)), Some(&p[1..]), "entry for {}", p);
    }

    for p in &paths {
        let req = DownloadRequest::new(server.url(p), dir.path(), p.clone());
        assert!(fetcher.fetch(&req, &NoProgress).unwrap().is_cached());
    }
    assert_eq!(server.hits(), 8);
}

#[derive(Debug, PartialEq)]
enum ProgressEvent {
    Start(String, Option<u64>),
    Progress(u64, Option<u64>),
    Finish(u64),
}

#[derive(Default)]
struct RecordingProgress(Mutex<Vec<ProgressEvent>>);

impl ProgressSink for RecordingProgress {
    fn on_start(&self, name: &str, total: Option<u64>) {
        self.0
            .lock()
            .unwrap()
            .push(ProgressEvent::Start(name.to_string(), total));
    }

    fn on_progress(&self, received: u64, total: Option<u64>) {
        self.0
            .lock()
            .unwrap()
            .push(ProgressEvent::Progress(received, total));
    }

    fn on_finish(&self, received: u64) {
        self.0.lock().unwrap().push(ProgressEvent::Finish(received));
    }
}

#[test]
fn progress_events_follow_the_transfer() {
    let body: Vec<u8> = (0u8..=255).cycle().take(64 * 1024).collect();
    let len = body.len() as u64;
    let server = ArtifactServer::start(vec![("/big.bin", Route::file(body))]);
    let dir = tempdir().unwrap();
    let req = DownloadRequest::new(server.url("/big.bin"), dir.path(), "big")
        .with_chunk_size(ChunkSize::new(4).unwrap());
    let sink = RecordingProgress::default();

    let out = Fetcher::default().fetch(&req, &sink).unwrap();
    assert!(!out.is_cached());

    let events = sink.0.into_inner().unwrap();
    assert_eq!(
        events.first(),
        Some(&ProgressEvent::Start("big".to_string(), Some(len)))
    );
    assert_eq!(events.last(), Some(&ProgressEvent::Finish(len)));
    let received: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress(n, total) => {
                assert_eq!(*total, Some(len));
                Some(*n)
            }
            _ => None,
        })
        .collect();
    assert!(!received.is_empty());
    assert!(received.windows(2).all(|w| w[0] < w[1]), "{:?}", received);
    assert_eq!(received.last(), Some(&len));
}
