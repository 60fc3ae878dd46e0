//! Voice asset provisioning tests
//!
//! Exercises the download pipeline end to end against temp directories and
//! in-memory zips:
//! - Debug builds and existing installs never download
//! - Failure states and their messages
//! - Archive verification, unsafe paths and temp file cleanup
//! - Single-flight attempts and cancellation
//! - Catalog freshness and voice file lookup

mod common;

use bridge_traits::time::ManualClock;
use chrono::{TimeZone, Utc};
use common::*;
use core_playback::{DownloadState, MetadataSource, MetadataState, PlaybackError};
use core_runtime::config::BuildMode;
use std::sync::Arc;
use std::time::Duration;

async fn wait_for_download(
    rx: &mut tokio::sync::watch::Receiver<DownloadState>,
    pred: impl FnMut(&DownloadState) -> bool,
) -> DownloadState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for download state")
        .expect("download state channel closed")
        .clone()
}

#[tokio::test]
async fn test_debug_build_completes_without_network() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(Vec::new()),
        StaticNetwork::offline(),
        MemoryBundle::debug_assets(),
    );
    let provisioner = fixture.provisioner(BuildMode::Debug);

    provisioner.ensure_available().await.unwrap();

    assert_eq!(provisioner.current_download_state(), DownloadState::Completed);
    assert_eq!(fixture.http.download_count(), 0);
    assert_eq!(
        fixture
            .http
            .release_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_existing_install_skips_download() {
    let fixture = Fixture::new(MockHttp::serving(Vec::new()));
    fixture.install_local_pack();
    let provisioner = fixture.provisioner(BuildMode::Release);

    provisioner.ensure_available().await.unwrap();

    assert_eq!(provisioner.current_download_state(), DownloadState::Completed);
    assert_eq!(fixture.http.download_count(), 0);
}

#[tokio::test]
async fn test_full_download_installs_pack() {
    let fixture = Fixture::new(MockHttp::serving(voice_pack().await));
    let provisioner = fixture.provisioner(BuildMode::Release);
    let mut states = provisioner.download_state();

    let recorder = tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let state = states.borrow_and_update().clone();
            let done = state.is_terminal();
            seen.push(state);
            if done || states.changed().await.is_err() {
                break;
            }
        }
        seen
    });

    provisioner.ensure_available().await.unwrap();
    let seen = recorder.await.unwrap();

    assert_eq!(seen.last(), Some(&DownloadState::Completed));

    // Progress within each phase never goes backwards.
    let downloading: Vec<f32> = seen
        .iter()
        .filter_map(|s| match s {
            DownloadState::Downloading(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert!(downloading.windows(2).all(|w| w[0] <= w[1]));
    let extracting: Vec<f32> = seen
        .iter()
        .filter_map(|s| match s {
            DownloadState::Extracting(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert!(extracting.windows(2).all(|w| w[0] <= w[1]));

    let data = fixture.data_dir();
    assert_eq!(std::fs::read(data.join("voice/b.mp3")).unwrap(), b"clip-b");
    assert!(data.join("metadata/voice_files.json").exists());
    assert!(!data.join("voice/b.mp3.tmp").exists());
    assert!(!fixture.temp_archive().exists());

    assert_eq!(
        *provisioner.metadata_state().borrow(),
        MetadataState::Loaded(MetadataSource::Server)
    );
    assert_eq!(provisioner.audio_files().borrow().len(), 3);
}

#[tokio::test]
async fn test_offline_reports_no_connection() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(voice_pack().await),
        StaticNetwork::offline(),
        MemoryBundle::default(),
    );
    let provisioner = fixture.provisioner(BuildMode::Release);

    let err = provisioner.ensure_available().await.unwrap_err();

    assert!(matches!(err, PlaybackError::NoConnection));
    assert_eq!(
        provisioner.current_download_state(),
        DownloadState::Error("No internet connection".to_string())
    );
    assert_eq!(fixture.http.download_count(), 0);
}

#[tokio::test]
async fn test_release_without_archive_asset() {
    let http = MockHttp::serving(Vec::new()).with_release(200, r#"{"assets": []}"#);
    let fixture = Fixture::new(http);
    let provisioner = fixture.provisioner(BuildMode::Release);

    assert!(provisioner.ensure_available().await.is_err());
    assert_eq!(
        provisioner.current_download_state(),
        DownloadState::Error("Could not resolve latest release".to_string())
    );
}

#[tokio::test]
async fn test_http_error_status() {
    let fixture = Fixture::new(MockHttp::with_archive(ArchiveResponse::Body {
        status: 404,
        data: Vec::new(),
    }));
    let provisioner = fixture.provisioner(BuildMode::Release);

    let err = provisioner.ensure_available().await.unwrap_err();

    assert!(matches!(err, PlaybackError::HttpStatus { status: 404, .. }));
    assert_eq!(
        provisioner.current_download_state(),
        DownloadState::Error("Download failed (HTTP 404)".to_string())
    );
}

#[tokio::test]
async fn test_archive_missing_voice_files_is_rejected() {
    let archive = build_zip(&[
        ("metadata/categories.json", CATEGORIES_JSON.as_bytes()),
        ("voice/a.mp3", b"clip-a"),
    ])
    .await;
    let fixture = Fixture::new(MockHttp::serving(archive));
    let provisioner = fixture.provisioner(BuildMode::Release);

    let err = provisioner.ensure_available().await.unwrap_err();

    assert!(err.is_integrity_error());
    assert_eq!(
        provisioner.current_download_state(),
        DownloadState::Error("Invalid voice asset archive".to_string())
    );
    assert!(!fixture.temp_archive().exists());
    assert!(!fixture.data_dir().join("voice/a.mp3").exists());
}

#[tokio::test]
async fn test_garbage_archive_is_rejected() {
    let fixture = Fixture::new(MockHttp::serving(b"definitely not a zip".to_vec()));
    let provisioner = fixture.provisioner(BuildMode::Release);

    let err = provisioner.ensure_available().await.unwrap_err();

    assert!(err.is_integrity_error());
    assert!(!fixture.temp_archive().exists());
}

#[tokio::test]
async fn test_unsafe_entry_paths_are_rejected() {
    let archive = build_zip(&[
        ("metadata/categories.json", CATEGORIES_JSON.as_bytes()),
        ("metadata/voice_files.json", VOICE_FILES_JSON.as_bytes()),
        ("voice/a.mp3", b"clip-a"),
        ("../escape.txt", b"nope"),
    ])
    .await;
    let fixture = Fixture::new(MockHttp::serving(archive));
    let provisioner = fixture.provisioner(BuildMode::Release);

    let err = provisioner.ensure_available().await.unwrap_err();

    assert!(err.is_integrity_error());
    assert!(!fixture.dirs.path().join("escape.txt").exists());
    assert!(!fixture.data_dir().join("voice/a.mp3").exists());
}

#[tokio::test]
async fn test_concurrent_callers_share_one_download() {
    let fixture = Fixture::new(MockHttp::serving(voice_pack().await));
    let provisioner = fixture.provisioner(BuildMode::Release);

    let (a, b) = tokio::join!(provisioner.ensure_available(), provisioner.ensure_available());

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(fixture.http.download_count(), 1);

    // Further calls are no-ops.
    provisioner.ensure_available().await.unwrap();
    assert_eq!(fixture.http.download_count(), 1);
}

#[tokio::test]
async fn test_waiting_caller_observes_failure() {
    let fixture = Fixture::new(MockHttp::with_archive(ArchiveResponse::Body {
        status: 500,
        data: Vec::new(),
    }));
    let provisioner = fixture.provisioner(BuildMode::Release);

    let (a, b) = tokio::join!(provisioner.ensure_available(), provisioner.ensure_available());

    assert!(a.is_err());
    let b = b.unwrap_err();
    assert_eq!(b.download_message(), "Download failed (HTTP 500)");
    assert_eq!(fixture.http.download_count(), 1);
}

#[tokio::test]
async fn test_cancel_deletes_temp_archive() {
    let fixture = Fixture::new(MockHttp::with_archive(ArchiveResponse::Stalled {
        prefix: vec![7u8; 64],
        declared_len: 10_000,
    }));
    let provisioner = Arc::new(fixture.provisioner(BuildMode::Release));
    let mut states = provisioner.download_state();

    assert!(!provisioner.cancel_in_flight());

    let task = {
        let provisioner = provisioner.clone();
        tokio::spawn(async move { provisioner.ensure_available().await })
    };

    wait_for_download(&mut states, |s| {
        matches!(s, DownloadState::Downloading(p) if *p > 0.0)
    })
    .await;
    assert!(fixture.temp_archive().exists());

    assert!(provisioner.cancel_in_flight());
    let result = task.await.unwrap();

    assert!(matches!(result, Err(PlaybackError::Cancelled)));
    assert_eq!(
        provisioner.current_download_state(),
        DownloadState::Error("Download cancelled".to_string())
    );
    assert!(!fixture.temp_archive().exists());
}

#[tokio::test]
async fn test_retry_after_failure() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(voice_pack().await),
        StaticNetwork::offline(),
        MemoryBundle::default(),
    );
    let provisioner = fixture.provisioner(BuildMode::Release);

    assert!(provisioner.ensure_available().await.is_err());

    fixture.network.set_connected(true);
    provisioner.retry().await.unwrap();

    assert_eq!(provisioner.current_download_state(), DownloadState::Completed);
    assert_eq!(fixture.http.download_count(), 1);
}

#[tokio::test]
async fn test_metadata_freshness_window() {
    let fixture = Fixture::new(MockHttp::serving(Vec::new()));
    fixture.install_local_pack();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let provisioner = fixture.provisioner_with_clock(BuildMode::Release, clock.clone());

    let catalog = provisioner.fetch_metadata().await.unwrap();
    assert_eq!(catalog.voice_files.len(), 3);
    assert_eq!(
        *provisioner.metadata_state().borrow(),
        MetadataState::Loaded(MetadataSource::Server)
    );

    clock.advance(chrono::Duration::hours(23));
    provisioner.fetch_metadata().await.unwrap();
    assert_eq!(
        *provisioner.metadata_state().borrow(),
        MetadataState::Loaded(MetadataSource::Cache)
    );

    clock.advance(chrono::Duration::hours(2));
    provisioner.fetch_metadata().await.unwrap();
    assert_eq!(
        *provisioner.metadata_state().borrow(),
        MetadataState::Loaded(MetadataSource::Server)
    );
}

#[tokio::test]
async fn test_offline_metadata_falls_back_to_disk() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(Vec::new()),
        StaticNetwork::offline(),
        MemoryBundle::default(),
    );
    let provisioner = fixture.provisioner(BuildMode::Release);

    assert!(provisioner.fetch_metadata().await.is_err());
    assert_eq!(
        *provisioner.metadata_state().borrow(),
        MetadataState::Error("No internet connection".to_string())
    );

    fixture.install_local_pack();
    let files = provisioner.load_metadata().await.unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0].category.as_deref(), Some("greetings"));
    assert_eq!(
        *provisioner.metadata_state().borrow(),
        MetadataState::Loaded(MetadataSource::Cache)
    );
}

#[tokio::test]
async fn test_debug_metadata_uses_bundle() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(Vec::new()),
        StaticNetwork::offline(),
        MemoryBundle::debug_assets(),
    );
    let provisioner = fixture.provisioner(BuildMode::Debug);

    let files = provisioner.load_metadata().await.unwrap();

    assert_eq!(files.len(), 3);
    assert_eq!(
        *provisioner.metadata_state().borrow(),
        MetadataState::Loaded(MetadataSource::BundledFallback)
    );
    assert_eq!(*provisioner.audio_files().borrow(), files);
}

#[tokio::test]
async fn test_voice_file_lookup_order() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(Vec::new()),
        StaticNetwork::offline(),
        MemoryBundle::debug_assets(),
    );
    fixture.install_local_pack();

    let release = fixture.provisioner(BuildMode::Release);
    let path = release.voice_file("a.mp3").await.unwrap();
    assert_eq!(path, fixture.data_dir().join("voice/a.mp3"));

    let debug = fixture.provisioner(BuildMode::Debug);
    let path = debug.voice_file("a.mp3").await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"bundled-a");

    assert!(release.voice_file("missing.mp3").await.is_none());
    assert!(release.voice_file("../../etc/passwd").await.is_none());
}

#[tokio::test]
async fn test_release_falls_back_to_bundle_copy() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(Vec::new()),
        StaticNetwork::offline(),
        MemoryBundle::debug_assets(),
    );
    let provisioner = fixture.provisioner(BuildMode::Release);

    let path = provisioner.voice_file("a.mp3").await.unwrap();

    assert!(path.starts_with(fixture.dirs.path().join("cache")));
    assert_eq!(std::fs::read(&path).unwrap(), b"bundled-a");
}

#[tokio::test]
async fn test_bundle_copy_is_reused() {
    let fixture = Fixture::with_parts(
        MockHttp::serving(Vec::new()),
        StaticNetwork::offline(),
        MemoryBundle::debug_assets(),
    );
    let provisioner = fixture.provisioner(BuildMode::Debug);

    let first = provisioner.voice_file("a.mp3").await.unwrap();
    std::fs::write(&first, b"already-cached").unwrap();

    let second = provisioner.voice_file("a.mp3").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(std::fs::read(&second).unwrap(), b"already-cached");
}
