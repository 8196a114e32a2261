//! Byte inputs are staged in temporary files; none may survive a call.

use std::sync::Arc;
use tempfile::tempdir;
use textxtract::plugins::HandlerRegistry;
use textxtract::{AsyncExtractor, ConfigOverrides, ErrorKind, SyncExtractor};

mod helpers;

use helpers::leftover_entries;

#[test]
fn test_sync_success_and_failure_leave_nothing() {
    let scratch = tempdir().unwrap();
    let overrides = ConfigOverrides::default().with_temp_dir(scratch.path());
    let extractor = SyncExtractor::with_config(overrides)
        .unwrap()
        .with_registry(Arc::new(HandlerRegistry::with_defaults()));

    assert_eq!(extractor.extract(b"ok".to_vec(), Some("a.txt"), None).unwrap(), "ok");
    assert!(leftover_entries(scratch.path()).is_empty());

    let err = extractor.extract(b"{broken".to_vec(), Some("b.json"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFile);
    assert!(leftover_entries(scratch.path()).is_empty());

    let err = extractor.extract(b"ok,\xc3\x28".to_vec(), Some("c.csv"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(leftover_entries(scratch.path()).is_empty());
}

#[test]
fn test_rejected_input_never_touches_disk() {
    let scratch = tempdir().unwrap();
    let overrides = ConfigOverrides::default()
        .with_temp_dir(scratch.path())
        .with_max_file_size(4);
    let extractor = SyncExtractor::with_config(overrides)
        .unwrap()
        .with_registry(Arc::new(HandlerRegistry::with_defaults()));

    let err = extractor.extract(b"far too long".to_vec(), Some("a.txt"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFile);
    let err = extractor.extract(b"tiny".to_vec(), Some("a.exe"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileTypeNotSupported);
    assert!(leftover_entries(scratch.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_batch_leaves_nothing() {
    let scratch = tempdir().unwrap();
    let extractor = Arc::new(
        AsyncExtractor::with_config(
            ConfigOverrides::default()
                .with_temp_dir(scratch.path())
                .with_max_workers(3),
        )
        .unwrap()
        .with_registry(Arc::new(HandlerRegistry::with_defaults())),
    );

    let mut handles = Vec::new();
    for i in 0..12 {
        let extractor = Arc::clone(&extractor);
        handles.push(tokio::spawn(async move {
            let (bytes, name) = if i % 3 == 0 {
                (b"{bad".to_vec(), format!("{i}.json"))
            } else {
                (format!("doc {i}").into_bytes(), format!("{i}.txt"))
            };
            extractor.extract(bytes, Some(name.as_str()), None).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        if i % 3 == 0 {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidFile);
        } else {
            assert_eq!(result.unwrap(), format!("doc {i}"));
        }
    }

    extractor.close().await;
    assert!(leftover_entries(scratch.path()).is_empty());
}
