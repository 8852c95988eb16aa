use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tempfile::tempdir;
use tokio::io::{AsyncRead, ReadBuf};

use gcs_mirror::catalog::{MockCatalog, ObjectReader};
use gcs_mirror::materialize::{
    compare_file_checksum, file_crc32c, file_exists, MaterializeError, Materializer, Outcome,
};
use gcs_mirror::object::ObjectDescriptor;

/// CRC32C (Castagnoli) of b"qwerty".
const QWERTY_CRC32C: u32 = 3283772498;

fn qwerty_object(name: &str) -> ObjectDescriptor {
    ObjectDescriptor::new(name, "test-bucket", QWERTY_CRC32C).expect("valid descriptor")
}

fn qwerty_reader() -> ObjectReader {
    Box::new(Cursor::new(b"qwerty".to_vec()))
}

/// Reader that never produces data, for exercising the transfer timeout.
struct StallReader;

impl AsyncRead for StallReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Pending
    }
}

#[tokio::test]
async fn checksum_of_known_content() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("qwerty.txt");
    tokio::fs::write(&path, b"qwerty").await.expect("write");

    let sum = file_crc32c(&path).await.expect("checksum");
    assert_eq!(sum, QWERTY_CRC32C);
}

#[tokio::test]
async fn compare_detects_match_and_mismatch() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("file.txt");
    tokio::fs::write(&path, b"qwerty").await.expect("write");

    assert!(compare_file_checksum(&path, QWERTY_CRC32C)
        .await
        .expect("compare"));
    assert!(!compare_file_checksum(&path, QWERTY_CRC32C + 1)
        .await
        .expect("compare"));
}

#[tokio::test]
async fn compare_of_missing_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.txt");

    let err = compare_file_checksum(&path, QWERTY_CRC32C)
        .await
        .expect_err("missing file must not compare");
    assert!(matches!(err, MaterializeError::Open { .. }));
}

#[tokio::test]
async fn file_existence_is_reported() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("present.txt");

    assert!(!file_exists(&path).await.expect("stat"));
    tokio::fs::write(&path, b"x").await.expect("write");
    assert!(file_exists(&path).await.expect("stat"));
}

#[tokio::test]
async fn matching_local_copy_is_skipped_without_opening_remote() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("current.txt");
    tokio::fs::write(&path, b"qwerty").await.expect("write");

    let mut catalog = MockCatalog::new();
    catalog.expect_open_object().times(0);

    let materializer = Materializer::new(dir.path(), Duration::from_secs(5));
    let outcome = materializer
        .sync_object(&catalog, &qwerty_object("current.txt"))
        .await
        .expect("sync");
    assert_eq!(outcome, Outcome::Skipped);

    let content = tokio::fs::read(&path).await.expect("read back");
    assert_eq!(content, b"qwerty");
}

#[tokio::test]
async fn stale_local_copy_is_replaced() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("stale.txt");
    tokio::fs::write(&path, b"previous content, longer than the update")
        .await
        .expect("write");

    let mut catalog = MockCatalog::new();
    catalog
        .expect_open_object()
        .times(1)
        .returning(|_| Ok(qwerty_reader()));

    let materializer = Materializer::new(dir.path(), Duration::from_secs(5));
    let outcome = materializer
        .sync_object(&catalog, &qwerty_object("stale.txt"))
        .await
        .expect("sync");
    assert_eq!(outcome, Outcome::Replaced);

    let content = tokio::fs::read(&path).await.expect("read back");
    assert_eq!(content, b"qwerty");
}

#[tokio::test]
async fn missing_file_with_nested_name_is_created() {
    let dir = tempdir().expect("tempdir");

    let mut catalog = MockCatalog::new();
    catalog
        .expect_open_object()
        .times(1)
        .returning(|_| Ok(qwerty_reader()));

    let materializer = Materializer::new(dir.path(), Duration::from_secs(5));
    let outcome = materializer
        .sync_object(&catalog, &qwerty_object("deep/nested/file.txt"))
        .await
        .expect("sync");
    assert_eq!(outcome, Outcome::Created);

    let content = tokio::fs::read(dir.path().join("deep/nested/file.txt"))
        .await
        .expect("read back");
    assert_eq!(content, b"qwerty");
}

#[tokio::test]
async fn stalled_transfer_times_out() {
    let dir = tempdir().expect("tempdir");

    let mut catalog = MockCatalog::new();
    catalog
        .expect_open_object()
        .returning(|_| Ok(Box::new(StallReader) as ObjectReader));

    let materializer = Materializer::new(dir.path(), Duration::from_millis(50));
    let err = materializer
        .sync_object(&catalog, &qwerty_object("stalled.txt"))
        .await
        .expect_err("stalled transfer must time out");
    assert!(matches!(err, MaterializeError::Timeout { .. }));
}
