//! Unit tests for streamed downloads.

use super::*;
use rstest::{fixture, rstest};
use std::cell::Cell;
use std::io::Cursor;
use ureq::http::HeaderValue;

const URL: &str = "https://example.test/DoL.zip";

struct Staging {
    _temp: tempfile::TempDir,
    path: Utf8PathBuf,
}

impl Staging {
    fn entries(&self) -> Vec<String> {
        std::fs::read_dir(&self.path)
            .expect("read staging dir")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }
}

#[fixture]
fn staging() -> Staging {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    Staging { _temp: temp, path }
}

#[derive(Default)]
struct RecordingProgress {
    total: Cell<Option<Option<u64>>>,
    advanced: Cell<u64>,
    finished: Cell<u32>,
}

impl DownloadProgress for RecordingProgress {
    fn started(&self, total_bytes: Option<u64>) {
        self.total.set(Some(total_bytes));
    }

    fn advanced(&self, bytes: u64) {
        self.advanced.set(self.advanced.get() + bytes);
    }

    fn finished(&self) {
        self.finished.set(self.finished.get() + 1);
    }
}

/// Yields `body` and then fails with `kind`.
struct FailingReader {
    body: Cursor<Vec<u8>>,
    kind: ErrorKind,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.body.read(buf)?;
        if read == 0 {
            return Err(std::io::Error::new(self.kind, "connection reset"));
        }
        Ok(read)
    }
}

#[rstest]
fn complete_body_is_kept_until_removed(staging: Staging) {
    let body = b"PK\x03\x04 archive bytes".to_vec();
    let expected = u64::try_from(body.len()).expect("fits");
    let mut reader = Cursor::new(body.clone());

    let archive = write_body(URL, &mut reader, Some(expected), &staging.path, &SilentProgress)
        .expect("download succeeds");

    assert_eq!(archive.size(), expected);
    assert_eq!(std::fs::read(archive.path()).expect("read archive"), body);
    assert!(archive.path().starts_with(&staging.path));

    archive.remove().expect("remove archive");
    assert!(staging.entries().is_empty());
}

#[rstest]
fn short_body_is_incomplete_and_leaves_nothing(staging: Staging) {
    let mut reader = std::io::repeat(7).take(999_000);

    let err = write_body(URL, &mut reader, Some(1_000_000), &staging.path, &SilentProgress)
        .expect_err("short body must fail");

    assert!(
        matches!(
            err,
            FetchError::IncompleteDownload {
                expected: 1_000_000,
                actual: 999_000,
                ..
            }
        ),
        "unexpected error: {err:?}"
    );
    assert!(staging.entries().is_empty(), "left: {:?}", staging.entries());
}

#[rstest]
fn oversized_body_is_rejected(staging: Staging) {
    let mut reader = std::io::repeat(1).take(20);

    let err = write_body(URL, &mut reader, Some(10), &staging.path, &SilentProgress)
        .expect_err("long body must fail");

    assert!(matches!(
        err,
        FetchError::IncompleteDownload {
            expected: 10,
            actual: 20,
            ..
        }
    ));
    assert!(staging.entries().is_empty());
}

#[rstest]
fn unknown_length_accepts_any_body(staging: Staging) {
    let mut reader = std::io::repeat(3).take(20_000);

    let archive = write_body(URL, &mut reader, None, &staging.path, &SilentProgress)
        .expect("download succeeds");

    assert_eq!(archive.size(), 20_000);
}

#[rstest]
fn dropped_connection_before_declared_length_is_incomplete(staging: Staging) {
    let mut reader = FailingReader {
        body: Cursor::new(vec![0; 500]),
        kind: ErrorKind::UnexpectedEof,
    };

    let err = write_body(URL, &mut reader, Some(1_000), &staging.path, &SilentProgress)
        .expect_err("dropped connection must fail");

    assert!(matches!(
        err,
        FetchError::IncompleteDownload {
            expected: 1_000,
            actual: 500,
            ..
        }
    ));
    assert!(staging.entries().is_empty());
}

#[rstest]
fn transport_error_mid_stream_is_network_failure(staging: Staging) {
    let mut reader = FailingReader {
        body: Cursor::new(vec![0; 500]),
        kind: ErrorKind::ConnectionReset,
    };

    let err = write_body(URL, &mut reader, None, &staging.path, &SilentProgress)
        .expect_err("reset must fail");

    match err {
        FetchError::Network { url, reason } => {
            assert_eq!(url, URL);
            assert!(reason.contains("connection reset"), "reason: {reason}");
        }
        other => panic!("expected Network, got {other:?}"),
    }
    assert!(staging.entries().is_empty());
}

#[rstest]
fn progress_sees_every_byte_once(staging: Staging) {
    let progress = RecordingProgress::default();
    let mut reader = std::io::repeat(9).take(70_000);

    write_body(URL, &mut reader, Some(70_000), &staging.path, &progress)
        .expect("download succeeds");

    assert_eq!(progress.total.get(), Some(Some(70_000)));
    assert_eq!(progress.advanced.get(), 70_000);
    assert_eq!(progress.finished.get(), 1);
}

#[rstest]
fn progress_finishes_after_failure(staging: Staging) {
    let progress = RecordingProgress::default();
    let mut reader = std::io::repeat(9).take(10);

    let _err = write_body(URL, &mut reader, Some(99), &staging.path, &progress)
        .expect_err("short body must fail");

    assert_eq!(progress.finished.get(), 1);
}

#[rstest]
fn missing_staging_dir_is_created(staging: Staging) {
    let nested = staging.path.join("fresh");
    let mut reader = Cursor::new(b"abc".to_vec());

    let archive =
        write_body(URL, &mut reader, Some(3), &nested, &SilentProgress).expect("download");

    assert!(archive.path().starts_with(&nested));
}

#[test]
fn dropping_archive_deletes_file() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let archive = DownloadedArchive::from_temp_file(file, 0);
    let path = archive.path().to_path_buf();
    assert!(path.exists());

    drop(archive);
    assert!(!path.exists());
}

#[rstest]
#[case::plain(&[("content-length", "1024")], Some(1024))]
#[case::missing(&[], None)]
#[case::garbage(&[("content-length", "lots")], None)]
#[case::encoded(&[("content-length", "1024"), ("content-encoding", "gzip")], None)]
fn declared_length_reads_usable_header(
    #[case] headers: &[(&'static str, &'static str)],
    #[case] expected: Option<u64>,
) {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(*name, HeaderValue::from_static(*value));
    }
    assert_eq!(declared_length(&map), expected);
}
