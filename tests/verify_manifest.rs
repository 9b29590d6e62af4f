//! Integration tests for manifest verification

use std::path::Path;

use tempfile::TempDir;

use shard_fetcher::app::{digest_bytes, DigestAlgorithm, IntegrityVerifier, VerifierConfig};
use shard_fetcher::errors::{AppError, ManifestError};

fn write(path: &Path, content: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn sha256_hex(content: &[u8]) -> String {
    digest_bytes(content, DigestAlgorithm::Sha256).to_hex()
}

/// Test one matching and one mismatching entry: (1, 1) and the bad file is gone
#[tokio::test]
async fn test_match_and_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data");
    write(&data.join("f1.txt"), b"first file");
    write(&data.join("f2.txt"), b"second file, corrupted");

    let manifest = temp_dir.path().join("demo_SHA256SUMS.txt");
    std::fs::write(
        &manifest,
        format!(
            "{}  f1.txt\n{}  f2.txt\n",
            sha256_hex(b"first file"),
            sha256_hex(b"second file")
        ),
    )
    .unwrap();

    let verifier = IntegrityVerifier::new(VerifierConfig::default());
    let report = verifier.verify_manifest(&manifest, &data).await.unwrap();

    assert_eq!((report.matched, report.mismatched), (1, 1));
    assert_eq!(report.deleted, 1);
    assert_eq!(std::fs::read(data.join("f1.txt")).unwrap(), b"first file");
    assert!(!data.join("f2.txt").exists());
}

/// Test that every mismatching file is deleted and every matching file is untouched
#[tokio::test]
async fn test_deletion_property_over_many_files() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data");
    let mut lines = String::new();

    for i in 0..40u32 {
        let name = format!("part/{:03}.jsonl", i);
        let expected = format!("record {}", i).into_bytes();
        let actual = if i % 3 == 0 {
            format!("record {} (truncated", i).into_bytes()
        } else {
            expected.clone()
        };
        write(&data.join(&name), &actual);
        lines.push_str(&format!("{} {}\n", sha256_hex(&expected).to_uppercase(), name));
    }
    let manifest = temp_dir.path().join("part_SHA256SUMS.txt");
    std::fs::write(&manifest, lines).unwrap();

    let verifier = IntegrityVerifier::new(VerifierConfig {
        concurrency: Some(4),
        ..Default::default()
    });
    let report = verifier.verify_manifest(&manifest, &data).await.unwrap();

    assert_eq!(report.matched, 26);
    assert_eq!(report.mismatched, 14);
    for i in 0..40u32 {
        let path = data.join(format!("part/{:03}.jsonl", i));
        if i % 3 == 0 {
            assert!(!path.exists(), "{} should be deleted", path.display());
        } else {
            assert_eq!(std::fs::read(&path).unwrap(), format!("record {}", i).into_bytes());
        }
    }
}

/// Test that a directory of manifests is processed in name order, one report each
#[tokio::test]
async fn test_manifest_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data");
    let sums = temp_dir.path().join("sha256");
    write(&data.join("book/book.jsonl"), b"book");
    write(&data.join("arxiv/arxiv_0.jsonl"), b"arxiv");

    write(
        &sums.join("book_SHA256SUMS.txt"),
        format!("{} book/book.jsonl\n", sha256_hex(b"book")).as_bytes(),
    );
    write(
        &sums.join("arxiv_SHA256SUMS.txt"),
        format!(
            "{} arxiv/arxiv_0.jsonl\n{} arxiv/arxiv_1.jsonl\n",
            sha256_hex(b"arxiv"),
            sha256_hex(b"missing")
        )
        .as_bytes(),
    );
    write(&sums.join("README.md"), b"not a manifest");

    let verifier = IntegrityVerifier::new(VerifierConfig::default());
    let manifests = verifier.discover(&sums).await.unwrap();
    assert_eq!(manifests.len(), 2);

    let reports = verifier.verify_manifests(&manifests, &data).await.unwrap();

    assert!(reports[0].manifest.as_ref().unwrap().ends_with("arxiv_SHA256SUMS.txt"));
    assert_eq!((reports[0].matched, reports[0].mismatched), (1, 1));
    assert_eq!(reports[0].missing, 1);
    assert_eq!(reports[0].deleted, 0);
    assert_eq!((reports[1].matched, reports[1].mismatched), (1, 0));
    assert!(reports[1].is_successful());
}

/// Test verification with MD5 manifests
#[tokio::test]
async fn test_md5_manifest() {
    let temp_dir = TempDir::new().unwrap();
    write(&temp_dir.path().join("hello.txt"), b"hello");
    let manifest = temp_dir.path().join("hello.md5");
    std::fs::write(&manifest, "5d41402abc4b2a76b9719d911017c592  hello.txt\n").unwrap();

    let verifier = IntegrityVerifier::new(VerifierConfig {
        algorithm: DigestAlgorithm::Md5,
        ..Default::default()
    });
    let report = verifier
        .verify_manifest(&manifest, temp_dir.path())
        .await
        .unwrap();

    assert_eq!(report.matched, 1);
    assert!(temp_dir.path().join("hello.txt").exists());
}

/// Test that a malformed manifest is fatal and deletes nothing
#[tokio::test]
async fn test_malformed_manifest_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    write(&temp_dir.path().join("f1.txt"), b"content");
    let manifest = temp_dir.path().join("bad_SHA256SUMS.txt");
    std::fs::write(&manifest, "abc123 f1.txt\n").unwrap();

    let verifier = IntegrityVerifier::new(VerifierConfig::default());
    let result = verifier.verify_manifest(&manifest, temp_dir.path()).await;

    assert!(matches!(
        result,
        Err(AppError::Manifest(ManifestError::InvalidFormat { line: 1, .. }))
    ));
    assert!(temp_dir.path().join("f1.txt").exists());
}

/// Test that filenames outside the data directory are rejected before anything is deleted
#[tokio::test]
async fn test_escaping_filenames_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data");
    write(&data.join("f1.txt"), b"first file");
    let outside = temp_dir.path().join("precious.txt");
    write(&outside, b"keep me");

    let verifier = IntegrityVerifier::new(VerifierConfig::default());
    let wrong = sha256_hex(b"something else");

    let relative = temp_dir.path().join("parent_SHA256SUMS.txt");
    std::fs::write(
        &relative,
        format!("{}  f1.txt\n{}  ../precious.txt\n", sha256_hex(b"first file"), wrong),
    )
    .unwrap();
    let result = verifier.verify_manifest(&relative, &data).await;
    assert!(matches!(
        result,
        Err(AppError::Manifest(ManifestError::InvalidFormat { line: 2, .. }))
    ));

    let absolute = temp_dir.path().join("absolute_SHA256SUMS.txt");
    std::fs::write(&absolute, format!("{}  {}\n", wrong, outside.display())).unwrap();
    let result = verifier.verify_manifest(&absolute, &data).await;
    assert!(matches!(
        result,
        Err(AppError::Manifest(ManifestError::InvalidFormat { line: 1, .. }))
    ));

    assert_eq!(std::fs::read(&outside).unwrap(), b"keep me");
    assert!(data.join("f1.txt").exists());
}
