use pkgmirror::mirror::{mirror_packages, MirrorOptions};
use pkgmirror::verify::verify_mirror;
use pkgmirror::MirrorConfig;
use pkgmirror_test_utils::*;

/// Builds a two-payload mirror and returns the directories plus the cache
/// filenames of both payloads.
async fn build_mirror() -> (tempfile::TempDir, tempfile::TempDir, String, String) {
	let upstream = tempfile::tempdir().unwrap();
	let mirror_dir = tempfile::tempdir().unwrap();

	let (url_a, digest_a) = write_payload(upstream.path(), "a.bin", b"payload a");
	let (url_b, digest_b) = write_payload(upstream.path(), "b.bin", b"payload b");

	let mut registry = FakeRegistry::new().with_pin("core", "deadbeef", "git");
	let mut a = package("a", "1.0");
	a.download = Some(archive_descriptor(&url_a, Some(&digest_a)));
	registry.add(a);
	let mut b = package("b", "1.0");
	b.download = Some(archive_descriptor(&url_b, Some(&digest_b)));
	registry.add(b);

	let mut config = MirrorConfig::new(mirror_dir.path(), "http://mirror.test/payloads");
	config.set_fetch_delay_secs(0);
	let names = vec!["a".to_string(), "b".to_string()];
	mirror_packages(&config, &registry, &names, &MirrorOptions::default()).await.unwrap();

	(upstream, mirror_dir, format!("{}.bin", digest_a), format!("{}.bin", digest_b))
}

#[tokio::test]
async fn fresh_mirror_verifies_clean() {
	let (_upstream, mirror_dir, _, _) = build_mirror().await;

	let report = verify_mirror(mirror_dir.path(), true).await.unwrap();

	assert!(report.ok(), "unexpected errors: {:?}", report.errors);
	assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
	assert_eq!(report.total_bytes, Some(18));
}

#[tokio::test]
async fn deleting_one_referenced_payload_yields_exactly_one_error() {
	let (_upstream, mirror_dir, filename_a, _) = build_mirror().await;

	std::fs::remove_file(mirror_dir.path().join(&filename_a)).unwrap();
	let report = verify_mirror(mirror_dir.path(), false).await.unwrap();

	assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
	assert!(report.errors[0].contains(&filename_a));
}

#[tokio::test]
async fn orphaned_payloads_are_warnings_not_errors() {
	let (_upstream, mirror_dir, _, _) = build_mirror().await;

	std::fs::write(mirror_dir.path().join("feedface.zip"), b"nobody references me").unwrap();
	let report = verify_mirror(mirror_dir.path(), false).await.unwrap();

	assert!(report.ok());
	assert_eq!(report.warnings.len(), 1);
	assert!(report.warnings[0].contains("feedface.zip"));
}

#[tokio::test]
async fn malformed_configuration_document_degrades_to_an_error_report() {
	let (_upstream, mirror_dir, _, _) = build_mirror().await;

	std::fs::write(mirror_dir.path().join("mirror-config.json"), "{ not json").unwrap();
	let report = verify_mirror(mirror_dir.path(), false).await.unwrap();

	assert!(!report.ok());
	assert!(report.errors[0].contains("not valid JSON"));
}

#[tokio::test]
async fn legacy_configuration_document_shape_still_verifies() {
	let (_upstream, mirror_dir, _, _) = build_mirror().await;

	std::fs::write(
		mirror_dir.path().join("mirror-config.json"),
		r#"{"revision": "abc", "timestamp": 1700000000, "cacheRoot": "/m", "baseAddress": "http://host/m"}"#,
	).unwrap();
	let report = verify_mirror(mirror_dir.path(), false).await.unwrap();

	assert!(report.ok(), "unexpected errors: {:?}", report.errors);
}

#[tokio::test]
async fn wrong_shape_configuration_document_is_an_error() {
	let (_upstream, mirror_dir, _, _) = build_mirror().await;

	std::fs::write(mirror_dir.path().join("mirror-config.json"), r#"{"cacheRoot": 5}"#).unwrap();
	let report = verify_mirror(mirror_dir.path(), false).await.unwrap();

	assert!(!report.ok());
}

#[tokio::test]
async fn digest_check_flags_corrupted_payloads() {
	let (_upstream, mirror_dir, filename_a, _) = build_mirror().await;

	std::fs::write(mirror_dir.path().join(&filename_a), b"bit rot").unwrap();
	let report = verify_mirror(mirror_dir.path(), true).await.unwrap();

	assert!(!report.ok());
	assert!(report.errors.iter().any(|e| e.contains("does not match declared checksum")));
}

#[tokio::test]
async fn empty_redirection_map_is_a_warning() {
	let mirror_dir = tempfile::tempdir().unwrap();
	std::fs::write(
		mirror_dir.path().join("mirror-config.json"),
		r#"{"collections": {}, "timestamp": 1, "cacheRoot": "/m", "baseAddress": "http://host/m"}"#,
	).unwrap();
	std::fs::write(mirror_dir.path().join("redirect-map.json"), "{}").unwrap();

	let report = verify_mirror(mirror_dir.path(), false).await.unwrap();

	assert!(report.ok());
	assert!(report.warnings.iter().any(|w| w.contains("redirection map is empty")));
}
