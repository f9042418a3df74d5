use std::collections::HashSet;

use pkgmirror::cache::MirrorCache;
use pkgmirror::registry::package::Checksum;

fn stage_temp(cache: &MirrorCache, contents: &[u8]) -> std::path::PathBuf {
	let temp = cache.scratch_dir().join("incoming.part");
	std::fs::write(&temp, contents).unwrap();
	temp
}

#[test]
fn put_places_atomically_and_consumes_the_temp_file() {
	let dir = tempfile::tempdir().unwrap();
	let cache = MirrorCache::open(dir.path()).unwrap();

	let temp = stage_temp(&cache, b"payload bytes");
	let entry = cache.put("cafe01", &temp, ".zip", &Checksum::Unchecked).unwrap();

	assert_eq!(entry.filename, "cafe01.zip");
	assert_eq!(entry.size, 13);
	assert!(cache.entry_path(&entry.filename).is_file());
	assert!(!temp.exists());
}

#[test]
fn existing_entry_wins_over_a_new_fetch() {
	let dir = tempfile::tempdir().unwrap();
	let cache = MirrorCache::open(dir.path()).unwrap();

	let temp = stage_temp(&cache, b"payload bytes");
	let entry = cache.put("cafe01", &temp, ".zip", &Checksum::Unchecked).unwrap();

	let temp = stage_temp(&cache, b"completely different bytes");
	let again = cache.put("cafe01", &temp, ".zip", &Checksum::Unchecked).unwrap();

	assert_eq!(again.size, entry.size);
	assert_eq!(std::fs::read(cache.entry_path(&entry.filename)).unwrap(), b"payload bytes");
	assert!(!temp.exists());
}

#[test]
fn checksum_mismatch_discards_the_temp_file_and_places_nothing() {
	let dir = tempfile::tempdir().unwrap();
	let cache = MirrorCache::open(dir.path()).unwrap();

	let temp = stage_temp(&cache, b"corrupted payload");
	let wrong = "0".repeat(64);
	let result = cache.put("cafe02", &temp, ".zip", &Checksum::Sha256(wrong));

	assert!(matches!(result, Err(pkgmirror::Error::Download(_))));
	assert!(!cache.entry_path("cafe02.zip").exists());
	assert!(!temp.exists());
}

#[test]
fn matching_checksum_marks_the_entry_verified() {
	let upstream = tempfile::tempdir().unwrap();
	let dir = tempfile::tempdir().unwrap();
	let cache = MirrorCache::open(dir.path()).unwrap();

	let (_, digest) = pkgmirror_test_utils::write_payload(upstream.path(), "fixture.bin", b"payload bytes");
	let temp = stage_temp(&cache, b"payload bytes");
	let entry = cache.put(&digest, &temp, ".bin", &Checksum::Sha256(digest.clone())).unwrap();

	assert!(entry.verified);
	assert_eq!(entry.filename, format!("{}.bin", digest));
}

#[test]
fn identifiers_that_escape_the_directory_are_rejected() {
	let dir = tempfile::tempdir().unwrap();
	let cache = MirrorCache::open(dir.path()).unwrap();

	assert!(matches!(cache.get("../evil", ".zip"), Err(pkgmirror::Error::PathSecurity(_))));
	assert!(matches!(MirrorCache::filename("", ""), Err(pkgmirror::Error::PathSecurity(_))));
	assert!(matches!(MirrorCache::filename("ok", "/../.."), Err(pkgmirror::Error::PathSecurity(_))));
}

#[test]
fn prune_removes_only_unreferenced_entries() {
	let dir = tempfile::tempdir().unwrap();
	let cache = MirrorCache::open(dir.path()).unwrap();

	let temp = stage_temp(&cache, b"one");
	cache.put("cafe01", &temp, ".zip", &Checksum::Unchecked).unwrap();
	let temp = stage_temp(&cache, b"two");
	cache.put("cafe02", &temp, ".zip", &Checksum::Unchecked).unwrap();

	let keep = HashSet::from(["cafe01.zip".to_string()]);
	let removed = cache.prune(&keep).unwrap();

	assert_eq!(removed, vec!["cafe02.zip".to_string()]);
	assert!(cache.entry_path("cafe01.zip").is_file());
	assert!(!cache.entry_path("cafe02.zip").exists());
}

#[test]
fn list_reports_payloads_but_not_documents() {
	let dir = tempfile::tempdir().unwrap();
	let cache = MirrorCache::open(dir.path()).unwrap();

	let temp = stage_temp(&cache, b"payload");
	cache.put("cafe01", &temp, ".zip", &Checksum::Unchecked).unwrap();
	std::fs::write(dir.path().join("redirect-map.json"), "{}").unwrap();
	std::fs::write(dir.path().join("mirror-config.json"), "{}").unwrap();

	let entries = cache.list().unwrap();
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].filename, "cafe01.zip");
	assert_eq!(entries[0].identifier, "cafe01");
}
