use pkgmirror::redirect::{substitute, RedirectionMap};

#[test]
fn lookup_matches_query_fragment_and_slash_variants() {
	let mut map = RedirectionMap::new();
	map.register("https://x/y.zip", "abc.zip");

	for candidate in [
		"https://x/y.zip",
		"https://x/y.zip?v=1",
		"https://x/y.zip#frag",
		"https://x/y.zip?v=1#frag",
		"https://x/y.zip/",
	] {
		assert_eq!(map.lookup(candidate), Some("abc.zip"), "candidate {}", candidate);
	}
}

#[test]
fn lookup_registered_with_query_still_matches_bare() {
	let mut map = RedirectionMap::new();
	map.register("https://x/y.zip?token=123", "abc.zip");

	assert_eq!(map.lookup("https://x/y.zip"), Some("abc.zip"));
	assert_eq!(map.lookup("https://x/y.zip?other=9"), Some("abc.zip"));
}

#[test]
fn lookup_misses_unrelated_locators() {
	let mut map = RedirectionMap::new();
	map.register("https://x/y.zip", "abc.zip");

	assert_eq!(map.lookup("https://x/z.zip"), None);
	assert_eq!(map.lookup("https://other/y.zip"), None);
}

#[test]
fn exact_entries_are_not_displaced_by_another_locators_variants() {
	let mut map = RedirectionMap::new();
	map.register("https://x/a?v=1", "first.zip");
	map.register("https://x/a?v=2", "second.zip");

	assert_eq!(map.lookup("https://x/a?v=1"), Some("first.zip"));
	assert_eq!(map.lookup("https://x/a?v=2"), Some("second.zip"));
	/* The shared stripped variant keeps its first registration. */
	assert_eq!(map.lookup("https://x/a"), Some("first.zip"));
}

#[test]
fn many_locators_may_share_one_filename() {
	let mut map = RedirectionMap::new();
	map.register("https://primary/y.zip", "abc.zip");
	map.register("https://mirror1/y.zip", "abc.zip");

	assert_eq!(map.lookup("https://primary/y.zip"), map.lookup("https://mirror1/y.zip"));
}

#[test]
fn substitute_rewrites_hits_and_passes_misses_through() {
	let mut map = RedirectionMap::new();
	map.register("https://x/y.zip", "abc.zip");

	assert_eq!(
		substitute("https://x/y.zip?v=1", "http://mirror.test/payloads/", &map),
		Some("http://mirror.test/payloads/abc.zip".to_string()),
	);
	assert_eq!(substitute("https://x/unknown.zip", "http://mirror.test/payloads", &map), None);
}

#[test]
fn persisted_document_is_a_flat_object() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("redirect-map.json");

	let mut map = RedirectionMap::new();
	map.register("https://x/y.zip?v=1", "abc.zip");
	map.save_to(&path).unwrap();

	let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
	let object = value.as_object().unwrap();
	assert!(object.len() >= 2);
	assert!(object.values().all(|v| v == "abc.zip"));

	let reloaded = RedirectionMap::load_from(&path).unwrap();
	assert_eq!(reloaded.lookup("https://x/y.zip"), Some("abc.zip"));
}
