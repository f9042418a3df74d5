//! Consistency checks for an existing mirror directory.
//!
//! The verifier reports, it does not repair. It has to keep working on
//! half-broken mirrors: malformed JSON becomes an error entry rather than
//! a crash, and the size scan is bounded by a timeout so a slow filesystem
//! degrades to a warning instead of a hang.

use std::collections::BTreeSet;
use std::time::Duration;

use walkdir::WalkDir;

use crate::redirect::RedirectionMap;
use crate::registry::package::Checksum;

const SIZE_SCAN_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Default, Clone)]
pub struct VerifyReport {
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
	/// Aggregate payload size, absent when the size scan timed out.
	pub total_bytes: Option<u64>,
}

impl VerifyReport {
	pub fn ok(&self) -> bool {
		self.errors.is_empty()
	}
}

/// Checks a mirror directory for structural validity, referenced payloads
/// that are missing, and orphaned payloads nothing references. With
/// `check_digests` every descriptor carrying a strong checksum is
/// recomputed and compared, which is slow on large mirrors.
pub async fn verify_mirror(root: &std::path::Path, check_digests: bool) -> crate::Result<VerifyReport> {
	let mut report = VerifyReport::default();

	check_config_document(root, &mut report);

	let map = match RedirectionMap::load_from(&root.join(crate::redirect::MAP_FILENAME)) {
		Ok(map) => map,
		Err(e) => {
			report.errors.push(format!("redirection map unreadable: {}", e));
			return Ok(report);
		}
	};
	if map.is_empty() {
		report.warnings.push("redirection map is empty.".to_string());
	}

	/* Missing files are deduplicated by filename; many locator keys
	   reference each payload. */
	let referenced: BTreeSet<String> = map.referenced_filenames();
	for filename in &referenced {
		if !root.join(filename).is_file() {
			report.errors.push(format!("missing payload file `{}` referenced by the redirection map.", filename));
		}
	}

	for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
		let entry = match entry {
			Ok(entry) => entry,
			Err(e) => {
				report.warnings.push(format!("unreadable directory entry: {}", e));
				continue;
			}
		};
		if !entry.file_type().is_file() {
			continue;
		}
		let filename = entry.file_name().to_string_lossy().to_string();
		if crate::cache::is_document(&filename) {
			continue;
		}
		if !referenced.contains(&filename) {
			report.warnings.push(format!("orphaned payload file `{}` is not referenced by the redirection map.", filename));
		}
	}

	aggregate_sizes(root, &referenced, &mut report).await;

	if check_digests {
		check_payload_digests(root, &mut report);
	}

	Ok(report)
}

fn check_config_document(root: &std::path::Path, report: &mut VerifyReport) {
	let path = root.join(crate::config::CONFIG_FILENAME);
	let raw = match std::fs::read_to_string(&path) {
		Ok(raw) => raw,
		Err(_) => {
			report.errors.push("configuration document is missing.".to_string());
			return;
		}
	};
	let value = match serde_json::from_str::<serde_json::Value>(&raw) {
		Ok(value) => value,
		Err(e) => {
			report.errors.push(format!("configuration document is not valid JSON: {}", e));
			return;
		}
	};

	let schema = serde_json::from_str::<serde_json::Value>(include_str!("mirror-config.schema"))
		.expect("embedded schema isn't valid json");
	let compiled = jsonschema::JSONSchema::compile(&schema).expect("embedded schema isn't valid");
	if !compiled.is_valid(&value) {
		report.errors.push("configuration document does not match either accepted shape.".to_string());
	}
}

/// Sums referenced payload sizes on a blocking thread, bounded by a
/// timeout so a slow filesystem cannot hang verification.
async fn aggregate_sizes(root: &std::path::Path, referenced: &BTreeSet<String>, report: &mut VerifyReport) {
	let root = root.to_path_buf();
	let referenced = referenced.clone();
	let scan = tokio::task::spawn_blocking(move || {
		let mut total = 0u64;
		for filename in referenced {
			if let Ok(metadata) = std::fs::metadata(root.join(&filename)) {
				total += metadata.len();
			}
		}
		total
	});

	match tokio::time::timeout(Duration::from_secs(SIZE_SCAN_TIMEOUT_SECS), scan).await {
		Ok(Ok(total)) => report.total_bytes = Some(total),
		Ok(Err(e)) => report.warnings.push(format!("size scan failed: {}", e)),
		Err(_) => report.warnings.push("size scan timed out, aggregate statistics unavailable.".to_string()),
	}
}

fn check_payload_digests(root: &std::path::Path, report: &mut VerifyReport) {
	let manifest = match crate::manifest::RunManifest::load_from(&root.join(crate::manifest::MANIFEST_FILENAME)) {
		Ok(manifest) => manifest,
		Err(_) => {
			report.warnings.push("run manifest absent or unreadable, digest checks skipped.".to_string());
			return;
		}
	};

	for package in &manifest.packages {
		for descriptor in &package.descriptors {
			let expected = match &descriptor.checksum {
				Checksum::Sha256(expected) => expected.to_ascii_lowercase(),
				Checksum::Unchecked => continue,
			};

			let identifier = crate::resource::assign_identifier(descriptor);
			let extension = crate::resource::detect_extension(descriptor);
			let filename = match crate::cache::MirrorCache::filename(&identifier, &extension) {
				Ok(filename) => filename,
				Err(_) => continue,
			};
			let path = root.join(&filename);
			if !path.is_file() {
				/* Already reported as missing if the map references it. */
				continue;
			}

			match sha256::try_digest(path.as_path()) {
				Ok(actual) if actual == expected => {}
				Ok(actual) => report.errors.push(format!(
					"payload `{}` digest {} does not match declared checksum {}.",
					filename, actual, expected,
				)),
				Err(e) => report.warnings.push(format!("payload `{}` unreadable during digest check: {}", filename, e)),
			}
		}
	}
}
