//! Mirror configuration.
//!
//! [`MirrorConfig`] is the in-process configuration handed to a run.
//! [`MirrorDocument`] is the configuration document persisted into the
//! mirror directory for the redirection shim; the legacy single-collection
//! shape still parses.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::registry::CollectionPin;
use crate::registry::package::StrategyKind;

/// Filename of the configuration document inside the mirror directory.
pub const CONFIG_FILENAME: &str = "mirror-config.json";

/// An environment probe for the default mirror root.
type RootProbe = fn() -> Option<std::path::PathBuf>;

fn probe_explicit_override() -> Option<std::path::PathBuf> {
	std::env::var_os("PKGMIRROR_ROOT").map(std::path::PathBuf::from)
}

fn probe_xdg_cache() -> Option<std::path::PathBuf> {
	std::env::var_os("XDG_CACHE_HOME").map(|dir| std::path::PathBuf::from(dir).join("pkgmirror"))
}

fn probe_home_cache() -> Option<std::path::PathBuf> {
	std::env::var_os("HOME").map(|dir| std::path::PathBuf::from(dir).join(".cache").join("pkgmirror"))
}

const ROOT_PROBES: &[RootProbe] = &[probe_explicit_override, probe_xdg_cache, probe_home_cache];

fn discover_root(probes: &[RootProbe]) -> Option<std::path::PathBuf> {
	probes.iter().find_map(|probe| probe())
}

/// The default mirror root when the operator does not name one: an ordered
/// probe list, first success wins.
pub fn default_root() -> Option<std::path::PathBuf> {
	discover_root(ROOT_PROBES)
}

pub struct MirrorConfig {
	root: std::path::PathBuf,
	base_address: String,
	fetch_delay_secs: u64,
	fetch_timeout_secs: u64,
	max_retries: u32,
	allowed_strategies: Vec<StrategyKind>,
	do_checksums: bool,
	https_only: bool,
}

impl MirrorConfig {
	pub fn new(root: impl Into<std::path::PathBuf>, base_address: impl Into<String>) -> Self {
		MirrorConfig {
			root: root.into(),
			base_address: base_address.into(),
			fetch_delay_secs: 1,
			fetch_timeout_secs: 300,
			max_retries: 3,
			allowed_strategies: StrategyKind::builtin().to_vec(),
			do_checksums: true,
			https_only: false,
		}
	}

	pub fn root(&self) -> &std::path::Path {
		&self.root
	}

	pub fn base_address(&self) -> &str {
		&self.base_address
	}

	pub fn fetch_delay_secs(&self) -> u64 {
		self.fetch_delay_secs
	}
	/// Throttle between external fetches. Zero disables the delay.
	pub fn set_fetch_delay_secs(&mut self, fetch_delay_secs: u64) {
		self.fetch_delay_secs = fetch_delay_secs;
	}

	pub fn fetch_timeout_secs(&self) -> u64 {
		self.fetch_timeout_secs
	}
	pub fn set_fetch_timeout_secs(&mut self, fetch_timeout_secs: u64) {
		self.fetch_timeout_secs = fetch_timeout_secs;
	}

	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}
	pub fn set_max_retries(&mut self, max_retries: u32) {
		self.max_retries = max_retries;
	}

	pub fn allowed_strategies(&self) -> &[StrategyKind] {
		&self.allowed_strategies
	}
	/// Replaces the strategy allow list. Descriptors outside it are skipped
	/// with a warning, never fetched.
	pub fn set_allowed_strategies(&mut self, allowed_strategies: Vec<StrategyKind>) {
		self.allowed_strategies = allowed_strategies;
	}

	pub fn do_checksums(&self) -> bool {
		self.do_checksums
	}
	pub fn set_do_checksums(&mut self, do_checksums: bool) {
		self.do_checksums = do_checksums;
	}

	pub fn https_only(&self) -> bool {
		self.https_only
	}
	pub fn set_https_only(&mut self, https_only: bool) {
		self.https_only = https_only;
	}
}

/// The configuration document persisted into the mirror directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorDocument {
	pub collections: BTreeMap<String, CollectionPin>,
	pub timestamp: u64,
	pub cache_root: String,
	pub base_address: String,
}

/// The pre-collections document shape, a single unnamed collection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMirrorDocument {
	revision: String,
	timestamp: u64,
	cache_root: String,
	base_address: String,
}

impl MirrorDocument {
	/// Parses a configuration document, accepting the legacy
	/// single-collection shape.
	pub fn from_json(raw: &str) -> crate::Result<Self> {
		if let Ok(document) = serde_json::from_str::<MirrorDocument>(raw) {
			return Ok(document);
		}
		let legacy = serde_json::from_str::<LegacyMirrorDocument>(raw)
			.map_err(|e| crate::Error::Config(format!("configuration document malformed: {}", e)))?;
		Ok(MirrorDocument {
			collections: BTreeMap::from([(
				"core".to_string(),
				CollectionPin { revision: legacy.revision, kind: "git".to_string() },
			)]),
			timestamp: legacy.timestamp,
			cache_root: legacy.cache_root,
			base_address: legacy.base_address,
		})
	}

	pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
		Self::from_json(&std::fs::read_to_string(path)?)
	}

	pub fn save_to(&self, path: &std::path::Path) -> crate::Result<()> {
		std::fs::write(path, serde_json::to_string_pretty(self)?)?;
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn legacy_single_collection_shape_parses() {
		let document = MirrorDocument::from_json(
			r#"{"revision": "abc123", "timestamp": 1700000000, "cacheRoot": "/m", "baseAddress": "http://host/m"}"#,
		).unwrap();
		assert_eq!(document.collections.len(), 1);
		assert_eq!(document.collections["core"].revision, "abc123");
		assert_eq!(document.base_address, "http://host/m");
	}

	#[test]
	fn current_shape_parses() {
		let document = MirrorDocument::from_json(
			r#"{"collections": {"main": {"revision": "def", "kind": "git"}}, "timestamp": 1, "cacheRoot": "/m", "baseAddress": "http://host/m"}"#,
		).unwrap();
		assert_eq!(document.collections["main"].kind, "git");
	}

	#[test]
	fn garbage_is_a_config_error() {
		assert!(matches!(MirrorDocument::from_json("{"), Err(crate::Error::Config(_))));
	}

	#[test]
	fn root_discovery_takes_the_first_successful_probe() {
		fn miss() -> Option<std::path::PathBuf> {
			None
		}
		fn hit() -> Option<std::path::PathBuf> {
			Some(std::path::PathBuf::from("/first"))
		}
		fn later() -> Option<std::path::PathBuf> {
			Some(std::path::PathBuf::from("/second"))
		}

		assert_eq!(discover_root(&[miss, hit, later]), Some(std::path::PathBuf::from("/first")));
		assert_eq!(discover_root(&[miss, miss]), None);
	}
}
