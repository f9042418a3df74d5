//! Maps original download locators to mirrored filenames.
//!
//! The normalization rules here are a shared contract: the out-of-process
//! shim that rewrites the installer's outbound requests runs the same
//! algorithm against the persisted flat document, so register and lookup
//! must agree on the variants and their priority order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Deserialize};

/// Filename of the redirection map document inside the mirror directory.
pub const MAP_FILENAME: &str = "redirect-map.json";

/// A flat many-to-one mapping from locator strings (original and
/// normalized variants) to cache filenames.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectionMap {
	#[serde(flatten)]
	entries: BTreeMap<String, String>,
}

impl RedirectionMap {
	pub fn new() -> RedirectionMap {
		RedirectionMap::default()
	}

	/// Records a locator plus its synthesized variants. The exact locator
	/// always maps to `filename`; variants never displace an exact entry
	/// registered earlier.
	pub fn register(&mut self, locator: &str, filename: &str) {
		self.entries.insert(locator.to_string(), filename.to_string());
		for variant in normalized_variants(locator) {
			self.entries.entry(variant).or_insert_with(|| filename.to_string());
		}
	}

	/// Exact match first, then each normalized variant in priority order.
	pub fn lookup(&self, candidate: &str) -> Option<&str> {
		if let Some(filename) = self.entries.get(candidate) {
			return Some(filename.as_str());
		}
		for variant in normalized_variants(candidate) {
			if let Some(filename) = self.entries.get(&variant) {
				return Some(filename.as_str());
			}
		}
		None
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// The set of filenames the map references. Several keys usually point
	/// at each one.
	pub fn referenced_filenames(&self) -> BTreeSet<String> {
		self.entries.values().cloned().collect()
	}

	pub fn load_from(path: &std::path::Path) -> crate::Result<RedirectionMap> {
		Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
	}

	pub fn save_to(&self, path: &std::path::Path) -> crate::Result<()> {
		std::fs::write(path, serde_json::to_string_pretty(self)?)?;
		Ok(())
	}
}

/// Normalized variants of a locator in lookup priority order: fragment
/// stripped, query stripped, both stripped, then the trailing-slash toggle
/// of the original and of each variant. The locator itself is excluded.
pub fn normalized_variants(locator: &str) -> Vec<String> {
	let mut variants = Vec::new();
	let mut push = |candidate: String| {
		if candidate != locator && !variants.contains(&candidate) {
			variants.push(candidate);
		}
	};

	let fragment_stripped = strip_fragment(locator);
	let query_stripped = strip_query(locator);
	let bare = strip_query(&fragment_stripped);

	push(fragment_stripped.clone());
	push(query_stripped.clone());
	push(bare.clone());

	push(toggle_trailing_slash(locator));
	push(toggle_trailing_slash(&fragment_stripped));
	push(toggle_trailing_slash(&query_stripped));
	push(toggle_trailing_slash(&bare));

	variants
}

fn strip_fragment(locator: &str) -> String {
	locator.split('#').next().unwrap_or(locator).to_string()
}

fn strip_query(locator: &str) -> String {
	match locator.split_once('?') {
		Some((head, rest)) => match rest.split_once('#') {
			Some((_, fragment)) => format!("{}#{}", head, fragment),
			None => head.to_string(),
		},
		None => locator.to_string(),
	}
}

fn toggle_trailing_slash(locator: &str) -> String {
	match locator.strip_suffix('/') {
		Some(stripped) => stripped.to_string(),
		None => format!("{}/", locator),
	}
}

/// The shim side of the contract: the rewritten address for `locator`, or
/// `None` when the request must pass through unmodified.
pub fn substitute(locator: &str, base_address: &str, map: &RedirectionMap) -> Option<String> {
	map.lookup(locator)
		.map(|filename| format!("{}/{}", base_address.trim_end_matches('/'), filename))
}
