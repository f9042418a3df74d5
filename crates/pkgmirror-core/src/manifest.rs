//! Snapshot of what a mirror run produced, used for incremental diffing
//! against the next run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Deserialize};

use crate::registry::CollectionPin;
use crate::registry::package::{DownloadDescriptor, Package};

/// Filename of the run manifest document inside the mirror directory.
pub const MANIFEST_FILENAME: &str = "run-manifest.json";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
	pub packages: u64,
	pub resources: u64,
	pub fetched: u64,
	pub reused: u64,
	pub skipped: u64,
	pub failed: u64,
	pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestPackage {
	pub name: String,
	pub version: String,
	pub descriptors: Vec<DownloadDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
	/// Creation time, unix seconds.
	pub created: u64,
	pub collections: BTreeMap<String, CollectionPin>,
	pub stats: RunStats,
	pub packages: Vec<ManifestPackage>,
}

impl RunManifest {
	pub fn load_from(path: &std::path::Path) -> crate::Result<RunManifest> {
		Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
	}

	pub fn save_to(&self, path: &std::path::Path) -> crate::Result<()> {
		std::fs::write(path, serde_json::to_string_pretty(self)?)?;
		Ok(())
	}
}

/// How the incremental engine classified the newly resolved set against a
/// prior run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ManifestDiff {
	/// Same (name, version) pair as the prior run; safe to skip.
	pub unchanged: Vec<String>,
	/// Absent from the prior run, or present under any other version.
	/// A rollback lands here on purpose and is re-fetched.
	pub new: Vec<String>,
	/// In the prior run but not resolved this time; prune candidates.
	pub stale: Vec<String>,
}

/// Partitions a newly resolved package set against a prior manifest,
/// keyed on the (name, version) pair only.
pub fn diff_manifest<'a, I>(prior: &RunManifest, current: I) -> ManifestDiff
where
	I: IntoIterator<Item = &'a Package>,
{
	let prior_versions: BTreeMap<&str, &str> = prior.packages.iter()
		.map(|package| (package.name.as_str(), package.version.as_str()))
		.collect();

	let mut diff = ManifestDiff::default();
	let mut seen = BTreeSet::<String>::new();

	for package in current {
		seen.insert(package.name().to_string());
		if prior_versions.get(package.name()) == Some(&package.version()) {
			diff.unchanged.push(package.name().to_string());
		} else {
			diff.new.push(package.name().to_string());
		}
	}

	for package in &prior.packages {
		if !seen.contains(&package.name) {
			diff.stale.push(package.name.clone());
		}
	}

	diff.unchanged.sort();
	diff.new.sort();
	diff.stale.sort();
	diff
}
