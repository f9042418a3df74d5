//! Various helper functions for testing
//!
//! A registry that lives in memory plus builders for the fixture packages
//! and descriptors the integration tests feed it. Payload fixtures are
//! written to disk and addressed with `file://` locators so tests never
//! touch the network.

use std::collections::{BTreeMap, HashMap};

use pkgmirror::registry::{CollectionPin, Registry};
use pkgmirror::registry::package::*;

#[derive(Default)]
pub struct FakeRegistry {
	packages: HashMap<String, Package>,
	pins: BTreeMap<String, CollectionPin>,
}

impl FakeRegistry {
	pub fn new() -> FakeRegistry {
		FakeRegistry::default()
	}

	pub fn add(&mut self, package: Package) {
		self.packages.insert(package.name().to_string(), package);
	}

	pub fn with_pin(mut self, name: &str, revision: &str, kind: &str) -> FakeRegistry {
		self.pins.insert(name.to_string(), CollectionPin { revision: revision.to_string(), kind: kind.to_string() });
		self
	}
}

impl Registry for FakeRegistry {
	fn package(&self, name: &str, _variants: &[String]) -> pkgmirror::Result<Option<Package>> {
		Ok(self.packages.get(name).cloned())
	}

	fn collections(&self) -> BTreeMap<String, CollectionPin> {
		self.pins.clone()
	}
}

/// A bare package with no dependencies and no downloads.
pub fn package(name: &str, version: &str) -> Package {
	Package {
		identifier: PackageIdentifier { name: name.to_string(), version: version.to_string() },
		dependencies: Vec::new(),
		download: None,
		head: None,
		resources: Vec::new(),
		patches: Vec::new(),
	}
}

pub fn package_with_deps(name: &str, version: &str, dependencies: &[(&str, DependencyKind)]) -> Package {
	let mut package = package(name, version);
	package.dependencies = dependencies.iter()
		.map(|(name, kind)| Dependency { name: name.to_string(), kind: *kind })
		.collect();
	package
}

pub fn archive_descriptor(url: &str, checksum: Option<&str>) -> DownloadDescriptor {
	DownloadDescriptor {
		locator: Locator::Url(url.to_string()),
		strategy: StrategyKind::PlainArchive,
		checksum: match checksum {
			Some(hex) => Checksum::Sha256(hex.to_string()),
			None => Checksum::Unchecked,
		},
		mirrors: Vec::new(),
	}
}

pub fn vcs_descriptor(url: &str, revision: Option<&str>) -> DownloadDescriptor {
	DownloadDescriptor {
		locator: Locator::Vcs { url: url.to_string(), revision: revision.map(str::to_string) },
		strategy: StrategyKind::VcsCheckout,
		checksum: Checksum::Unchecked,
		mirrors: Vec::new(),
	}
}

/// Writes a payload fixture and returns its `file://` locator plus the
/// sha256 of the bytes written.
pub fn write_payload(dir: &std::path::Path, filename: &str, contents: &[u8]) -> (String, String) {
	let path = dir.join(filename);
	std::fs::write(&path, contents).expect("failed to write payload fixture");
	(format!("file://{}", path.display()), sha256::digest(contents))
}
