//! The package metadata registry collaborator.
//!
//! The registry itself is an external service: given a package name it
//! returns dependency names and download descriptors. [`Registry`] is the
//! seam the rest of the crate talks through. [`FileRegistry`] adapts a
//! directory of JSON package documents, which is enough to drive a mirror
//! run from a local metadata snapshot.

pub mod package;

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use package::Package;

/// A pinned collection revision active at mirror time, recorded into the
/// configuration document for reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPin {
	pub revision: String,
	pub kind: String,
}

pub trait Registry {
	/// Fetches the metadata for a single package.
	///
	/// `Ok(None)` means the package does not exist, which callers treat as
	/// non-fatal. `variants` are opaque tokens forwarded from the operator;
	/// registries that do not distinguish variants may ignore them.
	fn package(&self, name: &str, variants: &[String]) -> crate::Result<Option<Package>>;

	/// Collection revision pins active at mirror time.
	fn collections(&self) -> BTreeMap<String, CollectionPin>;
}

/// A registry backed by a directory of `<name>.json` package documents.
///
/// Collection pins are read from an optional `collections.json` in the same
/// directory. Variant-specific documents may be provided as
/// `<name>+<variant>.json` and take priority over the plain document.
pub struct FileRegistry {
	dir: std::path::PathBuf,
	pins: BTreeMap<String, CollectionPin>,
}

impl FileRegistry {
	pub fn open(dir: impl AsRef<std::path::Path>) -> crate::Result<Self> {
		let dir = dir.as_ref().to_path_buf();
		if !dir.is_dir() {
			return Err(crate::Error::Config(format!("registry directory `{}` does not exist.", dir.display())));
		}

		let pins_path = dir.join("collections.json");
		let pins = if pins_path.is_file() {
			serde_json::from_str(&std::fs::read_to_string(&pins_path)?)
				.map_err(|e| crate::Error::Config(format!("collections.json malformed: {}", e)))?
		} else {
			BTreeMap::new()
		};

		Ok(FileRegistry { dir, pins })
	}
}

impl Registry for FileRegistry {
	fn package(&self, name: &str, variants: &[String]) -> crate::Result<Option<Package>> {
		if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
			log::warn!("refusing registry lookup for unsafe package name `{}`.", name);
			return Ok(None);
		}

		let mut candidates = Vec::new();
		if !variants.is_empty() {
			candidates.push(format!("{}+{}.json", name, variants.join("+")));
		}
		candidates.push(format!("{}.json", name));

		for candidate in candidates {
			let path = self.dir.join(candidate);
			if !path.is_file() {
				continue;
			}
			let raw = std::fs::read_to_string(&path)?;
			let package = serde_json::from_str::<Package>(&raw)
				.map_err(|e| crate::Error::Config(format!("package document `{}` malformed: {}", path.display(), e)))?;
			return Ok(Some(package));
		}

		Ok(None)
	}

	fn collections(&self) -> BTreeMap<String, CollectionPin> {
		self.pins.clone()
	}
}
