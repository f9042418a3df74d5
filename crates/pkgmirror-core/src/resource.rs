//! Collects download descriptors for resolved packages and assigns each
//! one a stable cache identifier.
//!
//! Identifier assignment is a pure function of the descriptor: no
//! randomness, no clock, so identical inputs name identical cache entries
//! across runs and processes.

use crate::registry::package::{Checksum, DownloadDescriptor, Locator, Package, PackageIdentifier, StrategyKind};

/// Filename of the debug transparency table (locator key -> identifier).
/// Non-authoritative; identifiers are always recomputed.
pub const TRANSPARENCY_FILENAME: &str = "transparency.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRole {
	Primary,
	Head,
	SubResource,
	Patch,
}

impl std::fmt::Display for ResourceRole {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ResourceRole::Primary => write!(f, "primary"),
			ResourceRole::Head => write!(f, "head"),
			ResourceRole::SubResource => write!(f, "sub-resource"),
			ResourceRole::Patch => write!(f, "patch"),
		}
	}
}

/// A descriptor queued for mirroring, tagged with its owning package.
#[derive(Debug, Clone)]
pub struct ResolvedResource {
	pub package: PackageIdentifier,
	pub role: ResourceRole,
	pub descriptor: DownloadDescriptor,
}

/// A descriptor whose strategy is outside the allow list. Deliberately
/// distinct from a download failure.
#[derive(Debug, Clone)]
pub struct SkippedResource {
	pub package: PackageIdentifier,
	pub strategy: String,
	pub locator: String,
}

/// Flattens a package into its mirrorable resources: primary source, the
/// alternate "latest" source, declared sub-resources, then external
/// patches. Anything outside `allowed` lands in the skip list with a
/// warning.
pub fn collect_resources(package: &Package, allowed: &[StrategyKind]) -> (Vec<ResolvedResource>, Vec<SkippedResource>) {
	let mut resources = Vec::new();
	let mut skipped = Vec::new();

	let mut push = |role: ResourceRole, descriptor: &DownloadDescriptor| {
		if allowed.contains(&descriptor.strategy) {
			resources.push(ResolvedResource {
				package: package.identifier.clone(),
				role,
				descriptor: descriptor.clone(),
			});
		} else {
			log::warn!(
				"skipping {} resource {} of {}: strategy `{}` is outside the allow list.",
				role, descriptor.locator, package.identifier, descriptor.strategy,
			);
			skipped.push(SkippedResource {
				package: package.identifier.clone(),
				strategy: descriptor.strategy.token().to_string(),
				locator: descriptor.locator.url().to_string(),
			});
		}
	};

	if let Some(descriptor) = &package.download {
		push(ResourceRole::Primary, descriptor);
	}
	if let Some(descriptor) = &package.head {
		push(ResourceRole::Head, descriptor);
	}
	for descriptor in &package.resources {
		push(ResourceRole::SubResource, descriptor);
	}
	for descriptor in &package.patches {
		push(ResourceRole::Patch, descriptor);
	}

	(resources, skipped)
}

/// Assigns the stable cache identifier for a descriptor.
///
/// 1. A strong checksum is its own identifier, so descriptors sharing a
///    checksum collapse to one cache entry whatever their locators say.
/// 2. Version-control checkouts hash `url@revision`, where the revision is
///    only ever a concrete commit hash; symbolic names fall back to the
///    literal token `HEAD`.
/// 3. Everything else hashes the locator string.
pub fn assign_identifier(descriptor: &DownloadDescriptor) -> String {
	match &descriptor.checksum {
		Checksum::Sha256(hex) => hex.to_ascii_lowercase(),
		Checksum::Unchecked => match &descriptor.locator {
			Locator::Vcs { url, revision } => {
				let revision = revision
					.as_deref()
					.filter(|r| crate::download::vcs::is_concrete_revision(r))
					.unwrap_or("HEAD");
				sha256::digest(format!("{}@{}", url, revision))
			}
			Locator::Url(url) => sha256::digest(url.as_str()),
		},
	}
}

/// The transparency-table key for a descriptor: the locator, with the
/// revision the identifier was derived from for checkouts.
pub fn locator_key(descriptor: &DownloadDescriptor) -> String {
	match &descriptor.locator {
		Locator::Vcs { url, revision } => {
			let revision = revision
				.as_deref()
				.filter(|r| crate::download::vcs::is_concrete_revision(r))
				.unwrap_or("HEAD");
			format!("{}@{}", url, revision)
		}
		Locator::Url(url) => url.clone(),
	}
}

/// Detects the payload filename extension for a descriptor.
///
/// Checkouts are packed into tarballs, so always `.tar.gz`. For URLs the
/// extension comes off the path with query and fragment stripped; known
/// multi-part archive suffixes are kept whole.
pub fn detect_extension(descriptor: &DownloadDescriptor) -> String {
	if let Locator::Vcs { .. } = descriptor.locator {
		return ".tar.gz".to_string();
	}
	if descriptor.strategy == StrategyKind::VcsCheckout {
		return ".tar.gz".to_string();
	}

	let url = descriptor.locator.url();
	let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
	let name = path.rsplit('/').next().unwrap_or(path);

	let known = regex::Regex::new(r"(?i)(\.tar\.(gz|bz2|xz|zst)|\.(tgz|tbz2?|txz|zip|jar|gem|whl|crate|deb|rpm|pkg|dmg|patch|diff|gz|bz2|xz))$")
		.expect("extension pattern failed to compile.");
	if let Some(m) = known.find(name) {
		return m.as_str().to_ascii_lowercase();
	}

	let fallback = regex::Regex::new(r"\.([A-Za-z0-9]{1,4})$").expect("extension pattern failed to compile.");
	match fallback.find(name) {
		Some(m) => m.as_str().to_ascii_lowercase(),
		None => String::new(),
	}
}
