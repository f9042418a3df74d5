//! Various types associated with packages and their downloadable resources.

use serde::*;

/// The (name, version) pair naming a package.
///
/// Incremental runs treat a package as unchanged exactly when this pair is
/// unchanged, so a version rollback reads as a new package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentifier {
	pub name: String,
	pub version: String,
}

impl std::fmt::Display for PackageIdentifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.name, self.version)
	}
}

/// How a dependency edge is tagged in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
	Runtime,
	Build,
	Optional,
	Recommended,
}

impl DependencyKind {
	pub fn token(&self) -> &'static str {
		match self {
			DependencyKind::Runtime => "runtime",
			DependencyKind::Build => "build",
			DependencyKind::Optional => "optional",
			DependencyKind::Recommended => "recommended",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
	pub name: String,
	pub kind: DependencyKind,
}

/// Where a resource's content lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locator {
	/// A plain URI, including `file://` for local upstreams.
	Url(String),
	/// A version-control location. `revision` may be a concrete commit
	/// hash, a symbolic reference, or absent (tip of the default branch).
	Vcs { url: String, revision: Option<String> },
}

impl Locator {
	pub fn url(&self) -> &str {
		match self {
			Locator::Url(url) => url,
			Locator::Vcs { url, .. } => url,
		}
	}
}

impl std::fmt::Display for Locator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Locator::Url(url) => write!(f, "{}", url),
			Locator::Vcs { url, revision: Some(revision) } => write!(f, "{}@{}", url, revision),
			Locator::Vcs { url, revision: None } => write!(f, "{}", url),
		}
	}
}

/// How a resource is fetched. A closed set plus [`StrategyKind::Other`] for
/// whatever foreign token the registry hands back; `Other` is never
/// fetchable, only skippable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StrategyKind {
	PlainArchive,
	NoAutoExtract,
	MirrorList,
	VcsCheckout,
	Other(String),
}

impl StrategyKind {
	pub fn token(&self) -> &str {
		match self {
			StrategyKind::PlainArchive => "plain-archive",
			StrategyKind::NoAutoExtract => "archive-no-auto-extract",
			StrategyKind::MirrorList => "mirror-list-archive",
			StrategyKind::VcsCheckout => "vcs-checkout",
			StrategyKind::Other(token) => token,
		}
	}

	pub fn from_token(token: &str) -> Self {
		match token {
			"plain-archive" => StrategyKind::PlainArchive,
			"archive-no-auto-extract" => StrategyKind::NoAutoExtract,
			"mirror-list-archive" => StrategyKind::MirrorList,
			"vcs-checkout" => StrategyKind::VcsCheckout,
			other => StrategyKind::Other(other.to_string()),
		}
	}

	/// The built-in fetchable kinds, the default allow list.
	pub fn builtin() -> [StrategyKind; 4] {
		[
			StrategyKind::PlainArchive,
			StrategyKind::NoAutoExtract,
			StrategyKind::MirrorList,
			StrategyKind::VcsCheckout,
		]
	}
}

impl std::fmt::Display for StrategyKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.token())
	}
}

impl Serialize for StrategyKind {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.token())
	}
}

impl<'de> Deserialize<'de> for StrategyKind {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let token = String::deserialize(deserializer)?;
		Ok(StrategyKind::from_token(&token))
	}
}

/// Declared content integrity for a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Checksum {
	/// Lower-case hex sha256 of the payload bytes.
	Sha256(String),
	/// The registry explicitly declares the content unchecked.
	Unchecked,
}

impl Checksum {
	pub fn is_strong(&self) -> bool {
		matches!(self, Checksum::Sha256(_))
	}
}

/// A pointer to fetchable content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadDescriptor {
	pub locator: Locator,
	pub strategy: StrategyKind,
	pub checksum: Checksum,
	/// Alternate URLs, only meaningful for mirror-list-archive descriptors.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub mirrors: Vec<String>,
}

/// A named, versioned installable unit as the registry describes it.
///
/// Recomputed fresh from the registry every run; nothing here is persisted
/// except through the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
	pub identifier: PackageIdentifier,
	#[serde(default)]
	pub dependencies: Vec<Dependency>,
	/// The primary source.
	pub download: Option<DownloadDescriptor>,
	/// An alternate "latest" source, typically a checkout of the tip.
	#[serde(default)]
	pub head: Option<DownloadDescriptor>,
	/// Bundled sub-resources declared by the package.
	#[serde(default)]
	pub resources: Vec<DownloadDescriptor>,
	/// External patches applied at build time.
	#[serde(default)]
	pub patches: Vec<DownloadDescriptor>,
}

impl Package {
	pub fn name(&self) -> &str {
		&self.identifier.name
	}

	pub fn version(&self) -> &str {
		&self.identifier.version
	}
}

impl std::hash::Hash for Package {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.identifier.hash(state);
	}
}

impl std::cmp::Ord for Package {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.identifier.cmp(&other.identifier)
	}
}

impl std::cmp::PartialOrd for Package {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::cmp::PartialEq for Package {
	fn eq(&self, other: &Self) -> bool {
		self.identifier == other.identifier
	}
}

impl std::cmp::Eq for Package {}

impl AsRef<PackageIdentifier> for Package {
	fn as_ref(&self) -> &PackageIdentifier {
		&self.identifier
	}
}
