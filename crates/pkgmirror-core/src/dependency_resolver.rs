//! Expands a set of requested package names into the full transitive
//! dependency set.
//!
//! Breadth-first over the registry with a visited set, so registry cycles
//! terminate. Runtime and recommended dependencies are always followed;
//! build-only and optional dependencies only when asked for. Output
//! iteration is lexicographic rather than traversal order, which keeps
//! repeated runs byte-identical.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::registry::Registry;
use crate::registry::package::{DependencyKind, Package};

mod tree;
pub use tree::DependencyTree;

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
	/// Follow dependency edges at all. With this off only the named
	/// packages are looked up.
	pub transitive: bool,
	pub include_build: bool,
	pub include_optional: bool,
}

impl Default for ResolveOptions {
	fn default() -> Self {
		ResolveOptions {
			transitive: true,
			include_build: false,
			include_optional: false,
		}
	}
}

/// The deduplicated result of a resolve, packages keyed and iterated by
/// name in sorted order.
#[derive(Debug, Default, Clone)]
pub struct ResolvedSet {
	packages: BTreeMap<String, Package>,
	edges: Vec<(String, String, DependencyKind)>,
	requested: Vec<String>,
}

impl ResolvedSet {
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.packages.keys().map(String::as_str)
	}

	pub fn packages(&self) -> impl Iterator<Item = &Package> {
		self.packages.values()
	}

	pub fn get(&self, name: &str) -> Option<&Package> {
		self.packages.get(name)
	}

	pub fn len(&self) -> usize {
		self.packages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.packages.is_empty()
	}

	/// The requested names that actually resolved, sorted.
	pub fn requested(&self) -> &[String] {
		&self.requested
	}

	/// A lazy depth-bounded tree listing over the already resolved set.
	/// Intended for debug output; no registry traffic.
	pub fn tree(&self, max_depth: usize) -> DependencyTree<'_> {
		DependencyTree::new(self, max_depth)
	}
}

pub fn resolve_dependencies<R: Registry>(
	registry: &R,
	names: &[String],
	variants: &[String],
	options: ResolveOptions,
) -> crate::Result<ResolvedSet> {
	let mut packages = BTreeMap::<String, Package>::new();
	let mut edges = Vec::<(String, String, DependencyKind)>::new();
	let mut visited = HashSet::<String>::new();
	let mut queue = VecDeque::<String>::new();

	for name in names {
		if visited.insert(name.clone()) {
			queue.push_back(name.clone());
		}
	}

	while let Some(name) = queue.pop_front() {
		let package = match registry.package(&name, variants)? {
			Some(package) => package,
			None => {
				log::warn!("package `{}` not found in the registry, skipping.", name);
				continue;
			}
		};

		if options.transitive {
			for dependency in &package.dependencies {
				let follow = match dependency.kind {
					DependencyKind::Runtime | DependencyKind::Recommended => true,
					DependencyKind::Build => options.include_build,
					DependencyKind::Optional => options.include_optional,
				};
				if !follow {
					log::debug!("not following {} dependency {} -> {}.", dependency.kind.token(), name, dependency.name);
					continue;
				}
				edges.push((name.clone(), dependency.name.clone(), dependency.kind));
				if visited.insert(dependency.name.clone()) {
					queue.push_back(dependency.name.clone());
				}
			}
		}

		packages.insert(name, package);
	}

	let mut requested: Vec<String> = names.iter().filter(|n| packages.contains_key(*n)).cloned().collect();
	requested.sort();
	requested.dedup();

	Ok(ResolvedSet { packages, edges, requested })
}
