use pkgmirror::dependency_resolver::{resolve_dependencies, ResolveOptions, ResolvedSet};
use pkgmirror::registry::package::DependencyKind;
use pkgmirror_test_utils::*;

fn names(set: &ResolvedSet) -> Vec<&str> {
	set.names().collect()
}

fn request(names: &[&str]) -> Vec<String> {
	names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn runtime_dependencies_resolve_transitively() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("B", DependencyKind::Runtime), ("C", DependencyKind::Build)]));
	registry.add(package("B", "1.0"));
	registry.add(package("C", "1.0"));

	let set = resolve_dependencies(&registry, &request(&["A"]), &[], ResolveOptions::default()).unwrap();
	assert_eq!(names(&set), vec!["A", "B"]);
}

#[test]
fn build_dependencies_follow_when_requested() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("B", DependencyKind::Runtime), ("C", DependencyKind::Build)]));
	registry.add(package("B", "1.0"));
	registry.add(package("C", "1.0"));

	let options = ResolveOptions { include_build: true, ..Default::default() };
	let set = resolve_dependencies(&registry, &request(&["A"]), &[], options).unwrap();
	assert_eq!(names(&set), vec!["A", "B", "C"]);
}

#[test]
fn recommended_always_follow_optional_only_when_requested() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("B", DependencyKind::Recommended), ("C", DependencyKind::Optional)]));
	registry.add(package("B", "1.0"));
	registry.add(package("C", "1.0"));

	let set = resolve_dependencies(&registry, &request(&["A"]), &[], ResolveOptions::default()).unwrap();
	assert_eq!(names(&set), vec!["A", "B"]);

	let options = ResolveOptions { include_optional: true, ..Default::default() };
	let set = resolve_dependencies(&registry, &request(&["A"]), &[], options).unwrap();
	assert_eq!(names(&set), vec!["A", "B", "C"]);
}

#[test]
fn cycles_terminate() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("B", DependencyKind::Runtime)]));
	registry.add(package_with_deps("B", "1.0", &[("A", DependencyKind::Runtime)]));

	let set = resolve_dependencies(&registry, &request(&["A"]), &[], ResolveOptions::default()).unwrap();
	assert_eq!(names(&set), vec!["A", "B"]);
}

#[test]
fn missing_packages_are_skipped_without_error() {
	let registry = FakeRegistry::new();
	let set = resolve_dependencies(&registry, &request(&["doesnotexist"]), &[], ResolveOptions::default()).unwrap();
	assert!(set.is_empty());
}

#[test]
fn missing_dependencies_do_not_fail_the_resolve() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("gone", DependencyKind::Runtime)]));

	let set = resolve_dependencies(&registry, &request(&["A"]), &[], ResolveOptions::default()).unwrap();
	assert_eq!(names(&set), vec!["A"]);
}

#[test]
fn empty_input_resolves_to_the_empty_set() {
	let registry = FakeRegistry::new();
	let set = resolve_dependencies(&registry, &[], &[], ResolveOptions::default()).unwrap();
	assert!(set.is_empty());
}

#[test]
fn iteration_order_is_sorted_not_traversal_order() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("zeta", "1.0", &[("alpha", DependencyKind::Runtime)]));
	registry.add(package("alpha", "1.0"));

	let set = resolve_dependencies(&registry, &request(&["zeta"]), &[], ResolveOptions::default()).unwrap();
	assert_eq!(names(&set), vec!["alpha", "zeta"]);
}

#[test]
fn non_transitive_resolve_looks_up_only_the_named_packages() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("B", DependencyKind::Runtime)]));
	registry.add(package("B", "1.0"));

	let options = ResolveOptions { transitive: false, ..Default::default() };
	let set = resolve_dependencies(&registry, &request(&["A"]), &[], options).unwrap();
	assert_eq!(names(&set), vec!["A"]);
}

#[test]
fn tree_listing_is_depth_bounded() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("B", DependencyKind::Runtime)]));
	registry.add(package_with_deps("B", "1.0", &[("C", DependencyKind::Runtime)]));
	registry.add(package("C", "1.0"));

	let set = resolve_dependencies(&registry, &request(&["A"]), &[], ResolveOptions::default()).unwrap();
	let rows: Vec<(usize, &str)> = set.tree(1).collect();
	assert_eq!(rows, vec![(0, "A"), (1, "B")]);

	let rows: Vec<(usize, &str)> = set.tree(2).collect();
	assert_eq!(rows, vec![(0, "A"), (1, "B"), (2, "C")]);
}

#[test]
fn tree_listing_terminates_on_cycles() {
	let mut registry = FakeRegistry::new();
	registry.add(package_with_deps("A", "1.0", &[("B", DependencyKind::Runtime)]));
	registry.add(package_with_deps("B", "1.0", &[("A", DependencyKind::Runtime)]));

	let set = resolve_dependencies(&registry, &request(&["A"]), &[], ResolveOptions::default()).unwrap();
	let rows: Vec<(usize, &str)> = set.tree(4).collect();
	assert_eq!(rows.len(), 5);
	assert_eq!(rows[0], (0, "A"));
	assert_eq!(rows[4], (4, "A"));
}
