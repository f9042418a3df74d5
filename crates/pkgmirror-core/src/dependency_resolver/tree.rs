//! Depth-bounded tree listing of an already resolved dependency set.

use std::collections::HashMap;

use petgraph::prelude::*;

use super::ResolvedSet;
use crate::registry::package::DependencyKind;

/// A lazy pre-order walk of the resolved set, yielding `(depth, name)` rows
/// starting from the requested packages. The depth bound is the only
/// termination guard, so cyclic sets print to the bound and stop.
pub struct DependencyTree<'set> {
	graph: StableDiGraph<&'set str, DependencyKind>,
	stack: Vec<(NodeIndex, usize)>,
	max_depth: usize,
}

impl<'set> DependencyTree<'set> {
	pub(super) fn new(set: &'set ResolvedSet, max_depth: usize) -> Self {
		let mut graph = StableDiGraph::new();
		let mut index = HashMap::<&str, NodeIndex>::new();

		for name in set.packages.keys() {
			index.insert(name.as_str(), graph.add_node(name.as_str()));
		}
		for (source, target, kind) in &set.edges {
			if let (Some(&source), Some(&target)) = (index.get(source.as_str()), index.get(target.as_str())) {
				graph.add_edge(source, target, *kind);
			}
		}

		/* Reversed so the stack pops roots in sorted order. */
		let mut stack: Vec<(NodeIndex, usize)> = set.requested.iter()
			.filter_map(|name| index.get(name.as_str()).copied())
			.map(|node| (node, 0))
			.collect();
		stack.reverse();

		DependencyTree { graph, stack, max_depth }
	}
}

impl<'set> Iterator for DependencyTree<'set> {
	type Item = (usize, &'set str);

	fn next(&mut self) -> Option<Self::Item> {
		let (node, depth) = self.stack.pop()?;

		if depth < self.max_depth {
			let mut children: Vec<NodeIndex> = self.graph.neighbors_directed(node, Outgoing).collect();
			children.sort_by_key(|child| self.graph[*child]);
			children.reverse();
			for child in children {
				self.stack.push((child, depth + 1));
			}
		}

		Some((depth, self.graph[node]))
	}
}
