use std::collections::{HashMap, HashSet, VecDeque};

use super::types::{GraphEdge, GraphNode, NodeKind};

/// Category groups the user has opened. All groups start collapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandedGroups {
	ids: HashSet<String>,
	generation: u64,
}

impl ExpandedGroups {
	pub fn contains(&self, id: &str) -> bool {
		self.ids.contains(id)
	}

	/// Flip `id` and return its new expanded state.
	pub fn toggle(&mut self, id: &str) -> bool {
		self.generation += 1;
		if self.ids.remove(id) {
			false
		} else {
			self.ids.insert(id.to_string());
			true
		}
	}

	/// Collapse everything. Called when a different document is loaded.
	pub fn reset(&mut self) {
		if !self.ids.is_empty() {
			self.ids.clear();
			self.generation += 1;
		}
	}

	/// Bumped on every change; used as the filter's memo key.
	pub fn generation(&self) -> u64 {
		self.generation
	}
}

/// Nodes and edges that survive collapse filtering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibleGraph {
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
}

impl VisibleGraph {
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	pub fn structural_edges(&self) -> impl Iterator<Item = &GraphEdge> {
		self.edges.iter().filter(|e| e.is_structural())
	}
}

/// Hide everything below a collapsed category group and every edge that
/// touches a hidden or unknown node. Category groups get `is_expanded`
/// stamped so the renderer can draw the right disclosure marker.
///
/// Collapse is followed through any depth of structural descendants, so a
/// group nested inside another collapsed group stays hidden too.
pub fn filter_visible(nodes: &[GraphNode], edges: &[GraphEdge], expanded: &ExpandedGroups) -> VisibleGraph {
	let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
	for edge in edges.iter().filter(|e| e.is_structural()) {
		children.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
	}

	let mut hidden: HashSet<&str> = HashSet::new();
	let mut queue: VecDeque<&str> = nodes
		.iter()
		.filter(|n| n.kind == NodeKind::CategoryGroup && !expanded.contains(&n.id))
		.map(|n| n.id.as_str())
		.collect();
	while let Some(id) = queue.pop_front() {
		for &child in children.get(id).into_iter().flatten() {
			if hidden.insert(child) {
				queue.push_back(child);
			}
		}
	}

	let visible_nodes: Vec<GraphNode> = nodes
		.iter()
		.filter(|n| !hidden.contains(n.id.as_str()))
		.map(|n| {
			let mut n = n.clone();
			if n.kind == NodeKind::CategoryGroup {
				n.flags.is_expanded = expanded.contains(&n.id);
			}
			n
		})
		.collect();
	let ids: HashSet<&str> = visible_nodes.iter().map(|n| n.id.as_str()).collect();
	let visible_edges = edges
		.iter()
		.filter(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
		.cloned()
		.collect();

	VisibleGraph {
		nodes: visible_nodes,
		edges: visible_edges,
	}
}
