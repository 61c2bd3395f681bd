//! Selection, hover and explicit highlight, resolved into per-node opacity
//! and per-edge emphasis.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use indexmap::IndexSet;
use log::debug;

use super::types::{DiagramConfig, GraphEdge};
use super::visibility::VisibleGraph;

/// Parent/child maps over structural edges only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjacencyIndex {
	parent_of: HashMap<String, String>,
	children_of: HashMap<String, Vec<String>>,
}

impl AdjacencyIndex {
	/// Index the structural edges among `edges`; every other class is ignored.
	pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a GraphEdge>) -> Self {
		let mut index = Self::default();
		for edge in edges.into_iter().filter(|e| e.is_structural()) {
			if index.parent_of.contains_key(&edge.target) {
				continue;
			}
			index.parent_of.insert(edge.target.clone(), edge.source.clone());
			index
				.children_of
				.entry(edge.source.clone())
				.or_default()
				.push(edge.target.clone());
		}
		index
	}

	pub fn parent_of(&self, id: &str) -> Option<&str> {
		self.parent_of.get(id).map(String::as_str)
	}

	pub fn children_of(&self, id: &str) -> &[String] {
		self.children_of.get(id).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Each selected id plus all of its ancestors and descendants.
	pub fn branch<'a>(&self, selected: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
		let mut set: HashSet<String> = HashSet::new();
		for id in selected {
			set.insert(id.to_string());

			let mut cursor = id;
			for _ in 0..=self.parent_of.len() {
				let Some(parent) = self.parent_of(cursor) else {
					break;
				};
				set.insert(parent.to_string());
				cursor = parent;
			}

			let mut queue: VecDeque<&str> = VecDeque::from([id]);
			let mut seen: HashSet<&str> = HashSet::from([id]);
			while let Some(current) = queue.pop_front() {
				for child in self.children_of(current) {
					if seen.insert(child.as_str()) {
						set.insert(child.clone());
						queue.push_back(child.as_str());
					}
				}
			}
		}
		set
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HighlightMode {
	#[default]
	None,
	/// Explicit highlight driven from outside the canvas.
	Highlight,
	/// Hover preview; lighter dimming.
	Preview,
	/// Selection-derived branch.
	Branch,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
	pub mode: HighlightMode,
	pub active: HashSet<String>,
}

impl Resolution {
	/// Same mode and the same ids.
	fn same_as(&self, other: &Resolution) -> bool {
		self.mode == other.mode
			&& self.active.len() == other.active.len()
			&& self.active.iter().all(|id| other.active.contains(id))
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
	pub emphasized: bool,
	pub opacity: f64,
}

impl Default for EdgeStyle {
	fn default() -> Self {
		Self {
			emphasized: false,
			opacity: 1.0,
		}
	}
}

/// Visual weights for the current resolution. Ids that are absent render at
/// full opacity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Styling {
	nodes: HashMap<String, f64>,
	edges: HashMap<String, EdgeStyle>,
}

impl Styling {
	pub fn node_opacity(&self, id: &str) -> f64 {
		self.nodes.get(id).copied().unwrap_or(1.0)
	}

	pub fn edge(&self, id: &str) -> EdgeStyle {
		self.edges.get(id).copied().unwrap_or_default()
	}
}

/// Owns selection, hover and highlight inputs plus the adjacency cache.
pub struct HighlightEngine {
	root_id: String,
	dim_committed: f64,
	dim_preview: f64,
	selected: IndexSet<String>,
	highlighted: HashSet<String>,
	hovered: HashSet<String>,
	graph: Option<Rc<VisibleGraph>>,
	index: AdjacencyIndex,
	index_builds: usize,
	resolution: Resolution,
	styling: Styling,
}

impl HighlightEngine {
	pub fn new(root_id: &str, config: &DiagramConfig) -> Self {
		Self {
			root_id: root_id.to_string(),
			dim_committed: config.dim_committed,
			dim_preview: config.dim_preview,
			selected: IndexSet::new(),
			highlighted: HashSet::new(),
			hovered: HashSet::new(),
			graph: None,
			index: AdjacencyIndex::default(),
			index_builds: 0,
			resolution: Resolution::default(),
			styling: Styling::default(),
		}
	}

	/// Point the engine at a new filtered graph. Nothing happens when `graph`
	/// is the same allocation as last time, and the adjacency index is only
	/// rebuilt when the structural edges differ. Inputs naming nodes that are
	/// no longer visible are pruned.
	pub fn sync_graph(&mut self, graph: &Rc<VisibleGraph>) {
		if self.graph.as_ref().is_some_and(|g| Rc::ptr_eq(g, graph)) {
			return;
		}
		let same_structure = self
			.graph
			.as_ref()
			.is_some_and(|g| g.structural_edges().eq(graph.structural_edges()));
		if !same_structure {
			self.index = AdjacencyIndex::from_edges(graph.structural_edges());
			self.index_builds += 1;
		}
		self.selected.retain(|id| graph.contains(id));
		self.highlighted.retain(|id| graph.contains(id));
		self.hovered.retain(|id| graph.contains(id));
		self.graph = Some(Rc::clone(graph));
		self.refresh(true);
	}

	/// Replace the selection with `id`, or toggle `id` in it when `additive`.
	/// `None` clears the selection unless `additive` is set.
	pub fn select_node(&mut self, id: Option<&str>, additive: bool) -> bool {
		match id {
			Some(id) if !self.is_known(id) => {}
			Some(id) if additive => {
				if !self.selected.shift_remove(id) {
					self.selected.insert(id.to_string());
				}
			}
			Some(id) => {
				self.selected.clear();
				self.selected.insert(id.to_string());
			}
			None if !additive => self.selected.clear(),
			None => {}
		}
		self.refresh(false)
	}

	/// Highlight exactly `ids`; repeating the current set clears it.
	pub fn toggle_highlight(&mut self, ids: &[String]) -> bool {
		let next: HashSet<String> = ids.iter().filter(|id| self.is_known(id)).cloned().collect();
		if next == self.highlighted {
			self.highlighted.clear();
		} else {
			self.highlighted = next;
		}
		self.refresh(false)
	}

	pub fn clear_highlight(&mut self) -> bool {
		self.highlighted.clear();
		self.refresh(false)
	}

	/// Preview `ids`; an empty list ends the preview.
	pub fn hover_highlight(&mut self, ids: &[String]) -> bool {
		self.hovered = ids.iter().filter(|id| self.is_known(id)).cloned().collect();
		self.refresh(false)
	}

	/// Drop every input, e.g. when a different document is loaded.
	pub fn reset(&mut self) {
		self.selected.clear();
		self.highlighted.clear();
		self.hovered.clear();
		self.refresh(false);
	}

	/// Selected ids in selection order.
	pub fn selected(&self) -> impl Iterator<Item = &str> {
		self.selected.iter().map(String::as_str)
	}

	/// Most recently selected id, for the detail panel.
	pub fn primary_selection(&self) -> Option<&str> {
		self.selected.last().map(String::as_str)
	}

	pub fn is_selected(&self, id: &str) -> bool {
		self.selected.contains(id)
	}

	pub fn resolution(&self) -> &Resolution {
		&self.resolution
	}

	pub fn styling(&self) -> &Styling {
		&self.styling
	}

	pub fn index(&self) -> &AdjacencyIndex {
		&self.index
	}

	/// How many times the adjacency index has been built.
	pub fn index_builds(&self) -> usize {
		self.index_builds
	}

	fn is_known(&self, id: &str) -> bool {
		self.graph.as_ref().is_none_or(|g| g.contains(id))
	}

	/// Re-resolve the active set. Returns false, leaving the styling alone,
	/// when nothing changed and `force` is not set.
	fn refresh(&mut self, force: bool) -> bool {
		let next = self.resolve();
		if !force && next.same_as(&self.resolution) {
			return false;
		}
		self.resolution = next;
		self.styling = self.compute_styling();
		debug!(
			"highlight: {:?} with {} active",
			self.resolution.mode,
			self.resolution.active.len()
		);
		true
	}

	fn resolve(&self) -> Resolution {
		if !self.highlighted.is_empty() {
			return Resolution {
				mode: HighlightMode::Highlight,
				active: self.highlighted.clone(),
			};
		}
		if !self.hovered.is_empty() {
			return Resolution {
				mode: HighlightMode::Preview,
				active: self.hovered.clone(),
			};
		}
		if !self.selected.is_empty() {
			let branch = self.index.branch(self.selected.iter().map(String::as_str));
			return Resolution {
				mode: HighlightMode::Branch,
				active: branch,
			};
		}
		Resolution::default()
	}

	fn compute_styling(&self) -> Styling {
		let mut styling = Styling::default();
		let (Some(graph), mode) = (&self.graph, self.resolution.mode) else {
			return styling;
		};
		if mode == HighlightMode::None {
			return styling;
		}
		let dim = if mode == HighlightMode::Preview {
			self.dim_preview
		} else {
			self.dim_committed
		};
		let active = &self.resolution.active;
		for node in &graph.nodes {
			if node.id != self.root_id && !active.contains(&node.id) {
				styling.nodes.insert(node.id.clone(), dim);
			}
		}
		for edge in &graph.edges {
			let (src, tgt) = (active.contains(&edge.source), active.contains(&edge.target));
			let emphasized = match mode {
				HighlightMode::Branch => src && tgt,
				_ => src || tgt,
			};
			let opacity = if emphasized { 1.0 } else { dim };
			styling.edges.insert(edge.id.clone(), EdgeStyle { emphasized, opacity });
		}
		styling
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::super::builder::{ROOT_ID, build_graph};
	use super::super::fixtures::arb_tree;
	use super::super::types::{GraphNode, NodeFlags, NodeKind, Side};
	use super::super::visibility::{ExpandedGroups, filter_visible};
	use super::*;

	fn n(id: &str) -> GraphNode {
		GraphNode {
			id: id.into(),
			kind: NodeKind::Person,
			side: Side::Right,
			label: id.into(),
			sublabel: None,
			flags: NodeFlags::default(),
			owner_refs: vec![],
		}
	}

	/// root -> A -> G -> L, root -> B, plus a user link A..B and a joint
	/// ownership cross-link B..L.
	fn graph() -> Rc<VisibleGraph> {
		Rc::new(VisibleGraph {
			nodes: ["root", "A", "B", "G", "L"].into_iter().map(n).collect(),
			edges: vec![
				GraphEdge::structural("root", "A"),
				GraphEdge::structural("root", "B"),
				GraphEdge::structural("A", "G"),
				GraphEdge::structural("G", "L"),
				GraphEdge::user_link("A", "B"),
				GraphEdge::cross_link("B", "L"),
			],
		})
	}

	fn engine() -> HighlightEngine {
		let mut engine = HighlightEngine::new("root", &DiagramConfig::default());
		engine.sync_graph(&graph());
		engine
	}

	fn set(ids: &[&str]) -> HashSet<String> {
		ids.iter().map(|s| s.to_string()).collect()
	}

	fn ids(ids: &[&str]) -> Vec<String> {
		ids.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn user_and_cross_links_never_enter_the_index() {
		let index = AdjacencyIndex::from_edges(&graph().edges);
		assert_eq!(index.parent_of("B"), Some("root"));
		assert_eq!(index.parent_of("L"), Some("G"));
		assert_eq!(index.children_of("A"), ["G".to_string()]);
		assert!(index.children_of("B").is_empty());
	}

	#[test]
	fn branch_does_not_follow_cross_links() {
		let mut engine = engine();
		engine.select_node(Some("B"), false);
		assert!(!engine.resolution().active.contains("L"));
		assert!(!engine.styling().edge("x:B->L").emphasized);
	}

	#[test]
	fn additive_selection_keeps_order() {
		let mut engine = engine();
		engine.select_node(Some("A"), false);
		engine.select_node(Some("B"), true);
		assert_eq!(engine.selected().collect::<Vec<_>>(), vec!["A", "B"]);
		assert_eq!(engine.primary_selection(), Some("B"));
		assert_eq!(engine.resolution().active, set(&["root", "A", "B", "G", "L"]));
	}

	#[test]
	fn branch_of_leaf_walks_to_root_only() {
		let mut engine = engine();
		engine.select_node(Some("B"), false);
		assert_eq!(engine.resolution().mode, HighlightMode::Branch);
		assert_eq!(engine.resolution().active, set(&["root", "B"]));
		assert_eq!(engine.styling().node_opacity("A"), DiagramConfig::default().dim_committed);
		assert_eq!(engine.styling().node_opacity("root"), 1.0);
	}

	#[test]
	fn branch_edges_need_both_ends_active() {
		let mut engine = engine();
		engine.select_node(Some("B"), false);
		assert!(engine.styling().edge("s:root->B").emphasized);
		assert!(!engine.styling().edge("u:A->B").emphasized);
	}

	#[test]
	fn highlight_edges_need_either_end_active() {
		let mut engine = engine();
		engine.toggle_highlight(&ids(&["B"]));
		assert_eq!(engine.resolution().mode, HighlightMode::Highlight);
		assert!(engine.styling().edge("u:A->B").emphasized);
		assert!(engine.styling().edge("s:root->B").emphasized);
		assert!(!engine.styling().edge("s:A->G").emphasized);
	}

	#[test]
	fn priority_is_highlight_then_hover_then_branch() {
		let mut engine = engine();
		engine.select_node(Some("A"), false);
		engine.hover_highlight(&ids(&["L"]));
		assert_eq!(engine.resolution().mode, HighlightMode::Preview);
		assert_eq!(engine.styling().node_opacity("B"), DiagramConfig::default().dim_preview);

		engine.toggle_highlight(&ids(&["B"]));
		assert_eq!(engine.resolution().mode, HighlightMode::Highlight);
		assert_eq!(engine.resolution().active, set(&["B"]));

		engine.toggle_highlight(&ids(&["B"]));
		assert_eq!(engine.resolution().mode, HighlightMode::Preview);
		engine.hover_highlight(&[]);
		assert_eq!(engine.resolution().mode, HighlightMode::Branch);
	}

	#[test]
	fn unchanged_resolution_skips_restyle() {
		let mut engine = engine();
		assert!(engine.select_node(Some("A"), false));
		assert!(!engine.select_node(Some("A"), false));
		assert!(!engine.clear_highlight());
	}

	#[test]
	fn index_is_rebuilt_only_when_structure_changes() {
		let shared = graph();
		let mut engine = HighlightEngine::new("root", &DiagramConfig::default());
		engine.sync_graph(&shared);
		engine.sync_graph(&shared);
		engine.select_node(Some("A"), false);
		assert_eq!(engine.index_builds(), 1);

		let mut relinked = (*graph()).clone();
		relinked.edges.push(GraphEdge::user_link("L", "A"));
		engine.sync_graph(&Rc::new(relinked));
		assert_eq!(engine.index_builds(), 1);
		assert!(engine.styling().edge("u:L->A").emphasized);

		let mut regrown = (*graph()).clone();
		regrown.nodes.push(n("M"));
		regrown.edges.push(GraphEdge::structural("B", "M"));
		engine.sync_graph(&Rc::new(regrown));
		assert_eq!(engine.index_builds(), 2);
		assert_eq!(engine.index().parent_of("M"), Some("B"));
	}

	#[test]
	fn hidden_nodes_fall_out_of_the_selection() {
		let mut engine = engine();
		engine.select_node(Some("L"), false);
		let smaller = Rc::new(VisibleGraph {
			nodes: ["root", "A", "B", "G"].into_iter().map(n).collect(),
			edges: graph().edges[..3].to_vec(),
		});
		engine.sync_graph(&smaller);
		assert_eq!(engine.selected().count(), 0);
		assert_eq!(engine.resolution().mode, HighlightMode::None);
	}

	#[test]
	fn unknown_ids_are_ignored() {
		let mut engine = engine();
		assert!(!engine.select_node(Some("ghost"), false));
		assert_eq!(engine.selected().count(), 0);
	}

	proptest! {
		#[test]
		fn branch_is_closed_over_ancestors_and_descendants(tree in arb_tree(), picks in prop::collection::vec(any::<prop::sample::Index>(), 1..4)) {
			let graph = build_graph(&tree, &DiagramConfig::default());
			let visible = filter_visible(&graph.nodes, &graph.edges, &ExpandedGroups::default());
			let index = AdjacencyIndex::from_edges(&visible.edges);
			let selected: Vec<&str> = picks.iter().map(|i| visible.nodes[i.index(visible.nodes.len())].id.as_str()).collect();
			let branch = index.branch(selected.iter().copied());
			for id in &selected {
				let mut cursor = *id;
				while let Some(parent) = index.parent_of(cursor) {
					prop_assert!(branch.contains(parent));
					cursor = parent;
				}
				prop_assert_eq!(cursor, ROOT_ID);
				let mut stack = vec![*id];
				while let Some(current) = stack.pop() {
					for child in index.children_of(current) {
						prop_assert!(branch.contains(child));
						stack.push(child.as_str());
					}
				}
			}
		}
	}
}
