//! Deterministic two-sided tree layout.
//!
//! [`layered_layout`] lays out one side of the tree flowing away from the
//! root in a single direction. [`dual_layout`] runs it once per side and
//! merges the two halves into one coordinate space with the root centred
//! on the origin.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use log::debug;

use super::types::{DiagramConfig, GraphEdge, GraphNode, Position, Rect, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowDirection {
	/// Layers grow toward +x; each card's left edge is flush with its layer.
	Rightward,
	/// Layers grow toward -x; each card's right edge is flush with its layer.
	Leftward,
}

/// Node rectangles in graph space, keyed by node id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	pub rects: BTreeMap<String, Rect>,
}

impl Layout {
	/// Top-left corner of `id`.
	pub fn position(&self, id: &str) -> Option<Position> {
		self.rects.get(id).map(|r| Position::new(r.x, r.y))
	}

	pub fn rect(&self, id: &str) -> Option<Rect> {
		self.rects.get(id).copied()
	}

	/// Bounding box of every positioned node.
	pub fn bounds(&self) -> Option<Rect> {
		let mut rects = self.rects.values();
		let first = *rects.next()?;
		Some(rects.fold(first, |acc, r| acc.union(r)))
	}

	/// Topmost node under `p`, if any.
	pub fn node_at(&self, p: Position) -> Option<&str> {
		self.rects.iter().find(|(_, r)| r.contains(p)).map(|(id, _)| id.as_str())
	}

	fn translate(&mut self, ids: &[String], dx: f64, dy: f64) {
		for id in ids {
			if let Some(r) = self.rects.get_mut(id) {
				r.x += dx;
				r.y += dy;
			}
		}
	}
}

/// Placement tree for one run: first structural parent wins.
struct Tree<'a> {
	children: HashMap<&'a str, Vec<&'a str>>,
	size: HashMap<&'a str, (f64, f64)>,
}

/// Lay out `nodes` as layered trees hanging off `root`, following only
/// structural edges between the given nodes.
///
/// Rank is structural depth from `root`. Siblings keep edge order and each
/// parent is centred on its children's band. Nodes unreachable from `root`
/// are placed as extra children of the root so they still get a position.
/// Returned rectangles are in run-local coordinates with the root's layer
/// starting at x = 0.
pub fn layered_layout(
	nodes: &[&GraphNode],
	edges: &[&GraphEdge],
	root: &str,
	direction: FlowDirection,
	config: &DiagramConfig,
) -> Layout {
	let size: HashMap<&str, (f64, f64)> = nodes.iter().map(|n| (n.id.as_str(), n.kind.size())).collect();
	if !size.contains_key(root) {
		return Layout::default();
	}

	let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
	let mut has_parent: HashSet<&str> = HashSet::new();
	has_parent.insert(root);
	for edge in edges.iter().filter(|e| e.is_structural()) {
		let (src, tgt) = (edge.source.as_str(), edge.target.as_str());
		if size.contains_key(src) && size.contains_key(tgt) && has_parent.insert(tgt) {
			children.entry(src).or_default().push(tgt);
		}
	}

	// Breadth-first ranks; `seen` also breaks any cycle among the edges.
	let mut rank: HashMap<&str, usize> = HashMap::new();
	let mut order: Vec<&str> = Vec::new();
	let mut queue = VecDeque::from([(root, 0usize)]);
	let mut seen: HashSet<&str> = HashSet::from([root]);
	loop {
		while let Some((id, r)) = queue.pop_front() {
			rank.insert(id, r);
			order.push(id);
			for &child in children.get(id).into_iter().flatten() {
				if seen.insert(child) {
					queue.push_back((child, r + 1));
				}
			}
		}
		let Some(stray) = nodes.iter().map(|n| n.id.as_str()).find(|id| !seen.contains(id)) else {
			break;
		};
		seen.insert(stray);
		children.entry(root).or_default().push(stray);
		queue.push_back((stray, 1));
	}
	// Drop back-edges so the placement tree is acyclic.
	let mut tree_children: HashMap<&str, Vec<&str>> = HashMap::new();
	for &id in &order {
		let kids = children
			.get(id)
			.into_iter()
			.flatten()
			.copied()
			.filter(|c| rank.get(c) == Some(&(rank[id] + 1)))
			.collect();
		tree_children.insert(id, kids);
	}
	let tree = Tree {
		children: tree_children,
		size,
	};

	let mut band: HashMap<&str, f64> = HashMap::new();
	for &id in order.iter().rev() {
		let kids = &tree.children[id];
		let kids_span = kids.iter().map(|c| band[c]).sum::<f64>()
			+ config.node_gap * kids.len().saturating_sub(1) as f64;
		band.insert(id, tree.size[id].1.max(kids_span));
	}

	// Cross-axis centres, top-down through the bands.
	let mut center_y: HashMap<&str, f64> = HashMap::new();
	center_y.insert(root, band[root] / 2.0);
	for &id in &order {
		let kids = &tree.children[id];
		if kids.is_empty() {
			continue;
		}
		let kids_span = kids.iter().map(|c| band[c]).sum::<f64>()
			+ config.node_gap * (kids.len() - 1) as f64;
		let mut cursor = center_y[id] - kids_span / 2.0;
		for &kid in kids {
			center_y.insert(kid, cursor + band[kid] / 2.0);
			cursor += band[kid] + config.node_gap;
		}
	}

	// Main axis: each layer is as wide as its widest card.
	let depth = order.iter().map(|id| rank[id]).max().unwrap_or(0);
	let mut layer_width = vec![0.0f64; depth + 1];
	for &id in &order {
		layer_width[rank[id]] = layer_width[rank[id]].max(tree.size[id].0);
	}
	let mut layer_start = vec![0.0f64; depth + 1];
	for r in 1..=depth {
		layer_start[r] = layer_start[r - 1] + layer_width[r - 1] + config.rank_gap;
	}

	let mut layout = Layout::default();
	for &id in &order {
		let (w, h) = tree.size[id];
		let x = match direction {
			FlowDirection::Rightward => layer_start[rank[id]],
			FlowDirection::Leftward => -layer_start[rank[id]] - w,
		};
		layout.rects.insert(
			id.to_string(),
			Rect {
				x,
				y: center_y[id] - h / 2.0,
				width: w,
				height: h,
			},
		);
	}
	layout
}

/// Lay out the visible graph on both sides of `root`.
///
/// Right-side nodes flow toward +x and left-side nodes toward -x. The root
/// ends up centred on the origin. Afterwards the side whose top edge sits
/// lower is moved up so both sides start on the same line.
pub fn dual_layout(nodes: &[GraphNode], edges: &[GraphEdge], root: &str, config: &DiagramConfig) -> Layout {
	let Some(root_node) = nodes.iter().find(|n| n.id == root) else {
		return Layout::default();
	};
	let (root_w, root_h) = root_node.kind.size();
	let structural: Vec<&GraphEdge> = edges.iter().filter(|e| e.is_structural()).collect();

	let mut merged = Layout::default();
	merged.rects.insert(
		root.to_string(),
		Rect {
			x: -root_w / 2.0,
			y: -root_h / 2.0,
			width: root_w,
			height: root_h,
		},
	);

	let mut tops: Vec<(Vec<String>, f64)> = Vec::new();
	for (side, direction) in [(Side::Left, FlowDirection::Leftward), (Side::Right, FlowDirection::Rightward)] {
		let members: Vec<&GraphNode> = nodes
			.iter()
			.filter(|n| n.id == root || (n.side == side && n.id != root))
			.collect();
		if members.len() <= 1 {
			continue;
		}
		let half = layered_layout(&members, &structural, root, direction, config);
		let Some(local_root) = half.rect(root) else {
			continue;
		};
		let (dx, dy) = (-root_w / 2.0 - local_root.x, -root_h / 2.0 - local_root.y);

		let mut ids = Vec::new();
		let mut top = f64::INFINITY;
		for (id, rect) in half.rects {
			if id == root {
				continue;
			}
			let placed = Rect {
				x: rect.x + dx,
				y: rect.y + dy,
				..rect
			};
			top = top.min(placed.y);
			merged.rects.insert(id.clone(), placed);
			ids.push(id);
		}
		tops.push((ids, top));
	}

	if let [(left_ids, left_top), (right_ids, right_top)] = tops.as_slice() {
		if left_top > right_top {
			merged.translate(left_ids, 0.0, right_top - left_top);
		} else if right_top > left_top {
			merged.translate(right_ids, 0.0, left_top - right_top);
		}
	}

	debug!("layout: {} nodes positioned", merged.rects.len());
	merged
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::super::builder::{ROOT_ID, build_graph};
	use super::super::fixtures::{arb_tree, sample_tree};
	use super::super::types::{NodeFlags, NodeKind};
	use super::super::visibility::{ExpandedGroups, filter_visible};
	use super::*;

	fn n(id: &str, kind: NodeKind, side: Side) -> GraphNode {
		GraphNode {
			id: id.into(),
			kind,
			side,
			label: id.into(),
			sublabel: None,
			flags: NodeFlags::default(),
			owner_refs: vec![],
		}
	}

	fn sample_layout() -> (Vec<GraphNode>, Layout) {
		let config = DiagramConfig::default();
		let mut expanded = ExpandedGroups::default();
		expanded.toggle("trust::asset::shares");
		let graph = build_graph(&sample_tree(), &config);
		let visible = filter_visible(&graph.nodes, &graph.edges, &expanded);
		let layout = dual_layout(&visible.nodes, &visible.edges, ROOT_ID, &config);
		(visible.nodes, layout)
	}

	#[test]
	fn root_is_centred_on_origin() {
		let (_, layout) = sample_layout();
		let c = layout.rect(ROOT_ID).unwrap().center();
		assert!(c.x.abs() < 1e-9 && c.y.abs() < 1e-9);
	}

	#[test]
	fn sides_flow_away_from_root() {
		let (nodes, layout) = sample_layout();
		let root = layout.rect(ROOT_ID).unwrap();
		for node in nodes.iter().filter(|n| n.id != ROOT_ID) {
			let r = layout.rect(&node.id).unwrap();
			match node.side {
				Side::Right => assert!(r.x >= root.x + root.width, "{}", node.id),
				Side::Left => assert!(r.x + r.width <= root.x, "{}", node.id),
				Side::Center => unreachable!(),
			}
		}
	}

	#[test]
	fn every_visible_node_is_positioned() {
		let (nodes, layout) = sample_layout();
		assert_eq!(layout.rects.len(), nodes.len());
	}

	/// First pair of cards that intersect, if any.
	fn overlap(layout: &Layout) -> Option<(Rect, Rect)> {
		let rects: Vec<Rect> = layout.rects.values().copied().collect();
		for (i, a) in rects.iter().enumerate() {
			for b in rects.iter().skip(i + 1) {
				let x_overlap = a.x < b.x + b.width && b.x < a.x + a.width;
				let y_overlap = a.y < b.y + b.height && b.y < a.y + a.height;
				if x_overlap && y_overlap {
					return Some((*a, *b));
				}
			}
		}
		None
	}

	#[test]
	fn cards_do_not_overlap() {
		let (_, layout) = sample_layout();
		assert_eq!(overlap(&layout), None);
	}

	#[test]
	fn layers_are_flush_toward_root() {
		let config = DiagramConfig::default();
		let nodes = vec![
			n("root", NodeKind::Root, Side::Center),
			n("s", NodeKind::Structure, Side::Right),
			n("a", NodeKind::Asset, Side::Right),
			n("g", NodeKind::GoalsGroup, Side::Left),
			n("f", NodeKind::FamilyGroup, Side::Left),
		];
		let edges = vec![
			GraphEdge::structural("root", "s"),
			GraphEdge::structural("root", "a"),
			GraphEdge::structural("root", "g"),
			GraphEdge::structural("root", "f"),
		];
		let layout = dual_layout(&nodes, &edges, "root", &config);
		let (s, a) = (layout.rect("s").unwrap(), layout.rect("a").unwrap());
		assert_eq!(s.x, a.x);
		assert_eq!(s.x, 110.0 + config.rank_gap);
		let (g, f) = (layout.rect("g").unwrap(), layout.rect("f").unwrap());
		assert_eq!(g.x + g.width, f.x + f.width);
		assert_eq!(g.x + g.width, -110.0 - config.rank_gap);
	}

	#[test]
	fn children_sit_one_layer_further_out() {
		let (_, layout) = sample_layout();
		let person = layout.rect("p-ann").unwrap();
		let trust = layout.rect("trust").unwrap();
		assert!(trust.x > person.x + person.width);
		let family = layout.rect("group:family").unwrap();
		let ben = layout.rect("fam-ben").unwrap();
		assert!(ben.x + ben.width < family.x);
	}

	#[test]
	fn both_sides_share_a_top_edge() {
		let (nodes, layout) = sample_layout();
		let top = |side: Side| {
			nodes
				.iter()
				.filter(|n| n.side == side)
				.map(|n| layout.rect(&n.id).unwrap().y)
				.fold(f64::INFINITY, f64::min)
		};
		assert!((top(Side::Left) - top(Side::Right)).abs() < 1e-9);
	}

	#[test]
	fn empty_side_is_skipped() {
		let config = DiagramConfig::default();
		let nodes = vec![n("root", NodeKind::Root, Side::Center), n("p", NodeKind::Person, Side::Right)];
		let edges = vec![GraphEdge::structural("root", "p")];
		let layout = dual_layout(&nodes, &edges, "root", &config);
		assert_eq!(layout.rects.len(), 2);
		let p = layout.rect("p").unwrap();
		assert_eq!(p.center().y, 0.0);
	}

	#[test]
	fn root_alone_and_orphans_still_get_positions() {
		let config = DiagramConfig::default();
		let lone = dual_layout(&[n("root", NodeKind::Root, Side::Center)], &[], "root", &config);
		assert_eq!(lone.rects.len(), 1);

		let nodes = vec![n("root", NodeKind::Root, Side::Center), n("stray", NodeKind::Goal, Side::Left)];
		let layout = dual_layout(&nodes, &[], "root", &config);
		assert!(layout.rect("stray").is_some());
	}

	#[test]
	fn non_structural_edges_do_not_shape_the_tree() {
		let config = DiagramConfig::default();
		let nodes = vec![
			n("root", NodeKind::Root, Side::Center),
			n("a", NodeKind::Person, Side::Right),
			n("b", NodeKind::Person, Side::Right),
		];
		let tree = vec![GraphEdge::structural("root", "a"), GraphEdge::structural("root", "b")];
		let mut with_links = tree.clone();
		with_links.push(GraphEdge::user_link("a", "b"));
		with_links.push(GraphEdge::cross_link("a", "b"));
		assert_eq!(
			dual_layout(&nodes, &tree, "root", &config),
			dual_layout(&nodes, &with_links, "root", &config)
		);
	}

	#[test]
	fn bounds_cover_all_rects() {
		let (_, layout) = sample_layout();
		let bounds = layout.bounds().unwrap();
		for r in layout.rects.values() {
			assert!(r.x >= bounds.x && r.x + r.width <= bounds.x + bounds.width + 1e-9);
		}
		assert!(Layout::default().bounds().is_none());
	}

	proptest! {
		#[test]
		fn layout_is_deterministic(tree in arb_tree()) {
			let config = DiagramConfig::default();
			let run = || {
				let graph = build_graph(&tree, &config);
				let visible = filter_visible(&graph.nodes, &graph.edges, &ExpandedGroups::default());
				dual_layout(&visible.nodes, &visible.edges, ROOT_ID, &config)
			};
			prop_assert_eq!(run(), run());
		}

		#[test]
		fn cards_never_overlap(tree in arb_tree(), open in prop::collection::vec(any::<bool>(), 16)) {
			let config = DiagramConfig::default();
			let graph = build_graph(&tree, &config);
			let mut expanded = ExpandedGroups::default();
			let groups = graph.nodes.iter().filter(|n| n.kind == NodeKind::CategoryGroup);
			for (group, _) in groups.zip(&open).filter(|(_, open)| **open) {
				expanded.toggle(&group.id);
			}
			let visible = filter_visible(&graph.nodes, &graph.edges, &expanded);
			let layout = dual_layout(&visible.nodes, &visible.edges, ROOT_ID, &config);
			prop_assert_eq!(layout.rects.len(), visible.nodes.len());
			prop_assert_eq!(overlap(&layout), None);
		}
	}
}
