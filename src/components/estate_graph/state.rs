//! The diagram's single owner of state and its command dispatch.
//!
//! Every event from the canvas or the surrounding chrome becomes a
//! [`Command`]. The build, filter and layout stages are memoised so that a
//! command touching only selection never rebuilds or re-lays-out the graph.

use std::rc::Rc;

use log::{debug, info, warn};

use super::builder::{BuiltGraph, ROOT_ID, build_graph};
use super::domain::DomainTree;
use super::editor::{ChildOverrides, DomainEditor, EditError, RecordEditor};
use super::highlight::HighlightEngine;
use super::interaction::{AutoSelect, ChildPrompt, DragMachine, DragOutcome, DropTarget};
use super::layout::{Layout, dual_layout};
use super::types::{DiagramConfig, EdgeClass, GraphEdge, GraphNode, NodeKind, Position, Rect, Side};
use super::viewport::{AnchorStabilizer, ViewTransform};
use super::visibility::{ExpandedGroups, VisibleGraph, filter_visible};

/// Connection handle hit radius, in graph units.
pub const HANDLE_RADIUS: f64 = 7.0;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
	/// A different document was loaded. `links` are its persisted user links.
	ReplaceTree { tree: DomainTree, links: Vec<GraphEdge> },
	/// An edit of the current document.
	UpdateTree(DomainTree),
	SelectNode { id: Option<String>, additive: bool },
	ToggleHighlight(Vec<String>),
	ClearHighlight,
	HoverHighlight(Vec<String>),
	ToggleGroup(String),
	AddLink(GraphEdge),
	RemoveLink(String),
	FocusNode(String),
	FitView { padding: f64 },
	Resize { width: f64, height: f64 },
	DragStart(String),
	DragMove(Position),
	DragEnd(DropTarget),
	/// Abandon the gesture, e.g. when the pointer leaves the canvas.
	DragCancel,
	CreateChild {
		parent_id: String,
		kind: NodeKind,
		overrides: ChildOverrides,
	},
}

/// Results the chrome needs to act on.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
	/// A user link was stored; the caller should persist it.
	LinkAdded(GraphEdge),
	LinkRemoved(String),
	ChildPrompt(ChildPrompt),
	/// A new entity was created and will be selected once visible.
	ChildCreated { id: String, tree: DomainTree },
	EditFailed(EditError),
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Stage run counters, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
	pub builds: u64,
	pub filters: u64,
	pub layouts: u64,
}

pub struct DiagramState {
	config: DiagramConfig,
	tree: Rc<DomainTree>,
	generation: u64,
	links: Vec<GraphEdge>,
	links_generation: u64,
	expanded: ExpandedGroups,
	built_from: Option<Rc<DomainTree>>,
	built: Rc<BuiltGraph>,
	visible_key: Option<(u64, u64, u64)>,
	visible: Rc<VisibleGraph>,
	/// Build count and expanded generation the layout was computed for.
	/// User links are not part of it.
	layout_key: Option<(u64, u64)>,
	layout: Rc<Layout>,
	anchor: AnchorStabilizer,
	highlight: HighlightEngine,
	drag: DragMachine,
	auto_select: AutoSelect,
	editor: Box<dyn RecordEditor>,
	stats: PipelineStats,
	pub transform: ViewTransform,
	pub pan: PanState,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
}

impl DiagramState {
	pub fn new(tree: DomainTree, config: DiagramConfig, width: f64, height: f64) -> Self {
		Self::with_editor(tree, config, width, height, Box::new(DomainEditor::default()))
	}

	pub fn with_editor(
		tree: DomainTree,
		config: DiagramConfig,
		width: f64,
		height: f64,
		editor: Box<dyn RecordEditor>,
	) -> Self {
		let highlight = HighlightEngine::new(ROOT_ID, &config);
		let mut state = Self {
			config,
			tree: Rc::new(tree),
			generation: 0,
			links: Vec::new(),
			links_generation: 0,
			expanded: ExpandedGroups::default(),
			built_from: None,
			built: Rc::default(),
			visible_key: None,
			visible: Rc::default(),
			layout_key: None,
			layout: Rc::default(),
			anchor: AnchorStabilizer::default(),
			highlight,
			drag: DragMachine::default(),
			auto_select: AutoSelect::default(),
			editor,
			stats: PipelineStats::default(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			pan: PanState::default(),
			width,
			height,
			flow_time: 0.0,
		};
		state.run_pipeline();
		state
	}

	pub fn dispatch(&mut self, command: Command) -> Option<Outcome> {
		match command {
			Command::ReplaceTree { tree, links } => {
				self.replace_tree(tree, links);
				None
			}
			Command::UpdateTree(tree) => {
				if tree.document_id != self.tree.document_id {
					self.replace_tree(tree, Vec::new());
				} else {
					self.tree = Rc::new(tree);
					self.run_pipeline();
				}
				None
			}
			Command::SelectNode { id, additive } => {
				self.highlight.select_node(id.as_deref(), additive);
				None
			}
			Command::ToggleHighlight(ids) => {
				self.highlight.toggle_highlight(&ids);
				None
			}
			Command::ClearHighlight => {
				self.highlight.clear_highlight();
				None
			}
			Command::HoverHighlight(ids) => {
				self.highlight.hover_highlight(&ids);
				None
			}
			Command::ToggleGroup(id) => {
				self.toggle_group(&id);
				None
			}
			Command::AddLink(edge) => self.add_link(edge).map(Outcome::LinkAdded),
			Command::RemoveLink(id) => {
				let before = self.links.len();
				self.links.retain(|e| e.id != id);
				if self.links.len() == before {
					return None;
				}
				self.links_generation += 1;
				self.run_pipeline();
				Some(Outcome::LinkRemoved(id))
			}
			Command::FocusNode(id) => {
				if let Some(rect) = self.layout.rect(&id) {
					self.transform.center_on(rect.center(), self.width, self.height);
				}
				None
			}
			Command::FitView { padding } => {
				self.fit_view(padding);
				None
			}
			Command::Resize { width, height } => {
				self.width = width;
				self.height = height;
				None
			}
			Command::DragStart(id) => {
				if self.visible.contains(&id) {
					self.drag.start(&id);
				}
				None
			}
			Command::DragMove(p) => {
				self.drag.move_to(p);
				None
			}
			Command::DragEnd(target) => {
				let known: Vec<GraphEdge> = self.all_edges().cloned().collect();
				match self.drag.end(target, &self.visible.nodes, &known) {
					DragOutcome::Link(edge) => self.add_link(edge).map(Outcome::LinkAdded),
					DragOutcome::ChildPrompt(prompt) => Some(Outcome::ChildPrompt(prompt)),
					DragOutcome::Cancelled => None,
				}
			}
			Command::DragCancel => {
				self.drag.cancel();
				None
			}
			Command::CreateChild {
				parent_id,
				kind,
				overrides,
			} => Some(self.create_child(&parent_id, kind, &overrides)),
		}
	}

	fn replace_tree(&mut self, tree: DomainTree, links: Vec<GraphEdge>) {
		info!("loading document `{}`", tree.document_id);
		self.generation += 1;
		self.tree = Rc::new(tree);
		self.links = links
			.into_iter()
			.map(|e| GraphEdge {
				class: EdgeClass::UserLink,
				..e
			})
			.collect();
		self.links_generation += 1;
		self.expanded.reset();
		self.highlight.reset();
		self.drag.cancel();
		self.run_pipeline();
	}

	fn toggle_group(&mut self, id: &str) {
		let is_group = self
			.visible
			.node(id)
			.is_some_and(|n| n.kind == NodeKind::CategoryGroup);
		if !is_group {
			return;
		}
		self.anchor.capture(id, &self.layout, self.transform);
		self.expanded.toggle(id);
		self.run_pipeline();
	}

	fn add_link(&mut self, edge: GraphEdge) -> Option<GraphEdge> {
		let known = |id: &str| self.built.node(id).is_some();
		if edge.source == edge.target
			|| !known(&edge.source)
			|| !known(&edge.target)
			|| self.all_edges().any(|e| e.connects(&edge.source, &edge.target))
		{
			debug!("link {} -> {} rejected", edge.source, edge.target);
			return None;
		}
		let edge = GraphEdge {
			class: EdgeClass::UserLink,
			..edge
		};
		self.links.push(edge.clone());
		self.links_generation += 1;
		self.run_pipeline();
		Some(edge)
	}

	fn create_child(&mut self, parent_id: &str, kind: NodeKind, overrides: &ChildOverrides) -> Outcome {
		match self.editor.create_child(&self.tree, parent_id, kind, overrides) {
			Ok((tree, id)) => {
				self.auto_select.mark(&id, self.generation);
				self.tree = Rc::new(tree.clone());
				self.run_pipeline();
				Outcome::ChildCreated { id, tree }
			}
			Err(err) => {
				warn!("create child under `{parent_id}`: {err}");
				Outcome::EditFailed(err)
			}
		}
	}

	fn fit_view(&mut self, padding: f64) {
		if let Some(bounds) = self.layout.bounds() {
			self.transform.fit(
				bounds,
				self.width,
				self.height,
				padding,
				self.config.min_zoom,
				self.config.max_zoom,
			);
		}
	}

	/// Structural and cross-link edges of the full build plus user links.
	fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
		self.built.edges.iter().chain(self.links.iter())
	}

	/// build -> filter -> layout -> anchor, each stage skipped when its
	/// inputs are unchanged.
	fn run_pipeline(&mut self) {
		if !self.built_from.as_ref().is_some_and(|t| Rc::ptr_eq(t, &self.tree)) {
			self.built = Rc::new(build_graph(&self.tree, &self.config));
			self.built_from = Some(Rc::clone(&self.tree));
			self.stats.builds += 1;
			debug!("build: {} nodes, {} edges", self.built.nodes.len(), self.built.edges.len());
		}

		let key = (self.stats.builds, self.expanded.generation(), self.links_generation);
		if self.visible_key != Some(key) {
			let edges: Vec<GraphEdge> = self.all_edges().cloned().collect();
			self.visible = Rc::new(filter_visible(&self.built.nodes, &edges, &self.expanded));
			self.visible_key = Some(key);
			self.stats.filters += 1;
			debug!("filter: {} visible", self.visible.nodes.len());
		}

		let structure = (self.stats.builds, self.expanded.generation());
		if self.layout_key != Some(structure) {
			self.layout = Rc::new(dual_layout(&self.visible.nodes, &self.visible.edges, ROOT_ID, &self.config));
			self.layout_key = Some(structure);
			self.stats.layouts += 1;
		}

		self.anchor.apply(&self.layout, &mut self.transform);
		self.highlight.sync_graph(&self.visible);

		if let Some(id) = self.auto_select.resolve(&self.built, self.generation) {
			if !self.visible.contains(&id) && self.reveal(&id) {
				self.run_pipeline();
			}
			self.highlight.select_node(Some(&id), false);
		}
	}

	/// Expand the collapsed category group hiding `id`, if there is one.
	fn reveal(&mut self, id: &str) -> bool {
		let parent = self
			.built
			.edges
			.iter()
			.find(|e| e.is_structural() && e.target == id)
			.map(|e| e.source.clone());
		match parent {
			Some(group)
				if self.built.node(&group).is_some_and(|n| n.kind == NodeKind::CategoryGroup)
					&& !self.expanded.contains(&group) =>
			{
				self.expanded.toggle(&group);
				true
			}
			_ => false,
		}
	}

	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Position {
		self.transform.screen_to_graph(sx, sy)
	}

	/// The node whose card is under the screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<&GraphNode> {
		let p = self.screen_to_graph(sx, sy);
		self.layout.node_at(p).and_then(|id| self.visible.node(id))
	}

	/// The node whose connection handle is under the screen point.
	pub fn handle_at_position(&self, sx: f64, sy: f64) -> Option<&GraphNode> {
		let p = self.screen_to_graph(sx, sy);
		self.visible.nodes.iter().find(|n| {
			self.handle_position(n).is_some_and(|h| {
				let (dx, dy) = (h.x - p.x, h.y - p.y);
				(dx * dx + dy * dy).sqrt() < HANDLE_RADIUS
			})
		})
	}

	/// Connection handle on the card edge facing away from the root.
	pub fn handle_position(&self, node: &GraphNode) -> Option<Position> {
		let rect = self.layout.rect(&node.id)?;
		let x = match node.side {
			Side::Left => rect.x,
			Side::Right | Side::Center => rect.x + rect.width,
		};
		Some(Position::new(x, rect.y + rect.height / 2.0))
	}

	pub fn content_bounds(&self) -> Option<Rect> {
		self.layout.bounds()
	}

	pub fn config(&self) -> &DiagramConfig {
		&self.config
	}

	pub fn tree(&self) -> &DomainTree {
		&self.tree
	}

	pub fn built(&self) -> &BuiltGraph {
		&self.built
	}

	pub fn visible(&self) -> &VisibleGraph {
		&self.visible
	}

	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	pub fn highlight(&self) -> &HighlightEngine {
		&self.highlight
	}

	pub fn drag(&self) -> &DragMachine {
		&self.drag
	}

	pub fn links(&self) -> &[GraphEdge] {
		&self.links
	}

	pub fn is_expanded(&self, id: &str) -> bool {
		self.expanded.contains(id)
	}

	/// Bumped each time a different document is loaded.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn stats(&self) -> PipelineStats {
		self.stats
	}
}
