//! Drag-to-connect and drag-to-create gestures.

use log::debug;

use super::builder::BuiltGraph;
use super::types::{GraphEdge, GraphNode, NodeKind, Position};

/// Child kinds that may be created under a node of `kind`.
pub fn child_kinds(kind: NodeKind) -> &'static [NodeKind] {
	match kind {
		NodeKind::Root => &[
			NodeKind::Person,
			NodeKind::Structure,
			NodeKind::EstateItem,
			NodeKind::FamilyMember,
			NodeKind::Goal,
			NodeKind::Relationship,
		],
		NodeKind::Person => &[NodeKind::Asset, NodeKind::Liability, NodeKind::Structure],
		NodeKind::Structure => &[NodeKind::Asset, NodeKind::Liability],
		NodeKind::EstateGroup => &[NodeKind::EstateItem],
		NodeKind::FamilyGroup => &[NodeKind::FamilyMember],
		NodeKind::FamilyMember => &[NodeKind::Grandchild],
		NodeKind::GoalsGroup => &[NodeKind::Goal],
		NodeKind::RelationshipsGroup => &[NodeKind::Relationship],
		NodeKind::CategoryGroup
		| NodeKind::Asset
		| NodeKind::Liability
		| NodeKind::EstateItem
		| NodeKind::Grandchild
		| NodeKind::Goal
		| NodeKind::Relationship => &[],
	}
}

/// Where a drag was released.
#[derive(Clone, Debug, PartialEq)]
pub enum DropTarget {
	/// Another node's connection handle.
	ConnectionPoint(String),
	/// The body of a node.
	Node(String),
	/// Empty canvas, in graph coordinates.
	Canvas(Position),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
	#[default]
	Idle,
	Dragging {
		source: String,
		pointer: Option<Position>,
	},
}

/// Contextual "create a child here" choice.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildPrompt {
	pub parent_id: String,
	pub options: Vec<NodeKind>,
	pub at: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DragOutcome {
	Link(GraphEdge),
	ChildPrompt(ChildPrompt),
	Cancelled,
}

/// `Idle -> Dragging -> {Link | ChildPrompt | Cancelled}`; every outcome
/// returns the machine to `Idle`.
#[derive(Clone, Debug, Default)]
pub struct DragMachine {
	state: DragState,
}

impl DragMachine {
	pub fn state(&self) -> &DragState {
		&self.state
	}

	pub fn is_dragging(&self) -> bool {
		matches!(self.state, DragState::Dragging { .. })
	}

	pub fn start(&mut self, source: &str) {
		self.state = DragState::Dragging {
			source: source.to_string(),
			pointer: None,
		};
	}

	pub fn move_to(&mut self, p: Position) {
		if let DragState::Dragging { pointer, .. } = &mut self.state {
			*pointer = Some(p);
		}
	}

	pub fn cancel(&mut self) {
		self.state = DragState::Idle;
	}

	/// Resolve the gesture. `edges` is every edge currently drawn, including
	/// user links, and is used to reject duplicates.
	pub fn end(&mut self, target: DropTarget, nodes: &[GraphNode], edges: &[GraphEdge]) -> DragOutcome {
		let DragState::Dragging { source, .. } = std::mem::take(&mut self.state) else {
			return DragOutcome::Cancelled;
		};
		match target {
			DropTarget::ConnectionPoint(target) => {
				if source == target || edges.iter().any(|e| e.connects(&source, &target)) {
					debug!("drag: link {source} -> {target} rejected");
					return DragOutcome::Cancelled;
				}
				if !nodes.iter().any(|n| n.id == target) {
					return DragOutcome::Cancelled;
				}
				DragOutcome::Link(GraphEdge::user_link(&source, &target))
			}
			DropTarget::Node(_) => DragOutcome::Cancelled,
			DropTarget::Canvas(at) => {
				let Some(kind) = nodes.iter().find(|n| n.id == source).map(|n| n.kind) else {
					return DragOutcome::Cancelled;
				};
				let options = child_kinds(kind);
				if options.is_empty() {
					return DragOutcome::Cancelled;
				}
				DragOutcome::ChildPrompt(ChildPrompt {
					parent_id: source,
					options: options.to_vec(),
					at,
				})
			}
		}
	}
}

/// A freshly created node waiting to show up so it can be selected.
#[derive(Clone, Debug, Default)]
pub struct AutoSelect {
	pending: Option<(String, u64)>,
}

impl AutoSelect {
	/// Remember `node_id`, created against document generation `generation`.
	pub fn mark(&mut self, node_id: &str, generation: u64) {
		self.pending = Some((node_id.to_string(), generation));
	}

	pub fn pending(&self) -> Option<&str> {
		self.pending.as_ref().map(|(id, _)| id.as_str())
	}

	/// Called after each build. Yields the id once it is present; discards
	/// the intent if a different document has been loaded since.
	pub fn resolve(&mut self, built: &BuiltGraph, generation: u64) -> Option<String> {
		let (id, marked) = self.pending.as_ref()?;
		if *marked != generation {
			debug!("auto-select: `{id}` dropped, document replaced");
			self.pending = None;
			return None;
		}
		if built.node(id).is_none() {
			return None;
		}
		self.pending.take().map(|(id, _)| id)
	}
}
