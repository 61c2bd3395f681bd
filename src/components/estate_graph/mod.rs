mod builder;
mod component;
mod domain;
mod editor;
#[cfg(test)]
mod fixtures;
mod highlight;
mod interaction;
mod layout;
mod render;
mod state;
mod types;
mod viewport;
mod visibility;

pub use builder::{BuiltGraph, IntegrityIssue, build_graph};
pub use component::EstateGraphCanvas;
pub use domain::{
	Asset, AssetCategory, DomainTree, EstateItem, FamilyMember, Goal, Liability, LiabilityCategory,
	Person, Relationship, Structure, StructureType,
};
pub use editor::{ChildOverrides, DomainEditor, EditError, RecordEditor};
pub use highlight::{HighlightEngine, HighlightMode};
pub use interaction::{ChildPrompt, DragMachine, DropTarget};
pub use layout::{FlowDirection, Layout, dual_layout, layered_layout};
pub use state::{Command, DiagramState, Outcome};
pub use types::{DiagramConfig, EdgeClass, GraphEdge, GraphNode, NodeKind, Position, Rect, Side};
pub use viewport::ViewTransform;
pub use visibility::{ExpandedGroups, VisibleGraph, filter_visible};
