use serde::{Deserialize, Serialize};

/// One tag per concept the diagram can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
	Root,
	Person,
	Structure,
	Asset,
	Liability,
	/// Synthetic cluster of same-category leaves under one owner.
	CategoryGroup,
	EstateGroup,
	EstateItem,
	FamilyGroup,
	FamilyMember,
	Grandchild,
	GoalsGroup,
	Goal,
	RelationshipsGroup,
	Relationship,
}

impl NodeKind {
	/// Rendered (width, height) of a card of this kind.
	pub fn size(self) -> (f64, f64) {
		match self {
			Self::Root => (220.0, 80.0),
			Self::Person => (200.0, 64.0),
			Self::Structure => (240.0, 72.0),
			Self::CategoryGroup => (190.0, 52.0),
			Self::EstateGroup | Self::FamilyGroup | Self::GoalsGroup | Self::RelationshipsGroup => {
				(200.0, 56.0)
			}
			Self::FamilyMember => (180.0, 56.0),
			Self::Asset
			| Self::Liability
			| Self::EstateItem
			| Self::Grandchild
			| Self::Goal
			| Self::Relationship => (170.0, 52.0),
		}
	}

	pub fn is_group_header(self) -> bool {
		matches!(
			self,
			Self::EstateGroup | Self::FamilyGroup | Self::GoalsGroup | Self::RelationshipsGroup
		)
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Root => "Client",
			Self::Person => "Person",
			Self::Structure => "Structure",
			Self::Asset => "Asset",
			Self::Liability => "Liability",
			Self::CategoryGroup => "Category",
			Self::EstateGroup => "Estate planning",
			Self::EstateItem => "Estate document",
			Self::FamilyGroup => "Family",
			Self::FamilyMember => "Family member",
			Self::Grandchild => "Grandchild",
			Self::GoalsGroup => "Goals",
			Self::Goal => "Goal",
			Self::RelationshipsGroup => "Relationships",
			Self::Relationship => "Adviser",
		}
	}
}

/// Which half of the diagram a node is laid out in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
	Left,
	Right,
	Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
	pub has_issue: bool,
	pub is_joint: bool,
	/// Only meaningful on category groups; stamped by the visibility filter.
	pub is_expanded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	pub id: String,
	pub kind: NodeKind,
	pub side: Side,
	pub label: String,
	pub sublabel: Option<String>,
	pub flags: NodeFlags,
	/// Weak references to owning entities, never used for traversal.
	pub owner_refs: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeClass {
	/// Domain parent/child. The only class layout and branch walks follow.
	Structural,
	/// Drawn by the user; survives rebuilds through the link store.
	UserLink,
	/// Joint-ownership fan-out to additional owners.
	CrossLink,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
	pub id: String,
	pub source: String,
	pub target: String,
	pub class: EdgeClass,
}

impl GraphEdge {
	pub fn structural(parent: &str, child: &str) -> Self {
		Self {
			id: format!("s:{parent}->{child}"),
			source: parent.to_string(),
			target: child.to_string(),
			class: EdgeClass::Structural,
		}
	}

	pub fn cross_link(owner: &str, item: &str) -> Self {
		Self {
			id: format!("x:{owner}->{item}"),
			source: owner.to_string(),
			target: item.to_string(),
			class: EdgeClass::CrossLink,
		}
	}

	pub fn user_link(source: &str, target: &str) -> Self {
		Self {
			id: format!("u:{source}->{target}"),
			source: source.to_string(),
			target: target.to_string(),
			class: EdgeClass::UserLink,
		}
	}

	pub fn is_structural(&self) -> bool {
		self.class == EdgeClass::Structural
	}

	/// True when this edge joins `a` and `b` in either direction.
	pub fn connects(&self, a: &str, b: &str) -> bool {
		(self.source == a && self.target == b) || (self.source == b && self.target == a)
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// A point in graph space. For nodes this is the card's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

impl Position {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn center(&self) -> Position {
		Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}

	pub fn contains(&self, p: Position) -> bool {
		p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
	}

	/// Smallest rectangle covering both.
	pub fn union(&self, other: &Rect) -> Rect {
		let (x0, y0) = (self.x.min(other.x), self.y.min(other.y));
		let x1 = (self.x + self.width).max(other.x + other.width);
		let y1 = (self.y + self.height).max(other.y + other.height);
		Rect {
			x: x0,
			y: y0,
			width: x1 - x0,
			height: y1 - y0,
		}
	}
}

/// Presentation tuning. None of these values are load-bearing for the
/// diagram's invariants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
	/// Minimum gap between neighbouring cards in one layer.
	pub node_gap: f64,
	/// Gap between consecutive layers.
	pub rank_gap: f64,
	/// Owners with more same-category leaves than this get a category group.
	pub category_threshold: usize,
	/// Opacity of non-active nodes under a committed highlight or branch.
	pub dim_committed: f64,
	/// Opacity of non-active nodes while previewing a hover.
	pub dim_preview: f64,
	pub min_zoom: f64,
	pub max_zoom: f64,
}

impl Default for DiagramConfig {
	fn default() -> Self {
		Self {
			node_gap: 24.0,
			rank_gap: 80.0,
			category_threshold: 3,
			dim_committed: 0.2,
			dim_preview: 0.5,
			min_zoom: 0.1,
			max_zoom: 4.0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn structures_are_wider_than_leaves() {
		assert!(NodeKind::Structure.size().0 > NodeKind::Asset.size().0);
	}

	#[test]
	fn connects_ignores_direction() {
		let edge = GraphEdge::user_link("a", "b");
		assert!(edge.connects("b", "a"));
		assert!(!edge.connects("a", "c"));
		assert_eq!(edge.id, "u:a->b");
	}

	#[test]
	fn config_fills_missing_fields_from_defaults() {
		let config: DiagramConfig = serde_json::from_str(r#"{ "node_gap": 10.0 }"#).unwrap();
		assert_eq!(config.node_gap, 10.0);
		assert_eq!(config.category_threshold, 3);
	}

	#[test]
	fn union_covers_both_rects() {
		let a = Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
		let b = Rect { x: -5.0, y: 5.0, width: 10.0, height: 20.0 };
		assert_eq!(a.union(&b), Rect { x: -5.0, y: 0.0, width: 15.0, height: 25.0 });
	}
}
