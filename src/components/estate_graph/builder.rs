//! Domain tree to typed graph.
//!
//! Emits one root, one node per domain entity and exactly one structural
//! edge from each non-root node to its logical parent. The result is
//! rebuilt from scratch on every call and depends on nothing but the tree
//! and the config.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, warn};

use super::domain::{Asset, DomainTree, FamilyMember, Liability};
use super::types::{DiagramConfig, GraphEdge, GraphNode, NodeFlags, NodeKind, Side};

pub const ROOT_ID: &str = "root";
pub const ESTATE_GROUP_ID: &str = "group:estate";
pub const FAMILY_GROUP_ID: &str = "group:family";
pub const GOALS_GROUP_ID: &str = "group:goals";
pub const RELATIONSHIPS_GROUP_ID: &str = "group:relationships";

/// A referential-integrity problem found in the input. The offending
/// reference is dropped and the build carries on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityIssue {
	#[error("entity `{0}` has an empty id and was dropped")]
	EmptyId(String),
	#[error("duplicate id `{0}`; later occurrence dropped")]
	DuplicateId(String),
	#[error("`{entity}` references unknown owner `{owner}`")]
	DanglingOwner { entity: String, owner: String },
	#[error("`{entity}` references unknown person `{person}`")]
	DanglingPerson { entity: String, person: String },
}

/// Output of one build cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuiltGraph {
	pub nodes: Vec<GraphNode>,
	/// Structural and cross-link edges. User links are merged in later.
	pub edges: Vec<GraphEdge>,
	pub issues: Vec<IntegrityIssue>,
}

impl BuiltGraph {
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}
}

/// Build the diagram graph for `tree`. Never fails: an empty tree yields the
/// root alone and broken references are dropped with a warning.
pub fn build_graph(tree: &DomainTree, config: &DiagramConfig) -> BuiltGraph {
	let mut b = Builder::new(config, tree);
	let client = if tree.client_name.is_empty() {
		"Client".to_string()
	} else {
		tree.client_name.clone()
	};
	b.nodes.push(node(ROOT_ID, NodeKind::Root, Side::Center, client, None));

	b.people(tree);
	b.structures(tree);
	b.personal_items(tree);
	b.attach_pending();
	b.estate(tree);
	b.family(tree);
	b.goals(tree);
	b.relationships(tree);

	for issue in &b.issues {
		warn!("graph build: {issue}");
	}
	debug!(
		"graph build: {} nodes, {} edges, {} issues",
		b.nodes.len(),
		b.edges.len(),
		b.issues.len()
	);
	BuiltGraph {
		nodes: b.nodes,
		edges: b.edges,
		issues: b.issues,
	}
}

/// An asset or liability waiting to be attached under its owner.
struct Leaf {
	id: String,
	kind: NodeKind,
	category_key: &'static str,
	category_label: &'static str,
	label: String,
	sublabel: Option<String>,
	has_issue: bool,
	owners: Vec<String>,
}

struct Builder<'a> {
	config: &'a DiagramConfig,
	nodes: Vec<GraphNode>,
	edges: Vec<GraphEdge>,
	issues: Vec<IntegrityIssue>,
	claimed: HashSet<String>,
	person_ids: HashSet<&'a str>,
	structure_ids: HashSet<&'a str>,
	/// Leaves per owner, gathered from structures and personal holdings so
	/// grouping sees every leaf an owner has.
	pending: IndexMap<String, Vec<Leaf>>,
}

impl<'a> Builder<'a> {
	fn new(config: &'a DiagramConfig, tree: &'a DomainTree) -> Self {
		let claimed: HashSet<String> = [ROOT_ID, ESTATE_GROUP_ID, FAMILY_GROUP_ID, GOALS_GROUP_ID, RELATIONSHIPS_GROUP_ID]
			.into_iter()
			.map(str::to_string)
			.collect();
		// Owners resolve only to people and structures that will actually be
		// emitted, so precompute the same first-wins claim order.
		let mut person_ids = HashSet::new();
		for p in &tree.people {
			if !p.id.is_empty() && !claimed.contains(&p.id) {
				person_ids.insert(p.id.as_str());
			}
		}
		let mut structure_ids = HashSet::new();
		for s in &tree.structures {
			if !s.id.is_empty() && !claimed.contains(&s.id) && !person_ids.contains(s.id.as_str()) {
				structure_ids.insert(s.id.as_str());
			}
		}
		Self {
			config,
			nodes: Vec::new(),
			edges: Vec::new(),
			issues: Vec::new(),
			claimed,
			person_ids,
			structure_ids,
			pending: IndexMap::new(),
		}
	}

	/// Reserve `id` for a new node; records an issue when it cannot be used.
	fn claim(&mut self, id: &str, name: &str) -> bool {
		if id.is_empty() {
			self.issues.push(IntegrityIssue::EmptyId(name.to_string()));
			return false;
		}
		if !self.claimed.insert(id.to_string()) {
			self.issues.push(IntegrityIssue::DuplicateId(id.to_string()));
			return false;
		}
		true
	}

	fn attach(&mut self, parent: &str, node: GraphNode) {
		self.edges.push(GraphEdge::structural(parent, &node.id));
		self.nodes.push(node);
	}

	/// Keep the owner references that resolve, in order and deduplicated.
	fn valid_owners(&mut self, entity: &str, owner_ids: &[String], people_only: bool) -> Vec<String> {
		let mut owners: Vec<String> = Vec::new();
		for owner in owner_ids {
			let known = self.person_ids.contains(owner.as_str())
				|| (!people_only && self.structure_ids.contains(owner.as_str()));
			if !known || owner == entity {
				self.issues.push(IntegrityIssue::DanglingOwner {
					entity: entity.to_string(),
					owner: owner.clone(),
				});
			} else if !owners.contains(owner) {
				owners.push(owner.clone());
			}
		}
		owners
	}

	fn people(&mut self, tree: &DomainTree) {
		for person in &tree.people {
			if !self.claim(&person.id, &person.name) {
				continue;
			}
			let mut n = node(&person.id, NodeKind::Person, Side::Right, person.name.clone(), person.role.clone());
			n.flags.has_issue = person.has_issue;
			self.attach(ROOT_ID, n);
		}
	}

	fn structures(&mut self, tree: &DomainTree) {
		for structure in &tree.structures {
			if !self.claim(&structure.id, &structure.name) {
				continue;
			}
			let owners = self.valid_owners(&structure.id, &structure.owner_ids, true);
			let parent = owners.first().cloned().unwrap_or_else(|| ROOT_ID.to_string());
			let mut n = node(
				&structure.id,
				NodeKind::Structure,
				Side::Right,
				structure.name.clone(),
				Some(structure.structure_type.label().to_string()),
			);
			n.flags.has_issue = structure.has_issue;
			n.flags.is_joint = owners.len() > 1;
			n.owner_refs = owners.clone();
			self.attach(&parent, n);
			for extra in owners.iter().skip(1) {
				self.edges.push(GraphEdge::cross_link(extra, &structure.id));
			}

			for asset in &structure.assets {
				if let Some(leaf) = self.asset_leaf(asset, Some(&structure.id)) {
					self.defer(leaf);
				}
			}
			for liability in &structure.liabilities {
				if let Some(leaf) = self.liability_leaf(liability, Some(&structure.id)) {
					self.defer(leaf);
				}
			}
		}
	}

	/// Personally held items, bucketed under their first owner.
	fn personal_items(&mut self, tree: &DomainTree) {
		for asset in &tree.assets {
			if let Some(leaf) = self.asset_leaf(asset, None) {
				self.defer(leaf);
			}
		}
		for liability in &tree.liabilities {
			if let Some(leaf) = self.liability_leaf(liability, None) {
				self.defer(leaf);
			}
		}
	}

	fn defer(&mut self, leaf: Leaf) {
		let owner = leaf.owners.first().cloned().unwrap_or_else(|| ROOT_ID.to_string());
		self.pending.entry(owner).or_default().push(leaf);
	}

	/// Attach every deferred leaf, one grouping pass per owner.
	fn attach_pending(&mut self) {
		for (owner, leaves) in std::mem::take(&mut self.pending) {
			self.attach_leaves(&owner, leaves);
		}
	}

	fn asset_leaf(&mut self, asset: &Asset, held_by: Option<&str>) -> Option<Leaf> {
		if !self.claim(&asset.id, &asset.name) {
			return None;
		}
		let owners = self.leaf_owners(&asset.id, &asset.owner_ids, held_by);
		Some(Leaf {
			id: asset.id.clone(),
			kind: NodeKind::Asset,
			category_key: asset.category.key(),
			category_label: asset.category.label(),
			label: asset.name.clone(),
			sublabel: asset.value.map(format_amount),
			has_issue: asset.has_issue,
			owners,
		})
	}

	fn liability_leaf(&mut self, liability: &Liability, held_by: Option<&str>) -> Option<Leaf> {
		if !self.claim(&liability.id, &liability.name) {
			return None;
		}
		let owners = self.leaf_owners(&liability.id, &liability.owner_ids, held_by);
		Some(Leaf {
			id: liability.id.clone(),
			kind: NodeKind::Liability,
			category_key: liability.category.key(),
			category_label: liability.category.label(),
			label: liability.name.clone(),
			sublabel: liability.amount.map(format_amount),
			has_issue: liability.has_issue,
			owners,
		})
	}

	/// Structure-held items always list the structure first.
	fn leaf_owners(&mut self, id: &str, owner_ids: &[String], held_by: Option<&str>) -> Vec<String> {
		let mut owners = self.valid_owners(id, owner_ids, false);
		if let Some(structure) = held_by {
			owners.retain(|o| o != structure);
			owners.insert(0, structure.to_string());
		}
		owners
	}

	/// Attach leaves under `owner`, interposing a category group for any
	/// category with more than `category_threshold` members.
	fn attach_leaves(&mut self, owner: &str, leaves: Vec<Leaf>) {
		let mut groups: IndexMap<(NodeKind, &'static str), Vec<Leaf>> = IndexMap::new();
		for leaf in leaves {
			groups.entry((leaf.kind, leaf.category_key)).or_default().push(leaf);
		}
		for ((kind, key), members) in groups {
			let mut parent = owner.to_string();
			if members.len() > self.config.category_threshold {
				let family = if kind == NodeKind::Liability { "liability" } else { "asset" };
				let group_id = format!("{owner}::{family}::{key}");
				let label = members[0].category_label.to_string();
				if self.claim(&group_id, &label) {
					let mut group = node(
						&group_id,
						NodeKind::CategoryGroup,
						Side::Right,
						label,
						Some(format!("{} items", members.len())),
					);
					group.flags.has_issue = members.iter().any(|m| m.has_issue);
					group.owner_refs = vec![owner.to_string()];
					self.attach(owner, group);
					parent = group_id;
				}
			}
			for leaf in members {
				self.attach_leaf(&parent, leaf);
			}
		}
	}

	fn attach_leaf(&mut self, parent: &str, leaf: Leaf) {
		let mut n = node(&leaf.id, leaf.kind, Side::Right, leaf.label, leaf.sublabel);
		n.flags.has_issue = leaf.has_issue;
		n.flags.is_joint = leaf.owners.len() > 1;
		self.attach(parent, n);
		for extra in leaf.owners.iter().skip(1) {
			self.edges.push(GraphEdge::cross_link(extra, &leaf.id));
		}
		if let Some(n) = self.nodes.last_mut() {
			n.owner_refs = leaf.owners;
		}
	}

	fn header(&mut self, id: &str, kind: NodeKind, count: usize) {
		let n = node(id, kind, Side::Left, kind.label().to_string(), Some(format!("{count}")));
		self.attach(ROOT_ID, n);
	}

	fn estate(&mut self, tree: &DomainTree) {
		if tree.estate_planning.is_empty() {
			return;
		}
		self.header(ESTATE_GROUP_ID, NodeKind::EstateGroup, tree.estate_planning.len());
		for item in &tree.estate_planning {
			if !self.claim(&item.id, &item.name) {
				continue;
			}
			let mut n = node(&item.id, NodeKind::EstateItem, Side::Left, item.name.clone(), None);
			if let Some(person) = &item.person_id {
				if self.person_ids.contains(person.as_str()) {
					n.owner_refs = vec![person.clone()];
				} else {
					self.issues.push(IntegrityIssue::DanglingPerson {
						entity: item.id.clone(),
						person: person.clone(),
					});
				}
			}
			self.attach(ESTATE_GROUP_ID, n);
		}
	}

	fn family(&mut self, tree: &DomainTree) {
		if tree.family.is_empty() {
			return;
		}
		self.header(FAMILY_GROUP_ID, NodeKind::FamilyGroup, tree.family.len());
		for member in &tree.family {
			if !self.family_member(FAMILY_GROUP_ID, member, NodeKind::FamilyMember) {
				continue;
			}
			for grandchild in &member.children {
				self.family_member(&member.id, grandchild, NodeKind::Grandchild);
			}
		}
	}

	fn family_member(&mut self, parent: &str, member: &FamilyMember, kind: NodeKind) -> bool {
		if !self.claim(&member.id, &member.name) {
			return false;
		}
		let n = node(&member.id, kind, Side::Left, member.name.clone(), member.relation.clone());
		self.attach(parent, n);
		true
	}

	fn goals(&mut self, tree: &DomainTree) {
		if tree.goals.is_empty() {
			return;
		}
		self.header(GOALS_GROUP_ID, NodeKind::GoalsGroup, tree.goals.len());
		for goal in &tree.goals {
			if self.claim(&goal.id, &goal.name) {
				let n = node(&goal.id, NodeKind::Goal, Side::Left, goal.name.clone(), None);
				self.attach(GOALS_GROUP_ID, n);
			}
		}
	}

	fn relationships(&mut self, tree: &DomainTree) {
		if tree.relationships.is_empty() {
			return;
		}
		self.header(RELATIONSHIPS_GROUP_ID, NodeKind::RelationshipsGroup, tree.relationships.len());
		for rel in &tree.relationships {
			if self.claim(&rel.id, &rel.name) {
				let n = node(&rel.id, NodeKind::Relationship, Side::Left, rel.name.clone(), rel.firm.clone());
				self.attach(RELATIONSHIPS_GROUP_ID, n);
			}
		}
	}
}

fn node(id: &str, kind: NodeKind, side: Side, label: String, sublabel: Option<String>) -> GraphNode {
	GraphNode {
		id: id.to_string(),
		kind,
		side,
		label,
		sublabel,
		flags: NodeFlags::default(),
		owner_refs: Vec::new(),
	}
}

/// Whole-dollar amount with thousands separators, e.g. `$1,250,000`.
pub fn format_amount(value: f64) -> String {
	let rounded = value.abs().round() as u64;
	let digits = rounded.to_string();
	let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
	for (i, ch) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			out.push(',');
		}
		out.push(ch);
	}
	if value < 0.0 && rounded > 0 {
		format!("-${out}")
	} else {
		format!("${out}")
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use proptest::prelude::*;

	use super::super::domain::{AssetCategory, Goal, Person, Structure};
	use super::super::fixtures::{arb_tree, asset, person, sample_tree};
	use super::super::types::EdgeClass;
	use super::*;

	fn parent_map(graph: &BuiltGraph) -> HashMap<&str, &str> {
		graph
			.edges
			.iter()
			.filter(|e| e.is_structural())
			.map(|e| (e.target.as_str(), e.source.as_str()))
			.collect()
	}

	#[test]
	fn empty_tree_yields_root_alone() {
		let graph = build_graph(&DomainTree::default(), &DiagramConfig::default());
		assert_eq!(graph.nodes.len(), 1);
		assert_eq!(graph.nodes[0].id, ROOT_ID);
		assert_eq!(graph.nodes[0].side, Side::Center);
		assert!(graph.edges.is_empty());
	}

	#[test]
	fn sides_follow_entity_class() {
		let graph = build_graph(&sample_tree(), &DiagramConfig::default());
		for n in &graph.nodes {
			let expected = match n.kind {
				NodeKind::Root => Side::Center,
				NodeKind::Person
				| NodeKind::Structure
				| NodeKind::Asset
				| NodeKind::Liability
				| NodeKind::CategoryGroup => Side::Right,
				_ => Side::Left,
			};
			assert_eq!(n.side, expected, "{}", n.id);
		}
	}

	#[test]
	fn every_entity_gets_one_structural_parent() {
		let graph = build_graph(&sample_tree(), &DiagramConfig::default());
		for n in graph.nodes.iter().filter(|n| n.id != ROOT_ID) {
			let parents = graph
				.edges
				.iter()
				.filter(|e| e.is_structural() && e.target == n.id)
				.count();
			assert_eq!(parents, 1, "{}", n.id);
		}
	}

	#[test]
	fn groups_same_category_leaves_over_threshold() {
		let mut tree = DomainTree::default();
		tree.people.push(person("p1", "Ann"));
		for i in 0..4 {
			tree.assets.push(asset(&format!("a{i}"), AssetCategory::Cash, &["p1"]));
		}
		tree.assets.push(asset("house", AssetCategory::Property, &["p1"]));
		let graph = build_graph(&tree, &DiagramConfig::default());

		let group = graph.node("p1::asset::cash").expect("cash group");
		assert_eq!(group.kind, NodeKind::CategoryGroup);
		let parents = parent_map(&graph);
		assert_eq!(parents["p1::asset::cash"], "p1");
		for i in 0..4 {
			assert_eq!(parents[format!("a{i}").as_str()], "p1::asset::cash");
		}
		assert_eq!(parents["house"], "p1");
	}

	#[test]
	fn at_threshold_leaves_attach_directly() {
		let mut tree = DomainTree::default();
		tree.people.push(person("p1", "Ann"));
		for i in 0..3 {
			tree.assets.push(asset(&format!("a{i}"), AssetCategory::Cash, &["p1"]));
		}
		let graph = build_graph(&tree, &DiagramConfig::default());
		assert!(graph.nodes.iter().all(|n| n.kind != NodeKind::CategoryGroup));
	}

	#[test]
	fn joint_ownership_fans_out_cross_links() {
		let mut tree = DomainTree::default();
		tree.people.push(person("p1", "Ann"));
		tree.people.push(person("p2", "Bob"));
		tree.assets.push(asset("home", AssetCategory::Property, &["p1", "p2"]));
		let graph = build_graph(&tree, &DiagramConfig::default());

		assert_eq!(parent_map(&graph)["home"], "p1");
		let cross: Vec<_> = graph.edges.iter().filter(|e| e.class == EdgeClass::CrossLink).collect();
		assert_eq!(cross.len(), 1);
		assert!(cross[0].connects("p2", "home"));
		let home = graph.node("home").unwrap();
		assert!(home.flags.is_joint);
		assert_eq!(home.owner_refs, vec!["p1".to_string(), "p2".to_string()]);
	}

	#[test]
	fn dangling_owner_is_dropped_and_reported() {
		let mut tree = DomainTree::default();
		tree.assets.push(asset("car", AssetCategory::Vehicle, &["ghost"]));
		let graph = build_graph(&tree, &DiagramConfig::default());
		assert_eq!(parent_map(&graph)["car"], ROOT_ID);
		assert_eq!(
			graph.issues,
			vec![IntegrityIssue::DanglingOwner {
				entity: "car".into(),
				owner: "ghost".into()
			}]
		);
	}

	#[test]
	fn duplicate_ids_keep_first_occurrence() {
		let mut tree = DomainTree::default();
		tree.people.push(person("p1", "Ann"));
		tree.goals.push(Goal { id: "p1".into(), name: "Retire".into() });
		let graph = build_graph(&tree, &DiagramConfig::default());
		assert_eq!(graph.node("p1").unwrap().kind, NodeKind::Person);
		assert!(graph.issues.contains(&IntegrityIssue::DuplicateId("p1".into())));
	}

	#[test]
	fn structure_hangs_off_first_owner() {
		let mut tree = DomainTree::default();
		tree.people.push(person("p1", "Ann"));
		tree.people.push(Person { id: "p2".into(), name: "Bob".into(), ..Default::default() });
		tree.structures.push(Structure {
			id: "s1".into(),
			name: "Trust".into(),
			owner_ids: vec!["p2".into(), "p1".into()],
			assets: vec![asset("units", AssetCategory::Shares, &[])],
			..Default::default()
		});
		let graph = build_graph(&tree, &DiagramConfig::default());
		let parents = parent_map(&graph);
		assert_eq!(parents["s1"], "p2");
		assert_eq!(parents["units"], "s1");
		assert_eq!(graph.node("units").unwrap().owner_refs, vec!["s1".to_string()]);
	}

	fn cash_structure(own: usize, personal: usize) -> DomainTree {
		let mut tree = DomainTree::default();
		tree.structures.push(Structure {
			id: "s".into(),
			name: "Trust".into(),
			assets: (0..own).map(|i| asset(&format!("a{i}"), AssetCategory::Cash, &[])).collect(),
			..Default::default()
		});
		for i in 0..personal {
			tree.assets.push(asset(&format!("b{i}"), AssetCategory::Cash, &["s"]));
		}
		tree
	}

	#[test]
	fn structure_leaves_from_both_sources_group_together() {
		let graph = build_graph(&cash_structure(2, 2), &DiagramConfig::default());
		let parents = parent_map(&graph);
		assert_eq!(parents["s::asset::cash"], "s");
		for id in ["a0", "a1", "b0", "b1"] {
			assert_eq!(parents[id], "s::asset::cash", "{id}");
		}
		assert!(graph.issues.is_empty());
	}

	#[test]
	fn structure_with_large_holdings_on_both_sides_has_one_group() {
		let graph = build_graph(&cash_structure(4, 4), &DiagramConfig::default());
		assert!(graph.issues.is_empty(), "{:?}", graph.issues);
		let groups = graph.nodes.iter().filter(|n| n.kind == NodeKind::CategoryGroup).count();
		assert_eq!(groups, 1);
		assert_eq!(graph.node("s::asset::cash").unwrap().sublabel.as_deref(), Some("8 items"));
		let parents = parent_map(&graph);
		assert_eq!(parents["a3"], "s::asset::cash");
		assert_eq!(parents["b0"], "s::asset::cash");
	}

	#[test]
	fn grandchildren_hang_off_family_members() {
		let graph = build_graph(&sample_tree(), &DiagramConfig::default());
		let parents = parent_map(&graph);
		assert_eq!(parents["fam-ben"], FAMILY_GROUP_ID);
		assert_eq!(parents["fam-cal"], "fam-ben");
		assert_eq!(graph.node("fam-cal").unwrap().kind, NodeKind::Grandchild);
	}

	#[test]
	fn formats_amounts() {
		assert_eq!(format_amount(1_250_000.0), "$1,250,000");
		assert_eq!(format_amount(999.4), "$999");
		assert_eq!(format_amount(-4200.0), "-$4,200");
	}

	proptest! {
		#[test]
		fn build_is_deterministic(tree in arb_tree()) {
			let config = DiagramConfig::default();
			prop_assert_eq!(build_graph(&tree, &config), build_graph(&tree, &config));
		}

		#[test]
		fn structural_edges_form_a_tree_under_root(tree in arb_tree()) {
			let graph = build_graph(&tree, &DiagramConfig::default());
			let parents = parent_map(&graph);
			prop_assert_eq!(parents.len(), graph.nodes.len() - 1);
			for n in &graph.nodes {
				let mut cursor = n.id.as_str();
				let mut steps = 0;
				while cursor != ROOT_ID {
					cursor = parents[cursor];
					steps += 1;
					prop_assert!(steps <= graph.nodes.len());
				}
			}
		}
	}
}
