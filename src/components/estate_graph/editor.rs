//! Child creation, delegated to a record-editing collaborator.
//!
//! The diagram never edits a [`DomainTree`] itself. [`RecordEditor`] is the
//! seam; [`DomainEditor`] is a minimal immutable implementation used by the
//! demo page and the tests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::builder::{ESTATE_GROUP_ID, FAMILY_GROUP_ID, GOALS_GROUP_ID, RELATIONSHIPS_GROUP_ID, ROOT_ID};
use super::domain::{
	Asset, AssetCategory, DomainTree, EstateItem, FamilyMember, Goal, Liability, LiabilityCategory,
	Person, Relationship, Structure,
};
use super::interaction::child_kinds;
use super::types::NodeKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
	#[error("no entity with id `{0}`")]
	UnknownParent(String),
	#[error("a {child:?} cannot be created under a {parent:?}")]
	NotPermitted { parent: NodeKind, child: NodeKind },
}

/// Field values for a new entity; anything unset gets a default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildOverrides {
	pub name: Option<String>,
	pub asset_category: Option<AssetCategory>,
	pub liability_category: Option<LiabilityCategory>,
	pub amount: Option<f64>,
}

pub trait RecordEditor {
	/// Return a copy of `tree` with a new `kind` entity under `parent_id`,
	/// together with the new entity's id.
	fn create_child(
		&mut self,
		tree: &DomainTree,
		parent_id: &str,
		kind: NodeKind,
		overrides: &ChildOverrides,
	) -> Result<(DomainTree, String), EditError>;
}

/// Clone-and-insert editor generating ids of the form `new-{kind}-{n}`.
#[derive(Clone, Debug, Default)]
pub struct DomainEditor {
	counter: u64,
}

impl RecordEditor for DomainEditor {
	fn create_child(
		&mut self,
		tree: &DomainTree,
		parent_id: &str,
		kind: NodeKind,
		overrides: &ChildOverrides,
	) -> Result<(DomainTree, String), EditError> {
		let parent = locate(tree, parent_id).ok_or_else(|| EditError::UnknownParent(parent_id.to_string()))?;
		if !child_kinds(parent).contains(&kind) {
			return Err(EditError::NotPermitted { parent, child: kind });
		}

		let taken = all_ids(tree);
		let id = loop {
			self.counter += 1;
			let candidate = format!("new-{}-{}", kind_key(kind), self.counter);
			if !taken.contains(candidate.as_str()) {
				break candidate;
			}
		};
		let name = overrides
			.name
			.clone()
			.unwrap_or_else(|| format!("New {}", kind.label().to_lowercase()));

		let mut next = tree.clone();
		let owners = if parent == NodeKind::Person {
			vec![parent_id.to_string()]
		} else {
			Vec::new()
		};
		match kind {
			NodeKind::Person => next.people.push(Person {
				id: id.clone(),
				name,
				..Default::default()
			}),
			NodeKind::Structure => next.structures.push(Structure {
				id: id.clone(),
				name,
				owner_ids: owners,
				..Default::default()
			}),
			NodeKind::Asset => {
				let asset = Asset {
					id: id.clone(),
					name,
					category: overrides.asset_category.unwrap_or_default(),
					value: overrides.amount,
					owner_ids: owners,
					has_issue: false,
				};
				match next.structures.iter_mut().find(|s| s.id == parent_id) {
					Some(structure) => structure.assets.push(asset),
					None => next.assets.push(asset),
				}
			}
			NodeKind::Liability => {
				let liability = Liability {
					id: id.clone(),
					name,
					category: overrides.liability_category.unwrap_or_default(),
					amount: overrides.amount,
					owner_ids: owners,
					has_issue: false,
				};
				match next.structures.iter_mut().find(|s| s.id == parent_id) {
					Some(structure) => structure.liabilities.push(liability),
					None => next.liabilities.push(liability),
				}
			}
			NodeKind::EstateItem => next.estate_planning.push(EstateItem {
				id: id.clone(),
				name,
				person_id: None,
			}),
			NodeKind::FamilyMember => next.family.push(FamilyMember {
				id: id.clone(),
				name,
				..Default::default()
			}),
			NodeKind::Grandchild => {
				if let Some(member) = next.family.iter_mut().find(|m| m.id == parent_id) {
					member.children.push(FamilyMember {
						id: id.clone(),
						name,
						..Default::default()
					});
				}
			}
			NodeKind::Goal => next.goals.push(Goal { id: id.clone(), name }),
			NodeKind::Relationship => next.relationships.push(Relationship {
				id: id.clone(),
				name,
				firm: None,
			}),
			_ => return Err(EditError::NotPermitted { parent, child: kind }),
		}
		Ok((next, id))
	}
}

/// Kind of the entity or header `id` refers to in `tree`.
fn locate(tree: &DomainTree, id: &str) -> Option<NodeKind> {
	let header = match id {
		ROOT_ID => Some(NodeKind::Root),
		ESTATE_GROUP_ID => Some(NodeKind::EstateGroup),
		FAMILY_GROUP_ID => Some(NodeKind::FamilyGroup),
		GOALS_GROUP_ID => Some(NodeKind::GoalsGroup),
		RELATIONSHIPS_GROUP_ID => Some(NodeKind::RelationshipsGroup),
		_ => None,
	};
	header
		.or_else(|| tree.people.iter().any(|p| p.id == id).then_some(NodeKind::Person))
		.or_else(|| tree.structures.iter().any(|s| s.id == id).then_some(NodeKind::Structure))
		.or_else(|| tree.family.iter().any(|m| m.id == id).then_some(NodeKind::FamilyMember))
}

fn all_ids(tree: &DomainTree) -> HashSet<&str> {
	let mut ids: HashSet<&str> = HashSet::new();
	ids.extend(tree.people.iter().map(|p| p.id.as_str()));
	for s in &tree.structures {
		ids.insert(&s.id);
		ids.extend(s.assets.iter().map(|a| a.id.as_str()));
		ids.extend(s.liabilities.iter().map(|l| l.id.as_str()));
	}
	ids.extend(tree.assets.iter().map(|a| a.id.as_str()));
	ids.extend(tree.liabilities.iter().map(|l| l.id.as_str()));
	ids.extend(tree.estate_planning.iter().map(|e| e.id.as_str()));
	for m in &tree.family {
		ids.insert(&m.id);
		ids.extend(m.children.iter().map(|c| c.id.as_str()));
	}
	ids.extend(tree.goals.iter().map(|g| g.id.as_str()));
	ids.extend(tree.relationships.iter().map(|r| r.id.as_str()));
	ids
}

fn kind_key(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::Person => "person",
		NodeKind::Structure => "structure",
		NodeKind::Asset => "asset",
		NodeKind::Liability => "liability",
		NodeKind::EstateItem => "estate",
		NodeKind::FamilyMember => "family",
		NodeKind::Grandchild => "grandchild",
		NodeKind::Goal => "goal",
		NodeKind::Relationship => "adviser",
		_ => "node",
	}
}
