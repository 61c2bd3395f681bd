//! Shared trees for unit tests.

use proptest::prelude::*;

use super::domain::{
	Asset, AssetCategory, DomainTree, EstateItem, FamilyMember, Goal, Liability, LiabilityCategory,
	Person, Relationship, Structure, StructureType,
};

pub fn person(id: &str, name: &str) -> Person {
	Person {
		id: id.into(),
		name: name.into(),
		..Default::default()
	}
}

pub fn asset(id: &str, category: AssetCategory, owners: &[&str]) -> Asset {
	Asset {
		id: id.into(),
		name: id.to_uppercase(),
		category,
		value: Some(1000.0),
		owner_ids: owners.iter().map(|o| o.to_string()).collect(),
		has_issue: false,
	}
}

/// A household touching every entity class, with one category group under
/// the trust (`trust::asset::shares`).
pub fn sample_tree() -> DomainTree {
	DomainTree {
		document_id: "doc-sample".into(),
		client_name: "Smith household".into(),
		people: vec![person("p-ann", "Ann"), person("p-bob", "Bob")],
		structures: vec![Structure {
			id: "trust".into(),
			name: "Smith Family Trust".into(),
			structure_type: StructureType::Trust,
			owner_ids: vec!["p-ann".into(), "p-bob".into()],
			assets: (0..5)
				.map(|i| asset(&format!("shares-{i}"), AssetCategory::Shares, &[]))
				.collect(),
			liabilities: vec![],
			has_issue: false,
		}],
		assets: vec![
			asset("home", AssetCategory::Property, &["p-ann", "p-bob"]),
			asset("car", AssetCategory::Vehicle, &["p-bob"]),
		],
		liabilities: vec![Liability {
			id: "mortgage".into(),
			name: "Home loan".into(),
			category: LiabilityCategory::Mortgage,
			amount: Some(450_000.0),
			owner_ids: vec!["p-ann".into()],
			has_issue: true,
		}],
		estate_planning: vec![EstateItem {
			id: "will-ann".into(),
			name: "Will".into(),
			person_id: Some("p-ann".into()),
		}],
		family: vec![FamilyMember {
			id: "fam-ben".into(),
			name: "Ben".into(),
			relation: Some("Son".into()),
			children: vec![FamilyMember {
				id: "fam-cal".into(),
				name: "Cal".into(),
				relation: Some("Grandson".into()),
				children: vec![],
			}],
		}],
		goals: vec![Goal {
			id: "goal-retire".into(),
			name: "Retire at 60".into(),
		}],
		relationships: vec![Relationship {
			id: "adv-acct".into(),
			name: "Jo Lee".into(),
			firm: Some("Lee Accounting".into()),
		}],
	}
}

fn arb_id() -> impl Strategy<Value = String> {
	// A small id space so duplicates and dangling owners actually occur.
	"[a-h][0-3]"
}

fn arb_category() -> impl Strategy<Value = AssetCategory> {
	prop_oneof![
		Just(AssetCategory::Cash),
		Just(AssetCategory::Property),
		Just(AssetCategory::Shares),
	]
}

fn arb_asset() -> impl Strategy<Value = Asset> {
	(arb_id(), arb_category(), prop::collection::vec(arb_id(), 0..3)).prop_map(
		|(id, category, owner_ids)| Asset {
			name: id.clone(),
			id,
			category,
			value: None,
			owner_ids,
			has_issue: false,
		},
	)
}

fn arb_member() -> impl Strategy<Value = FamilyMember> {
	(arb_id(), prop::collection::vec(arb_id(), 0..3)).prop_map(|(id, kids)| FamilyMember {
		name: id.clone(),
		id,
		relation: None,
		children: kids
			.into_iter()
			.map(|k| FamilyMember {
				name: k.clone(),
				id: k,
				..Default::default()
			})
			.collect(),
	})
}

/// Arbitrary, frequently inconsistent, household records.
pub fn arb_tree() -> impl Strategy<Value = DomainTree> {
	(
		prop::collection::vec(arb_id(), 0..4),
		prop::collection::vec(
			(arb_id(), prop::collection::vec(arb_id(), 0..3), prop::collection::vec(arb_asset(), 0..6)),
			0..3,
		),
		prop::collection::vec(arb_asset(), 0..10),
		prop::collection::vec(arb_member(), 0..3),
		prop::collection::vec(arb_id(), 0..3),
	)
		.prop_map(|(people, structures, assets, family, goals)| DomainTree {
			document_id: "doc-arb".into(),
			client_name: "Arbitrary".into(),
			people: people.iter().map(|id| person(id, id)).collect(),
			structures: structures
				.into_iter()
				.map(|(id, owner_ids, assets)| Structure {
					name: id.clone(),
					id,
					owner_ids,
					assets,
					..Default::default()
				})
				.collect(),
			assets,
			family,
			goals: goals
				.into_iter()
				.map(|id| Goal { name: id.clone(), id })
				.collect(),
			..Default::default()
		})
}
