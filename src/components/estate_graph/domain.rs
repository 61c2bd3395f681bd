//! The domain record handed over by the extraction and editing collaborators.
//!
//! Every value here is treated as immutable input by the diagram. Edits
//! produce a new [`DomainTree`] rather than mutating the current one.

use serde::{Deserialize, Serialize};

/// A client's full household record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainTree {
	/// Identity of the loaded document. A different id means a new document.
	pub document_id: String,
	pub client_name: String,
	pub people: Vec<Person>,
	pub structures: Vec<Structure>,
	/// Personally held assets.
	pub assets: Vec<Asset>,
	/// Personally held liabilities.
	pub liabilities: Vec<Liability>,
	pub estate_planning: Vec<EstateItem>,
	pub family: Vec<FamilyMember>,
	pub goals: Vec<Goal>,
	pub relationships: Vec<Relationship>,
}

impl DomainTree {
	/// Parse a record produced by the extraction collaborator.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// True when the tree carries no top-level entities at all.
	pub fn is_empty(&self) -> bool {
		self.people.is_empty()
			&& self.structures.is_empty()
			&& self.assets.is_empty()
			&& self.liabilities.is_empty()
			&& self.estate_planning.is_empty()
			&& self.family.is_empty()
			&& self.goals.is_empty()
			&& self.relationships.is_empty()
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
	pub id: String,
	pub name: String,
	pub role: Option<String>,
	pub has_issue: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructureType {
	Trust,
	Company,
	SuperFund,
	Partnership,
	#[default]
	Other,
}

impl StructureType {
	pub fn label(self) -> &'static str {
		match self {
			Self::Trust => "Trust",
			Self::Company => "Company",
			Self::SuperFund => "Super fund",
			Self::Partnership => "Partnership",
			Self::Other => "Structure",
		}
	}
}

/// A legal or financial entity such as a trust or company.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Structure {
	pub id: String,
	pub name: String,
	pub structure_type: StructureType,
	/// Controlling people. Weak references into `DomainTree::people`.
	pub owner_ids: Vec<String>,
	pub assets: Vec<Asset>,
	pub liabilities: Vec<Liability>,
	pub has_issue: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetCategory {
	Property,
	Cash,
	Shares,
	Super,
	Vehicle,
	Business,
	#[default]
	Other,
}

impl AssetCategory {
	pub fn key(self) -> &'static str {
		match self {
			Self::Property => "property",
			Self::Cash => "cash",
			Self::Shares => "shares",
			Self::Super => "super",
			Self::Vehicle => "vehicle",
			Self::Business => "business",
			Self::Other => "other",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Property => "Property",
			Self::Cash => "Cash",
			Self::Shares => "Shares",
			Self::Super => "Superannuation",
			Self::Vehicle => "Vehicles",
			Self::Business => "Business interests",
			Self::Other => "Other assets",
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Asset {
	pub id: String,
	pub name: String,
	pub category: AssetCategory,
	pub value: Option<f64>,
	/// Owners in priority order. More than one means joint ownership.
	pub owner_ids: Vec<String>,
	pub has_issue: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LiabilityCategory {
	Mortgage,
	Loan,
	CreditCard,
	#[default]
	Other,
}

impl LiabilityCategory {
	pub fn key(self) -> &'static str {
		match self {
			Self::Mortgage => "mortgage",
			Self::Loan => "loan",
			Self::CreditCard => "creditCard",
			Self::Other => "other",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Mortgage => "Mortgages",
			Self::Loan => "Loans",
			Self::CreditCard => "Credit cards",
			Self::Other => "Other liabilities",
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Liability {
	pub id: String,
	pub name: String,
	pub category: LiabilityCategory,
	pub amount: Option<f64>,
	pub owner_ids: Vec<String>,
	pub has_issue: bool,
}

/// A will, power of attorney or similar instrument.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstateItem {
	pub id: String,
	pub name: String,
	pub person_id: Option<String>,
}

/// A family member. `children` holds the second generation (grandchildren).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyMember {
	pub id: String,
	pub name: String,
	pub relation: Option<String>,
	pub children: Vec<FamilyMember>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Goal {
	pub id: String,
	pub name: String,
}

/// A professional adviser relationship (accountant, lawyer, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Relationship {
	pub id: String,
	pub name: String,
	pub firm: Option<String>,
}
