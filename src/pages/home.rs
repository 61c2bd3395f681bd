use leptos::prelude::*;

use crate::components::estate_graph::{
	Asset, AssetCategory, DomainTree, EstateGraphCanvas, EstateItem, FamilyMember, Goal, GraphEdge,
	Liability, LiabilityCategory, Person, Relationship, Structure, StructureType,
};

const ASSET_CATEGORIES: [AssetCategory; 4] = [
	AssetCategory::Shares,
	AssetCategory::Cash,
	AssetCategory::Property,
	AssetCategory::Super,
];

/// Generate a sample household with `holdings` assets spread over two people
/// and a family trust.
fn generate_sample_household(holdings: usize) -> DomainTree {
	let people = vec![
		Person {
			id: "p-1".into(),
			name: "Alex Morgan".into(),
			role: Some("Client".into()),
			has_issue: false,
		},
		Person {
			id: "p-2".into(),
			name: "Sam Morgan".into(),
			role: Some("Partner".into()),
			has_issue: false,
		},
	];

	let asset = |i: usize, owners: Vec<String>| Asset {
		id: format!("a-{i}"),
		name: format!("Holding {}", i + 1),
		category: ASSET_CATEGORIES[i % ASSET_CATEGORIES.len()],
		value: Some((rand_simple(i) * 500_000.0).round()),
		owner_ids: owners,
		has_issue: rand_simple(i + 7) > 0.9,
	};

	let (mut personal, mut trust_assets) = (Vec::new(), Vec::new());
	for i in 0..holdings {
		match i % 3 {
			0 => trust_assets.push(asset(i, vec![])),
			1 => personal.push(asset(i, vec!["p-1".into()])),
			_ => personal.push(asset(i, vec!["p-1".into(), "p-2".into()])),
		}
	}

	DomainTree {
		document_id: "sample-household".into(),
		client_name: "The Morgan household".into(),
		people,
		structures: vec![Structure {
			id: "s-trust".into(),
			name: "Morgan Family Trust".into(),
			structure_type: StructureType::Trust,
			owner_ids: vec!["p-1".into(), "p-2".into()],
			assets: trust_assets,
			liabilities: vec![],
			has_issue: false,
		}],
		assets: personal,
		liabilities: vec![Liability {
			id: "l-home".into(),
			name: "Home loan".into(),
			category: LiabilityCategory::Mortgage,
			amount: Some(420_000.0),
			owner_ids: vec!["p-1".into(), "p-2".into()],
			has_issue: false,
		}],
		estate_planning: vec![EstateItem {
			id: "e-will".into(),
			name: "Will".into(),
			person_id: Some("p-1".into()),
		}],
		family: vec![FamilyMember {
			id: "f-1".into(),
			name: "Jordan Morgan".into(),
			relation: Some("Daughter".into()),
			children: vec![FamilyMember {
				id: "f-1-1".into(),
				name: "Riley".into(),
				relation: Some("Grandson".into()),
				children: vec![],
			}],
		}],
		goals: vec![Goal {
			id: "g-retire".into(),
			name: "Retire at 60".into(),
		}],
		relationships: vec![Relationship {
			id: "r-acct".into(),
			name: "Accountant".into(),
			firm: Some("Ledger & Co".into()),
		}],
	}
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	// The canvas reports edits; the page owns the record and feeds them back.
	let household = RwSignal::new(generate_sample_household(12));
	let on_child_created = Callback::new(move |(id, tree): (String, DomainTree)| {
		log::info!("created `{id}`");
		household.set(tree);
	});
	let on_link_added = Callback::new(move |edge: GraphEdge| {
		log::info!("link {} -> {} added", edge.source, edge.target);
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<EstateGraphCanvas
					data=household
					fullscreen=true
					on_child_created=on_child_created
					on_link_added=on_link_added
				/>
				<div class="graph-overlay">
					<h1>"Estate Overview"</h1>
					<p class="subtitle">
						"Click to select, shift-click to add. Drag a handle to link or create. Scroll to zoom."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
