use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::interaction::DragState;
use super::state::{DiagramState, HANDLE_RADIUS};
use super::types::{EdgeClass, GraphNode, NodeKind, Rect, Side};

fn card_color(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::Root => "#f4d35e",
		NodeKind::Person => "#4f9dde",
		NodeKind::Structure => "#9467bd",
		NodeKind::Asset => "#2ca02c",
		NodeKind::Liability => "#d62728",
		NodeKind::CategoryGroup => "#8c8c8c",
		NodeKind::EstateGroup | NodeKind::EstateItem => "#8c564b",
		NodeKind::FamilyGroup | NodeKind::FamilyMember | NodeKind::Grandchild => "#e377c2",
		NodeKind::GoalsGroup | NodeKind::Goal => "#ff7f0e",
		NodeKind::RelationshipsGroup | NodeKind::Relationship => "#17becf",
	}
}

pub fn render(state: &DiagramState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	draw_drag_line(state, ctx);
	ctx.restore();
}

/// Midpoint of the card edge facing `toward`.
fn anchor_point(rect: &Rect, toward: &Rect) -> (f64, f64) {
	let y = rect.y + rect.height / 2.0;
	if toward.center().x >= rect.center().x {
		(rect.x + rect.width, y)
	} else {
		(rect.x, y)
	}
}

fn draw_edges(state: &DiagramState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (dash, gap) = (8.0 / k, 4.0 / k);
	let flow_offset = -(state.flow_time * 30.0) % (dash + gap);
	let styling = state.highlight().styling();
	let layout = state.layout();

	for edge in &state.visible().edges {
		let (Some(a), Some(b)) = (layout.rect(&edge.source), layout.rect(&edge.target)) else {
			continue;
		};
		let (x1, y1) = anchor_point(&a, &b);
		let (x2, y2) = anchor_point(&b, &a);
		let style = styling.edge(&edge.id);

		let (color, base_width) = match edge.class {
			EdgeClass::Structural => ("100, 180, 255", 1.5),
			EdgeClass::CrossLink => ("180, 180, 180", 1.0),
			EdgeClass::UserLink => ("190, 120, 255", 2.0),
		};
		let width = if style.emphasized { base_width * 1.6 } else { base_width };
		ctx.set_stroke_style_str(&format!("rgba({color}, {})", 0.8 * style.opacity));
		ctx.set_line_width(width / k.max(0.5));

		let dashed = edge.class == EdgeClass::CrossLink || style.emphasized;
		if dashed {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(if style.emphasized { flow_offset } else { 0.0 });
		}

		let mid_x = (x1 + x2) / 2.0;
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.bezier_curve_to(mid_x, y1, mid_x, y2, x2, y2);
		ctx.stroke();
		if dashed {
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}
	}
}

fn draw_nodes(state: &DiagramState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let styling = state.highlight().styling();
	let layout = state.layout();

	for node in &state.visible().nodes {
		let Some(rect) = layout.rect(&node.id) else {
			continue;
		};
		ctx.set_global_alpha(styling.node_opacity(&node.id));

		ctx.set_fill_style_str("#24243e");
		ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
		ctx.set_fill_style_str(card_color(node.kind));
		ctx.fill_rect(rect.x, rect.y, 4.0, rect.height);

		let selected = state.highlight().is_selected(&node.id);
		ctx.set_stroke_style_str(if selected { "white" } else { "rgba(255, 255, 255, 0.25)" });
		ctx.set_line_width(if selected { 2.0 / k } else { 1.0 / k });
		ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);

		ctx.set_fill_style_str("white");
		ctx.set_font("13px sans-serif");
		let _ = ctx.fill_text(&node.label, rect.x + 12.0, rect.y + 22.0);
		if let Some(sublabel) = &node.sublabel {
			ctx.set_fill_style_str("rgba(255, 255, 255, 0.6)");
			ctx.set_font("11px sans-serif");
			let _ = ctx.fill_text(sublabel, rect.x + 12.0, rect.y + 40.0);
		}

		if node.flags.has_issue {
			ctx.begin_path();
			let _ = ctx.arc(rect.x + rect.width - 10.0, rect.y + 10.0, 4.0, 0.0, 2.0 * PI);
			ctx.set_fill_style_str("#ffb000");
			ctx.fill();
		}
		if node.kind == NodeKind::CategoryGroup {
			let marker = if node.flags.is_expanded { "\u{2212}" } else { "+" };
			ctx.set_fill_style_str("white");
			ctx.set_font("16px sans-serif");
			let _ = ctx.fill_text(marker, rect.x + rect.width - 22.0, rect.y + rect.height - 12.0);
		}
		draw_handle(state, node, ctx);
		ctx.set_global_alpha(1.0);
	}
}

fn draw_handle(state: &DiagramState, node: &GraphNode, ctx: &CanvasRenderingContext2d) {
	let Some(p) = state.handle_position(node) else {
		return;
	};
	ctx.begin_path();
	let _ = ctx.arc(p.x, p.y, HANDLE_RADIUS * 0.6, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(match node.side {
		Side::Left => "#e377c2",
		Side::Right | Side::Center => "#4f9dde",
	});
	ctx.fill();
}

fn draw_drag_line(state: &DiagramState, ctx: &CanvasRenderingContext2d) {
	let DragState::Dragging {
		source,
		pointer: Some(pointer),
	} = state.drag().state()
	else {
		return;
	};
	let Some(from) = state.visible().node(source).and_then(|n| state.handle_position(n)) else {
		return;
	};
	let k = state.transform.k;
	ctx.set_stroke_style_str("rgba(190, 120, 255, 0.9)");
	ctx.set_line_width(1.5 / k);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(6.0 / k),
		&JsValue::from_f64(4.0 / k),
	));
	ctx.begin_path();
	ctx.move_to(from.x, from.y);
	ctx.line_to(pointer.x, pointer.y);
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}
