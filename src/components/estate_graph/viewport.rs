use log::debug;

use super::layout::Layout;
use super::types::{Position, Rect};

/// Camera: screen = graph * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Position {
		Position::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	pub fn graph_to_screen(&self, p: Position) -> (f64, f64) {
		(p.x * self.k + self.x, p.y * self.k + self.y)
	}

	/// Zoom by `factor` keeping the graph point under (sx, sy) fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64, min_k: f64, max_k: f64) {
		let new_k = (self.k * factor).clamp(min_k, max_k);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}

	/// Place `p` at the centre of a `width` x `height` viewport.
	pub fn center_on(&mut self, p: Position, width: f64, height: f64) {
		self.x = width / 2.0 - p.x * self.k;
		self.y = height / 2.0 - p.y * self.k;
	}

	/// Frame `bounds` inside the viewport with `padding` screen pixels on
	/// every side.
	pub fn fit(&mut self, bounds: Rect, width: f64, height: f64, padding: f64, min_k: f64, max_k: f64) {
		let avail_w = (width - 2.0 * padding).max(1.0);
		let avail_h = (height - 2.0 * padding).max(1.0);
		let k = if bounds.width <= 0.0 || bounds.height <= 0.0 {
			1.0
		} else {
			(avail_w / bounds.width).min(avail_h / bounds.height)
		};
		self.k = k.clamp(min_k, max_k);
		self.center_on(bounds.center(), width, height);
	}
}

/// The toggled node's position and the camera as they were just before a
/// collapse/expand.
#[derive(Clone, Debug, PartialEq)]
struct PendingAnchor {
	node_id: String,
	position: Position,
	transform: ViewTransform,
}

/// Keeps a toggled group visually still across the re-layout it causes.
#[derive(Clone, Debug, Default)]
pub struct AnchorStabilizer {
	pending: Option<PendingAnchor>,
}

impl AnchorStabilizer {
	/// Record `node_id`'s pre-toggle position. Does nothing when the node has
	/// no position in `layout`.
	pub fn capture(&mut self, node_id: &str, layout: &Layout, transform: ViewTransform) {
		self.pending = layout.position(node_id).map(|position| PendingAnchor {
			node_id: node_id.to_string(),
			position,
			transform,
		});
	}

	pub fn is_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// Shift the camera opposite to the anchored node's movement in the new
	/// layout. Consumes the pending anchor; a node missing from the new
	/// layout leaves `transform` untouched.
	pub fn apply(&mut self, layout: &Layout, transform: &mut ViewTransform) -> bool {
		let Some(anchor) = self.pending.take() else {
			return false;
		};
		let Some(after) = layout.position(&anchor.node_id) else {
			debug!("anchor: `{}` not in new layout, camera kept", anchor.node_id);
			return false;
		};
		let (dx, dy) = (after.x - anchor.position.x, after.y - anchor.position.y);
		transform.x = anchor.transform.x - dx * anchor.transform.k;
		transform.y = anchor.transform.y - dy * anchor.transform.k;
		transform.k = anchor.transform.k;
		true
	}
}
