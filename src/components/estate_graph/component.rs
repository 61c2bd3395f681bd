use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::domain::DomainTree;
use super::editor::ChildOverrides;
use super::interaction::{ChildPrompt, DropTarget};
use super::render;
use super::state::{Command, DiagramState, Outcome};
use super::types::{DiagramConfig, GraphEdge, NodeKind};

const FIT_PADDING: f64 = 60.0;

/// An open "create child" menu, positioned in canvas pixels.
#[derive(Clone, Debug, PartialEq)]
struct PromptView {
	prompt: ChildPrompt,
	left: f64,
	top: f64,
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

#[component]
pub fn EstateGraphCanvas(
	#[prop(into)] data: Signal<DomainTree>,
	#[prop(optional)] config: DiagramConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	/// Receives the edited tree and the new entity's id. The caller owns the
	/// record and should feed the tree back through `data`.
	#[prop(optional)]
	on_child_created: Option<Callback<(String, DomainTree)>>,
	/// Receives each user link drawn on the canvas, for persisting.
	#[prop(optional)]
	on_link_added: Option<Callback<GraphEdge>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<DiagramState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (prompt, set_prompt) = signal(None::<PromptView>);
	let (choice, set_choice) = signal(None::<(String, NodeKind)>);
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let tree = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if let Some(ref mut s) = *state_init.borrow_mut() {
			s.dispatch(Command::UpdateTree(tree));
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let viewport = |w: &Window| {
			(
				w.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
				w.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
			)
		};

		let (w, h) = if fullscreen {
			viewport(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::error!("canvas 2d context unavailable");
			return;
		};
		let mut initial = DiagramState::new(tree, config.clone(), w, h);
		initial.dispatch(Command::FitView { padding: FIT_PADDING });
		*state_init.borrow_mut() = Some(initial);

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = viewport(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.dispatch(Command::Resize { width: nw, height: nh });
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_choice = state.clone();
	Effect::new(move |_| {
		let Some((parent_id, kind)) = choice.get() else {
			return;
		};
		let outcome = state_choice.borrow_mut().as_mut().and_then(|s| {
			s.dispatch(Command::CreateChild {
				parent_id,
				kind,
				overrides: ChildOverrides::default(),
			})
		});
		match outcome {
			Some(Outcome::ChildCreated { id, tree }) => {
				if let Some(cb) = on_child_created {
					cb.run((id, tree));
				}
			}
			Some(Outcome::EditFailed(err)) => log::warn!("child creation failed: {err}"),
			_ => {}
		}
		set_prompt.set(None);
		set_choice.set(None);
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		set_prompt.set(None);
		if let Some(ref mut s) = *state_md.borrow_mut() {
			if let Some(id) = s.handle_at_position(x, y).map(|n| n.id.clone()) {
				s.dispatch(Command::DragStart(id));
			} else if let Some((id, kind)) = s.node_at_position(x, y).map(|n| (n.id.clone(), n.kind)) {
				if kind == NodeKind::CategoryGroup {
					s.dispatch(Command::ToggleGroup(id.clone()));
				}
				s.dispatch(Command::SelectNode {
					id: Some(id),
					additive: ev.shift_key(),
				});
			} else {
				s.dispatch(Command::SelectNode {
					id: None,
					additive: false,
				});
				s.pan.active = true;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.drag().is_dragging() {
				let p = s.screen_to_graph(x, y);
				s.dispatch(Command::DragMove(p));
			} else if s.pan.active {
				s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
				s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
			} else {
				let hovered: Vec<String> = s.node_at_position(x, y).map(|n| n.id.clone()).into_iter().collect();
				s.dispatch(Command::HoverHighlight(hovered));
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let outcome = state_mu.borrow_mut().as_mut().and_then(|s| {
			s.pan.active = false;
			if !s.drag().is_dragging() {
				return None;
			}
			let target = if let Some(n) = s.handle_at_position(x, y) {
				DropTarget::ConnectionPoint(n.id.clone())
			} else if let Some(n) = s.node_at_position(x, y) {
				DropTarget::Node(n.id.clone())
			} else {
				DropTarget::Canvas(s.screen_to_graph(x, y))
			};
			s.dispatch(Command::DragEnd(target))
		});
		match outcome {
			Some(Outcome::ChildPrompt(prompt)) => set_prompt.set(Some(PromptView {
				prompt,
				left: x,
				top: y,
			})),
			Some(Outcome::LinkAdded(edge)) => {
				log::info!("linked {} -> {}", edge.source, edge.target);
				if let Some(cb) = on_link_added {
					cb.run(edge);
				}
			}
			_ => {}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.dispatch(Command::DragCancel);
			s.pan.active = false;
			s.dispatch(Command::HoverHighlight(Vec::new()));
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let (min_k, max_k) = (s.config().min_zoom, s.config().max_zoom);
			s.transform.zoom_at(x, y, factor, min_k, max_k);
		}
	};

	view! {
		<div class="estate-graph" style="position: relative; width: 100%; height: 100%;">
			<canvas
				node_ref=canvas_ref
				class="estate-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			{move || {
				prompt
					.get()
					.map(|view| {
						let parent = view.prompt.parent_id.clone();
						view! {
							<div
								class="child-prompt"
								style=format!("position: absolute; left: {}px; top: {}px;", view.left, view.top)
							>
								{view
									.prompt
									.options
									.into_iter()
									.map(|kind| {
										let parent = parent.clone();
										view! {
											<button on:click=move |_| {
												set_choice.set(Some((parent.clone(), kind)))
											}>{format!("Add {}", kind.label().to_lowercase())}</button>
										}
									})
									.collect_view()}
							</div>
						}
					})
			}}
		</div>
	}
}
