//! Gesture controller and browser binding.
//!
//! [`EngineCore`] turns pointer, wheel and keyboard events into store actions.
//! It holds the [`BoardStore`] and the [`InputState`] of the gesture in
//! progress, and never touches the DOM, so it is fully testable natively.
//! Each handler returns the [`Action`]s the host must carry out.
//!
//! [`Engine`] wraps the core together with the canvas element, its 2D
//! context and the image loader.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::catalog::Catalog;
use crate::config::BoardConfig;
use crate::consts::{DEFAULT_CIRCLE_RADIUS, DEFAULT_RECT_SIZE, DEFAULT_TEXT, MIN_CIRCLE_RADIUS, MIN_RECT_SIZE};
use crate::doc::{Element, ElementId, ElementKind, ElementPatch};
use crate::geom::{Point, distance, snap_to_grid};
use crate::hit::{ResizeAnchor, find_callout_at, find_element_at, find_resize_handle};
use crate::images::{ImageCache, ImageLoader, SharedImageCache};
use crate::input::{Button, GesturePreview, InputState, Key, Modifiers, Tool, WheelDelta};
use crate::persist::{KeyValueStore, LocalStorage, MemoryStore};
use crate::render::{Scene, draw, image_urls};
use crate::store::{BoardError, BoardStore};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Visible state changed; schedule a redraw.
    RenderNeeded,
    SetCursor(String),
    /// The text tool wants content for a label at `at`. The host answers with
    /// [`EngineCore::place_text`].
    TextRequested { at: Point },
    GadgetLimitReached { gadget_id: String, count: usize, limit: usize },
}

/// Core engine state: all logic that doesn't depend on the canvas element.
pub struct EngineCore {
    pub store: BoardStore,
    pub input: InputState,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
    cursor: String,
}

impl EngineCore {
    #[must_use]
    pub fn new(store: BoardStore) -> Self {
        let cursor = store.selected_tool().idle_cursor().to_owned();
        Self { store, input: InputState::Idle, viewport_width: 0.0, viewport_height: 0.0, dpr: 1.0, cursor }
    }

    // --- Host inputs ---

    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css;
        self.viewport_height = height_css;
        self.dpr = if dpr > 0.0 { dpr } else { 1.0 };
    }

    /// Switch tools. Any gesture in progress is dropped without committing.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.input.is_idle() {
            self.input = InputState::Idle;
            actions.push(Action::RenderNeeded);
        }
        tracing::debug!(tool = tool.as_str(), "tool selected");
        self.store.set_selected_tool(tool);
        self.set_cursor(tool.idle_cursor(), &mut actions);
        actions
    }

    /// Place a text label, typically in answer to [`Action::TextRequested`].
    pub fn place_text(&mut self, at: Point, content: &str) -> Vec<Action> {
        self.store.place_text(at, content);
        vec![Action::RenderNeeded]
    }

    // --- Queries ---

    /// Preview of the gesture in progress, for the renderer.
    #[must_use]
    pub fn preview(&self) -> Option<GesturePreview<'_>> {
        self.input.preview(self.store.elements())
    }

    /// Cursor most recently requested through [`Action::SetCursor`].
    #[must_use]
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    // =============================================================
    // Pointer down
    // =============================================================

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.input.is_idle() || button == Button::Secondary {
            return actions;
        }
        let world = self.store.camera().screen_to_world(screen_pt);
        let tool = self.store.selected_tool();

        if button == Button::Middle || tool == Tool::Pan {
            self.input = InputState::Panning { last_screen: screen_pt };
            self.sync_gesture_cursor(&mut actions);
            return actions;
        }

        match tool {
            Tool::Select | Tool::Pan => self.select_down(world, modifiers, &mut actions),
            Tool::Player => {
                let at = self.placement_point(world);
                self.store.place_player(at);
                actions.push(Action::RenderNeeded);
            }
            Tool::Gadget => self.gadget_down(world, &mut actions),
            Tool::Text => {
                let at = self.placement_point(world);
                if self.store.config().prompt_for_text {
                    actions.push(Action::TextRequested { at });
                } else {
                    self.store.place_text(at, DEFAULT_TEXT);
                    actions.push(Action::RenderNeeded);
                }
            }
            Tool::Circle => {
                let anchor = self.placement_point(world);
                let provisional = Element::circle(anchor, DEFAULT_CIRCLE_RADIUS);
                self.input = InputState::ResizingNew { anchor, provisional };
                actions.push(Action::RenderNeeded);
            }
            Tool::Rectangle => {
                let anchor = self.placement_point(world);
                let provisional = Element::rectangle(anchor, DEFAULT_RECT_SIZE, DEFAULT_RECT_SIZE);
                self.input = InputState::ResizingNew { anchor, provisional };
                actions.push(Action::RenderNeeded);
            }
            Tool::Line => {
                self.input = InputState::DrawingFreehandLine { points: vec![world] };
                actions.push(Action::RenderNeeded);
            }
        }
        self.sync_gesture_cursor(&mut actions);
        actions
    }

    fn select_down(&mut self, world: Point, modifiers: Modifiers, actions: &mut Vec<Action>) {
        if self.store.callout_management_mode() && self.callout_down(world, actions) {
            return;
        }

        // Handles of the single selected shape win over element bodies.
        if let [only] = self.store.selection()
            && let Some(el) = self.store.element(only)
            && let Some(handle) = find_resize_handle(world, el)
        {
            self.input = InputState::ResizingSelected { handle, original: el.clone(), preview: el.clone() };
            return;
        }

        let hit = find_element_at(world, self.store.elements()).map(|el| (el.id.clone(), el.anchor()));
        match hit {
            Some((id, _)) if modifiers.command() => {
                self.store.toggle_selection(&id);
                actions.push(Action::RenderNeeded);
            }
            Some((id, anchor)) if self.store.is_selected(&id) => {
                self.input = InputState::DraggingElement {
                    ids: self.store.selection().to_vec(),
                    grab_offset: Point::new(world.x - anchor.x, world.y - anchor.y),
                    origin: anchor,
                    delta: Point::default(),
                };
            }
            Some((id, _)) => {
                self.store.select_element(&id);
                actions.push(Action::RenderNeeded);
            }
            None => {
                if !self.store.selection().is_empty() {
                    self.store.clear_selection();
                    actions.push(Action::RenderNeeded);
                }
            }
        }
    }

    /// Callout editing in management mode. Returns whether the press was
    /// consumed by a callout.
    fn callout_down(&mut self, world: Point, actions: &mut Vec<Action>) -> bool {
        if !self.store.show_callouts() {
            return false;
        }
        let Some(map) = self.store.selected_map() else {
            return false;
        };
        let Some(callout) = find_callout_at(world, &map.callouts, self.store.hidden_callouts()) else {
            return false;
        };
        let (map_id, callout_id, position) = (map.id.clone(), callout.id.clone(), callout.position);

        if self.store.editing_callout() == Some(callout_id.as_str()) {
            self.input = InputState::DraggingCallout {
                map_id,
                callout_id,
                grab_offset: Point::new(world.x - position.x, world.y - position.y),
                position,
            };
        } else {
            self.store.set_editing_callout(Some(callout_id));
            actions.push(Action::RenderNeeded);
        }
        true
    }

    fn gadget_down(&mut self, world: Point, actions: &mut Vec<Action>) {
        let at = self.placement_point(world);
        match self.store.place_gadget(at) {
            Ok(_) => actions.push(Action::RenderNeeded),
            Err(BoardError::GadgetLimitReached { gadget_id, count, limit }) => {
                actions.push(Action::GadgetLimitReached { gadget_id, count, limit });
            }
            Err(e) => tracing::debug!(error = %e, "gadget not placed"),
        }
    }

    fn placement_point(&self, world: Point) -> Point {
        let config = self.store.config();
        if config.snap_to_grid { snap_to_grid(world, config.grid_size) } else { world }
    }

    // =============================================================
    // Pointer move
    // =============================================================

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        let world = self.store.camera().screen_to_world(screen_pt);

        if self.input.is_idle() {
            let cursor = self.hover_cursor(world);
            self.set_cursor(cursor, &mut actions);
            return actions;
        }

        match &mut self.input {
            InputState::Idle => {}
            InputState::Panning { last_screen } => {
                let delta = Point::new(screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                *last_screen = screen_pt;
                let pan = self.store.camera().pan;
                self.store.set_pan(Point::new(pan.x + delta.x, pan.y + delta.y));
                actions.push(Action::RenderNeeded);
            }
            InputState::DraggingElement { grab_offset, origin, delta, .. } => {
                *delta = Point::new(world.x - grab_offset.x - origin.x, world.y - grab_offset.y - origin.y);
                actions.push(Action::RenderNeeded);
            }
            InputState::ResizingNew { anchor, provisional } => {
                let patch = creation_size(*anchor, world, &provisional.kind);
                provisional.apply_patch(&patch);
                actions.push(Action::RenderNeeded);
            }
            InputState::ResizingSelected { handle, original, preview } => {
                let mut next = original.clone();
                next.apply_patch(&handle_resize(*handle, original, world));
                *preview = next;
                actions.push(Action::RenderNeeded);
            }
            InputState::DrawingFreehandLine { points } => {
                let sample = self.store.config().line_sample_distance;
                if points.last().is_none_or(|last| distance(*last, world) > sample) {
                    points.push(world);
                    actions.push(Action::RenderNeeded);
                }
            }
            InputState::DraggingCallout { grab_offset, position, .. } => {
                *position = Point::new(world.x - grab_offset.x, world.y - grab_offset.y);
                actions.push(Action::RenderNeeded);
            }
        }
        actions
    }

    fn hover_cursor(&self, world: Point) -> &'static str {
        let tool = self.store.selected_tool();
        if tool != Tool::Select {
            return tool.idle_cursor();
        }
        if let [only] = self.store.selection()
            && let Some(handle) = self.store.element(only).and_then(|el| find_resize_handle(world, el))
        {
            return handle.cursor();
        }
        match find_element_at(world, self.store.elements()) {
            Some(el) if self.store.is_selected(&el.id) => "move",
            Some(_) => "pointer",
            None => tool.idle_cursor(),
        }
    }

    // =============================================================
    // Pointer up / leave
    // =============================================================

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = self.finish_gesture();
        let world = self.store.camera().screen_to_world(screen_pt);
        let cursor = self.hover_cursor(world);
        self.set_cursor(cursor, &mut actions);
        actions
    }

    /// The pointer left the canvas: finalize like a release.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let mut actions = self.finish_gesture();
        let cursor = self.store.selected_tool().idle_cursor();
        self.set_cursor(cursor, &mut actions);
        actions
    }

    /// Commit whatever the gesture in progress implies and return to Idle.
    fn finish_gesture(&mut self) -> Vec<Action> {
        let state = std::mem::take(&mut self.input);
        let mut actions = Vec::new();

        match state {
            InputState::Idle => return actions,
            InputState::Panning { .. } => {}
            InputState::DraggingElement { ids, delta, .. } => {
                let moved: Vec<Element> = self
                    .store
                    .elements()
                    .iter()
                    .filter(|e| ids.contains(&e.id))
                    .map(|e| {
                        let mut moved = e.clone();
                        moved.translate(delta.x, delta.y);
                        moved
                    })
                    .collect();
                if self.store.replace_elements(moved) {
                    tracing::debug!(count = ids.len(), dx = delta.x, dy = delta.y, "drag committed");
                }
            }
            InputState::ResizingNew { provisional, .. } => {
                if let Err(e) = self.store.add_element(provisional) {
                    tracing::warn!(error = %e, "provisional shape not committed");
                }
            }
            InputState::ResizingSelected { preview, .. } => {
                if self.store.replace_elements(vec![preview]) {
                    tracing::debug!("resize committed");
                }
            }
            InputState::DrawingFreehandLine { points } => {
                if let Some(line) = Element::line(&points) {
                    tracing::debug!(points = points.len(), "freehand line committed");
                    if let Err(e) = self.store.add_element(line) {
                        tracing::warn!(error = %e, "freehand line not committed");
                    }
                }
            }
            InputState::DraggingCallout { map_id, callout_id, position, .. } => {
                self.commit_callout(&map_id, &callout_id, position);
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn commit_callout(&mut self, map_id: &str, callout_id: &str, position: Point) {
        let current = self.store.selected_map().filter(|m| m.id == map_id).and_then(|m| m.callout(callout_id));
        match current {
            Some(c) if c.position == position => {}
            Some(_) => {
                if let Err(e) = self.store.update_callout_position(callout_id, position) {
                    tracing::warn!(error = %e, callout = callout_id, "callout move not committed");
                }
            }
            None => tracing::debug!(map = map_id, callout = callout_id, "callout drag outlived its map"),
        }
    }

    // =============================================================
    // Wheel and keyboard
    // =============================================================

    /// Zoom by one wheel tick around the cursor.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        let step = self.store.config().wheel_zoom_factor;
        let factor = if delta.dy > 0.0 {
            1.0 / step
        } else if delta.dy < 0.0 {
            step
        } else {
            return Vec::new();
        };
        self.store.zoom_at(screen_pt, factor);
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();

        if key.is("Escape") {
            let cancelled = !self.input.is_idle();
            self.input = InputState::Idle;
            if cancelled || !self.store.selection().is_empty() {
                self.store.clear_selection();
                actions.push(Action::RenderNeeded);
            }
            let cursor = self.store.selected_tool().idle_cursor();
            self.set_cursor(cursor, &mut actions);
            return actions;
        }

        if !self.input.is_idle() {
            return actions;
        }

        let changed = if key.is("Delete") || key.is("Backspace") {
            let ids: Vec<ElementId> = self.store.selection().to_vec();
            self.store.remove_elements(&ids) > 0
        } else if modifiers.command() && key.is("z") {
            if modifiers.shift { self.store.redo() } else { self.store.undo() }
        } else if modifiers.command() && key.is("y") {
            self.store.redo()
        } else {
            false
        };

        if changed {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    // --- Cursor ---

    fn set_cursor(&mut self, cursor: &str, actions: &mut Vec<Action>) {
        if self.cursor != cursor {
            cursor.clone_into(&mut self.cursor);
            actions.push(Action::SetCursor(cursor.to_owned()));
        }
    }

    fn sync_gesture_cursor(&mut self, actions: &mut Vec<Action>) {
        if let Some(cursor) = self.input.cursor() {
            self.set_cursor(cursor, actions);
        }
    }
}

/// Size of a shape being created, from its anchor to the pointer.
fn creation_size(anchor: Point, pointer: Point, kind: &ElementKind) -> ElementPatch {
    match kind {
        ElementKind::Circle { .. } => ElementPatch {
            radius: Some(distance(anchor, pointer).max(MIN_CIRCLE_RADIUS)),
            ..ElementPatch::default()
        },
        ElementKind::Rectangle { .. } => ElementPatch {
            width: Some((2.0 * (pointer.x - anchor.x).abs()).max(MIN_RECT_SIZE)),
            height: Some((2.0 * (pointer.y - anchor.y).abs()).max(MIN_RECT_SIZE)),
            ..ElementPatch::default()
        },
        _ => ElementPatch::default(),
    }
}

/// Size of a selected shape while one of its handles is dragged. Shapes
/// resize symmetrically about their centre.
fn handle_resize(handle: ResizeAnchor, original: &Element, pointer: Point) -> ElementPatch {
    let center = original.anchor();
    match original.kind {
        ElementKind::Circle { .. } => ElementPatch {
            radius: Some(distance(center, pointer).max(MIN_CIRCLE_RADIUS)),
            ..ElementPatch::default()
        },
        ElementKind::Rectangle { .. } => ElementPatch {
            width: handle
                .affects_width()
                .then(|| (2.0 * (pointer.x - center.x).abs()).max(MIN_RECT_SIZE)),
            height: handle
                .affects_height()
                .then(|| (2.0 * (pointer.y - center.y).abs()).max(MIN_RECT_SIZE)),
            ..ElementPatch::default()
        },
        _ => ElementPatch::default(),
    }
}

// =============================================================
// Browser binding
// =============================================================

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    images: ImageLoader,
    pub core: EngineCore,
}

impl Engine {
    /// Bind to `canvas`. `on_image_ready` runs whenever a map or gadget image
    /// finishes loading, so the host can schedule [`Engine::render`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement, config: BoardConfig, on_image_ready: impl Fn() + 'static) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;

        let storage: Box<dyn KeyValueStore> = match LocalStorage::open() {
            Ok(storage) => Box::new(storage),
            Err(e) => {
                tracing::warn!(error = %e, "local storage unavailable; changes will not persist");
                Box::new(MemoryStore::new())
            }
        };
        let store = BoardStore::new(Catalog::builtin(), config, storage);
        let cache: SharedImageCache = Rc::new(RefCell::new(ImageCache::new()));

        Ok(Self { canvas, ctx, images: ImageLoader::new(cache, on_image_ready), core: EngineCore::new(store) })
    }

    // --- Viewport ---

    /// Update viewport dimensions and device pixel ratio, resizing the
    /// canvas backing store to match.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
        self.canvas.set_width((width_css * self.core.dpr).round().max(0.0) as u32);
        self.canvas.set_height((height_css * self.core.dpr).round().max(0.0) as u32);
    }

    // --- Delegated inputs ---

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.core.set_tool(tool)
    }

    pub fn place_text(&mut self, at: Point, content: &str) -> Vec<Action> {
        self.core.place_text(at, content)
    }

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.core.on_pointer_leave()
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    // --- Render ---

    /// Start any missing image loads, then draw the current state.
    ///
    /// # Errors
    ///
    /// Returns `Err` if an image element cannot be created or a canvas call
    /// fails.
    pub fn render(&self) -> Result<(), JsValue> {
        for url in image_urls(&self.core.store) {
            self.images.load(&url)?;
        }
        let cache = self.images.cache().borrow();
        let scene = Scene {
            store: &self.core.store,
            preview: self.core.preview(),
            images: &cache,
            viewport_width: self.core.viewport_width,
            viewport_height: self.core.viewport_height,
            dpr: self.core.dpr,
        };
        draw(&self.ctx, &scene)
    }

    /// Incremented whenever an image finishes loading or fails.
    #[must_use]
    pub fn image_generation(&self) -> u64 {
        self.images.cache().borrow().generation()
    }
}
