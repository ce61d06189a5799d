//! Rendering: repaints the whole board from a [`Scene`] snapshot.
//!
//! Drawing goes through the [`Surface`] trait. The browser implementation is
//! [`web_sys::CanvasRenderingContext2d`]; tests use a recording surface. The
//! renderer reads state and produces pixels; it never mutates the store or
//! starts image loads ([`image_urls`] tells the host what to load).
//!
//! Layers, bottom first: map background, grid, callouts, elements, gesture
//! preview, selection treatment.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::TAU;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::camera::Camera;
use crate::catalog::Callout;
use crate::consts::{
    GADGET_ICON_SIZE, HANDLE_DRAW_PX, MARKER_HIT_RADIUS, SELECTION_DASH_PX, SELECTION_PAD,
};
use crate::doc::{Element, ElementKind, bounding_box};
use crate::geom::{Point, Rect, fit_rect, points_of};
use crate::hit::resize_handle_positions;
use crate::images::{ImageCache, RasterImage};
use crate::input::GesturePreview;
use crate::store::BoardStore;

const SELECTION_COLOR: &str = "#00ff00";
const SELECTION_GROUP_COLOR: &str = "rgba(0, 255, 0, 0.6)";
const SELECTION_LINE_PX: f64 = 2.0;
const BACKGROUND_FALLBACK: &str = "#3f3f46";
const BACKGROUND_OVERLAY: &str = "rgba(0, 0, 0, 0.3)";
const GRID_COLOR: &str = "rgba(255, 255, 255, 0.15)";
const CALLOUT_FONT: &str = "bold 12px Arial";
const CALLOUT_TEXT: &str = "#ffffff";
const CALLOUT_OUTLINE: &str = "#000000";
const CALLOUT_EDIT_FILL: &str = "rgba(0, 255, 0, 0.12)";
const CALLOUT_EDIT_PAD: f64 = 8.0;
const MARKER_OUTLINE: &str = "#ffffff";
const STROKE_WIDTH: f64 = 2.0;
const PREVIEW_ALPHA: f64 = 0.6;
/// Side of the square drawn for a gadget whose icon is not available.
const GADGET_FALLBACK_SIZE: f64 = 20.0;

/// 2D drawing target. Mirrors the subset of the Canvas 2D API the renderer uses.
pub trait Surface {
    type Image: RasterImage;
    type Error;

    fn save(&self);
    fn restore(&self);
    /// Reset the transform to `[a c e; b d f]`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn set_transform(&self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), Self::Error>;
    /// # Errors
    ///
    /// Backend failure.
    fn translate(&self, x: f64, y: f64) -> Result<(), Self::Error>;
    /// # Errors
    ///
    /// Backend failure.
    fn scale(&self, x: f64, y: f64) -> Result<(), Self::Error>;
    fn clear_rect(&self, x: f64, y: f64, w: f64, h: f64);
    fn set_fill_style(&self, style: &str);
    fn set_stroke_style(&self, style: &str);
    fn set_line_width(&self, width: f64);
    /// Dash pattern; an empty slice draws solid lines.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn set_line_dash(&self, segments: &[f64]) -> Result<(), Self::Error>;
    fn set_global_alpha(&self, alpha: f64);
    fn set_font(&self, font: &str);
    fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_rect(&self, x: f64, y: f64, w: f64, h: f64);
    fn begin_path(&self);
    fn move_to(&self, x: f64, y: f64);
    fn line_to(&self, x: f64, y: f64);
    /// # Errors
    ///
    /// Backend failure, e.g. a negative radius.
    fn arc(&self, x: f64, y: f64, radius: f64, start: f64, end: f64) -> Result<(), Self::Error>;
    fn fill(&self);
    fn stroke(&self);
    /// # Errors
    ///
    /// Backend failure.
    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), Self::Error>;
    /// # Errors
    ///
    /// Backend failure.
    fn stroke_text(&self, text: &str, x: f64, y: f64) -> Result<(), Self::Error>;
    /// Width of `text` in the current font.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn measure_text(&self, text: &str) -> Result<f64, Self::Error>;
    /// # Errors
    ///
    /// Backend failure.
    fn draw_image(&self, image: &Self::Image, x: f64, y: f64, w: f64, h: f64) -> Result<(), Self::Error>;
}

impl Surface for CanvasRenderingContext2d {
    type Image = HtmlImageElement;
    type Error = JsValue;

    fn save(&self) {
        CanvasRenderingContext2d::save(self);
    }

    fn restore(&self) {
        CanvasRenderingContext2d::restore(self);
    }

    fn set_transform(&self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::set_transform(self, a, b, c, d, e, f)
    }

    fn translate(&self, x: f64, y: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::translate(self, x, y)
    }

    fn scale(&self, x: f64, y: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::scale(self, x, y)
    }

    fn clear_rect(&self, x: f64, y: f64, w: f64, h: f64) {
        CanvasRenderingContext2d::clear_rect(self, x, y, w, h);
    }

    fn set_fill_style(&self, style: &str) {
        self.set_fill_style_str(style);
    }

    fn set_stroke_style(&self, style: &str) {
        self.set_stroke_style_str(style);
    }

    fn set_line_width(&self, width: f64) {
        CanvasRenderingContext2d::set_line_width(self, width);
    }

    fn set_line_dash(&self, segments: &[f64]) -> Result<(), JsValue> {
        let array = js_sys::Array::new();
        for s in segments {
            array.push(&JsValue::from_f64(*s));
        }
        CanvasRenderingContext2d::set_line_dash(self, &array)
    }

    fn set_global_alpha(&self, alpha: f64) {
        CanvasRenderingContext2d::set_global_alpha(self, alpha);
    }

    fn set_font(&self, font: &str) {
        CanvasRenderingContext2d::set_font(self, font);
    }

    fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64) {
        CanvasRenderingContext2d::fill_rect(self, x, y, w, h);
    }

    fn stroke_rect(&self, x: f64, y: f64, w: f64, h: f64) {
        CanvasRenderingContext2d::stroke_rect(self, x, y, w, h);
    }

    fn begin_path(&self) {
        CanvasRenderingContext2d::begin_path(self);
    }

    fn move_to(&self, x: f64, y: f64) {
        CanvasRenderingContext2d::move_to(self, x, y);
    }

    fn line_to(&self, x: f64, y: f64) {
        CanvasRenderingContext2d::line_to(self, x, y);
    }

    fn arc(&self, x: f64, y: f64, radius: f64, start: f64, end: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::arc(self, x, y, radius, start, end)
    }

    fn fill(&self) {
        CanvasRenderingContext2d::fill(self);
    }

    fn stroke(&self) {
        CanvasRenderingContext2d::stroke(self);
    }

    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::fill_text(self, text, x, y)
    }

    fn stroke_text(&self, text: &str, x: f64, y: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::stroke_text(self, text, x, y)
    }

    fn measure_text(&self, text: &str) -> Result<f64, JsValue> {
        CanvasRenderingContext2d::measure_text(self, text).map(|m| m.width())
    }

    fn draw_image(&self, image: &HtmlImageElement, x: f64, y: f64, w: f64, h: f64) -> Result<(), JsValue> {
        self.draw_image_with_html_image_element_and_dw_and_dh(image, x, y, w, h)
    }
}

/// Everything one frame needs.
pub struct Scene<'a, I> {
    pub store: &'a BoardStore,
    pub preview: Option<GesturePreview<'a>>,
    pub images: &'a ImageCache<I>,
    /// Viewport size in CSS pixels.
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

/// URLs the scene wants loaded: the selected map background and the icon of
/// every gadget on the board.
#[must_use]
pub fn image_urls(store: &BoardStore) -> Vec<String> {
    let mut urls: Vec<String> = store.selected_map().map(|m| m.image.clone()).into_iter().collect();
    for el in store.elements() {
        if let Some(gadget) = el.gadget_id().and_then(|id| store.catalog().gadget(id))
            && !urls.contains(&gadget.image)
        {
            urls.push(gadget.image.clone());
        }
    }
    urls
}

/// Draw the full scene.
///
/// # Errors
///
/// Returns the surface's error if any drawing call fails.
pub fn draw<S: Surface>(surface: &S, scene: &Scene<'_, S::Image>) -> Result<(), S::Error> {
    let camera = scene.store.camera();

    // Layer 1: clear and set up transforms.
    surface.set_transform(scene.dpr, 0.0, 0.0, scene.dpr, 0.0, 0.0)?;
    surface.clear_rect(0.0, 0.0, scene.viewport_width, scene.viewport_height);
    surface.translate(camera.pan.x, camera.pan.y)?;
    surface.scale(camera.zoom(), camera.zoom())?;

    // Layer 2: map background and grid.
    draw_background(surface, scene)?;
    if scene.store.show_grid() {
        draw_grid(surface, camera, scene);
    }

    // Layer 3: callouts.
    if scene.store.show_callouts() {
        draw_callouts(surface, scene)?;
    }

    // Layer 4: committed elements, with moved/resized ones replaced by their preview.
    let replaced: &[Element] = match &scene.preview {
        Some(GesturePreview::Replaced(elements)) => elements,
        _ => &[],
    };
    for el in scene.store.elements() {
        let shown = replaced.iter().find(|r| r.id == el.id).unwrap_or(el);
        draw_element(surface, shown, scene)?;
    }

    // Layer 5: provisional shape or freehand path.
    match &scene.preview {
        Some(GesturePreview::Provisional(el)) => {
            surface.save();
            surface.set_global_alpha(PREVIEW_ALPHA);
            draw_element(surface, el, scene)?;
            surface.restore();
        }
        Some(GesturePreview::Path(points)) => draw_path_preview(surface, points),
        _ => {}
    }

    // Layer 6: selection.
    let selected: Vec<&Element> = scene
        .store
        .selected_elements()
        .map(|el| replaced.iter().find(|r| r.id == el.id).unwrap_or(el))
        .filter(|el| el.is_well_formed())
        .collect();
    draw_selection(surface, &selected, camera)?;

    Ok(())
}

// =============================================================
// Background
// =============================================================

fn draw_background<S: Surface>(surface: &S, scene: &Scene<'_, S::Image>) -> Result<(), S::Error> {
    let config = scene.store.config();
    let board = Rect::new(0.0, 0.0, config.board_width, config.board_height);
    let image = scene
        .store
        .selected_map()
        .and_then(|m| scene.images.get(&m.image));

    match image {
        Some(img) => {
            let (w, h) = img.dimensions();
            let fitted = fit_rect(w, h, board);
            surface.draw_image(img, fitted.x, fitted.y, fitted.width, fitted.height)?;
            surface.set_fill_style(BACKGROUND_OVERLAY);
            surface.fill_rect(fitted.x, fitted.y, fitted.width, fitted.height);
        }
        None => {
            surface.set_fill_style(BACKGROUND_FALLBACK);
            surface.fill_rect(board.x, board.y, board.width, board.height);
        }
    }
    Ok(())
}

fn draw_grid<S: Surface>(surface: &S, camera: &Camera, scene: &Scene<'_, S::Image>) {
    let step = scene.store.config().grid_size;
    if step <= 0.0 {
        return;
    }
    let visible = camera.visible_world(scene.viewport_width, scene.viewport_height);

    surface.save();
    surface.set_stroke_style(GRID_COLOR);
    surface.set_line_width(camera.screen_dist_to_world(1.0));
    surface.begin_path();

    let mut x = (visible.x / step).floor() * step;
    while x <= visible.right() {
        surface.move_to(x, visible.y);
        surface.line_to(x, visible.bottom());
        x += step;
    }
    let mut y = (visible.y / step).floor() * step;
    while y <= visible.bottom() {
        surface.move_to(visible.x, y);
        surface.line_to(visible.right(), y);
        y += step;
    }

    surface.stroke();
    surface.restore();
}

// =============================================================
// Callouts
// =============================================================

fn draw_callouts<S: Surface>(surface: &S, scene: &Scene<'_, S::Image>) -> Result<(), S::Error> {
    let Some(map) = scene.store.selected_map() else {
        return Ok(());
    };
    let hidden = scene.store.hidden_callouts();
    let editing = scene.store.editing_callout();

    surface.save();
    surface.set_font(CALLOUT_FONT);
    for callout in map.callouts.iter().filter(|c| !hidden.contains(&c.id)) {
        let position = match &scene.preview {
            Some(GesturePreview::Callout { id, position }) if *id == callout.id => *position,
            _ => callout.position,
        };
        let is_editing = editing == Some(callout.id.as_str());
        draw_callout(surface, callout, position, is_editing)?;
    }
    surface.restore();
    Ok(())
}

fn draw_callout<S: Surface>(surface: &S, callout: &Callout, at: Point, is_editing: bool) -> Result<(), S::Error> {
    if is_editing {
        let width = surface.measure_text(&callout.name)?;
        surface.set_fill_style(CALLOUT_EDIT_FILL);
        surface.set_stroke_style(SELECTION_COLOR);
        surface.set_line_width(STROKE_WIDTH);
        let (x, y) = (at.x - CALLOUT_EDIT_PAD, at.y - 16.0);
        let (w, h) = (CALLOUT_EDIT_PAD.mul_add(2.0, width), 20.0);
        surface.fill_rect(x, y, w, h);
        surface.stroke_rect(x, y, w, h);

        // Drag handle left of the label.
        surface.set_fill_style(SELECTION_COLOR);
        surface.begin_path();
        surface.arc(at.x - 20.0, at.y - 6.0, 6.0, 0.0, TAU)?;
        surface.fill();
    }

    surface.set_stroke_style(CALLOUT_OUTLINE);
    surface.set_line_width(3.0);
    surface.stroke_text(&callout.name, at.x, at.y)?;
    surface.set_fill_style(if is_editing { SELECTION_COLOR } else { CALLOUT_TEXT });
    surface.fill_text(&callout.name, at.x, at.y)?;
    Ok(())
}

// =============================================================
// Elements
// =============================================================

fn draw_element<S: Surface>(surface: &S, el: &Element, scene: &Scene<'_, S::Image>) -> Result<(), S::Error> {
    if !el.is_well_formed() {
        tracing::warn!(id = %el.id, "skipping element with unusable geometry");
        return Ok(());
    }
    surface.save();
    surface.set_fill_style(el.paint());
    surface.set_stroke_style(el.paint());
    surface.set_line_width(STROKE_WIDTH);

    match &el.kind {
        ElementKind::Player => {
            surface.begin_path();
            surface.arc(el.x, el.y, MARKER_HIT_RADIUS, 0.0, TAU)?;
            surface.fill();
            surface.set_stroke_style(MARKER_OUTLINE);
            surface.stroke();
        }
        ElementKind::Gadget { gadget_id } => draw_gadget(surface, el, gadget_id, scene)?,
        ElementKind::Circle { radius } => {
            surface.begin_path();
            surface.arc(el.x, el.y, *radius, 0.0, TAU)?;
            surface.fill();
        }
        ElementKind::Rectangle { width, height } => {
            let r = Rect::centered(el.anchor(), *width, *height);
            surface.fill_rect(r.x, r.y, r.width, r.height);
        }
        ElementKind::Line { points } => stroke_polyline(surface, points_of(points)),
        ElementKind::Text { data } => {
            surface.set_font(&format!("{}px {}", data.font_size(), data.font_family()));
            surface.fill_text(&data.text, el.x, el.y)?;
        }
    }

    surface.restore();
    Ok(())
}

fn draw_gadget<S: Surface>(
    surface: &S,
    el: &Element,
    gadget_id: &str,
    scene: &Scene<'_, S::Image>,
) -> Result<(), S::Error> {
    let Some(gadget) = scene.store.catalog().gadget(gadget_id) else {
        return Ok(());
    };
    match scene.images.get(&gadget.image) {
        Some(icon) => {
            let r = Rect::centered(el.anchor(), GADGET_ICON_SIZE, GADGET_ICON_SIZE);
            surface.draw_image(icon, r.x, r.y, r.width, r.height)
        }
        None => {
            let r = Rect::centered(el.anchor(), GADGET_FALLBACK_SIZE, GADGET_FALLBACK_SIZE);
            surface.fill_rect(r.x, r.y, r.width, r.height);
            Ok(())
        }
    }
}

fn stroke_polyline<S: Surface>(surface: &S, mut points: impl Iterator<Item = Point>) {
    let Some(first) = points.next() else {
        return;
    };
    surface.begin_path();
    surface.move_to(first.x, first.y);
    for p in points {
        surface.line_to(p.x, p.y);
    }
    surface.stroke();
}

fn draw_path_preview<S: Surface>(surface: &S, points: &[Point]) {
    if points.len() < 2 {
        return;
    }
    surface.save();
    surface.set_global_alpha(PREVIEW_ALPHA);
    surface.set_stroke_style(crate::doc::Team::Attacker.color());
    surface.set_line_width(STROKE_WIDTH);
    stroke_polyline(surface, points.iter().copied());
    surface.restore();
}

// =============================================================
// Selection UI
// =============================================================

fn draw_selection<S: Surface>(surface: &S, selected: &[&Element], camera: &Camera) -> Result<(), S::Error> {
    if selected.is_empty() {
        return Ok(());
    }
    let dash = camera.screen_dist_to_world(SELECTION_DASH_PX);

    surface.save();
    surface.set_stroke_style(SELECTION_COLOR);
    surface.set_line_width(camera.screen_dist_to_world(SELECTION_LINE_PX));
    surface.set_line_dash(&[dash, dash])?;
    for el in selected {
        draw_outline(surface, el)?;
    }

    if selected.len() > 1 {
        if let Some(group) = bounding_box(selected.iter().copied()) {
            let g = group.inflate(SELECTION_PAD * 2.0);
            surface.set_stroke_style(SELECTION_GROUP_COLOR);
            surface.stroke_rect(g.x, g.y, g.width, g.height);
        }
    }
    surface.set_line_dash(&[])?;

    if let [only] = selected {
        draw_handles(surface, only, camera);
    }
    surface.restore();
    Ok(())
}

fn draw_outline<S: Surface>(surface: &S, el: &Element) -> Result<(), S::Error> {
    match &el.kind {
        ElementKind::Circle { radius } => {
            surface.begin_path();
            surface.arc(el.x, el.y, radius + SELECTION_PAD, 0.0, TAU)?;
            surface.stroke();
        }
        ElementKind::Player | ElementKind::Gadget { .. } => {
            surface.begin_path();
            surface.arc(el.x, el.y, MARKER_HIT_RADIUS + SELECTION_PAD, 0.0, TAU)?;
            surface.stroke();
        }
        ElementKind::Rectangle { .. } | ElementKind::Line { .. } | ElementKind::Text { .. } => {
            let r = el.bounds().inflate(SELECTION_PAD);
            surface.stroke_rect(r.x, r.y, r.width, r.height);
        }
    }
    Ok(())
}

fn draw_handles<S: Surface>(surface: &S, el: &Element, camera: &Camera) {
    let half = camera.screen_dist_to_world(HANDLE_DRAW_PX);
    surface.set_fill_style(MARKER_OUTLINE);
    surface.set_stroke_style(SELECTION_COLOR);
    surface.set_line_width(camera.screen_dist_to_world(1.0));
    for (_, pos) in resize_handle_positions(el) {
        surface.fill_rect(pos.x - half, pos.y - half, half * 2.0, half * 2.0);
        surface.stroke_rect(pos.x - half, pos.y - half, half * 2.0, half * 2.0);
    }
}
