//! Hit-testing: which element, resize handle or callout lies under a world point.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::HashSet;

use crate::catalog::Callout;
use crate::consts::{CALLOUT_HIT_RADIUS, HANDLE_HIT_RADIUS, LINE_HIT_THRESHOLD, MARKER_HIT_RADIUS};
use crate::doc::{Element, ElementKind};
use crate::geom::{Point, distance, point_segment_distance, points_of};

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    /// CSS cursor shown while hovering or dragging this handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::N | Self::S => "ns-resize",
            Self::E | Self::W => "ew-resize",
            Self::Ne | Self::Sw => "nesw-resize",
            Self::Nw | Self::Se => "nwse-resize",
        }
    }

    /// Whether dragging this handle changes the width.
    #[must_use]
    pub fn affects_width(self) -> bool {
        !matches!(self, Self::N | Self::S)
    }

    /// Whether dragging this handle changes the height.
    #[must_use]
    pub fn affects_height(self) -> bool {
        !matches!(self, Self::E | Self::W)
    }
}

/// Whether `p` lands on `el`.
#[must_use]
pub fn element_contains(el: &Element, p: Point) -> bool {
    match &el.kind {
        ElementKind::Player | ElementKind::Gadget { .. } => distance(p, el.anchor()) <= MARKER_HIT_RADIUS,
        ElementKind::Circle { radius } => distance(p, el.anchor()) <= *radius,
        ElementKind::Rectangle { width, height } => {
            (p.x - el.x).abs() <= width / 2.0 && (p.y - el.y).abs() <= height / 2.0
        }
        ElementKind::Line { points } => line_distance(p, points) <= LINE_HIT_THRESHOLD,
        ElementKind::Text { .. } => el.bounds().contains(p),
    }
}

fn line_distance(p: Point, flat: &[f64]) -> f64 {
    let pts: Vec<Point> = points_of(flat).collect();
    match pts.as_slice() {
        [] => f64::INFINITY,
        [only] => distance(p, *only),
        _ => pts
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Topmost element under `p`. Later elements draw on top, so the search runs
/// in reverse insertion order and the first match wins.
#[must_use]
pub fn find_element_at(p: Point, elements: &[Element]) -> Option<&Element> {
    elements.iter().rev().find(|el| element_contains(el, p))
}

/// Resize handles of `el` with their world positions. Only circles and
/// rectangles have handles.
#[must_use]
pub fn resize_handle_positions(el: &Element) -> Vec<(ResizeAnchor, Point)> {
    let (cx, cy) = (el.x, el.y);
    match el.kind {
        ElementKind::Circle { radius } => vec![
            (ResizeAnchor::N, Point::new(cx, cy - radius)),
            (ResizeAnchor::E, Point::new(cx + radius, cy)),
            (ResizeAnchor::S, Point::new(cx, cy + radius)),
            (ResizeAnchor::W, Point::new(cx - radius, cy)),
        ],
        ElementKind::Rectangle { width, height } => {
            let (hw, hh) = (width / 2.0, height / 2.0);
            vec![
                (ResizeAnchor::N, Point::new(cx, cy - hh)),
                (ResizeAnchor::Ne, Point::new(cx + hw, cy - hh)),
                (ResizeAnchor::E, Point::new(cx + hw, cy)),
                (ResizeAnchor::Se, Point::new(cx + hw, cy + hh)),
                (ResizeAnchor::S, Point::new(cx, cy + hh)),
                (ResizeAnchor::Sw, Point::new(cx - hw, cy + hh)),
                (ResizeAnchor::W, Point::new(cx - hw, cy)),
                (ResizeAnchor::Nw, Point::new(cx - hw, cy - hh)),
            ]
        }
        _ => Vec::new(),
    }
}

/// Handle of `el` within the handle radius of `p`, if any.
#[must_use]
pub fn find_resize_handle(p: Point, el: &Element) -> Option<ResizeAnchor> {
    resize_handle_positions(el)
        .into_iter()
        .find(|(_, pos)| distance(p, *pos) <= HANDLE_HIT_RADIUS)
        .map(|(anchor, _)| anchor)
}

/// Nearest visible callout within the callout radius of `p`.
#[must_use]
pub fn find_callout_at<'a>(p: Point, callouts: &'a [Callout], hidden: &HashSet<String>) -> Option<&'a Callout> {
    callouts
        .iter()
        .filter(|c| !hidden.contains(&c.id))
        .map(|c| (c, distance(p, c.position)))
        .filter(|(_, d)| *d <= CALLOUT_HIT_RADIUS)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(c, _)| c)
}
