#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::geom::{Point, Rect};

/// View transform for pan/zoom on the board.
///
/// `pan` is in CSS pixels. `zoom` is a scale factor (1.0 = no zoom), always
/// kept inside `[min_zoom, max_zoom]` so it never reaches zero.
/// `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan: Point,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::with_limits(0.1, 3.0)
    }
}

impl Camera {
    /// Identity camera with the given zoom bounds.
    #[must_use]
    pub fn with_limits(min_zoom: f64, max_zoom: f64) -> Self {
        Self { pan: Point::default(), zoom: 1.0_f64.clamp(min_zoom, max_zoom), min_zoom, max_zoom }
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn zoom_limits(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    /// Set the zoom factor, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            self.zoom
        };
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan.x) / self.zoom,
            y: (screen.y - self.pan.y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan.x,
            y: world.y * self.zoom + self.pan.y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Multiply zoom by `factor` while keeping the world point under
    /// `screen_anchor` fixed on screen.
    pub fn zoom_at(&mut self, screen_anchor: Point, factor: f64) {
        let world = self.screen_to_world(screen_anchor);
        self.set_zoom(self.zoom * factor);
        self.pan = Point {
            x: screen_anchor.x - world.x * self.zoom,
            y: screen_anchor.y - world.y * self.zoom,
        };
    }

    /// World-space rectangle visible in a viewport of the given CSS size.
    #[must_use]
    pub fn visible_world(&self, viewport_w: f64, viewport_h: f64) -> Rect {
        let top_left = self.screen_to_world(Point::default());
        Rect {
            x: top_left.x,
            y: top_left.y,
            width: viewport_w / self.zoom,
            height: viewport_h / self.zoom,
        }
    }
}
