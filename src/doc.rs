//! Element model: what can be placed on the board.
//!
//! An [`Element`] carries the fields every element shares (id, anchor,
//! optional colour and team) plus a closed [`ElementKind`] with the
//! kind-specific fields. The kind is fixed at construction; updates go through
//! [`ElementPatch`], which only touches fields that make sense for the kind.
//!
//! Default attribute values are looked up once, at construction, through
//! [`ElementType`]. Code downstream of a constructor can assume every field
//! is populated.
//!
//! The serde representation is the JSON shape stored inside saved
//! strategies: `{"id", "type", "x", "y", "color"?, "team"?, ...kind fields}`.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{
    DEFAULT_CIRCLE_RADIUS, DEFAULT_FONT_SIZE, DEFAULT_RECT_SIZE, MARKER_HIT_RADIUS, TEXT_ASCENT, TEXT_BOX_HEIGHT,
    TEXT_CHAR_WIDTH_RATIO,
};
use crate::geom::{Point, Rect, points_of};

/// Unique identifier for an element within the active collection.
pub type ElementId = String;

/// Generate a fresh element or strategy id.
#[must_use]
pub fn new_id() -> ElementId {
    Uuid::new_v4().to_string()
}

/// Side an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    #[default]
    Attacker,
    Defender,
}

impl Team {
    /// Fill colour for team-coloured markers.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Attacker => "#ff0000",
            Self::Defender => "#0000ff",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attacker => "attacker",
            Self::Defender => "defender",
        }
    }
}

/// Field-less element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Player,
    Gadget,
    Circle,
    Rectangle,
    Line,
    Text,
}

impl ElementType {
    /// Radius used when an element of this type is created without one.
    #[must_use]
    pub fn default_radius(self) -> f64 {
        match self {
            Self::Player | Self::Gadget => MARKER_HIT_RADIUS,
            Self::Circle | Self::Rectangle | Self::Line | Self::Text => DEFAULT_CIRCLE_RADIUS,
        }
    }

    /// Width and height used when an element of this type is created without them.
    #[must_use]
    pub fn default_size(self) -> (f64, f64) {
        match self {
            Self::Player | Self::Gadget => (MARKER_HIT_RADIUS * 2.0, MARKER_HIT_RADIUS * 2.0),
            Self::Text => (DEFAULT_FONT_SIZE * TEXT_CHAR_WIDTH_RATIO, TEXT_BOX_HEIGHT),
            Self::Circle | Self::Rectangle | Self::Line => (DEFAULT_RECT_SIZE, DEFAULT_RECT_SIZE),
        }
    }
}

/// Text content and optional font metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

impl TextData {
    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.font_size.unwrap_or(DEFAULT_FONT_SIZE)
    }

    #[must_use]
    pub fn font_family(&self) -> &str {
        self.font_family.as_deref().unwrap_or("Arial")
    }
}

/// Kind-specific element fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// Team marker.
    Player,
    /// Gadget icon referencing the gadget catalog.
    Gadget {
        #[serde(rename = "gadgetId")]
        gadget_id: String,
    },
    /// Circle centered on the anchor.
    Circle { radius: f64 },
    /// Axis-aligned rectangle centered on the anchor.
    Rectangle { width: f64, height: f64 },
    /// Polyline as flat `[x0, y0, x1, y1, ...]` world coordinates.
    Line { points: Vec<f64> },
    /// Text whose baseline starts at the anchor.
    Text { data: TextData },
}

/// A placeable board element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    fn base(at: Point, team: Option<Team>, kind: ElementKind) -> Self {
        Self { id: new_id(), x: at.x, y: at.y, color: None, team, kind }
    }

    /// Player marker for `team` at `at`.
    #[must_use]
    pub fn player(at: Point, team: Team) -> Self {
        Self::base(at, Some(team), ElementKind::Player)
    }

    /// Gadget marker at `at`.
    #[must_use]
    pub fn gadget(at: Point, gadget_id: impl Into<String>, team: Team) -> Self {
        Self::base(at, Some(team), ElementKind::Gadget { gadget_id: gadget_id.into() })
    }

    /// Circle centered on `center`; non-positive radii take the default.
    #[must_use]
    pub fn circle(center: Point, radius: f64) -> Self {
        let radius = if radius > 0.0 { radius } else { ElementType::Circle.default_radius() };
        Self::base(center, None, ElementKind::Circle { radius })
    }

    /// Rectangle centered on `center`; non-positive sides take the default.
    #[must_use]
    pub fn rectangle(center: Point, width: f64, height: f64) -> Self {
        let (dw, dh) = ElementType::Rectangle.default_size();
        let width = if width > 0.0 { width } else { dw };
        let height = if height > 0.0 { height } else { dh };
        Self::base(center, None, ElementKind::Rectangle { width, height })
    }

    /// Polyline through `points`. Returns `None` for fewer than two points.
    #[must_use]
    pub fn line(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        if points.len() < 2 {
            return None;
        }
        let flat = points.iter().flat_map(|p| [p.x, p.y]).collect();
        Some(Self::base(first, None, ElementKind::Line { points: flat }))
    }

    /// Text element with the default font.
    #[must_use]
    pub fn text(at: Point, text: impl Into<String>) -> Self {
        let data = TextData { text: text.into(), font_size: None, font_family: None };
        Self::base(at, None, ElementKind::Text { data })
    }

    /// Builder: set the element colour.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Builder: set the element team.
    #[must_use]
    pub fn with_team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    #[must_use]
    pub fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self.kind {
            ElementKind::Player => ElementType::Player,
            ElementKind::Gadget { .. } => ElementType::Gadget,
            ElementKind::Circle { .. } => ElementType::Circle,
            ElementKind::Rectangle { .. } => ElementType::Rectangle,
            ElementKind::Line { .. } => ElementType::Line,
            ElementKind::Text { .. } => ElementType::Text,
        }
    }

    /// Gadget catalog id, for gadget elements.
    #[must_use]
    pub fn gadget_id(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Gadget { gadget_id } => Some(gadget_id),
            _ => None,
        }
    }

    /// Fill/stroke colour: explicit colour, else team colour, else red.
    #[must_use]
    pub fn paint(&self) -> &str {
        match (&self.color, self.team) {
            (Some(c), _) => c,
            (None, Some(team)) => team.color(),
            (None, None) => Team::Attacker.color(),
        }
    }

    /// Move the anchor by `(dx, dy)`; lines move every point.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        if let ElementKind::Line { points } = &mut self.kind {
            for pair in points.chunks_exact_mut(2) {
                pair[0] += dx;
                pair[1] += dy;
            }
        }
    }

    /// Apply the fields of `patch` that are valid for this element's kind.
    /// Returns `true` if anything changed.
    pub fn apply_patch(&mut self, patch: &ElementPatch) -> bool {
        let before = self.clone();

        if patch.x.is_some() || patch.y.is_some() {
            let dx = patch.x.map_or(0.0, |x| x - self.x);
            let dy = patch.y.map_or(0.0, |y| y - self.y);
            self.translate(dx, dy);
        }
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
        if let Some(team) = patch.team {
            self.team = Some(team);
        }

        match &mut self.kind {
            ElementKind::Circle { radius } => {
                if let Some(r) = patch.radius.filter(|r| *r > 0.0) {
                    *radius = r;
                }
            }
            ElementKind::Rectangle { width, height } => {
                if let Some(w) = patch.width.filter(|w| *w > 0.0) {
                    *width = w;
                }
                if let Some(h) = patch.height.filter(|h| *h > 0.0) {
                    *height = h;
                }
            }
            ElementKind::Line { points } => {
                if let Some(new_points) = patch.points.as_ref().filter(|p| p.len() >= 4 && p.len() % 2 == 0) {
                    points.clone_from(new_points);
                    self.x = new_points[0];
                    self.y = new_points[1];
                }
            }
            ElementKind::Text { data } => {
                if let Some(text) = &patch.text {
                    data.text.clone_from(text);
                }
            }
            ElementKind::Player | ElementKind::Gadget { .. } => {}
        }

        *self != before
    }

    /// Whether the geometry can be drawn: finite coordinates, positive sizes,
    /// and lines with an even number of at least four coordinates.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(self.x.is_finite() && self.y.is_finite()) {
            return false;
        }
        match &self.kind {
            ElementKind::Player | ElementKind::Gadget { .. } => true,
            ElementKind::Circle { radius } => positive(*radius),
            ElementKind::Rectangle { width, height } => positive(*width) && positive(*height),
            ElementKind::Line { points } => {
                points.len() >= 4 && points.len() % 2 == 0 && points.iter().all(|v| v.is_finite())
            }
            ElementKind::Text { data } => data.font_size.is_none_or(positive),
        }
    }

    /// Axis-aligned extent of the element in world space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            ElementKind::Player | ElementKind::Gadget { .. } => {
                let (w, h) = self.element_type().default_size();
                Rect::centered(self.anchor(), w, h)
            }
            ElementKind::Circle { radius } => Rect::centered(self.anchor(), radius * 2.0, radius * 2.0),
            ElementKind::Rectangle { width, height } => Rect::centered(self.anchor(), *width, *height),
            ElementKind::Line { points } => points_of(points)
                .map(|p| Rect::new(p.x, p.y, 0.0, 0.0))
                .reduce(|acc, r| acc.union(&r))
                .unwrap_or_else(|| Rect::new(self.x, self.y, 0.0, 0.0)),
            ElementKind::Text { data } => Rect::new(self.x, self.y - TEXT_ASCENT, text_width(data), TEXT_BOX_HEIGHT),
        }
    }
}

/// Smallest rectangle covering every element, or `None` for an empty slice.
#[must_use]
pub fn bounding_box<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Option<Rect> {
    elements.into_iter().map(Element::bounds).reduce(|acc, r| acc.union(&r))
}

/// Approximate rendered width of a text element.
#[must_use]
pub fn text_width(data: &TextData) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let chars = data.text.chars().count() as f64;
    chars * data.font_size() * TEXT_CHAR_WIDTH_RATIO
}

/// Sparse update for an element. Only present fields are applied, and only
/// when they are meaningful for the element's kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementPatch {
    /// Patch that moves the anchor to `p`.
    #[must_use]
    pub fn position(p: Point) -> Self {
        Self { x: Some(p.x), y: Some(p.y), ..Self::default() }
    }
}
