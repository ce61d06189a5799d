//! Shared numeric constants for the board core.

// ── Hit-testing ─────────────────────────────────────────────────

/// Click radius for player and gadget markers, in world units.
pub const MARKER_HIT_RADIUS: f64 = 15.0;

/// Maximum distance from a line segment that still counts as a hit, in world units.
pub const LINE_HIT_THRESHOLD: f64 = 10.0;

/// Hit radius around a resize handle, in world units.
pub const HANDLE_HIT_RADIUS: f64 = 6.0;

/// Hit radius around a callout label anchor, in world units.
pub const CALLOUT_HIT_RADIUS: f64 = 30.0;

// ── Element defaults ────────────────────────────────────────────

/// Radius of a circle placed without dragging.
pub const DEFAULT_CIRCLE_RADIUS: f64 = 10.0;

/// Side of a rectangle placed without dragging.
pub const DEFAULT_RECT_SIZE: f64 = 20.0;

/// Smallest radius a circle can be sized to.
pub const MIN_CIRCLE_RADIUS: f64 = 10.0;

/// Smallest width or height a rectangle can be sized to.
pub const MIN_RECT_SIZE: f64 = 20.0;

/// Font size for text elements without explicit font metadata.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Content of a text element placed without a prompt.
pub const DEFAULT_TEXT: &str = "Text";

/// Average glyph advance as a fraction of the font size, used to approximate text width.
pub const TEXT_CHAR_WIDTH_RATIO: f64 = 0.6;

/// Height of the box that text elements occupy.
pub const TEXT_BOX_HEIGHT: f64 = 20.0;

/// Distance from the text baseline to the top of its box.
pub const TEXT_ASCENT: f64 = 16.0;

// ── Rendering ───────────────────────────────────────────────────

/// Side of a gadget icon, in world units.
pub const GADGET_ICON_SIZE: f64 = 24.0;

/// Half-size of a drawn resize handle, in screen pixels.
pub const HANDLE_DRAW_PX: f64 = 4.0;

/// Selection dash segment length, in screen pixels.
pub const SELECTION_DASH_PX: f64 = 5.0;

/// Gap between an element and its selection outline, in world units.
pub const SELECTION_PAD: f64 = 5.0;
