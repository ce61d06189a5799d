//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the gesture tracked between pointer-down and
//! pointer-up. Gestures never touch the element collection while they run:
//! each one carries its own preview, which the renderer draws in place of the
//! committed elements, and the engine commits the result once on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::doc::{Element, ElementId};
use crate::geom::Point;
use crate::hit::ResizeAnchor;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Select, move and resize elements (default).
    #[default]
    Select,
    /// Drag the view.
    Pan,
    /// Place a player marker for the selected team.
    Player,
    /// Place the selected gadget.
    Gadget,
    /// Place a text label.
    Text,
    /// Drag out a circle from its centre.
    Circle,
    /// Drag out a rectangle from its centre.
    Rectangle,
    /// Draw a freehand line.
    Line,
}

impl Tool {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Pan => "pan",
            Self::Player => "player",
            Self::Gadget => "gadget",
            Self::Text => "text",
            Self::Circle => "circle",
            Self::Rectangle => "rectangle",
            Self::Line => "line",
        }
    }

    /// Whether a press with this tool creates an element.
    #[must_use]
    pub fn creates(self) -> bool {
        !matches!(self, Self::Select | Self::Pan)
    }

    /// Cursor shown while idle over empty board with this tool.
    #[must_use]
    pub fn idle_cursor(self) -> &'static str {
        if self.creates() {
            "crosshair"
        } else if self == Self::Pan {
            "grab"
        } else {
            "default"
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS. Toggles selection membership
    /// on click and prefixes undo/redo shortcuts.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` value.
    #[must_use]
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => Self::Middle,
            2 => Self::Secondary,
            _ => Self::Primary,
        }
    }
}

/// A keyboard key as reported by the browser (`KeyboardEvent.key`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive scrolls down (zooms out).
    pub dy: f64,
}

/// Gesture in progress between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the view.
    Panning {
        /// Screen position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving every selected element by the same delta.
    DraggingElement {
        /// Elements being moved, in selection order.
        ids: Vec<ElementId>,
        /// Pointer minus anchor of the pressed element, in world space.
        grab_offset: Point,
        /// Anchor of the pressed element when the drag started.
        origin: Point,
        /// Current displacement from the start positions.
        delta: Point,
    },
    /// Sizing a shape that is not yet part of the collection.
    ResizingNew {
        /// World point where the press happened; the shape's centre.
        anchor: Point,
        provisional: Element,
    },
    /// Dragging a handle of the selected shape.
    ResizingSelected {
        handle: ResizeAnchor,
        /// The shape as it was when the press happened.
        original: Element,
        /// The shape with the current size applied.
        preview: Element,
    },
    /// Sampling a freehand path.
    DrawingFreehandLine { points: Vec<Point> },
    /// Moving a callout label in callout management mode.
    DraggingCallout {
        map_id: String,
        callout_id: String,
        grab_offset: Point,
        position: Point,
    },
}

/// What the renderer should draw for the gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum GesturePreview<'a> {
    /// Drawn instead of the committed elements with the same ids.
    Replaced(Vec<Element>),
    /// A shape not yet in the collection.
    Provisional(&'a Element),
    /// A freehand path not yet committed.
    Path(&'a [Point]),
    /// A callout drawn at a new position.
    Callout { id: &'a str, position: Point },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Preview of the gesture in progress. `elements` is the committed
    /// collection the gesture started from.
    #[must_use]
    pub fn preview(&self, elements: &[Element]) -> Option<GesturePreview<'_>> {
        match self {
            Self::Idle | Self::Panning { .. } => None,
            Self::DraggingElement { ids, delta, .. } => {
                let moved = elements
                    .iter()
                    .filter(|e| ids.contains(&e.id))
                    .map(|e| {
                        let mut moved = e.clone();
                        moved.translate(delta.x, delta.y);
                        moved
                    })
                    .collect();
                Some(GesturePreview::Replaced(moved))
            }
            Self::ResizingNew { provisional, .. } => Some(GesturePreview::Provisional(provisional)),
            Self::ResizingSelected { preview, .. } => Some(GesturePreview::Replaced(vec![preview.clone()])),
            Self::DrawingFreehandLine { points } => Some(GesturePreview::Path(points)),
            Self::DraggingCallout { callout_id, position, .. } => {
                Some(GesturePreview::Callout { id: callout_id, position: *position })
            }
        }
    }

    /// Cursor shown while this gesture runs, if it overrides the hover cursor.
    #[must_use]
    pub fn cursor(&self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Panning { .. } => Some("grabbing"),
            Self::DraggingElement { .. } | Self::DraggingCallout { .. } => Some("move"),
            Self::ResizingSelected { handle, .. } => Some(handle.cursor()),
            Self::ResizingNew { .. } | Self::DrawingFreehandLine { .. } => Some("crosshair"),
        }
    }
}
