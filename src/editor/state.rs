//! Editor modes and the inputs that drive them.

use crate::geom::Point;
use crate::midi::NoteId;
use crate::timeline::MarkerId;

/// Which edge of a note is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Left,
    Right,
}

/// The value a measure control is adjusting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Left press on an insert button: copies of the hovered measure.
    InsertMeasures,
    /// Right press on an insert button: one measure with a chosen
    /// signature, applied on right release.
    InsertMeasureOptions,
    DeleteMeasure,
}

/// The editor mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Normal,
    DragView,
    DragNote,
    DragSelection,
    ResizeNote { edge: ResizeEdge },
    Selecting,
    Playing,
    /// Playback with a fixed time step and one frame capture per step.
    PlayingCapture,
    ControlSetting { which: ControlKind },
    DragTempoNode,
}

impl EditState {
    pub fn is_playing(&self) -> bool {
        matches!(self, EditState::Playing | EditState::PlayingCapture)
    }

    /// Short name for logs and status lines.
    pub fn label(&self) -> &'static str {
        match self {
            EditState::Normal => "normal",
            EditState::DragView => "drag view",
            EditState::DragNote => "drag note",
            EditState::DragSelection => "drag selection",
            EditState::ResizeNote { .. } => "resize note",
            EditState::Selecting => "selecting",
            EditState::Playing => "playing",
            EditState::PlayingCapture => "playing (capture)",
            EditState::ControlSetting { .. } => "control setting",
            EditState::DragTempoNode => "drag tempo",
        }
    }
}

/// Where on a note the pointer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEdge {
    Body,
    Left,
    Right,
}

impl NoteEdge {
    /// Classifies a pointer against a note's screen-space edges.
    ///
    /// The right edge is checked first, so on a note narrower than twice
    /// the threshold the right edge wins.
    ///
    /// # Arguments
    ///
    /// * `pointer_px` - Pointer x in screen pixels
    /// * `left_px` - Note left edge in screen pixels
    /// * `right_px` - Note right edge in screen pixels
    /// * `threshold_px` - Edge grab distance
    pub fn classify(pointer_px: f64, left_px: f64, right_px: f64, threshold_px: f64) -> Self {
        if right_px - pointer_px < threshold_px {
            NoteEdge::Right
        } else if pointer_px - left_px < threshold_px {
            NoteEdge::Left
        } else {
            NoteEdge::Body
        }
    }
}

/// The two buttons of a measure control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlButton {
    Insert,
    Delete,
}

/// What the picking layer found under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HoverTarget {
    #[default]
    None,
    Note { id: NoteId, edge: NoteEdge },
    Selection,
    /// `measure` is None for the control after the last measure.
    MeasureControl { measure: Option<usize>, button: ControlButton },
    TempoMarker(MarkerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Delete,
    Plus,
    Minus,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }
}

/// A discrete input. Pointer positions are in grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { button: PointerButton, at: Point },
    PointerUp { button: PointerButton, at: Point },
    /// One wheel notch.
    Scroll { up: bool },
    KeyDown(Key),
}
