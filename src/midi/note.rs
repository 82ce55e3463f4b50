//! Timeline note representation.
//!
//! A note lives in grid space: `x` is its left edge, `y` its vertical centre.
//! Pitch is not stored; it is derived from `y` by the grid's row height so a
//! vertical drag is all it takes to transpose.

use crate::control::BoundedInt;
use crate::geom::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique note IDs.
static NOTE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Lowest MIDI pitch on the grid (piano A0). Grid row 0 maps here.
pub const LOWEST_PITCH: u8 = 21;

/// Unique identifier for a note within a project.
/// Selections, hover results and history refer to notes only through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(u64);

impl NoteId {
    /// Generates a new unique note ID.
    pub fn new() -> Self {
        Self(NOTE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value (for logging).
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

/// A single note placed on the timeline grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for this note instance.
    pub id: NoteId,

    /// MIDI channel (0-15) the note was imported from.
    pub channel: u8,

    /// Instrument program active when the note started.
    pub program: u8,

    /// Note velocity, clamped to 1-127.
    pub velocity: BoundedInt,

    /// Left edge in grid space.
    pub x: f64,

    /// Vertical centre in grid space.
    pub y: f64,

    pub width: f64,
    pub height: f64,

    /// Muted notes never sound during playback.
    pub muted: bool,

    /// Member of the committed selection.
    pub selected: bool,

    /// Member of the in-progress rectangle selection (drawn brightened).
    pub highlighted: bool,

    /// Currently sounding under the playhead.
    pub sounding: bool,
}

impl Note {
    /// Creates a new note with the given geometry.
    ///
    /// # Arguments
    ///
    /// * `x` - Left edge in grid space
    /// * `y` - Vertical centre in grid space
    /// * `width` - Horizontal extent
    /// * `height` - Vertical extent
    /// * `velocity` - Note velocity (clamped to 1-127)
    ///
    /// # Returns
    ///
    /// A new Note with a unique ID on channel 0, program 0
    pub fn new(x: f64, y: f64, width: f64, height: f64, velocity: i32) -> Self {
        Self {
            id: NoteId::new(),
            channel: 0,
            program: 0,
            velocity: BoundedInt::new(velocity, 1, 127),
            x,
            y,
            width,
            height,
            muted: false,
            selected: false,
            highlighted: false,
            sounding: false,
        }
    }

    /// Sets the channel and program, returning the note (builder style).
    pub fn with_voice(mut self, channel: u8, program: u8) -> Self {
        self.channel = channel.min(15);
        self.program = program.min(127);
        self
    }

    /// Right edge in grid space.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y - self.height / 2.0
    }

    /// Bounding box used for hit-testing and selection bounds.
    pub fn bounds(&self) -> Rect {
        Rect {
            left: self.x,
            bottom: self.bottom(),
            right: self.right(),
            top: self.top(),
        }
    }

    /// Position of the note as a point (left edge, centre).
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Translates the note in grid space.
    pub fn translate(&mut self, delta: Point) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Returns the MIDI pitch for a grid with the given row height.
    ///
    /// # Arguments
    ///
    /// * `row_height` - Height of one pitch row
    ///
    /// # Returns
    ///
    /// `round(y / row_height) + 21`, clamped to the MIDI range
    pub fn pitch(&self, row_height: f64) -> u8 {
        if row_height <= 0.0 {
            return LOWEST_PITCH;
        }
        let row = (self.y / row_height).round() as i64;
        (row + LOWEST_PITCH as i64).clamp(0, 127) as u8
    }

    /// Whether the playhead at `play_x` lies inside `[x, x + width)`.
    pub fn is_active_at(&self, play_x: f64) -> bool {
        self.x <= play_x && play_x < self.right()
    }

    /// Creates a copy of this note with a new unique ID and cleared
    /// interaction flags. Used by the clipboard.
    pub fn duplicate(&self) -> Self {
        Self {
            id: NoteId::new(),
            selected: false,
            highlighted: false,
            sounding: false,
            ..self.clone()
        }
    }
}
