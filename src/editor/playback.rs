//! Playhead advancement and phantom notes.
//!
//! The playhead moves at `bpm * elapsed * whole_note_width / 240` from an
//! anchor. Whenever the tempo under it changes the anchor moves to the
//! current position and elapsed time restarts, so the position never jumps.

use crate::midi::NoteId;
use crate::timeline::TempoMap;

/// A whole note lasts `240 / bpm` seconds.
const SECONDS_PER_WHOLE_AT_ONE_BPM: f64 = 240.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Playhead {
    x: f64,
    anchor_x: f64,
    elapsed: f64,
    bpm: f64,
    whole_note_width: f64,
}

impl Playhead {
    pub fn new(whole_note_width: f64, bpm: f64) -> Self {
        Self {
            x: 0.0,
            anchor_x: 0.0,
            elapsed: 0.0,
            bpm,
            whole_note_width,
        }
    }

    /// Restarts playback at `x`.
    ///
    /// # Arguments
    ///
    /// * `x` - Start position
    /// * `bpm` - Tempo in effect at `x`
    /// * `pre_roll` - Initial elapsed time in seconds, usually negative
    pub fn start(&mut self, x: f64, bpm: f64, pre_roll: f64) {
        self.x = x;
        self.anchor_x = x;
        self.elapsed = pre_roll;
        self.bpm = bpm;
    }

    /// Advances by `dt` seconds under the tempo map.
    ///
    /// # Returns
    ///
    /// The new position
    pub fn advance(&mut self, dt: f64, tempo: &TempoMap) -> f64 {
        let bpm = tempo.effective_tempo(self.x, self.bpm);
        if bpm != self.bpm {
            self.bpm = bpm;
            self.elapsed = 0.0;
            self.anchor_x = self.x;
        }
        self.elapsed += dt;
        self.x = self.anchor_x + self.bpm * self.elapsed * self.whole_note_width / SECONDS_PER_WHOLE_AT_ONE_BPM;
        self.x
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn anchor_x(&self) -> f64 {
        self.anchor_x
    }
}

/// A fading echo of a note that started sounding.
///
/// Not part of the timeline; it only lives while the playhead crosses the
/// note it was spawned from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhantomNote {
    pub source: NoteId,
    pub start_x: f64,
    pub width: f64,
    pub y: f64,
}

impl PhantomNote {
    /// Whether the playhead has passed the end of the note.
    pub fn is_expired(&self, play_x: f64) -> bool {
        play_x > self.start_x + self.width
    }

    /// How far the playhead is through the note, 0 to 1.
    pub fn progress(&self, play_x: f64) -> f64 {
        if self.width <= 0.0 {
            return 1.0;
        }
        ((play_x - self.start_x) / self.width).clamp(0.0, 1.0)
    }
}
