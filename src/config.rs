//! Editor configuration.
//!
//! Every tunable constant of the timeline lives here. Missing keys in a
//! config file fall back to their defaults.

use crate::midi::LOWEST_PITCH;
use crate::timeline::Measure;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Subdivisions a config may request; matches the subdivision control.
pub const SUBDIVISION_RANGE: (u32, u32) = (4, 64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Grid width of one whole note.
    pub whole_note_width: f64,
    /// Total grid height across all pitch rows.
    pub grid_height: f64,
    pub pitch_rows: u32,
    /// MIDI pitch of row 0.
    pub lowest_pitch: u8,
    /// Note height in grid units.
    pub note_height: f64,
    pub numerator: u32,
    pub denominator: u32,
    pub subdivision: u32,
    pub selection_padding: f64,
    /// Pointer distance, in screen pixels, that counts as a note edge.
    pub resize_threshold_px: f64,
    /// Elapsed playback time when playback starts, in seconds.
    pub pre_roll_seconds: f64,
    /// Fixed time step used in capture playback, in seconds.
    pub capture_step_seconds: f64,
    /// Tempo used where no marker precedes the playhead.
    pub fallback_bpm: f64,
    /// Tempo given to newly inserted markers.
    pub new_marker_bpm: i32,
    /// Ticks added to every imported event.
    pub tick_shift: i64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            whole_note_width: 8.0,
            grid_height: 100.0,
            pitch_rows: 87,
            lowest_pitch: LOWEST_PITCH,
            note_height: 1.5,
            numerator: 4,
            denominator: 4,
            subdivision: 16,
            selection_padding: 0.75,
            resize_threshold_px: 5.0,
            pre_roll_seconds: -0.2,
            capture_step_seconds: 1.0 / 60.0,
            fallback_bpm: 120.0,
            new_marker_bpm: 120,
            tick_shift: 0,
        }
    }
}

impl EditorConfig {
    /// The measure new grids are filled with.
    pub fn default_measure(&self) -> Measure {
        Measure::new(self.numerator, self.denominator, self.subdivision)
    }

    /// Height of one pitch row.
    pub fn row_height(&self) -> f64 {
        if self.pitch_rows == 0 {
            return self.grid_height;
        }
        self.grid_height / self.pitch_rows as f64
    }

    /// Parses a configuration from JSON. The subdivision is clamped into
    /// [`SUBDIVISION_RANGE`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        let (min, max) = SUBDIVISION_RANGE;
        config.subdivision = config.subdivision.clamp(min, max);
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if file reading or parsing fails
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
