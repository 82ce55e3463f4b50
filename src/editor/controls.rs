//! Values adjusted through measure and tempo controls.
//!
//! Deleting measures takes two activations of the same control: the first
//! arms it, the second deletes. Any insert resets every armed control.

use crate::config::{EditorConfig, SUBDIVISION_RANGE};
use crate::control::BoundedInt;
use crate::timeline::{MAX_BPM, MIN_BPM};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct EditControls {
    pub measures_to_add: BoundedInt,
    pub measures_to_delete: BoundedInt,
    /// Numerator for a measure inserted with options.
    pub insert_numerator: BoundedInt,
    /// Denominator for a measure inserted with options.
    pub insert_denominator: BoundedInt,
    /// Subdivision applied to every measure with ctrl+Plus / ctrl+Minus.
    pub smallest_units: BoundedInt,
    /// Tempo given to the next inserted marker; follows the last edited one.
    pub last_tempo: BoundedInt,
    armed_delete: Option<usize>,
    delete_preview: Option<(f64, f64)>,
}

impl EditControls {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            measures_to_add: BoundedInt::new(1, 1, 100),
            measures_to_delete: BoundedInt::new(1, 1, 100),
            insert_numerator: BoundedInt::new(4, 1, 50),
            insert_denominator: BoundedInt::new(4, 1, 32),
            smallest_units: BoundedInt::new(config.subdivision as i32, SUBDIVISION_RANGE.0 as i32, SUBDIVISION_RANGE.1 as i32),
            last_tempo: BoundedInt::new(config.new_marker_bpm, MIN_BPM, MAX_BPM),
            armed_delete: None,
            delete_preview: None,
        }
    }

    /// Arms the delete control of measure `index`.
    pub fn arm(&mut self, index: usize) {
        debug!(measure = index, "delete control armed");
        self.armed_delete = Some(index);
    }

    pub fn is_armed(&self, index: usize) -> bool {
        self.armed_delete == Some(index)
    }

    pub fn armed(&self) -> Option<usize> {
        self.armed_delete
    }

    /// Disarms every delete control and hides the preview.
    pub fn reset_deletions(&mut self) {
        self.armed_delete = None;
        self.delete_preview = None;
    }

    pub fn set_delete_preview(&mut self, span: Option<(f64, f64)>) {
        self.delete_preview = span;
    }

    /// The x-span that the pending deletion would remove.
    pub fn delete_preview(&self) -> Option<(f64, f64)> {
        self.delete_preview
    }

    /// "numerator / denominator" of the measure inserted with options.
    pub fn insert_signature_text(&self) -> String {
        format!(
            "{} / {}",
            self.insert_numerator.value(),
            self.insert_denominator.value()
        )
    }
}
