//! Measures and the vertical grid lines derived from them.

use serde::{Deserialize, Serialize};

/// One bar of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// Beats per measure.
    pub numerator: u32,
    /// Beat unit (4 = quarter note).
    pub denominator: u32,
    /// Smallest rhythmic unit used for snapping (16 = sixteenth notes).
    pub subdivision: u32,
    /// Position in the measure list. Recomputed after structural edits.
    pub index: usize,
}

impl Measure {
    /// Creates a measure. Zero values are raised to 1.
    pub fn new(numerator: u32, denominator: u32, subdivision: u32) -> Self {
        Self {
            numerator: numerator.max(1),
            denominator: denominator.max(1),
            subdivision: subdivision.max(1),
            index: 0,
        }
    }

    /// Length of the measure in whole notes.
    pub fn whole_notes(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn width(&self, whole_note_width: f64) -> f64 {
        whole_note_width * self.whole_notes()
    }

    /// Distance between two subdivision lines.
    pub fn step(&self, whole_note_width: f64) -> f64 {
        whole_note_width / self.subdivision as f64
    }

    /// Number of subdivision lines drawn inside this measure.
    pub fn line_count(&self) -> u32 {
        self.numerator
            .saturating_mul(self.subdivision)
            .div_ceil(self.denominator)
    }

    /// Visual weight of line `j` out of `count`.
    fn weight_of(&self, j: u32, count: u32) -> LineWeight {
        let half = count / 2;
        let per_beat = count / self.numerator;
        if j == 0 {
            LineWeight::MeasureStart
        } else if half % 2 == 0 && j == half && self.numerator % 2 == 0 {
            LineWeight::HalfMeasure
        } else if per_beat == 0 || j % per_beat == 0 {
            LineWeight::Beat
        } else {
            LineWeight::Subdivision
        }
    }

    /// Appends this measure's lines, starting at `origin`, to `out`.
    pub(crate) fn push_lines(&self, origin: f64, whole_note_width: f64, out: &mut Vec<GridLine>) {
        let count = self.line_count();
        if count < 2 {
            out.push(GridLine {
                x: origin,
                weight: LineWeight::MeasureStart,
                measure: self.index,
            });
            return;
        }
        let step = self.step(whole_note_width);
        out.extend((0..count).map(|j| GridLine {
            x: origin + j as f64 * step,
            weight: self.weight_of(j, count),
            measure: self.index,
        }));
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self::new(4, 4, 16)
    }
}

/// How prominently a grid line is drawn. Every line is a snap target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineWeight {
    MeasureStart,
    HalfMeasure,
    Beat,
    Subdivision,
    /// Closing line after the last measure.
    End,
}

/// A vertical grid line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub x: f64,
    pub weight: LineWeight,
    /// Owning measure; equals the measure count for the end line.
    pub measure: usize,
}
