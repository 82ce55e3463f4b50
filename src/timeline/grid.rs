//! The measure/pitch grid.
//!
//! Horizontal position is musical time: measures laid end to end, each
//! `whole_note_width * numerator / denominator` wide. Vertical position is
//! pitch: `pitch_rows` equal rows spanning `height`. The grid owns the
//! measure list and the derived vertical lines, and keeps every note in
//! place when measures are inserted or deleted.

use super::measure::{GridLine, LineWeight, Measure};
use crate::geom::Point;
use crate::midi::{NoteId, Track, LOWEST_PITCH};
use crate::selection::SelectionEngine;
use tracing::{debug, info};

/// Outcome of [`TimelineGrid::delete_measures`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureDeletion {
    /// Left edge of the removed span.
    pub span_start: f64,
    /// Total width removed; later notes moved left by this much.
    pub shift_width: f64,
    pub measures_removed: usize,
    /// Notes that started inside the span and were deleted.
    pub removed_notes: Vec<NoteId>,
}

#[derive(Debug, Clone)]
pub struct TimelineGrid {
    measures: Vec<Measure>,
    whole_note_width: f64,
    height: f64,
    pitch_rows: u32,
    lines: Vec<GridLine>,
    cursor: Point,
}

impl TimelineGrid {
    /// Creates an empty grid.
    ///
    /// # Arguments
    ///
    /// * `whole_note_width` - Grid width of one whole note
    /// * `height` - Total grid height
    /// * `pitch_rows` - Number of pitch rows the height is divided into
    pub fn new(whole_note_width: f64, height: f64, pitch_rows: u32) -> Self {
        let mut grid = Self {
            measures: Vec::new(),
            whole_note_width,
            height,
            pitch_rows: pitch_rows.max(1),
            lines: Vec::new(),
            cursor: Point::ORIGIN,
        };
        grid.rebuild_lines();
        grid
    }

    /// Creates a grid of `count` identical measures.
    pub fn with_measures(
        whole_note_width: f64,
        height: f64,
        pitch_rows: u32,
        count: usize,
        measure: Measure,
    ) -> Self {
        let mut grid = Self::new(whole_note_width, height, pitch_rows);
        grid.measures = vec![measure; count];
        grid.rebuild_lines();
        grid
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    pub fn whole_note_width(&self) -> f64 {
        self.whole_note_width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn pitch_rows(&self) -> u32 {
        self.pitch_rows
    }

    /// Height of a single pitch row.
    pub fn row_height(&self) -> f64 {
        self.height / self.pitch_rows as f64
    }

    /// Vertical grid lines in ascending x, ending with the closing line.
    pub fn lines(&self) -> &[GridLine] {
        &self.lines
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Sum of all measure widths.
    pub fn grid_width(&self) -> f64 {
        self.measures
            .iter()
            .map(|m| m.width(self.whole_note_width))
            .sum()
    }

    /// Left edge of measure `index` (or the grid end past the last one).
    pub fn measure_origin(&self, index: usize) -> f64 {
        self.measures
            .iter()
            .take(index)
            .map(|m| m.width(self.whole_note_width))
            .sum()
    }

    /// Index of the measure containing `x`, if any.
    pub fn measure_at(&self, x: f64) -> Option<usize> {
        let mut origin = 0.0;
        for (i, m) in self.measures.iter().enumerate() {
            let end = origin + m.width(self.whole_note_width);
            if x >= origin && x < end {
                return Some(i);
            }
            origin = end;
        }
        None
    }

    /// Converts a musical position to grid coordinates.
    ///
    /// # Arguments
    ///
    /// * `pitch_index` - Pitch row (0 = lowest)
    /// * `measure` - Zero-based measure index
    /// * `whole_notes` - Offset inside the measure, in whole notes
    pub fn position_on_grid(&self, pitch_index: i32, measure: usize, whole_notes: f64) -> Point {
        Point::new(
            self.measure_origin(measure) + whole_notes * self.whole_note_width,
            pitch_index as f64 * self.row_height(),
        )
    }

    /// MIDI pitch of a row-centred y.
    pub fn pitch_of(&self, y: f64) -> u8 {
        let row = (y / self.row_height()).round() as i64;
        (row + LOWEST_PITCH as i64).clamp(0, 127) as u8
    }

    /// Regenerates the vertical lines and measure indices from the measure
    /// list.
    pub fn rebuild_lines(&mut self) {
        self.lines.clear();
        let mut origin = 0.0;
        for (i, measure) in self.measures.iter_mut().enumerate() {
            measure.index = i;
            measure.push_lines(origin, self.whole_note_width, &mut self.lines);
            origin += measure.width(self.whole_note_width);
        }
        self.lines.push(GridLine {
            x: origin,
            weight: LineWeight::End,
            measure: self.measures.len(),
        });
    }

    /// Applies `subdivision` to every measure.
    pub fn set_subdivision(&mut self, subdivision: u32) {
        for measure in &mut self.measures {
            measure.subdivision = subdivision.max(1);
        }
        self.rebuild_lines();
        debug!(subdivision, lines = self.lines.len(), "subdivision changed");
    }

    /// Inserts a measure and shifts every note at or after it.
    ///
    /// `position` past the end appends. Notes whose left edge is at or past
    /// the new measure's origin move right by its width.
    ///
    /// # Returns
    ///
    /// The origin of the inserted measure
    pub fn insert_measure(
        &mut self,
        position: usize,
        numerator: u32,
        denominator: u32,
        subdivision: u32,
        tracks: &mut [Track],
    ) -> f64 {
        let position = position.min(self.measures.len());
        let measure = Measure::new(numerator, denominator, subdivision);
        let new_x = self.measure_origin(position);
        let width = measure.width(self.whole_note_width);
        self.measures.insert(position, measure);

        let mut shifted = 0;
        for note in tracks
            .iter_mut()
            .flat_map(|t| t.notes_mut().iter_mut())
            .filter(|n| n.x >= new_x)
        {
            note.x += width;
            shifted += 1;
        }
        self.rebuild_lines();
        info!(
            position,
            signature = %format!("{}/{}", measure.numerator, measure.denominator),
            shifted,
            "measure inserted"
        );
        new_x
    }

    /// The x-span `[start, end)` that deleting `count` measures at
    /// `position` would remove.
    pub fn delete_preview_span(&self, position: usize, count: usize) -> Option<(f64, f64)> {
        if position >= self.measures.len() || count == 0 {
            return None;
        }
        let start = self.measure_origin(position);
        let width: f64 = self.measures[position..]
            .iter()
            .take(count)
            .map(|m| m.width(self.whole_note_width))
            .sum();
        Some((start, start + width))
    }

    /// Deletes `count` measures starting at `position`.
    ///
    /// Notes starting inside the removed span are deleted (after leaving
    /// the selection); notes at or past its end move left by the removed
    /// width. A cursor at or past the span start returns to the origin.
    ///
    /// # Returns
    ///
    /// What was removed, or None if `position` is out of range or `count` is 0
    pub fn delete_measures(
        &mut self,
        position: usize,
        count: usize,
        tracks: &mut [Track],
        selection: &mut SelectionEngine,
    ) -> Option<MeasureDeletion> {
        let (span_start, span_end) = self.delete_preview_span(position, count)?;
        let shift_width = span_end - span_start;
        let end = (position + count).min(self.measures.len());
        let measures_removed = self.measures.drain(position..end).count();

        let mut removed_notes = Vec::new();
        for track in tracks.iter_mut() {
            let mut doomed = Vec::new();
            for note in track.notes_mut().iter_mut().filter(|n| n.x >= span_start) {
                if note.x < span_end {
                    doomed.push(note.id);
                } else {
                    note.x -= shift_width;
                }
            }
            for id in &doomed {
                selection.forget(*id);
            }
            track.remove_notes(&doomed);
            removed_notes.extend(doomed);
        }
        selection.refresh_bounds(tracks);

        if self.cursor.x >= span_start {
            self.cursor = Point::ORIGIN;
        }
        self.rebuild_lines();
        info!(
            position,
            measures_removed,
            notes_removed = removed_notes.len(),
            "measures deleted"
        );
        Some(MeasureDeletion {
            span_start,
            shift_width,
            measures_removed,
            removed_notes,
        })
    }

    /// Snaps `y` to the nearest row line, clamped to `[0, height]`.
    pub fn closest_grid_y(&self, y: f64) -> f64 {
        if y <= 0.0 {
            0.0
        } else if y > self.height {
            self.height
        } else {
            let row = self.row_height();
            (y / row).round() * row
        }
    }

    /// Snaps the centre of a block of height `extent` whose centre sits
    /// `offset` above a row line.
    ///
    /// The block is kept fully inside the grid: below the bottom it rests
    /// on 0, above the top it rests against `height`.
    pub fn closest_grid_y_padded(&self, y: f64, offset: f64, extent: f64) -> f64 {
        let half = extent / 2.0;
        if y - half + offset <= 0.0 {
            half
        } else if y + half + offset > self.height {
            self.height - half
        } else {
            let row = self.row_height();
            (y / row).round() * row + offset
        }
    }

    /// Snaps `x` to the nearest vertical line such that an object of
    /// `width` still fits inside the grid.
    ///
    /// Between two lines the closer wins; an exact tie goes to the left
    /// line. Positions at or before 0 snap to 0, positions past the end to
    /// the last position where `width` fits.
    pub fn closest_grid_x(&self, x: f64, width: f64) -> f64 {
        let grid_width = self.grid_width();
        let candidate = if x <= 0.0 {
            0.0
        } else if x > grid_width {
            self.last_possible_x(width)
        } else {
            let i = self.lines.partition_point(|l| l.x <= x);
            match (i.checked_sub(1).map(|j| self.lines[j].x), self.lines.get(i).map(|l| l.x)) {
                (Some(left), Some(right)) => {
                    if (x - left).abs() <= (right - x).abs() {
                        left
                    } else {
                        right
                    }
                }
                (Some(left), None) => left,
                (None, Some(right)) => right,
                (None, None) => 0.0,
            }
        };
        if candidate + width <= grid_width {
            candidate
        } else {
            self.last_possible_x(width)
        }
    }

    /// Rightmost line at which an object of `width` fits inside the grid.
    fn last_possible_x(&self, width: f64) -> f64 {
        let target = self.grid_width() - width;
        if target <= 0.0 {
            return 0.0;
        }
        let mut end = self.grid_width();
        for measure in self.measures.iter().rev() {
            let origin = end - measure.width(self.whole_note_width);
            if target >= origin {
                let step = measure.step(self.whole_note_width);
                return origin + ((target - origin) / step).floor() * step;
            }
            end = origin;
        }
        0.0
    }

    /// Moves the cursor to the snapped position nearest `at`.
    pub fn set_cursor(&mut self, at: Point) -> Point {
        self.cursor = Point::new(self.closest_grid_x(at.x, 0.0), self.closest_grid_y(at.y));
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::midi::Note;

    fn grid(count: usize) -> TimelineGrid {
        TimelineGrid::with_measures(8.0, 87.0, 87, count, Measure::default())
    }

    fn track_with(xs: &[f64]) -> (Vec<Track>, Vec<NoteId>) {
        let mut track = Track::new("Test", 0);
        let ids = xs
            .iter()
            .map(|&x| track.add_note(Note::new(x, 10.0, 0.5, 1.5, 100)))
            .collect();
        (vec![track], ids)
    }

    fn xs(tracks: &[Track]) -> Vec<f64> {
        tracks[0].notes().iter().map(|n| n.x).collect()
    }

    #[test]
    fn test_position_on_grid() {
        let mut g = grid(2);
        let mut tracks = Vec::new();
        g.insert_measure(1, 3, 4, 16, &mut tracks);
        assert_eq!(g.grid_width(), 22.0);
        let p = g.position_on_grid(5, 2, 0.25);
        assert_eq!(p, Point::new(16.0, 5.0));
        assert_eq!(g.position_on_grid(0, 0, 0.0), Point::ORIGIN);
    }

    #[test]
    fn test_snapping_is_idempotent_on_grid_positions() {
        let mut g = grid(3);
        let mut tracks = Vec::new();
        g.insert_measure(1, 7, 8, 8, &mut tracks);
        for measure in 0..g.measure_count() {
            let m = g.measures()[measure];
            for j in 0..m.line_count() {
                let x = g.position_on_grid(0, measure, j as f64 / m.subdivision as f64).x;
                assert_eq!(g.closest_grid_x(x, 0.0), x, "measure {measure} line {j}");
            }
        }
    }

    #[test]
    fn test_snapping_after_mixed_inserts_and_resubdivision() {
        let mut g = grid(2);
        let mut tracks = Vec::new();
        g.insert_measure(1, 3, 4, 16, &mut tracks);
        g.insert_measure(3, 7, 8, 16, &mut tracks);
        g.insert_measure(0, 5, 16, 16, &mut tracks);
        g.set_subdivision(8);
        assert_eq!(g.grid_width(), 31.5);

        let mut checked = 0;
        for measure in 0..g.measure_count() {
            let m = g.measures()[measure];
            assert_eq!(m.subdivision, 8);
            for k in 0..m.line_count() {
                let p = g.position_on_grid(k as i32, measure, k as f64 / 8.0);
                assert_eq!(g.closest_grid_x(p.x, 0.0), p.x, "measure {measure} step {k}");
                checked += 1;
            }
        }
        assert_eq!(checked, 3 + 8 + 6 + 8 + 7);

        let end = g.position_on_grid(0, g.measure_count(), 0.0);
        assert_eq!(end.x, g.grid_width());
        assert_eq!(g.closest_grid_x(end.x, 0.0), end.x);
    }

    #[test]
    fn test_snap_nearest_and_left_tie() {
        let g = grid(1);
        // Lines every 0.5.
        assert_eq!(g.closest_grid_x(1.2, 0.0), 1.0);
        assert_eq!(g.closest_grid_x(1.3, 0.0), 1.5);
        assert_eq!(g.closest_grid_x(1.25, 0.0), 1.0);
        assert_eq!(g.closest_grid_x(-3.0, 0.0), 0.0);
        assert_eq!(g.closest_grid_x(8.0, 0.0), 8.0);
    }

    #[test]
    fn test_snap_keeps_width_inside_grid() {
        let g = grid(2);
        assert_eq!(g.closest_grid_x(15.9, 1.0), 15.0);
        assert_eq!(g.closest_grid_x(40.0, 2.2), 13.5);
        assert_eq!(g.closest_grid_x(3.0, 100.0), 0.0);
    }

    #[test]
    fn test_empty_grid_snaps_to_zero() {
        let g = TimelineGrid::new(8.0, 87.0, 87);
        assert_eq!(g.grid_width(), 0.0);
        assert_eq!(g.closest_grid_x(5.0, 0.0), 0.0);
        assert_eq!(g.lines().len(), 1);
    }

    #[test]
    fn test_closest_grid_y() {
        let g = grid(1);
        assert_eq!(g.closest_grid_y(-2.0), 0.0);
        assert_eq!(g.closest_grid_y(100.0), 87.0);
        assert_eq!(g.closest_grid_y(4.4), 4.0);
        assert_eq!(g.closest_grid_y(4.6), 5.0);
    }

    #[test]
    fn test_closest_grid_y_padded() {
        let g = grid(1);
        assert_eq!(g.closest_grid_y_padded(10.2, 0.5, 3.0), 10.5);
        assert_eq!(g.closest_grid_y_padded(0.5, 0.0, 3.0), 1.5);
        assert_eq!(g.closest_grid_y_padded(86.0, 0.0, 3.0), 85.5);
    }

    #[test]
    fn test_insert_shifts_notes_at_or_after() {
        let mut g = grid(2);
        let (mut tracks, _) = track_with(&[0.0, 7.5, 8.0, 12.0]);
        let origin = g.insert_measure(1, 2, 4, 16, &mut tracks);
        assert_eq!(origin, 8.0);
        assert_eq!(xs(&tracks), vec![0.0, 7.5, 12.0, 16.0]);
        assert_eq!(g.measure_count(), 3);
        assert_eq!(g.measures()[2].index, 2);
    }

    #[test]
    fn test_insert_then_delete_restores_positions() {
        let mut g = grid(3);
        let mut a = Track::new("A", 0);
        let mut b = Track::new("B", 1);
        for x in [0.0, 3.5, 8.0, 9.0] {
            a.add_note(Note::new(x, 5.0, 0.5, 1.5, 100));
        }
        for x in [16.0, 23.5] {
            b.add_note(Note::new(x, 7.0, 0.5, 1.5, 100));
        }
        let mut tracks = vec![a, b];
        let before: Vec<Vec<f64>> = tracks
            .iter()
            .map(|t| t.notes().iter().map(|n| n.x).collect())
            .collect();

        let mut selection = SelectionEngine::new(0.75);
        g.insert_measure(1, 5, 8, 16, &mut tracks);
        let deletion = g.delete_measures(1, 1, &mut tracks, &mut selection).unwrap();
        assert!(deletion.removed_notes.is_empty());
        assert_eq!(deletion.shift_width, 5.0);

        let after: Vec<Vec<f64>> = tracks
            .iter()
            .map(|t| t.notes().iter().map(|n| n.x).collect())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_delete_cascades_to_selection() {
        let mut g = grid(3);
        let (mut tracks, ids) = track_with(&[1.0, 9.0, 17.0]);
        let mut selection = SelectionEngine::new(0.75);
        selection.begin_rectangle(Point::new(0.0, 0.0));
        selection.resize(Point::new(10.0, 20.0));
        selection.update_candidates(&mut tracks);
        selection.commit(false, &mut tracks);
        assert_eq!(selection.len(), 2);

        let deletion = g.delete_measures(1, 1, &mut tracks, &mut selection).unwrap();
        assert_eq!(deletion.removed_notes, vec![ids[1]]);
        assert!(!selection.is_selected(ids[1]));
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.bounds().unwrap().right, 1.5 + 0.75);
        assert_eq!(xs(&tracks), vec![1.0, 9.0]);

        g.delete_measures(0, 1, &mut tracks, &mut selection);
        assert!(selection.bounds().is_none());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_delete_resets_cursor_at_or_after_span() {
        let mut g = grid(4);
        let mut selection = SelectionEngine::new(0.0);
        g.set_cursor(Point::new(20.1, 30.2));
        assert_eq!(g.cursor(), Point::new(20.0, 30.0));
        g.delete_measures(3, 1, &mut [], &mut selection);
        assert_eq!(g.cursor(), Point::new(20.0, 30.0));
        g.delete_measures(1, 1, &mut [], &mut selection);
        assert_eq!(g.cursor(), Point::ORIGIN);
    }

    #[test]
    fn test_delete_preview_and_out_of_range() {
        let mut g = grid(2);
        assert_eq!(g.delete_preview_span(1, 5), Some((8.0, 16.0)));
        assert_eq!(g.delete_preview_span(2, 1), None);
        let mut selection = SelectionEngine::new(0.0);
        assert!(g.delete_measures(5, 1, &mut [], &mut selection).is_none());
        let deletion = g.delete_measures(1, 5, &mut [], &mut selection).unwrap();
        assert_eq!(deletion.measures_removed, 1);
        assert_eq!(g.measure_count(), 1);
    }

    #[test]
    fn test_set_subdivision_rebuilds_lines() {
        let mut g = grid(2);
        assert_eq!(g.lines().len(), 33);
        g.set_subdivision(4);
        assert_eq!(g.lines().len(), 9);
        assert_eq!(g.closest_grid_x(1.2, 0.0), 2.0);
    }

    #[test]
    fn test_pitch_rows() {
        let g = grid(1);
        assert_eq!(g.row_height(), 1.0);
        assert_eq!(g.pitch_of(39.0), 60);
        assert_eq!(g.measure_at(7.9), Some(0));
        assert_eq!(g.measure_at(8.5), None);
    }
}
