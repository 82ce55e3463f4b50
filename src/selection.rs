//! Rectangle selection over timeline notes.
//!
//! Two sets are kept: `selecting` holds the notes under the rectangle being
//! dragged, `selected` holds the committed selection. The committed set has a
//! padded bounding box that is recomputed whenever membership or positions
//! change, and is absent when nothing is selected.

use crate::geom::{Point, Rect};
use crate::midi::{note_by_id, note_by_id_mut, Note, NoteId, Track, TrackId};
use std::collections::HashSet;
use tracing::debug;

/// A note held on the clipboard, positioned relative to the selection.
#[derive(Debug, Clone)]
struct ClipboardNote {
    track: TrackId,
    note: Note,
    /// Note position minus the unpadded selection origin.
    offset: Point,
}

#[derive(Debug, Clone)]
pub struct SelectionEngine {
    padding: f64,
    anchor: Point,
    corner: Point,
    active: bool,
    selecting: HashSet<NoteId>,
    selected: HashSet<NoteId>,
    bounds: Option<Rect>,
    clipboard: Vec<ClipboardNote>,
}

impl SelectionEngine {
    /// Creates an empty selection whose bounds are padded by `padding` on
    /// every side.
    pub fn new(padding: f64) -> Self {
        Self {
            padding,
            anchor: Point::ORIGIN,
            corner: Point::ORIGIN,
            active: false,
            selecting: HashSet::new(),
            selected: HashSet::new(),
            bounds: None,
            clipboard: Vec::new(),
        }
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Opens a candidate rectangle at `origin`.
    pub fn begin_rectangle(&mut self, origin: Point) {
        self.anchor = origin;
        self.corner = origin;
        self.active = true;
    }

    /// Moves the free corner of the candidate rectangle.
    pub fn resize(&mut self, current: Point) {
        self.corner = current;
    }

    /// The candidate rectangle, if one is open.
    pub fn candidate_rect(&self) -> Option<Rect> {
        self.active
            .then(|| Rect::from_corners(self.anchor, self.corner))
    }

    /// Recomputes the `selecting` set against the candidate rectangle.
    ///
    /// A note qualifies when its bounds overlap the rectangle on both axes,
    /// edges included. Notes leaving the set lose their highlight.
    ///
    /// # Returns
    ///
    /// Number of notes currently under the rectangle
    pub fn update_candidates(&mut self, tracks: &mut [Track]) -> usize {
        let Some(rect) = self.candidate_rect() else {
            return 0;
        };
        for note in tracks.iter_mut().flat_map(|t| t.notes_mut().iter_mut()) {
            if note.bounds().overlaps(&rect) {
                self.selecting.insert(note.id);
                note.highlighted = true;
            } else if self.selecting.remove(&note.id) {
                note.highlighted = false;
            }
        }
        self.selecting.len()
    }

    /// Closes the candidate rectangle and moves its notes into the
    /// committed selection.
    ///
    /// # Arguments
    ///
    /// * `additive` - Keep the existing selection instead of replacing it
    /// * `tracks` - All tracks, for flag updates and bounds
    pub fn commit(&mut self, additive: bool, tracks: &mut [Track]) {
        self.active = false;
        if !additive {
            self.deselect_all(tracks);
        }
        for id in self.selecting.drain() {
            if let Some(note) = note_by_id_mut(tracks, id) {
                note.highlighted = false;
                note.selected = true;
                self.selected.insert(id);
            }
        }
        self.refresh_bounds(tracks);
        debug!(selected = self.selected.len(), additive, "selection committed");
    }

    /// Clears both sets and every note flag they set.
    pub fn clear(&mut self, tracks: &mut [Track]) {
        self.active = false;
        for id in self.selecting.drain() {
            if let Some(note) = note_by_id_mut(tracks, id) {
                note.highlighted = false;
            }
        }
        self.deselect_all(tracks);
        self.bounds = None;
    }

    fn deselect_all(&mut self, tracks: &mut [Track]) {
        for id in self.selected.drain() {
            if let Some(note) = note_by_id_mut(tracks, id) {
                note.selected = false;
            }
        }
    }

    /// Recomputes the padded bounding box over the committed notes. Members
    /// that no longer exist are dropped.
    pub fn refresh_bounds(&mut self, tracks: &[Track]) {
        self.selected.retain(|id| note_by_id(tracks, *id).is_some());
        self.bounds = self
            .selected
            .iter()
            .filter_map(|id| note_by_id(tracks, *id))
            .map(|n| n.bounds())
            .reduce(|acc, b| acc.union(&b))
            .map(|r| r.expand(self.padding));
    }

    /// Padded bounding box of the committed selection.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn selected(&self) -> &HashSet<NoteId> {
        &self.selected
    }

    pub fn selecting(&self) -> &HashSet<NoteId> {
        &self.selecting
    }

    pub fn is_selected(&self, id: NoteId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Moves the selection so its padded bounds start at `origin`.
    ///
    /// # Returns
    ///
    /// true if anything moved
    pub fn move_to(&mut self, origin: Point, tracks: &mut [Track]) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        self.translate(origin.minus(bounds.origin()), tracks)
    }

    /// Translates every committed note and the bounds by `delta`.
    pub fn translate(&mut self, delta: Point, tracks: &mut [Track]) -> bool {
        if delta.is_zero() || self.selected.is_empty() {
            return false;
        }
        for track in tracks.iter_mut() {
            let mut moved = false;
            for note in track.notes_mut().iter_mut().filter(|n| self.selected.contains(&n.id)) {
                note.translate(delta);
                moved = true;
            }
            if moved {
                track.sort_notes();
            }
        }
        self.bounds = self.bounds.map(|b| b.translate(delta));
        true
    }

    /// Removes every committed note from its track and clears both sets.
    ///
    /// # Returns
    ///
    /// Number of notes removed
    pub fn delete_committed(&mut self, tracks: &mut [Track]) -> usize {
        let ids: Vec<NoteId> = self.selected.drain().collect();
        let removed = tracks.iter_mut().map(|t| t.remove_notes(&ids)).sum();
        for id in self.selecting.drain() {
            if let Some(note) = note_by_id_mut(tracks, id) {
                note.highlighted = false;
            }
        }
        self.bounds = None;
        debug!(removed, "deleted selected notes");
        removed
    }

    /// Drops a note from both sets without touching the note itself.
    /// Used before the note is removed by someone else.
    pub fn forget(&mut self, id: NoteId) -> bool {
        let in_selected = self.selected.remove(&id);
        let in_selecting = self.selecting.remove(&id);
        in_selected || in_selecting
    }

    /// Replaces the committed selection with `ids`, skipping missing notes.
    pub fn restore(&mut self, ids: &HashSet<NoteId>, tracks: &mut [Track]) {
        self.clear(tracks);
        for id in ids {
            if let Some(note) = note_by_id_mut(tracks, *id) {
                note.selected = true;
                self.selected.insert(*id);
            }
        }
        self.refresh_bounds(tracks);
    }

    /// Copies the committed notes to the clipboard.
    ///
    /// # Returns
    ///
    /// Number of notes copied
    pub fn copy(&mut self, tracks: &[Track]) -> usize {
        self.clipboard.clear();
        let Some(bounds) = self.bounds else {
            return 0;
        };
        let inner = bounds.expand(-self.padding).origin();
        for track in tracks {
            for note in track.notes().iter().filter(|n| self.selected.contains(&n.id)) {
                self.clipboard.push(ClipboardNote {
                    track: track.id,
                    note: note.duplicate(),
                    offset: note.position().minus(inner),
                });
            }
        }
        debug!(copied = self.clipboard.len(), "copied selection");
        self.clipboard.len()
    }

    /// Copies the committed notes, then deletes them.
    pub fn cut(&mut self, tracks: &mut [Track]) -> usize {
        let copied = self.copy(tracks);
        self.delete_committed(tracks);
        copied
    }

    pub fn clipboard_len(&self) -> usize {
        self.clipboard.len()
    }

    /// Pastes the clipboard with its unpadded origin at `target`.
    ///
    /// Each note returns to the track it was copied from, or to the first
    /// track if that one is gone. The pasted notes become the selection.
    ///
    /// # Returns
    ///
    /// IDs of the new notes
    pub fn paste(&mut self, target: Point, tracks: &mut [Track]) -> Vec<NoteId> {
        if self.clipboard.is_empty() || tracks.is_empty() {
            return Vec::new();
        }
        let mut pasted = Vec::with_capacity(self.clipboard.len());
        for entry in &self.clipboard {
            let mut note = entry.note.duplicate();
            let at = target.plus(entry.offset);
            note.x = at.x;
            note.y = at.y;
            let index = tracks.iter().position(|t| t.id == entry.track).unwrap_or(0);
            pasted.push(tracks[index].add_note(note));
        }
        let ids: HashSet<NoteId> = pasted.iter().copied().collect();
        self.restore(&ids, tracks);
        debug!(pasted = pasted.len(), "pasted clipboard");
        pasted
    }
}
