//! Timeline track representation.
//!
//! A track owns its notes, kept sorted by left edge, together with the
//! display colour and note style the renderer uses. Tracks can be muted and
//! soloed; only audible tracks forward note transitions to the sound engine.

use super::note::{Note, NoteId};
use crate::audio::SoundEngine;
use crate::control::BoundedFloat;
use crate::geom::Point;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Global counter for generating unique track IDs.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a track within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(u64);

impl TrackId {
    /// Generates a new unique track ID.
    pub fn new() -> Self {
        Self(TRACK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape tag for a track's notes. Purely visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteStyle {
    Default,
    Diamond,
    RoundEnd,
}

impl NoteStyle {
    const CYCLE: [NoteStyle; 3] = [NoteStyle::Default, NoteStyle::Diamond, NoteStyle::RoundEnd];

    /// Style for the `index`-th imported track.
    pub fn cycled(index: usize) -> Self {
        Self::CYCLE[index % Self::CYCLE.len()]
    }
}

/// Track colour in hue/saturation/brightness form.
///
/// Hue wraps around the colour wheel; saturation and brightness clamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackColor {
    hue: f32,
    pub saturation: BoundedFloat,
    pub brightness: BoundedFloat,
}

impl TrackColor {
    pub fn new(hue: f32, saturation: f32, brightness: f32) -> Self {
        Self {
            hue: hue.rem_euclid(1.0),
            saturation: BoundedFloat::new(saturation, 0.0, 1.0),
            brightness: BoundedFloat::new(brightness, 0.0, 1.0),
        }
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn shift_hue(&mut self, amount: f32) -> f32 {
        self.hue = (self.hue + amount).rem_euclid(1.0);
        self.hue
    }
}

impl Default for TrackColor {
    fn default() -> Self {
        Self::new(0.0, 0.8, 0.9)
    }
}

/// A line joining two consecutive notes of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectingLine {
    pub from: Point,
    pub to: Point,
}

/// Represents a single track containing timeline notes.
///
/// Notes are sorted by left edge. Operations that move notes in bulk call
/// [`Track::sort_notes`] once they are done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier for this track.
    pub id: TrackId,

    /// Human-readable name for the track.
    pub name: String,

    /// MIDI channel (0-15).
    pub channel: u8,

    /// Default MIDI program for notes added by hand.
    pub program: u8,

    pub color: TrackColor,

    pub style: NoteStyle,

    /// Whether lines joining consecutive notes are drawn.
    pub show_connecting_lines: bool,

    /// Whether this track is muted (not played during playback).
    pub muted: bool,

    /// Whether this track is soloed (only soloed tracks play when any track is soloed).
    pub solo: bool,

    /// Collection of notes in this track, sorted by x.
    notes: Vec<Note>,
}

impl Track {
    /// Creates a new empty track.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name for the track
    /// * `channel` - MIDI channel (0-15)
    pub fn new(name: impl Into<String>, channel: u8) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            channel: channel.min(15),
            program: 0,
            color: TrackColor::default(),
            style: NoteStyle::Default,
            show_connecting_lines: false,
            muted: false,
            solo: false,
            notes: Vec::new(),
        }
    }

    /// Adds a note to the track, maintaining sorted order by x.
    ///
    /// # Returns
    ///
    /// The NoteId of the added note
    pub fn add_note(&mut self, mut note: Note) -> NoteId {
        let id = note.id;
        note.muted = note.muted || self.muted;
        let pos = self.notes.partition_point(|n| n.x <= note.x);
        self.notes.insert(pos, note);
        id
    }

    /// Removes a note by its ID.
    ///
    /// # Returns
    ///
    /// The removed note, or None if not found
    pub fn remove_note(&mut self, id: NoteId) -> Option<Note> {
        let pos = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(pos))
    }

    /// Removes every note whose ID is in `ids`, returning how many went.
    pub fn remove_notes(&mut self, ids: &[NoteId]) -> usize {
        let before = self.notes.len();
        self.notes.retain(|n| !ids.contains(&n.id));
        before - self.notes.len()
    }

    /// Returns a reference to a note by its ID.
    pub fn get_note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Returns a mutable reference to a note by its ID.
    pub fn get_note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    /// Returns all notes in the track (sorted by x).
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Returns mutable access to all notes. Callers that change `x` must
    /// call [`Track::sort_notes`] afterwards.
    pub fn notes_mut(&mut self) -> &mut [Note] {
        &mut self.notes
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Restores x ordering after notes were moved in place.
    pub fn sort_notes(&mut self) {
        self.notes.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    /// Mutes or unmutes the track and all of its notes.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        for note in &mut self.notes {
            note.muted = muted;
        }
    }

    /// Copies the velocity of `source` onto every note starting at or after
    /// it.
    ///
    /// # Returns
    ///
    /// Number of notes updated, or None if the source note is not in this track
    pub fn set_velocities_after(&mut self, source: NoteId) -> Option<usize> {
        let (x, velocity) = {
            let note = self.get_note(source)?;
            (note.x, note.velocity.value())
        };
        let mut updated = 0;
        for note in self.notes.iter_mut().filter(|n| n.x >= x) {
            note.velocity.set(velocity);
            updated += 1;
        }
        Some(updated)
    }

    /// Starts and stops notes for a playhead at `play_x`.
    ///
    /// A note sounds while `x <= play_x < x + width`. Transitions are sent to
    /// `sound` only when `audible` is set; the `sounding` flags are tracked
    /// either way so phantom notes still animate on muted tracks.
    ///
    /// # Returns
    ///
    /// IDs of notes that started sounding this call
    pub fn play_notes(
        &mut self,
        play_x: f64,
        row_height: f64,
        audible: bool,
        sound: &mut dyn SoundEngine,
    ) -> Vec<NoteId> {
        let mut started = Vec::new();
        for note in &mut self.notes {
            let active = note.is_active_at(play_x);
            if active && !note.sounding {
                note.sounding = true;
                started.push(note.id);
                if audible && !note.muted {
                    sound.note_on(
                        note.channel,
                        note.program,
                        note.pitch(row_height),
                        note.velocity.value() as u8,
                    );
                }
            } else if !active && note.sounding {
                note.sounding = false;
                if audible && !note.muted {
                    sound.note_off(note.channel, note.pitch(row_height));
                }
            }
        }
        started
    }

    /// Stops every sounding note.
    ///
    /// Note-offs follow the same rule as [`Track::play_notes`]: nothing is
    /// sent for muted notes or when `audible` is unset.
    pub fn stop_all_notes(&mut self, row_height: f64, audible: bool, sound: &mut dyn SoundEngine) {
        let mut stopped = 0;
        for note in self.notes.iter_mut().filter(|n| n.sounding) {
            note.sounding = false;
            if audible && !note.muted {
                sound.note_off(note.channel, note.pitch(row_height));
            }
            stopped += 1;
        }
        if stopped > 0 {
            debug!(track = %self.name, stopped, "stopped sounding notes");
        }
    }

    /// Lines joining the left edges of consecutive notes, skipping pairs
    /// that are a whole note or more apart.
    pub fn connecting_lines(&self, whole_note_width: f64) -> Vec<ConnectingLine> {
        self.notes
            .windows(2)
            .filter(|pair| pair[1].x - pair[0].x < whole_note_width)
            .map(|pair| ConnectingLine {
                from: pair[0].position(),
                to: pair[1].position(),
            })
            .collect()
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new("Track 1", 0)
    }
}

/// Finds a note by ID across a set of tracks.
pub fn note_by_id(tracks: &[Track], id: NoteId) -> Option<&Note> {
    tracks.iter().find_map(|t| t.get_note(id))
}

/// Finds a note by ID across a set of tracks, mutably.
pub fn note_by_id_mut(tracks: &mut [Track], id: NoteId) -> Option<&mut Note> {
    tracks.iter_mut().find_map(|t| t.get_note_mut(id))
}

/// Index of the track owning `id`.
pub fn track_index_of(tracks: &[Track], id: NoteId) -> Option<usize> {
    tracks.iter().position(|t| t.get_note(id).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingEngine, SoundEvent};

    const ROW: f64 = 1.0;

    fn note_at(x: f64, row: f64) -> Note {
        Note::new(x, row * ROW, 0.5, 1.5, 100)
    }

    #[test]
    fn test_track_creation() {
        let track = Track::new("Piano", 20);
        assert_eq!(track.name, "Piano");
        assert_eq!(track.channel, 15);
        assert!(!track.muted);
        assert!(!track.solo);
        assert!(track.is_empty());
    }

    #[test]
    fn test_add_notes_sorted() {
        let mut track = Track::new("Test", 0);
        track.add_note(note_at(2.0, 1.0));
        track.add_note(note_at(0.0, 2.0));
        track.add_note(note_at(4.0, 3.0));

        let xs: Vec<f64> = track.notes().iter().map(|n| n.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_sort_after_move() {
        let mut track = Track::new("Test", 0);
        track.add_note(note_at(0.0, 1.0));
        track.add_note(note_at(1.0, 1.0));
        track.notes_mut()[0].x = 3.0;
        track.sort_notes();
        assert_eq!(track.notes()[0].x, 1.0);
    }

    #[test]
    fn test_play_notes_transitions() {
        let mut track = Track::new("Test", 0);
        let id = track.add_note(Note::new(1.0, 39.0, 1.0, 1.0, 80).with_voice(2, 0));
        let mut sound = RecordingEngine::new();

        assert!(track.play_notes(0.5, ROW, true, &mut sound).is_empty());
        assert_eq!(track.play_notes(1.0, ROW, true, &mut sound), vec![id]);
        assert!(track.play_notes(1.5, ROW, true, &mut sound).is_empty());
        track.play_notes(2.0, ROW, true, &mut sound);

        assert_eq!(
            sound.events,
            vec![
                SoundEvent::On {
                    channel: 2,
                    program: 0,
                    pitch: 60,
                    velocity: 80
                },
                SoundEvent::Off {
                    channel: 2,
                    pitch: 60
                },
            ]
        );
    }

    #[test]
    fn test_inaudible_track_tracks_state_silently() {
        let mut track = Track::new("Test", 0);
        track.add_note(note_at(0.0, 10.0));
        let mut sound = RecordingEngine::new();
        let started = track.play_notes(0.1, ROW, false, &mut sound);
        assert_eq!(started.len(), 1);
        assert!(sound.events.is_empty());
        assert!(track.notes()[0].sounding);
    }

    #[test]
    fn test_stop_all_notes() {
        let mut track = Track::new("Test", 0);
        track.add_note(note_at(0.0, 10.0));
        track.add_note(note_at(0.0, 12.0));
        let mut sound = RecordingEngine::new();
        track.play_notes(0.1, ROW, true, &mut sound);
        sound.events.clear();
        track.stop_all_notes(ROW, true, &mut sound);
        assert_eq!(sound.events.len(), 2);
        assert!(track.notes().iter().all(|n| !n.sounding));
    }

    #[test]
    fn test_stop_all_notes_skips_unheard_notes() {
        let mut track = Track::new("Test", 0);
        track.add_note(note_at(0.0, 10.0));
        let muted = track.add_note(note_at(0.0, 12.0));
        track.get_note_mut(muted).unwrap().muted = true;
        let mut sound = RecordingEngine::new();

        track.play_notes(0.1, ROW, true, &mut sound);
        assert_eq!(sound.events.len(), 1);
        track.stop_all_notes(ROW, true, &mut sound);
        assert_eq!(sound.events.len(), 2);
        assert!(matches!(sound.events[1], SoundEvent::Off { .. }));

        sound.events.clear();
        track.play_notes(0.1, ROW, false, &mut sound);
        track.stop_all_notes(ROW, false, &mut sound);
        assert!(sound.events.is_empty());
        assert!(track.notes().iter().all(|n| !n.sounding));
    }

    #[test]
    fn test_set_velocities_after() {
        let mut track = Track::new("Test", 0);
        track.add_note(Note::new(0.0, 0.0, 1.0, 1.0, 10));
        let source = track.add_note(Note::new(1.0, 0.0, 1.0, 1.0, 99));
        track.add_note(Note::new(2.0, 0.0, 1.0, 1.0, 20));

        assert_eq!(track.set_velocities_after(source), Some(2));
        let velocities: Vec<i32> = track.notes().iter().map(|n| n.velocity.value()).collect();
        assert_eq!(velocities, vec![10, 99, 99]);
    }

    #[test]
    fn test_connecting_lines_skip_long_gaps() {
        let mut track = Track::new("Test", 0);
        track.add_note(note_at(0.0, 1.0));
        track.add_note(note_at(2.0, 1.0));
        track.add_note(note_at(20.0, 1.0));
        let lines = track.connecting_lines(8.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].to.x, 2.0);
    }

    #[test]
    fn test_color_adjustment() {
        let mut color = TrackColor::new(0.9, 0.5, 0.5);
        assert!((color.shift_hue(0.2) - 0.1).abs() < 1e-6);
        assert_eq!(color.saturation.add(2.0), 1.0);
        assert_eq!(color.brightness.subtract(2.0), 0.0);
    }

    #[test]
    fn test_note_lookup_across_tracks() {
        let mut a = Track::new("A", 0);
        let mut b = Track::new("B", 1);
        a.add_note(note_at(0.0, 1.0));
        let id = b.add_note(note_at(1.0, 1.0));
        let tracks = vec![a, b];
        assert_eq!(note_by_id(&tracks, id).map(|n| n.x), Some(1.0));
        assert_eq!(track_index_of(&tracks, id), Some(1));
    }
}
