//! Timeline project container.
//!
//! A project bundles the tracks with the grid they sit on and the tempo map
//! that drives playback. Structural edits go through the project so that
//! measures and notes always change together.

use super::midi_import::{ImportedSequence, MAX_DENOMINATOR};
use super::note::{Note, NoteId};
use super::track::{note_by_id, note_by_id_mut, NoteStyle, Track, TrackColor, TrackId};
use crate::audio::SoundEngine;
use crate::config::EditorConfig;
use crate::selection::SelectionEngine;
use crate::timeline::{Measure, MeasureDeletion, TempoMap, TimelineGrid};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Hue distance between consecutive imported tracks.
const HUE_STEP: f32 = 0.371;
const IMPORT_SATURATION: f32 = 0.85;
const IMPORT_BRIGHTNESS: f32 = 0.9;
/// Upper bound on the measures laid out for an imported file.
const MAX_IMPORT_MEASURES: usize = 10_000;

/// Counts reported by [`Project::summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub measures: usize,
    pub tracks: usize,
    pub notes: usize,
    pub tempo_markers: usize,
    pub grid_width: f64,
    pub time_signature: String,
}

/// A complete timeline: tracks, measures and tempo markers.
#[derive(Debug, Clone)]
pub struct Project {
    /// Project name.
    pub name: String,

    pub grid: TimelineGrid,

    pub tempo: TempoMap,

    /// Collection of tracks in the project.
    tracks: Vec<Track>,
}

impl Project {
    /// Creates a project with no tracks and a single default measure.
    ///
    /// # Arguments
    ///
    /// * `name` - Project name
    /// * `config` - Grid dimensions and default measure
    pub fn new(name: impl Into<String>, config: &EditorConfig) -> Self {
        Self {
            name: name.into(),
            grid: TimelineGrid::with_measures(
                config.whole_note_width,
                config.grid_height,
                config.pitch_rows,
                1,
                config.default_measure(),
            ),
            tempo: TempoMap::new(),
            tracks: Vec::new(),
        }
    }

    /// Creates a project with a single empty track.
    pub fn with_default_track(name: impl Into<String>, config: &EditorConfig) -> Self {
        let mut project = Self::new(name, config);
        project.add_track(Track::new("Track 1", 0));
        project
    }

    /// Builds a timeline from an imported MIDI sequence.
    ///
    /// Tracks are laid out in reverse file order and empty tracks are
    /// skipped. Each track gets its own hue and a note style picked by its
    /// position in the file. Tempo changes become unconnected markers.
    ///
    /// # Arguments
    ///
    /// * `name` - Project name
    /// * `seq` - The imported sequence
    /// * `config` - Grid dimensions and subdivision
    pub fn from_import(name: impl Into<String>, seq: &ImportedSequence, config: &EditorConfig) -> Self {
        let numerator = u32::from(seq.numerator).max(1);
        let denominator = seq.denominator.clamp(1, MAX_DENOMINATOR);
        let measure = Measure::new(numerator, denominator, config.subdivision);
        let count = (seq.length_whole_notes * denominator as f64 / numerator as f64).ceil();
        let mut count = if count.is_finite() && count >= 1.0 { count as usize } else { 1 };
        if count > MAX_IMPORT_MEASURES {
            warn!(count, limit = MAX_IMPORT_MEASURES, "truncating imported measures");
            count = MAX_IMPORT_MEASURES;
        }

        let mut project = Self {
            name: name.into(),
            grid: TimelineGrid::with_measures(
                config.whole_note_width,
                config.grid_height,
                config.pitch_rows,
                count,
                measure,
            ),
            tempo: TempoMap::new(),
            tracks: Vec::new(),
        };

        let ppq = f64::from(seq.ppq.max(1));
        let quarter_width = config.whole_note_width / 4.0;
        let to_x = |ticks: i64| ticks as f64 / ppq * quarter_width;

        for change in &seq.tempo_changes {
            project.tempo.insert(change.bpm.round() as i32, to_x(change.tick), false);
        }

        let row_height = project.grid.row_height();
        let top_row = i64::from(project.grid.pitch_rows()) - 1;
        let mut hue = 0.0f32;
        for imported in seq.non_empty_tracks().rev() {
            let Some(first) = imported.notes.first() else {
                continue;
            };
            hue = (hue + HUE_STEP).rem_euclid(1.0);
            let name = imported
                .name
                .clone()
                .unwrap_or_else(|| format!("Track {}", imported.number));
            let mut track = Track::new(name, first.channel);
            track.program = first.program;
            track.color = TrackColor::new(hue, IMPORT_SATURATION, IMPORT_BRIGHTNESS);
            track.style = NoteStyle::cycled(imported.number.saturating_sub(1));

            for n in &imported.notes {
                let row = (i64::from(n.pitch) - i64::from(config.lowest_pitch)).clamp(0, top_row);
                let note = Note::new(
                    to_x(n.start),
                    row as f64 * row_height,
                    to_x(n.duration),
                    config.note_height,
                    i32::from(n.velocity),
                )
                .with_voice(n.channel, n.program);
                track.add_note(note);
            }
            debug!(track = %track.name, notes = track.note_count(), "imported track");
            project.tracks.push(track);
        }

        info!(
            measures = count,
            tracks = project.tracks.len(),
            tempo_markers = project.tempo.len(),
            "timeline built from import"
        );
        project
    }

    /// Adds a track to the project.
    ///
    /// # Returns
    ///
    /// The TrackId of the added track
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.push(track);
        id
    }

    /// Returns a reference to a track by index.
    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Returns a mutable reference to a track by index.
    pub fn track_at_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    /// Returns a mutable reference to a track by its ID.
    pub fn get_track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Returns all tracks in the project.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// Returns the number of tracks in the project.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.note_count()).sum()
    }

    /// Finds a note by its ID across all tracks.
    ///
    /// # Returns
    ///
    /// Tuple of (TrackId, &Note) if found
    pub fn find_note(&self, note_id: NoteId) -> Option<(TrackId, &Note)> {
        self.tracks
            .iter()
            .find_map(|t| t.get_note(note_id).map(|n| (t.id, n)))
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        note_by_id(&self.tracks, id)
    }

    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        note_by_id_mut(&mut self.tracks, id)
    }

    /// Index of the track that owns `id`.
    pub fn track_of(&self, id: NoteId) -> Option<usize> {
        super::track::track_index_of(&self.tracks, id)
    }

    /// Re-sorts the track owning `id` after its note moved.
    pub fn resort_owner(&mut self, id: NoteId) {
        if let Some(index) = self.track_of(id) {
            self.tracks[index].sort_notes();
        }
    }

    /// Whether a track reaches the sound engine, considering mute and solo.
    ///
    /// If any track is soloed, only soloed tracks play.
    /// Otherwise, all non-muted tracks play.
    pub fn is_audible(&self, track: &Track) -> bool {
        let any_solo = self.tracks.iter().any(|t| t.solo);
        if any_solo {
            track.solo && !track.muted
        } else {
            !track.muted
        }
    }

    /// Returns tracks that should be played (considering mute/solo states).
    pub fn playable_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| self.is_audible(t))
    }

    /// Inserts a measure, moving later notes right.
    ///
    /// # Returns
    ///
    /// The origin of the inserted measure
    pub fn insert_measure(&mut self, position: usize, numerator: u32, denominator: u32, subdivision: u32) -> f64 {
        self.grid
            .insert_measure(position, numerator, denominator, subdivision, &mut self.tracks)
    }

    /// Deletes measures together with the notes that start inside them.
    pub fn delete_measures(
        &mut self,
        position: usize,
        count: usize,
        selection: &mut SelectionEngine,
    ) -> Option<MeasureDeletion> {
        self.grid
            .delete_measures(position, count, &mut self.tracks, selection)
    }

    /// Advances every track's sounding state to a playhead at `play_x`.
    ///
    /// # Returns
    ///
    /// IDs of notes that started sounding
    pub fn play_notes(&mut self, play_x: f64, sound: &mut dyn SoundEngine) -> Vec<NoteId> {
        let row_height = self.grid.row_height();
        let audible = self.audibility();
        let mut started = Vec::new();
        for (track, audible) in self.tracks.iter_mut().zip(audible) {
            started.extend(track.play_notes(play_x, row_height, audible, sound));
        }
        started
    }

    /// Silences every track and the engine.
    pub fn stop_all_notes(&mut self, sound: &mut dyn SoundEngine) {
        let row_height = self.grid.row_height();
        let audible = self.audibility();
        for (track, audible) in self.tracks.iter_mut().zip(audible) {
            track.stop_all_notes(row_height, audible, sound);
        }
        sound.all_notes_off();
    }

    /// [`Project::is_audible`] for each track, in track order.
    fn audibility(&self) -> Vec<bool> {
        self.tracks.iter().map(|t| self.is_audible(t)).collect()
    }

    pub fn summary(&self) -> ProjectSummary {
        let time_signature = self
            .grid
            .measures()
            .first()
            .map(|m| format!("{}/{}", m.numerator, m.denominator))
            .unwrap_or_else(|| String::from("-"));
        ProjectSummary {
            name: self.name.clone(),
            measures: self.grid.measure_count(),
            tracks: self.tracks.len(),
            notes: self.note_count(),
            tempo_markers: self.tempo.len(),
            grid_width: self.grid.grid_width(),
            time_signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingEngine, SoundEvent};
    use crate::midi::midi_import::fixture::{smf, TrackBuilder};
    use crate::midi::midi_import::import_bytes;

    fn config() -> EditorConfig {
        EditorConfig {
            grid_height: 87.0,
            ..EditorConfig::default()
        }
    }

    #[test]
    fn test_from_import_layout() {
        let bytes = smf(
            480,
            vec![
                TrackBuilder::new().tempo(0, 500_000).time_signature(0, 3, 2),
                TrackBuilder::new().note_on(0, 0, 60, 100).note_off(480, 0, 60),
                TrackBuilder::new()
                    .program(0, 1, 40)
                    .note_on(2160, 1, 21, 90)
                    .note_off(240, 1, 21),
            ],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        let project = Project::from_import("song", &seq, &config());

        // Reverse file order, empty tempo track skipped.
        assert_eq!(project.track_count(), 2);
        assert_eq!(project.tracks()[0].channel, 1);
        assert_eq!(project.tracks()[0].program, 40);
        assert_eq!(project.tracks()[1].channel, 0);

        assert!((project.tracks()[0].color.hue() - 0.371).abs() < 1e-6);
        assert!((project.tracks()[1].color.hue() - 0.742).abs() < 1e-6);
        assert_eq!(project.tracks()[0].style, NoteStyle::RoundEnd);
        assert_eq!(project.tracks()[1].style, NoteStyle::Diamond);

        let late = &project.tracks()[0].notes()[0];
        assert_eq!(late.x, 9.0);
        assert_eq!(late.width, 1.0);
        assert_eq!(late.y, 0.0);
        assert_eq!(late.program, 40);

        let middle_c = &project.tracks()[1].notes()[0];
        assert_eq!(middle_c.x, 0.0);
        assert_eq!(middle_c.width, 2.0);
        assert_eq!(middle_c.y, 39.0);
        assert_eq!(middle_c.pitch(project.grid.row_height()), 60);

        // 1.25 whole notes of 3/4 is 5/3 measures, rounded up.
        assert_eq!(project.grid.measure_count(), 2);
        assert_eq!(project.grid.measures()[0].numerator, 3);
        assert_eq!(project.tempo.len(), 1);
        assert_eq!(project.tempo.effective_tempo(0.0, 60.0), 120.0);
    }

    #[test]
    fn test_from_import_of_empty_file_has_one_measure() {
        let bytes = smf(96, vec![TrackBuilder::new()]);
        let seq = import_bytes(&bytes, 0).unwrap();
        let project = Project::from_import("empty", &seq, &config());
        assert_eq!(project.track_count(), 0);
        assert_eq!(project.grid.measure_count(), 1);
    }

    #[test]
    fn test_from_import_bounds_measure_count() {
        let bytes = smf(
            96,
            vec![TrackBuilder::new()
                .time_signature(0, 4, 31)
                .note_on(0, 0, 60, 100)
                .note_off(96, 0, 60)],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        let project = Project::from_import("odd", &seq, &config());
        assert_eq!(project.grid.measure_count(), 1);
        assert_eq!(project.grid.measures()[0].denominator, 4);

        let mut seq = import_bytes(&bytes, 0).unwrap();
        seq.denominator = 1 << 20;
        seq.length_whole_notes = 1.0e9;
        let project = Project::from_import("long", &seq, &config());
        assert_eq!(project.grid.measures()[0].denominator, 64);
        assert_eq!(project.grid.measure_count(), MAX_IMPORT_MEASURES);
    }

    #[test]
    fn test_muted_track_sends_nothing() {
        let mut project = Project::new("Test", &config());
        let mut a = Track::new("A", 0);
        a.add_note(Note::new(0.0, 39.0, 1.0, 1.5, 100));
        a.set_muted(true);
        let mut b = Track::new("B", 1);
        b.add_note(Note::new(0.0, 40.0, 1.0, 1.5, 100).with_voice(1, 0));
        project.add_track(a);
        project.add_track(b);

        let mut sound = RecordingEngine::new();
        project.play_notes(0.5, &mut sound);
        project.stop_all_notes(&mut sound);
        assert_eq!(sound.started_pitches(), vec![61]);
        assert_eq!(
            sound.events[1..],
            [SoundEvent::Off { channel: 1, pitch: 61 }, SoundEvent::AllOff]
        );
    }

    #[test]
    fn test_solo_and_mute() {
        let mut project = Project::new("Test", &config());
        let mut a = Track::new("A", 0);
        a.add_note(Note::new(0.0, 39.0, 1.0, 1.5, 100));
        let mut b = Track::new("B", 1);
        b.add_note(Note::new(0.0, 40.0, 1.0, 1.5, 100).with_voice(1, 0));
        project.add_track(a);
        project.add_track(b);

        assert_eq!(project.playable_tracks().count(), 2);
        project.track_at_mut(1).unwrap().solo = true;
        assert_eq!(project.playable_tracks().count(), 1);

        let mut sound = RecordingEngine::new();
        let started = project.play_notes(0.5, &mut sound);
        // Both notes start sounding, only the soloed track is heard.
        assert_eq!(started.len(), 2);
        assert_eq!(sound.started_pitches(), vec![61]);

        project.stop_all_notes(&mut sound);
        assert_eq!(sound.events.last(), Some(&SoundEvent::AllOff));
        assert!(project.tracks().iter().flat_map(|t| t.notes()).all(|n| !n.sounding));
    }

    #[test]
    fn test_insert_then_delete_restores_notes() {
        let mut project = Project::new("Test", &config());
        project.insert_measure(1, 4, 4, 16);
        project.insert_measure(2, 4, 4, 16);
        let mut track = Track::new("A", 0);
        let ids: Vec<NoteId> = [0.0, 8.5, 17.0]
            .iter()
            .map(|&x| track.add_note(Note::new(x, 10.0, 0.5, 1.5, 100)))
            .collect();
        project.add_track(track);

        let before: Vec<f64> = ids.iter().map(|id| project.note(*id).unwrap().x).collect();
        let origin = project.insert_measure(1, 3, 8, 16);
        assert_eq!(origin, 8.0);
        assert_eq!(project.note(ids[1]).unwrap().x, 11.5);

        let mut selection = SelectionEngine::new(0.75);
        let deletion = project.delete_measures(1, 1, &mut selection).unwrap();
        assert!(deletion.removed_notes.is_empty());
        let after: Vec<f64> = ids.iter().map(|id| project.note(*id).unwrap().x).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_find_note_and_summary() {
        let mut project = Project::with_default_track("Test", &config());
        let id = project
            .track_at_mut(0)
            .unwrap()
            .add_note(Note::new(1.0, 2.0, 0.5, 1.5, 64));
        let track_id = project.tracks()[0].id;
        assert_eq!(project.find_note(id).map(|(t, _)| t), Some(track_id));
        assert_eq!(project.track_of(id), Some(0));

        let summary = project.summary();
        assert_eq!(summary.measures, 1);
        assert_eq!(summary.notes, 1);
        assert_eq!(summary.grid_width, 8.0);
        assert_eq!(summary.time_signature, "4/4");
    }
}
