//! Standard MIDI File (SMF) import.
//!
//! Reads a .mid file into per-track note lists, tempo changes and the time
//! signature, all still in ticks. [`crate::midi::Project::from_import`] turns
//! the result into timeline geometry.
//!
//! # Matching rules
//!
//! - Note-off closes the most recently started open note of the same pitch
//!   in the same track (LIFO). A note-off with nothing open is ignored.
//! - A note-on with velocity 0 counts as a note-off.
//! - Notes never closed keep a sixteenth-note default duration.
//! - Program changes apply to notes started later in the same track.
//! - The last time signature seen wins.

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Largest time-signature denominator accepted from a file.
pub(crate) const MAX_DENOMINATOR: u32 = 64;

/// Errors that can occur during MIDI import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream is not a valid Standard MIDI File.
    #[error("MIDI parse error: {0}")]
    Parse(#[from] midly::Error),

    /// SMPTE timecode files have no ticks-per-quarter resolution.
    #[error("unsupported timing: {0}")]
    UnsupportedTiming(String),
}

/// A note read from a MIDI track, timed in (shifted) ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedNote {
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub program: u8,
    pub start: i64,
    pub duration: i64,
    open: bool,
}

/// Notes of one file track in file order.
#[derive(Debug, Clone, Default)]
pub struct ImportedTrack {
    /// 1-based position of the track in the file.
    pub number: usize,
    pub name: Option<String>,
    pub notes: Vec<ImportedNote>,
}

impl ImportedTrack {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    fn start_note(&mut self, note: ImportedNote) {
        self.notes.push(note);
    }

    /// Closes the latest open note with this pitch.
    ///
    /// # Returns
    ///
    /// true if a note was closed
    fn end_note(&mut self, pitch: u8, tick: i64) -> bool {
        match self
            .notes
            .iter_mut()
            .rev()
            .find(|n| n.open && n.pitch == pitch)
        {
            Some(note) => {
                note.duration = tick - note.start;
                note.open = false;
                true
            }
            None => false,
        }
    }
}

/// A tempo meta-event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoChange {
    /// Shifted tick the change occurs at.
    pub tick: i64,
    pub bpm: f64,
}

/// Everything the timeline needs from a MIDI file.
#[derive(Debug, Clone)]
pub struct ImportedSequence {
    /// Ticks per quarter note.
    pub ppq: u16,
    /// One entry per file track, empty ones included.
    pub tracks: Vec<ImportedTrack>,
    pub tempo_changes: Vec<TempoChange>,
    pub numerator: u8,
    pub denominator: u32,
    /// Length of the sequence measured in whole notes.
    pub length_whole_notes: f64,
}

impl ImportedSequence {
    /// Iterator over tracks that contain notes.
    pub fn non_empty_tracks(&self) -> impl DoubleEndedIterator<Item = &ImportedTrack> {
        self.tracks.iter().filter(|t| !t.is_empty())
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }
}

/// Imports a MIDI file from disk.
///
/// # Arguments
///
/// * `path` - Path to the .mid or .midi file
/// * `tick_shift` - Ticks added to every event time
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn import_file<P: AsRef<Path>>(path: P, tick_shift: i64) -> Result<ImportedSequence, ImportError> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    info!(path = %path.display(), bytes = data.len(), "importing MIDI file");
    import_bytes(&data, tick_shift)
}

/// Imports a MIDI byte stream.
///
/// # Errors
///
/// Returns error if the bytes are not a metrical-timed Standard MIDI File
pub fn import_bytes(data: &[u8], tick_shift: i64) -> Result<ImportedSequence, ImportError> {
    let smf = Smf::parse(data)?;

    let ppq = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(fps, sub) => {
            return Err(ImportError::UnsupportedTiming(format!(
                "SMPTE timecode ({} fps, {} subframes)",
                fps.as_int(),
                sub
            )))
        }
    };
    if ppq == 0 {
        return Err(ImportError::UnsupportedTiming(
            "zero ticks per quarter note".to_string(),
        ));
    }

    let mut sequence = ImportedSequence {
        ppq,
        tracks: Vec::with_capacity(smf.tracks.len()),
        tempo_changes: Vec::new(),
        numerator: 4,
        denominator: 4,
        length_whole_notes: 0.0,
    };

    let mut last_tick: u64 = 0;
    for (index, events) in smf.tracks.iter().enumerate() {
        let (track, end_tick) = read_track(index + 1, events, tick_shift, &mut sequence);
        last_tick = last_tick.max(end_tick);
        sequence.tracks.push(track);
    }

    let span = last_tick as f64 + tick_shift.max(0) as f64;
    sequence.length_whole_notes = span / (ppq as f64 * 4.0);

    info!(
        ppq,
        tracks = sequence.tracks.len(),
        notes = sequence.note_count(),
        tempo_changes = sequence.tempo_changes.len(),
        time_signature = %format!("{}/{}", sequence.numerator, sequence.denominator),
        "MIDI import complete"
    );
    Ok(sequence)
}

/// Reads one file track. Tempo and time-signature events are written to
/// `sequence` directly since they are global.
///
/// # Returns
///
/// The track and the absolute (unshifted) tick of its last event
fn read_track(
    number: usize,
    events: &[TrackEvent],
    tick_shift: i64,
    sequence: &mut ImportedSequence,
) -> (ImportedTrack, u64) {
    let mut track = ImportedTrack {
        number,
        ..Default::default()
    };
    let default_duration = (sequence.ppq as i64 / 4).max(1);
    let mut program: u8 = 0;
    let mut tick: u64 = 0;
    let mut unmatched = 0usize;

    for event in events {
        tick += event.delta.as_int() as u64;
        let at = tick as i64 + tick_shift;

        match event.kind {
            TrackEventKind::Midi { channel, message } => match message {
                MidiMessage::ProgramChange { program: p } => program = p.as_int(),
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    track.start_note(ImportedNote {
                        pitch: key.as_int(),
                        velocity: vel.as_int(),
                        channel: channel.as_int(),
                        program,
                        start: at,
                        duration: default_duration,
                        open: true,
                    });
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    if !track.end_note(key.as_int(), at) {
                        unmatched += 1;
                    }
                }
                _ => {}
            },
            TrackEventKind::Meta(meta) => match meta {
                MetaMessage::TrackName(bytes) => {
                    track.name = std::str::from_utf8(bytes).ok().map(str::to_string);
                }
                MetaMessage::Tempo(micros) => {
                    let micros = micros.as_int();
                    if micros > 0 {
                        let bpm = 60.0 / (micros as f64 / 1_000_000.0);
                        sequence.tempo_changes.push(TempoChange { tick: at, bpm });
                    }
                }
                MetaMessage::TimeSignature(numerator, exponent, _, _) => {
                    let denominator = 1u32
                        .checked_shl(exponent as u32)
                        .filter(|d| *d <= MAX_DENOMINATOR);
                    match denominator {
                        Some(denominator) if numerator > 0 => {
                            sequence.numerator = numerator;
                            sequence.denominator = denominator;
                        }
                        _ => warn!(numerator, exponent, "ignoring invalid time signature"),
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    if unmatched > 0 {
        debug!(track = number, unmatched, "note-off events without an open note");
    }
    (track, tick)
}

/// Builds Standard MIDI File bytes for tests.
#[cfg(test)]
pub(crate) mod fixture {
    /// Writes a variable-length quantity.
    fn write_vlq(value: u32, buffer: &mut Vec<u8>) {
        let mut bytes = vec![(value & 0x7F) as u8];
        let mut rest = value >> 7;
        while rest > 0 {
            bytes.push((rest & 0x7F) as u8 | 0x80);
            rest >>= 7;
        }
        buffer.extend(bytes.iter().rev());
    }

    /// One track being written. Events take delta times.
    #[derive(Default)]
    pub struct TrackBuilder {
        data: Vec<u8>,
    }

    impl TrackBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        fn event(mut self, delta: u32, bytes: &[u8]) -> Self {
            write_vlq(delta, &mut self.data);
            self.data.extend_from_slice(bytes);
            self
        }

        pub fn note_on(self, delta: u32, channel: u8, key: u8, vel: u8) -> Self {
            self.event(delta, &[0x90 | channel, key, vel])
        }

        pub fn note_off(self, delta: u32, channel: u8, key: u8) -> Self {
            self.event(delta, &[0x80 | channel, key, 0])
        }

        pub fn program(self, delta: u32, channel: u8, program: u8) -> Self {
            self.event(delta, &[0xC0 | channel, program])
        }

        pub fn tempo(self, delta: u32, micros: u32) -> Self {
            let b = micros.to_be_bytes();
            self.event(delta, &[0xFF, 0x51, 0x03, b[1], b[2], b[3]])
        }

        pub fn time_signature(self, delta: u32, numerator: u8, exponent: u8) -> Self {
            self.event(delta, &[0xFF, 0x58, 0x04, numerator, exponent, 24, 8])
        }

        fn finish(self) -> Vec<u8> {
            let mut data = self.event(0, &[0xFF, 0x2F, 0x00]).data;
            let mut chunk = b"MTrk".to_vec();
            chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
            chunk.append(&mut data);
            chunk
        }
    }

    /// Format 1 file with the given resolution and tracks.
    pub fn smf(ppq: u16, tracks: Vec<TrackBuilder>) -> Vec<u8> {
        let mut out = b"MThd".to_vec();
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        out.extend_from_slice(&ppq.to_be_bytes());
        for track in tracks {
            out.extend(track.finish());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::{smf, TrackBuilder};
    use super::*;

    #[test]
    fn test_lifo_note_off_matching() {
        let bytes = smf(
            480,
            vec![TrackBuilder::new()
                .note_on(0, 0, 60, 100)
                .note_on(100, 0, 60, 90)
                .note_off(100, 0, 60)
                .note_off(100, 0, 60)],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        let notes = &seq.tracks[0].notes;
        assert_eq!(notes.len(), 2);
        // Second note-on (tick 100) closes first, at tick 200.
        assert_eq!((notes[1].start, notes[1].duration), (100, 100));
        // First note-on (tick 0) closes at tick 300.
        assert_eq!((notes[0].start, notes[0].duration), (0, 300));
    }

    #[test]
    fn test_unmatched_note_off_ignored() {
        let bytes = smf(
            480,
            vec![TrackBuilder::new()
                .note_off(0, 0, 62)
                .note_on(10, 0, 64, 80)],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        let notes = &seq.tracks[0].notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].duration, 120);
    }

    #[test]
    fn test_velocity_zero_is_note_off() {
        let bytes = smf(
            96,
            vec![TrackBuilder::new()
                .note_on(0, 1, 70, 100)
                .note_on(48, 1, 70, 0)],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        let notes = &seq.tracks[0].notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].duration, 48);
        assert_eq!(notes[0].channel, 1);
    }

    #[test]
    fn test_tick_shift_applies_to_all_events() {
        let bytes = smf(
            480,
            vec![
                TrackBuilder::new().tempo(0, 500_000),
                TrackBuilder::new().note_on(480, 0, 60, 100).note_off(480, 0, 60),
            ],
        );
        let seq = import_bytes(&bytes, 240).unwrap();
        assert_eq!(seq.tempo_changes[0].tick, 240);
        let note = &seq.tracks[1].notes[0];
        assert_eq!(note.start, 720);
        assert_eq!(note.duration, 480);
    }

    #[test]
    fn test_tempo_and_time_signature() {
        let bytes = smf(
            480,
            vec![TrackBuilder::new()
                .time_signature(0, 3, 2)
                .tempo(0, 500_000)
                .tempo(960, 600_000)
                .time_signature(0, 6, 3)],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        assert_eq!(seq.tempo_changes.len(), 2);
        assert!((seq.tempo_changes[0].bpm - 120.0).abs() < 1e-9);
        assert!((seq.tempo_changes[1].bpm - 100.0).abs() < 1e-9);
        assert_eq!(seq.tempo_changes[1].tick, 960);
        assert_eq!((seq.numerator, seq.denominator), (6, 8));
    }

    #[test]
    fn test_oversized_denominator_ignored() {
        let bytes = smf(
            96,
            vec![TrackBuilder::new()
                .time_signature(0, 4, 31)
                .note_on(0, 0, 60, 100)
                .note_off(96, 0, 60)],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        assert_eq!((seq.numerator, seq.denominator), (4, 4));

        let bytes = smf(96, vec![TrackBuilder::new().time_signature(0, 5, 6)]);
        let seq = import_bytes(&bytes, 0).unwrap();
        assert_eq!((seq.numerator, seq.denominator), (5, 64));
    }

    #[test]
    fn test_program_tracked_per_track() {
        let bytes = smf(
            480,
            vec![
                TrackBuilder::new()
                    .note_on(0, 0, 60, 100)
                    .program(10, 0, 33)
                    .note_on(0, 0, 62, 100),
                TrackBuilder::new().note_on(0, 0, 64, 100),
            ],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        assert_eq!(seq.tracks[0].notes[0].program, 0);
        assert_eq!(seq.tracks[0].notes[1].program, 33);
        assert_eq!(seq.tracks[1].notes[0].program, 0);
    }

    #[test]
    fn test_length_and_empty_tracks() {
        let bytes = smf(
            480,
            vec![
                TrackBuilder::new().tempo(0, 500_000),
                TrackBuilder::new().note_on(0, 0, 60, 100).note_off(3840, 0, 60),
            ],
        );
        let seq = import_bytes(&bytes, 0).unwrap();
        assert_eq!(seq.tracks.len(), 2);
        assert_eq!(seq.non_empty_tracks().count(), 1);
        assert!((seq.length_whole_notes - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = import_bytes(b"not a midi file", 0).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = import_file("/nonexistent/definitely/missing.mid", 0).unwrap_err();
        assert!(matches!(err, ImportError::Io(_)));
    }
}
