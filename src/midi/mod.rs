//! MIDI data structures for the timeline.
//!
//! This module provides notes, tracks, the importer that reads Standard MIDI
//! Files and the project that ties tracks to a grid and tempo map.

mod midi_import;
mod note;
mod project;
mod track;

pub use midi_import::{
    import_bytes, import_file, ImportError, ImportedNote, ImportedSequence, ImportedTrack, TempoChange,
};
pub use note::{Note, NoteId, LOWEST_PITCH};
pub use project::{Project, ProjectSummary};
pub use track::{
    note_by_id, note_by_id_mut, track_index_of, ConnectingLine, NoteStyle, Track, TrackColor, TrackId,
};

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Arguments
///
/// * `note` - MIDI note number (0-127)
///
/// # Returns
///
/// String representation like "C4" or "F#5"
///
/// # Examples
///
/// ```
/// use midigrid::midi::note_to_name;
///
/// let name = note_to_name(60); // Middle C
/// assert_eq!(name, "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1; // MIDI octave convention
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}
