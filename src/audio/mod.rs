//! Sound output contract for timeline playback.
//!
//! The timeline never synthesizes audio itself. Tracks report note on/off
//! transitions through a [`SoundEngine`], and whoever owns the real synth
//! plugs it in here.

pub mod engine;

pub use engine::{RecordingEngine, SoundEvent, TracingEngine};

/// Receiver for note transitions produced while the playhead moves.
pub trait SoundEngine {
    /// Starts a note on the given channel with the given instrument.
    fn note_on(&mut self, channel: u8, program: u8, pitch: u8, velocity: u8);

    /// Stops a note on the given channel.
    fn note_off(&mut self, channel: u8, pitch: u8);

    /// Silences everything that is still sounding.
    fn all_notes_off(&mut self);
}
