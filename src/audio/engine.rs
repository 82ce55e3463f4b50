//! Sound engines that do not produce audio.
//!
//! [`TracingEngine`] logs every transition and is what the command-line
//! binary plays through. [`RecordingEngine`] keeps the transitions in memory
//! so playback can be inspected.

use super::SoundEngine;
use crate::midi::note_to_name;
use tracing::{debug, info};

/// One note transition reported by the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    On {
        channel: u8,
        program: u8,
        pitch: u8,
        velocity: u8,
    },
    Off {
        channel: u8,
        pitch: u8,
    },
    AllOff,
}

/// Logs note transitions through `tracing`.
#[derive(Debug, Default)]
pub struct TracingEngine {
    /// Number of note-on events seen so far.
    notes_started: usize,
}

impl TracingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many notes have been started.
    pub fn notes_started(&self) -> usize {
        self.notes_started
    }
}

impl SoundEngine for TracingEngine {
    fn note_on(&mut self, channel: u8, program: u8, pitch: u8, velocity: u8) {
        self.notes_started += 1;
        debug!(channel, program, note = %note_to_name(pitch), velocity, "note on");
    }

    fn note_off(&mut self, channel: u8, pitch: u8) {
        debug!(channel, note = %note_to_name(pitch), "note off");
    }

    fn all_notes_off(&mut self) {
        info!(started = self.notes_started, "all notes off");
    }
}

/// Collects note transitions in order.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub events: Vec<SoundEvent>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pitches of every note-on received, in order.
    pub fn started_pitches(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SoundEvent::On { pitch, .. } => Some(*pitch),
                _ => None,
            })
            .collect()
    }
}

impl SoundEngine for RecordingEngine {
    fn note_on(&mut self, channel: u8, program: u8, pitch: u8, velocity: u8) {
        self.events.push(SoundEvent::On {
            channel,
            program,
            pitch,
            velocity,
        });
    }

    fn note_off(&mut self, channel: u8, pitch: u8) {
        self.events.push(SoundEvent::Off { channel, pitch });
    }

    fn all_notes_off(&mut self) {
        self.events.push(SoundEvent::AllOff);
    }
}
