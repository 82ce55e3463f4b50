//! midigrid - a grid-quantized MIDI timeline engine.
//!
//! This library imports Standard MIDI Files onto a measure/pitch grid and
//! provides the editing core around it: a tempo map, rectangle selection
//! with a clipboard, snapshot undo, and a state machine that turns pointer
//! and keyboard input into edits and playback.

pub mod audio;
pub mod config;
pub mod control;
pub mod editor;
pub mod geom;
pub mod history;
pub mod midi;
pub mod selection;
pub mod timeline;

// Re-export commonly used types
pub use audio::{SoundEngine, TracingEngine};
pub use config::EditorConfig;
pub use editor::{EditState, EditorContext, FrameInput, FrameOutput, HoverTarget, InputEvent, Modifiers};
pub use geom::{Point, Rect};
pub use midi::{import_file, ImportError, Note, NoteId, Project, Track, TrackId};
pub use selection::SelectionEngine;
pub use timeline::{TempoMap, TimelineGrid};
