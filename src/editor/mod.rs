//! The editing state machine.
//!
//! [`EditorContext`] owns the project, the selection and all interaction
//! state. The host calls [`EditorContext::update_frame`] once per rendered
//! frame with the pointer position and whatever the picking layer found under
//! it, and [`EditorContext::handle_event`] for every button, wheel and key
//! event. Hover results are checked against the project before use; a
//! target that no longer exists counts as nothing hovered.

mod controls;
mod playback;
mod state;

pub use controls::EditControls;
pub use playback::{PhantomNote, Playhead};
pub use state::{
    ControlButton, ControlKind, EditState, HoverTarget, InputEvent, Key, Modifiers, NoteEdge, PointerButton,
    ResizeEdge,
};

use crate::audio::SoundEngine;
use crate::config::EditorConfig;
use crate::geom::Point;
use crate::history::{HistoryManager, StateSnapshot};
use crate::midi::{NoteId, Project};
use crate::selection::SelectionEngine;
use crate::timeline::{MarkerId, Measure};
use tracing::{debug, info};

/// Colour change per wheel notch.
const COLOR_STEP: f32 = 0.01;
/// Tempo change per wheel notch; shift uses 1.
const TEMPO_STEP: i32 = 10;

/// Per-frame input from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub dt: f64,
    /// Pointer in grid space.
    pub pointer: Point,
    /// Pointer in screen pixels.
    pub pointer_px: Point,
    pub hover: HoverTarget,
    pub modifiers: Modifiers,
}

/// What the host should act on after a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// Playhead position while playing.
    pub playhead: Option<f64>,
    /// Capture one frame (capture playback only).
    pub capture_frame: bool,
    /// Camera movement in screen pixels requested by a view drag.
    pub pan: Point,
    /// Notes that started sounding this frame.
    pub started: Vec<NoteId>,
}

/// Anchors captured when a drag starts.
#[derive(Debug, Clone, Default)]
struct DragAnchor {
    note: Option<NoteId>,
    marker: Option<MarkerId>,
    /// Pointer minus the dragged object's reference point.
    grab_offset: Point,
    /// Distance of the selection centre above its nearest row.
    row_offset: f64,
    note_start: f64,
    note_end: f64,
    /// Pushed to history on release if the drag changed anything.
    before: Option<StateSnapshot>,
    changed: bool,
}

pub struct EditorContext {
    config: EditorConfig,
    project: Project,
    selection: SelectionEngine,
    history: HistoryManager,
    controls: EditControls,
    state: EditState,
    /// State a view drag returns to.
    resume_state: EditState,
    hover: HoverTarget,
    pointer: Point,
    pointer_px: Point,
    modifiers: Modifiers,
    right_down: bool,
    /// Measure whose control is being set; None for the end control.
    control_target: Option<usize>,
    drag: DragAnchor,
    playhead: Playhead,
    phantoms: Vec<PhantomNote>,
    status: String,
}

impl EditorContext {
    pub fn new(project: Project, config: EditorConfig) -> Self {
        Self {
            selection: SelectionEngine::new(config.selection_padding),
            history: HistoryManager::new(),
            controls: EditControls::new(&config),
            state: EditState::Normal,
            resume_state: EditState::Normal,
            hover: HoverTarget::None,
            pointer: Point::ORIGIN,
            pointer_px: Point::ORIGIN,
            modifiers: Modifiers::NONE,
            right_down: false,
            control_target: None,
            drag: DragAnchor::default(),
            playhead: Playhead::new(config.whole_note_width, config.fallback_bpm),
            phantoms: Vec::new(),
            status: String::new(),
            project,
            config,
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn controls(&self) -> &EditControls {
        &self.controls
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn hover(&self) -> HoverTarget {
        self.hover
    }

    pub fn playhead(&self) -> &Playhead {
        &self.playhead
    }

    pub fn phantoms(&self) -> &[PhantomNote] {
        &self.phantoms
    }

    /// The value currently being adjusted, for the on-screen readout.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn set_state(&mut self, state: EditState) {
        if self.state != state {
            debug!(from = self.state.label(), to = state.label(), "edit state");
            self.state = state;
        }
    }

    fn snapshot(&self, description: &str) -> StateSnapshot {
        StateSnapshot::new(&self.project, self.selection.selected(), description)
    }

    /// Saves the current state before an edit.
    fn record(&mut self, description: &str) {
        let snapshot = self.snapshot(description);
        self.history.push_undo(snapshot);
    }

    /// Replaces a hover target whose entity is gone with `None`.
    fn validated(&self, hover: HoverTarget) -> HoverTarget {
        let live = match hover {
            HoverTarget::None => true,
            HoverTarget::Note { id, .. } => self.project.note(id).is_some(),
            HoverTarget::Selection => self.selection.bounds().is_some(),
            HoverTarget::MeasureControl {
                measure: Some(index), ..
            } => index < self.project.grid.measure_count(),
            HoverTarget::MeasureControl { measure: None, button } => button == ControlButton::Insert,
            HoverTarget::TempoMarker(id) => self.project.tempo.get(id).is_some(),
        };
        if live {
            hover
        } else {
            debug!(?hover, "stale hover target ignored");
            HoverTarget::None
        }
    }

    fn current_hover(&self) -> HoverTarget {
        self.validated(self.hover)
    }

    /// Runs one frame.
    ///
    /// While playing this advances the playhead and the notes under it;
    /// while dragging it moves the dragged object to the snapped pointer
    /// position; in Normal it records the hover target.
    ///
    /// # Arguments
    ///
    /// * `input` - Timing, pointer and hover for this frame
    /// * `sound` - Receives note transitions during playback
    pub fn update_frame(&mut self, input: FrameInput, sound: &mut dyn SoundEngine) -> FrameOutput {
        let previous_px = self.pointer_px;
        self.pointer = input.pointer;
        self.pointer_px = input.pointer_px;
        self.modifiers = input.modifiers;
        let mut out = FrameOutput::default();

        match self.state {
            EditState::Playing | EditState::PlayingCapture => {
                let capture = self.state == EditState::PlayingCapture;
                let dt = if capture { self.config.capture_step_seconds } else { input.dt };
                let x = self.playhead.advance(dt, &self.project.tempo);
                let started = self.project.play_notes(x, sound);
                for id in &started {
                    if let Some(note) = self.project.note(*id) {
                        self.phantoms.push(PhantomNote {
                            source: *id,
                            start_x: note.x,
                            width: note.width,
                            y: note.y,
                        });
                    }
                }
                self.phantoms.retain(|p| !p.is_expired(x));
                out.playhead = Some(x);
                out.capture_frame = capture;
                out.started = started;
            }
            EditState::Normal => {
                self.hover = self.validated(input.hover);
                if let HoverTarget::Note {
                    id,
                    edge: NoteEdge::Body,
                } = self.hover
                {
                    if self.modifiers.shift {
                        if let Some(note) = self.project.note(id) {
                            self.status = note.velocity.value().to_string();
                        }
                    }
                }
            }
            EditState::DragNote => self.drag_note(),
            EditState::ResizeNote { edge } => self.resize_note(edge),
            EditState::DragSelection => self.drag_selection(),
            EditState::DragTempoNode => self.drag_tempo(),
            EditState::Selecting => {
                self.selection.resize(self.pointer);
                self.selection.update_candidates(self.project.tracks_mut());
            }
            EditState::DragView => {
                let mut pan = previous_px.minus(self.pointer_px);
                if self.modifiers.shift {
                    pan.y = 0.0;
                }
                out.pan = pan;
            }
            EditState::ControlSetting {
                which: ControlKind::InsertMeasureOptions,
            } if self.modifiers.ctrl => {
                let dx = self.pointer_px.x - previous_px.x;
                if dx != 0.0 {
                    self.controls.insert_numerator.step(if dx > 0.0 { 1 } else { -1 }, 1);
                    self.status = self.controls.insert_signature_text();
                }
            }
            EditState::ControlSetting { .. } => {}
        }
        out
    }

    fn drag_note(&mut self) {
        let Some(id) = self.drag.note else {
            return;
        };
        let Some(width) = self.project.note(id).map(|n| n.width) else {
            self.set_state(EditState::Normal);
            return;
        };
        let target = self.pointer.minus(self.drag.grab_offset);
        let x = self.project.grid.closest_grid_x(target.x, width);
        let y = self.project.grid.closest_grid_y(target.y);
        if let Some(note) = self.project.note_mut(id) {
            if note.x != x || note.y != y {
                note.x = x;
                note.y = y;
                self.drag.changed = true;
            }
        }
        self.project.resort_owner(id);
        self.selection.refresh_bounds(self.project.tracks());
    }

    fn resize_note(&mut self, edge: ResizeEdge) {
        let Some(id) = self.drag.note else {
            return;
        };
        if self.project.note(id).is_none() {
            self.set_state(EditState::Normal);
            return;
        }
        let to = self.project.grid.closest_grid_x(self.pointer.x, 0.0);
        let (start, end) = (self.drag.note_start, self.drag.note_end);
        let Some(note) = self.project.note_mut(id) else {
            return;
        };
        match edge {
            ResizeEdge::Right if to != end && to > start => {
                note.width = to - start;
                self.drag.note_end = to;
                self.drag.changed = true;
            }
            ResizeEdge::Left if to != start && to < end => {
                note.x = to;
                note.width = end - to;
                self.drag.note_start = to;
                self.drag.changed = true;
            }
            _ => return,
        }
        self.project.resort_owner(id);
        self.selection.refresh_bounds(self.project.tracks());
    }

    fn drag_selection(&mut self) {
        let Some(bounds) = self.selection.bounds() else {
            self.set_state(EditState::Normal);
            return;
        };
        let padding = self.selection.padding();
        let target = self.pointer.minus(self.drag.grab_offset);
        let grid = &self.project.grid;
        let x = grid.closest_grid_x(target.x, bounds.width() - 2.0 * padding);
        let centre_y = grid.closest_grid_y_padded(
            target.y,
            self.drag.row_offset,
            bounds.height() - 2.0 * padding - self.config.note_height,
        );
        let origin = Point::new(x - padding, centre_y - bounds.height() / 2.0);
        if self.selection.move_to(origin, self.project.tracks_mut()) {
            self.drag.changed = true;
        }
    }

    fn drag_tempo(&mut self) {
        let Some(id) = self.drag.marker else {
            return;
        };
        let x = self.project.grid.closest_grid_x(self.pointer.x, 0.0);
        if self.project.tempo.move_to(id, x) {
            self.drag.changed = true;
        }
    }

    /// Applies one discrete input.
    ///
    /// # Arguments
    ///
    /// * `event` - The input
    /// * `modifiers` - Modifier keys held while it happened
    /// * `sound` - Silenced when playback stops
    pub fn handle_event(&mut self, event: InputEvent, modifiers: Modifiers, sound: &mut dyn SoundEngine) {
        self.modifiers = modifiers;
        match event {
            InputEvent::PointerDown {
                button: PointerButton::Left,
                at,
            } => {
                self.pointer = at;
                self.left_down();
            }
            InputEvent::PointerDown {
                button: PointerButton::Right,
                at,
            } => {
                self.pointer = at;
                self.right_down = true;
                self.right_pressed();
            }
            InputEvent::PointerUp {
                button: PointerButton::Left,
                at,
            } => {
                self.pointer = at;
                if self.state == EditState::DragView {
                    // Finish whatever the pan interrupted, then keep panning.
                    self.state = self.resume_state;
                    self.left_up();
                    self.resume_state = self.state;
                    self.state = EditState::DragView;
                } else {
                    self.left_up();
                }
            }
            InputEvent::PointerUp {
                button: PointerButton::Right,
                ..
            } => {
                self.right_down = false;
                self.right_released();
            }
            InputEvent::Scroll { up } => self.scroll(if up { 1 } else { -1 }),
            InputEvent::KeyDown(key) => self.key_down(key, sound),
        }
    }

    fn left_down(&mut self) {
        if self.state != EditState::Normal {
            return;
        }
        match self.current_hover() {
            HoverTarget::Note { id, edge } => {
                let Some(note) = self.project.note(id) else {
                    return;
                };
                let (grab_offset, note_start, note_end) =
                    (self.pointer.minus(note.position()), note.x, note.right());
                let (state, description) = match edge {
                    NoteEdge::Body => (EditState::DragNote, "Move note"),
                    NoteEdge::Left => (
                        EditState::ResizeNote {
                            edge: ResizeEdge::Left,
                        },
                        "Resize note",
                    ),
                    NoteEdge::Right => (
                        EditState::ResizeNote {
                            edge: ResizeEdge::Right,
                        },
                        "Resize note",
                    ),
                };
                self.drag = DragAnchor {
                    note: Some(id),
                    grab_offset,
                    note_start,
                    note_end,
                    before: Some(self.snapshot(description)),
                    ..DragAnchor::default()
                };
                self.set_state(state);
            }
            HoverTarget::Selection => {
                let Some(bounds) = self.selection.bounds() else {
                    return;
                };
                let centre_y = bounds.center_y();
                let reference = Point::new(bounds.left + self.selection.padding(), centre_y);
                self.drag = DragAnchor {
                    grab_offset: self.pointer.minus(reference),
                    row_offset: centre_y - self.project.grid.closest_grid_y(centre_y),
                    before: Some(self.snapshot("Move selection")),
                    ..DragAnchor::default()
                };
                self.set_state(EditState::DragSelection);
            }
            HoverTarget::MeasureControl { measure, button } if !self.right_down => match button {
                ControlButton::Insert => {
                    self.control_target = measure;
                    self.set_state(EditState::ControlSetting {
                        which: ControlKind::InsertMeasures,
                    });
                    self.status = self.controls.measures_to_add.value().to_string();
                }
                ControlButton::Delete => {
                    let Some(index) = measure else {
                        return;
                    };
                    if self.controls.is_armed(index) {
                        self.delete_measures(index);
                    } else {
                        self.controls.measures_to_delete.reset();
                        self.controls.reset_deletions();
                        self.control_target = Some(index);
                        self.update_delete_preview();
                        self.set_state(EditState::ControlSetting {
                            which: ControlKind::DeleteMeasure,
                        });
                        self.status = self.controls.measures_to_delete.value().to_string();
                    }
                }
            },
            HoverTarget::MeasureControl { .. } => {}
            HoverTarget::TempoMarker(id) => {
                if self.modifiers.shift {
                    self.record("Toggle tempo connection");
                    if let Some(connected) = self.project.tempo.toggle_connected(id) {
                        debug!(marker = id.as_u64(), connected, "tempo connection toggled");
                    }
                } else {
                    self.drag = DragAnchor {
                        marker: Some(id),
                        before: Some(self.snapshot("Move tempo marker")),
                        ..DragAnchor::default()
                    };
                    self.set_state(EditState::DragTempoNode);
                }
            }
            HoverTarget::None => {
                self.project.grid.set_cursor(self.pointer);
                self.selection.begin_rectangle(self.pointer);
                self.set_state(EditState::Selecting);
            }
        }
    }

    fn left_up(&mut self) {
        match self.state {
            EditState::Selecting => {
                self.selection.commit(self.modifiers.ctrl, self.project.tracks_mut());
                self.set_state(EditState::Normal);
            }
            EditState::DragNote
            | EditState::ResizeNote { .. }
            | EditState::DragSelection
            | EditState::DragTempoNode => {
                let drag = std::mem::take(&mut self.drag);
                if drag.changed {
                    if let Some(before) = drag.before {
                        debug!(edit = %before.description, "drag committed");
                        self.history.push_undo(before);
                    }
                }
                self.set_state(EditState::Normal);
            }
            EditState::ControlSetting {
                which: ControlKind::InsertMeasures,
            } => {
                self.insert_measure_copies();
                self.set_state(EditState::Normal);
            }
            EditState::ControlSetting {
                which: ControlKind::DeleteMeasure,
            } => {
                if let Some(index) = self.control_target {
                    if !self.controls.is_armed(index) {
                        self.controls.arm(index);
                    }
                }
                self.set_state(EditState::Normal);
            }
            // Waits for the right button.
            EditState::ControlSetting {
                which: ControlKind::InsertMeasureOptions,
            } => {}
            EditState::Normal | EditState::DragView | EditState::Playing | EditState::PlayingCapture => {}
        }
    }

    fn right_pressed(&mut self) {
        if self.state.is_playing() || self.state == EditState::DragView {
            return;
        }
        match self.current_hover() {
            HoverTarget::MeasureControl {
                measure,
                button: ControlButton::Insert,
            } if self.state == EditState::Normal => {
                self.control_target = measure;
                self.set_state(EditState::ControlSetting {
                    which: ControlKind::InsertMeasureOptions,
                });
                self.status = self.controls.insert_signature_text();
            }
            HoverTarget::MeasureControl {
                measure: Some(index),
                button: ControlButton::Delete,
            } if self.controls.is_armed(index) => {
                self.controls.reset_deletions();
            }
            _ => {
                self.resume_state = self.state;
                self.set_state(EditState::DragView);
            }
        }
    }

    fn right_released(&mut self) {
        match self.state {
            EditState::ControlSetting {
                which: ControlKind::InsertMeasureOptions,
            } => {
                self.insert_measure_with_options();
                self.set_state(EditState::Normal);
            }
            EditState::DragView => {
                let resume = self.resume_state;
                self.set_state(resume);
            }
            _ => {}
        }
    }

    fn scroll(&mut self, delta: i32) {
        match self.state {
            EditState::ControlSetting {
                which: ControlKind::InsertMeasures,
            } => {
                let value = self.controls.measures_to_add.step(delta, 1);
                self.set_status(value.to_string());
            }
            EditState::ControlSetting {
                which: ControlKind::InsertMeasureOptions,
            } => {
                if delta > 0 {
                    self.controls.insert_denominator.times_two();
                } else {
                    self.controls.insert_denominator.div_two();
                }
                self.status = self.controls.insert_signature_text();
            }
            EditState::ControlSetting {
                which: ControlKind::DeleteMeasure,
            } => {
                let value = self.controls.measures_to_delete.step(delta, 1);
                self.update_delete_preview();
                self.set_status(value.to_string());
            }
            EditState::Normal => match self.current_hover() {
                HoverTarget::Note {
                    id,
                    edge: NoteEdge::Body,
                } => self.adjust_note(id, delta),
                HoverTarget::TempoMarker(id) => {
                    let amount = if self.modifiers.shift { 1 } else { TEMPO_STEP };
                    if let Some(bpm) = self.project.tempo.adjust_bpm(id, delta, amount) {
                        self.controls.last_tempo.set(bpm);
                        self.set_status(bpm.to_string());
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    /// Wheel over a note: velocity with shift, track colour with ctrl.
    fn adjust_note(&mut self, id: NoteId, delta: i32) {
        let Some(index) = self.project.track_of(id) else {
            return;
        };
        let m = self.modifiers;
        let Some(track) = self.project.track_at_mut(index) else {
            return;
        };
        let step = delta as f32 * COLOR_STEP;
        match (m.ctrl, m.shift, m.alt) {
            (false, true, false) | (true, true, false) => {
                let Some(note) = track.get_note_mut(id) else {
                    return;
                };
                let velocity = note.velocity.step(delta, 1);
                if m.ctrl {
                    track.set_velocities_after(id);
                }
                self.set_status(velocity.to_string());
            }
            (true, false, false) => {
                track.color.shift_hue(step);
            }
            (true, false, true) => {
                track.color.saturation.add(step);
            }
            (true, true, true) => {
                track.color.brightness.add(step);
            }
            _ => {}
        }
    }

    fn key_down(&mut self, key: Key, sound: &mut dyn SoundEngine) {
        match key {
            Key::Space => {
                if self.state == EditState::Normal {
                    self.start_playback(self.modifiers.ctrl);
                } else if self.state.is_playing() {
                    self.stop_playback(sound);
                }
            }
            _ if self.state != EditState::Normal => {}
            Key::Delete => self.delete_hovered_or_selected(),
            Key::Plus if self.modifiers.ctrl => {
                let units = self.controls.smallest_units.times_two();
                self.project.grid.set_subdivision(units as u32);
                self.set_status(units.to_string());
            }
            Key::Minus if self.modifiers.ctrl => {
                let units = self.controls.smallest_units.div_two();
                self.project.grid.set_subdivision(units as u32);
                self.set_status(units.to_string());
            }
            Key::Char(c) if self.modifiers.ctrl => match c.to_ascii_lowercase() {
                't' => self.insert_tempo_marker(),
                'c' => {
                    let copied = self.selection.copy(self.project.tracks());
                    self.set_status(format!("Copied {} notes", copied));
                }
                'x' => {
                    if !self.selection.is_empty() {
                        self.record("Cut");
                        let cut = self.selection.cut(self.project.tracks_mut());
                        self.set_status(format!("Cut {} notes", cut));
                    }
                }
                'v' => self.paste(),
                'z' => {
                    self.undo();
                }
                'y' => {
                    self.redo();
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn start_playback(&mut self, capture: bool) {
        let x = self.project.grid.cursor().x;
        let bpm = self.project.tempo.effective_tempo(x, self.playhead.bpm());
        self.playhead.start(x, bpm, self.config.pre_roll_seconds);
        self.phantoms.clear();
        self.set_state(if capture {
            EditState::PlayingCapture
        } else {
            EditState::Playing
        });
        info!(x, bpm, capture, "playback started");
    }

    fn stop_playback(&mut self, sound: &mut dyn SoundEngine) {
        self.set_state(EditState::Normal);
        self.project.stop_all_notes(sound);
        self.phantoms.clear();
        info!(x = self.playhead.x(), "playback stopped");
    }

    fn delete_hovered_or_selected(&mut self) {
        if let HoverTarget::TempoMarker(id) = self.current_hover() {
            self.record("Delete tempo marker");
            self.project.tempo.delete(id);
            self.hover = HoverTarget::None;
        } else if !self.selection.is_empty() {
            self.record("Delete notes");
            let removed = self.selection.delete_committed(self.project.tracks_mut());
            self.set_status(format!("Deleted {} notes", removed));
        }
    }

    fn insert_tempo_marker(&mut self) {
        self.controls.reset_deletions();
        self.record("Insert tempo marker");
        let bpm = self.controls.last_tempo.value();
        let x = self.project.grid.cursor().x;
        self.project.tempo.insert(bpm, x, false);
        self.set_status(bpm.to_string());
    }

    /// Pastes with the lowest note centred on the cursor row.
    fn paste(&mut self) {
        if self.selection.clipboard_len() == 0 {
            return;
        }
        self.controls.reset_deletions();
        self.record("Paste");
        let cursor = self.project.grid.cursor();
        let target = Point::new(cursor.x, cursor.y - self.config.note_height / 2.0);
        let pasted = self.selection.paste(target, self.project.tracks_mut());
        self.set_status(format!("Pasted {} notes", pasted.len()));
    }

    /// The measure that `control_target` refers to, falling back to the
    /// last measure and then to the configured default.
    fn template_measure(&self) -> (usize, Measure) {
        let measures = self.project.grid.measures();
        match self.control_target {
            Some(index) if index < measures.len() => (index, measures[index]),
            _ => (
                measures.len(),
                measures.last().copied().unwrap_or_else(|| self.config.default_measure()),
            ),
        }
    }

    /// Inserts `measures_to_add` copies of the target measure after it, or
    /// at the end for the end control.
    fn insert_measure_copies(&mut self) {
        let (index, template) = self.template_measure();
        let position = if self.control_target.is_some() { index + 1 } else { index };
        let count = self.controls.measures_to_add.value() as usize;
        self.controls.reset_deletions();
        self.record("Insert measures");
        for _ in 0..count {
            self.project
                .insert_measure(position, template.numerator, template.denominator, template.subdivision);
        }
        self.selection.refresh_bounds(self.project.tracks());
        self.controls.measures_to_add.reset();
        info!(position, count, "measures inserted");
    }

    /// Inserts one measure with the chosen signature at the target.
    fn insert_measure_with_options(&mut self) {
        let (position, template) = self.template_measure();
        let numerator = self.controls.insert_numerator.value() as u32;
        let denominator = self.controls.insert_denominator.value() as u32;
        self.controls.reset_deletions();
        self.record("Insert measure");
        self.project
            .insert_measure(position, numerator, denominator, template.subdivision);
        self.selection.refresh_bounds(self.project.tracks());
    }

    fn update_delete_preview(&mut self) {
        let span = self.control_target.and_then(|index| {
            self.project
                .grid
                .delete_preview_span(index, self.controls.measures_to_delete.value() as usize)
        });
        self.controls.set_delete_preview(span);
    }

    fn delete_measures(&mut self, index: usize) {
        let count = self.controls.measures_to_delete.value() as usize;
        let before = self.snapshot("Delete measures");
        if self
            .project
            .delete_measures(index, count, &mut self.selection)
            .is_some()
        {
            self.history.push_undo(before);
        }
        self.controls.reset_deletions();
        self.hover = HoverTarget::None;
    }

    /// Restores the state before the last edit.
    ///
    /// # Returns
    ///
    /// true if there was something to undo
    pub fn undo(&mut self) -> bool {
        let Some(prev_state) = self.history.pop_undo() else {
            self.set_status("Nothing to undo");
            return false;
        };
        let description = prev_state.description.clone();
        let valid_notes = prev_state.valid_selected_notes();

        let current = self.snapshot(&description);
        self.history.push_redo(current);

        self.project = prev_state.project;
        self.selection.restore(&valid_notes, self.project.tracks_mut());
        self.controls.reset_deletions();
        self.hover = HoverTarget::None;
        info!(edit = %description, "undo");
        self.set_status(format!("Undo: {}", description));
        true
    }

    /// Re-applies the last undone edit.
    ///
    /// # Returns
    ///
    /// true if there was something to redo
    pub fn redo(&mut self) -> bool {
        let Some(next_state) = self.history.pop_redo() else {
            self.set_status("Nothing to redo");
            return false;
        };
        let description = next_state.description.clone();
        let valid_notes = next_state.valid_selected_notes();

        // Keep the remaining redo states.
        let current = self.snapshot(&description);
        self.history.push_undo_preserve_redo(current);

        self.project = next_state.project;
        self.selection.restore(&valid_notes, self.project.tracks_mut());
        self.controls.reset_deletions();
        self.hover = HoverTarget::None;
        info!(edit = %description, "redo");
        self.set_status(format!("Redo: {}", description));
        true
    }
}
