//! Snapshot undo/redo for timeline edits.
//!
//! Every committed edit stores a full copy of the project taken just before
//! it.

use crate::midi::{NoteId, Project};
use std::collections::{HashSet, VecDeque};

/// Depth of both the undo and the redo stack.
const MAX_HISTORY_SIZE: usize = 8;

/// The project and committed selection as they were before an edit.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub project: Project,

    /// Committed selection at snapshot time, by note ID.
    pub selected_notes: HashSet<NoteId>,

    /// Name of the edit, shown as "Undo: ..." / "Redo: ...".
    pub description: String,
}

impl StateSnapshot {
    /// Captures `project` and `selected_notes`.
    ///
    /// # Arguments
    ///
    /// * `project` - Project to copy
    /// * `selected_notes` - The committed selection
    /// * `description` - Name of the edit about to happen
    pub fn new(project: &Project, selected_notes: &HashSet<NoteId>, description: impl Into<String>) -> Self {
        Self {
            project: project.clone(),
            selected_notes: selected_notes.clone(),
            description: description.into(),
        }
    }

    /// The stored selection minus IDs whose notes are not in the stored
    /// project.
    pub fn valid_selected_notes(&self) -> HashSet<NoteId> {
        self.selected_notes
            .iter()
            .copied()
            .filter(|id| self.project.note(*id).is_some())
            .collect()
    }
}

/// Bounded undo and redo stacks.
///
/// The oldest entry is dropped once a stack holds more than
/// `MAX_HISTORY_SIZE` snapshots. Recording a fresh edit discards the redo
/// stack.
#[derive(Debug, Default)]
pub struct HistoryManager {
    undo_stack: VecDeque<StateSnapshot>,
    redo_stack: VecDeque<StateSnapshot>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(MAX_HISTORY_SIZE + 1),
            redo_stack: VecDeque::with_capacity(MAX_HISTORY_SIZE + 1),
        }
    }

    fn push_bounded(stack: &mut VecDeque<StateSnapshot>, snapshot: StateSnapshot) {
        stack.push_back(snapshot);
        while stack.len() > MAX_HISTORY_SIZE {
            stack.pop_front();
        }
    }

    /// Records the state before a new edit. Clears redo.
    pub fn push_undo(&mut self, snapshot: StateSnapshot) {
        self.redo_stack.clear();
        Self::push_bounded(&mut self.undo_stack, snapshot);
    }

    /// Records an undo entry while keeping the redo stack, for redo itself.
    pub fn push_undo_preserve_redo(&mut self, snapshot: StateSnapshot) {
        Self::push_bounded(&mut self.undo_stack, snapshot);
    }

    /// Takes the newest undo entry. The caller pushes the current state to
    /// redo before restoring it.
    pub fn pop_undo(&mut self) -> Option<StateSnapshot> {
        self.undo_stack.pop_back()
    }

    pub fn push_redo(&mut self, snapshot: StateSnapshot) {
        Self::push_bounded(&mut self.redo_stack, snapshot);
    }

    pub fn pop_redo(&mut self) -> Option<StateSnapshot> {
        self.redo_stack.pop_back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Name of the edit the next undo would revert.
    pub fn next_undo(&self) -> Option<&str> {
        self.undo_stack.back().map(|s| s.description.as_str())
    }

    /// Drops both stacks, e.g. after loading a different file.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    #[cfg(test)]
    fn depths(&self) -> (usize, usize) {
        (self.undo_stack.len(), self.redo_stack.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::midi::Note;

    fn snapshot(project: &Project, description: &str) -> StateSnapshot {
        StateSnapshot::new(project, &HashSet::new(), description)
    }

    fn project() -> Project {
        Project::with_default_track("Test", &EditorConfig::default())
    }

    #[test]
    fn test_push_and_pop() {
        let mut history = HistoryManager::new();
        assert!(!history.can_undo());
        history.push_undo(snapshot(&project(), "Insert measures"));

        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.next_undo(), Some("Insert measures"));

        let restored = history.pop_undo().unwrap();
        assert_eq!(restored.description, "Insert measures");
        assert_eq!(history.depths(), (0, 0));
    }

    #[test]
    fn test_oldest_entries_are_dropped() {
        let mut history = HistoryManager::new();
        let project = project();
        for i in 0..MAX_HISTORY_SIZE + 3 {
            history.push_undo(snapshot(&project, &format!("Edit {}", i)));
        }
        assert_eq!(history.depths().0, MAX_HISTORY_SIZE);

        let mut descriptions = Vec::new();
        while let Some(s) = history.pop_undo() {
            descriptions.push(s.description);
        }
        assert_eq!(descriptions.first().map(String::as_str), Some("Edit 10"));
        assert_eq!(descriptions.last().map(String::as_str), Some("Edit 3"));
    }

    #[test]
    fn test_new_edit_discards_redo() {
        let mut history = HistoryManager::new();
        let project = project();
        history.push_undo(snapshot(&project, "Paste"));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());

        history.push_undo(snapshot(&project, "Delete notes"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_redo_keeps_remaining_entries() {
        let mut history = HistoryManager::new();
        let project = project();
        for i in 0..3 {
            history.push_undo(snapshot(&project, &format!("Edit {}", i)));
        }
        for _ in 0..3 {
            let undone = history.pop_undo().unwrap();
            history.push_redo(undone);
        }
        assert_eq!(history.depths(), (0, 3));

        let redone = history.pop_redo().unwrap();
        assert_eq!(redone.description, "Edit 0");
        history.push_undo_preserve_redo(redone);
        assert_eq!(history.depths(), (1, 2));

        history.clear();
        assert_eq!(history.depths(), (0, 0));
    }

    #[test]
    fn test_valid_selected_notes_drops_missing() {
        let mut project = project();
        let kept = project
            .track_at_mut(0)
            .unwrap()
            .add_note(Note::new(0.0, 10.0, 1.0, 1.5, 100));
        let gone = NoteId::new();
        let selected: HashSet<NoteId> = [kept, gone].into_iter().collect();

        let snapshot = StateSnapshot::new(&project, &selected, "Move selection");
        let valid = snapshot.valid_selected_notes();
        assert_eq!(valid.len(), 1);
        assert!(valid.contains(&kept));
    }
}
