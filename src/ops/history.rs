//! Command-based undo/redo.
//!
//! Commands have already been applied when they are registered, so the
//! manager only ever calls `undo`/`redo` on them.

use log::{debug, error};

use crate::error::TimelineResult;
use crate::ops::commands::{Command, UndoableCommand};
use crate::physics::PhysicsWorld;
use crate::types::timeline::TimelineModel;

#[derive(Debug, Clone, Default)]
pub struct UndoManager {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Oldest entries are dropped past this depth. `None` keeps everything.
    max_depth: Option<usize>,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        UndoManager {
            max_depth: Some(max_depth.max(1)),
            ..Self::default()
        }
    }

    /// Records an already-applied command. Starts a new branch, so redo is lost.
    pub fn register(&mut self, command: impl Into<Command>) {
        let command = command.into();
        debug!("history: {}", command.label());
        self.redo_stack.clear();
        self.undo_stack.push(command);
        if let Some(max) = self.max_depth {
            if self.undo_stack.len() > max {
                let excess = self.undo_stack.len() - max;
                self.undo_stack.drain(..excess);
            }
        }
    }

    /// Reverts the latest command. Returns its label, or `None` if there is
    /// nothing to undo. A command that fails stays on top of its stack so it
    /// can be retried.
    pub fn undo<W: PhysicsWorld>(&mut self, model: &mut TimelineModel<W>) -> TimelineResult<Option<String>> {
        let Some(command) = self.undo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = command.undo(model) {
            error!("undo of '{}' failed: {}", command.label(), err);
            self.undo_stack.push(command);
            return Err(err);
        }
        let label = command.label();
        debug!("undo: {} ({} left)", label, self.undo_stack.len());
        self.redo_stack.push(command);
        Ok(Some(label))
    }

    pub fn redo<W: PhysicsWorld>(&mut self, model: &mut TimelineModel<W>) -> TimelineResult<Option<String>> {
        let Some(command) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = command.redo(model) {
            error!("redo of '{}' failed: {}", command.label(), err);
            self.redo_stack.push(command);
            return Err(err);
        }
        let label = command.label();
        debug!("redo: {}", label);
        self.undo_stack.push(command);
        Ok(Some(label))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.label())
    }

    pub fn redo_label(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.label())
    }

    /// Labels of undoable commands, newest first.
    pub fn undo_labels(&self) -> impl Iterator<Item = String> + '_ {
        self.undo_stack.iter().rev().map(|c| c.label())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::commands::tests::{canonical, model_with_tracks};
    use crate::error::TimelineError;
    use crate::ops::commands::{AddSnippet, DeleteSnippets};

    #[test]
    fn test_undo_redo_sequence() {
        let mut model = model_with_tracks(1);
        let mut history = UndoManager::new();
        let empty = canonical(&model);

        let add = AddSnippet::apply(&mut model, 0, 0, 10).unwrap();
        let id = add.snippet.id;
        history.register(add);
        let added = canonical(&model);
        history.register(DeleteSnippets::apply(&mut model, &[id]).unwrap());

        assert_eq!(history.undo(&mut model).unwrap().as_deref(), Some("Delete 1 snippet(s)"));
        assert_eq!(canonical(&model), added);
        history.undo(&mut model).unwrap();
        assert_eq!(canonical(&model), empty);
        assert_eq!(history.undo(&mut model).unwrap(), None);
        assert!(!history.can_undo());

        history.redo(&mut model).unwrap();
        assert_eq!(canonical(&model), added);
        assert!(history.can_redo());
    }

    #[test]
    fn test_failed_undo_keeps_the_command() {
        let mut model = model_with_tracks(1);
        let mut history = UndoManager::new();
        let add = AddSnippet::apply(&mut model, 0, 0, 10).unwrap();
        let id = add.snippet.id;
        history.register(add);

        let (_, snippet) = model.remove_snippet(0, id).unwrap();
        assert_eq!(
            history.undo(&mut model).unwrap_err(),
            TimelineError::SnippetNotFound(id)
        );
        assert_eq!(history.undo_depth(), 1);
        assert!(!history.can_redo());

        model.insert_snippet(0, snippet).unwrap();
        assert!(history.undo(&mut model).unwrap().is_some());
        assert!(model.find_snippet_by_id(id).is_none());

        model.remove_track(0).unwrap();
        assert!(matches!(
            history.redo(&mut model),
            Err(TimelineError::TrackOutOfRange { index: 0, count: 0 })
        ));
        assert!(history.can_redo());
        assert_eq!(history.undo_depth(), 0);
    }

    #[test]
    fn test_register_clears_redo() {
        let mut model = model_with_tracks(1);
        let mut history = UndoManager::new();
        history.register(AddSnippet::apply(&mut model, 0, 0, 10).unwrap());
        history.undo(&mut model).unwrap();
        assert!(history.can_redo());
        history.register(AddSnippet::apply(&mut model, 0, 20, 10).unwrap());
        assert!(!history.can_redo());
        assert_eq!(history.redo(&mut model).unwrap(), None);
    }

    #[test]
    fn test_max_depth_drops_oldest() {
        let mut model = model_with_tracks(1);
        let mut history = UndoManager::with_max_depth(2);
        for i in 0..4 {
            history.register(AddSnippet::apply(&mut model, 0, i * 10, 5).unwrap());
        }
        assert_eq!(history.undo_depth(), 2);
        history.undo(&mut model).unwrap();
        history.undo(&mut model).unwrap();
        assert!(!history.can_undo());
        assert_eq!(model.track(0).unwrap().snippets().len(), 2);
    }
}
