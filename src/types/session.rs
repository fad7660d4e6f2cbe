use log::{info, warn};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::error::{ProjectResult, TimelineError, TimelineResult};
use crate::ops::commands::{
    AddSnippet, AddTrack, Command, DeleteSnippets, MergeSnippets, MultiSplit, RemoveTrack,
    ToggleActive,
};
use crate::ops::history::UndoManager;
use crate::ops::interaction::{HeldControls, Shortcut, TimelineInteraction};
use crate::ops::recording;
use crate::physics::PhysicsWorld;
use crate::types::config::EditorConfig;
use crate::types::playback_state::PlaybackState;
use crate::types::project::{load_project, save_project};
use crate::types::timeline::TimelineModel;
use crate::types::track::TrackSettings;

/// EditorSession groups the timeline with everything the editor keeps around
/// it: undo history, pointer state, playback and the loaded config.
/// Only the timeline is saved to project files.
#[derive(Debug, Clone)]
pub struct EditorSession<W: PhysicsWorld> {
    pub model: TimelineModel<W>,
    pub history: UndoManager,
    pub interaction: TimelineInteraction,
    pub playback: PlaybackState,
    pub config: EditorConfig,
    pub project_path: Option<PathBuf>,
    /// Message of the last refused operation, shown in the status bar.
    pub last_error: Option<String>,
    pub dirty: bool,
}

impl<W: PhysicsWorld> EditorSession<W> {
    pub fn new(model: TimelineModel<W>, config: EditorConfig) -> Self {
        let mut playback = PlaybackState::new(config.playback_speed);
        playback.auto_scroll = config.auto_scroll;
        EditorSession {
            model,
            history: UndoManager::with_max_depth(config.max_undo_depth),
            interaction: TimelineInteraction::new(&config),
            playback,
            config,
            project_path: None,
            last_error: None,
            dirty: false,
        }
    }

    pub fn report(&mut self, err: impl Display) {
        warn!("{}", err);
        self.last_error = Some(err.to_string());
    }

    /// Registers a successful edit for undo or reports why it was refused.
    pub fn execute<C: Into<Command>>(&mut self, result: TimelineResult<C>) -> bool {
        match result {
            Ok(cmd) => {
                self.history.register(cmd);
                self.last_error = None;
                self.dirty = true;
                true
            }
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    pub fn undo(&mut self) {
        if self.model.is_recording() {
            self.report(TimelineError::AlreadyRecording);
            return;
        }
        match self.history.undo(&mut self.model) {
            Ok(Some(_)) => self.dirty = true,
            Ok(None) => {}
            Err(err) => self.report(err),
        }
    }

    pub fn redo(&mut self) {
        if self.model.is_recording() {
            self.report(TimelineError::AlreadyRecording);
            return;
        }
        match self.history.redo(&mut self.model) {
            Ok(Some(_)) => self.dirty = true,
            Ok(None) => {}
            Err(err) => self.report(err),
        }
    }

    /// Adds a neutral snippet of the configured length at the playhead on the
    /// selected track.
    pub fn add_snippet_at_playhead(&mut self) -> bool {
        let tick = self.model.current_tick();
        let duration = self.config.default_snippet_duration;
        let result = self
            .model
            .selected_track()
            .ok_or(TimelineError::NothingSelected)
            .and_then(|track| AddSnippet::apply(&mut self.model, track, tick, duration));
        self.execute(result)
    }

    pub fn add_track(&mut self, settings: TrackSettings) -> bool {
        let result = AddTrack::apply(&mut self.model, settings);
        self.execute(result)
    }

    pub fn remove_selected_track(&mut self) -> bool {
        let result = self
            .model
            .selected_track()
            .ok_or(TimelineError::NothingSelected)
            .and_then(|index| RemoveTrack::apply(&mut self.model, index));
        self.execute(result)
    }

    pub fn split_selected(&mut self) -> bool {
        let result = MultiSplit::apply(&mut self.model);
        self.execute(result)
    }

    pub fn merge_selected(&mut self) -> bool {
        let result = MergeSnippets::apply(&mut self.model);
        self.execute(result)
    }

    pub fn delete_selected(&mut self) -> bool {
        let result = DeleteSnippets::apply_selected(&mut self.model);
        self.execute(result)
    }

    pub fn toggle_selected_active(&mut self) -> bool {
        let result = ToggleActive::apply_selected(&mut self.model);
        self.execute(result)
    }

    pub fn select_all(&mut self) {
        let ids: Vec<_> = self
            .model
            .tracks()
            .iter()
            .flat_map(|t| t.snippets().iter().map(|s| s.id))
            .collect();
        self.model.selection.clear();
        for id in ids {
            self.model.selection.add(id);
        }
    }

    /// Selects a track, or while recording hands the recording over to it.
    pub fn switch_track(&mut self, track: usize) {
        if track >= self.model.track_count() {
            return;
        }
        if self.model.is_recording() {
            if let Err(err) = recording::switch_recording_target(&mut self.model, track) {
                self.report(err);
            }
        } else {
            self.model.set_selected_track(Some(track));
        }
    }

    /// Sets the recorded track's live input from what the user holds this frame.
    pub fn set_live_input(&mut self, controls: &HeldControls) {
        if !self.model.is_recording() {
            return;
        }
        let Some(track) = self.model.selected_track() else {
            return;
        };
        let previous = self
            .model
            .track(track)
            .map(|t| t.current_input)
            .unwrap_or_default();
        self.model.set_current_input(track, controls.to_input(previous));
    }

    pub fn change_playback_speed(&mut self, delta: i32) {
        let speed = (self.playback.playback_speed as i32 + delta).clamp(1, 1000) as u32;
        self.playback.playback_speed = speed;
        self.config.playback_speed = speed;
    }

    pub fn toggle_recording(&mut self) {
        match recording::toggle_recording(&mut self.model) {
            Ok(Some(commit)) => {
                self.execute(Ok(commit));
            }
            Ok(None) => self.last_error = None,
            Err(err) => self.report(err),
        }
    }

    pub fn cancel_recording(&mut self) {
        if let Err(err) = recording::cancel_recording(&mut self.model) {
            self.report(err);
        }
    }

    pub fn trim_recording(&mut self) {
        if let Err(err) = recording::trim_recording(&mut self.model) {
            self.report(err);
        }
    }

    /// Steps the playhead by hand. Stops playback first.
    pub fn step(&mut self, ticks: i32) {
        self.playback.stop();
        self.model.advance_tick(ticks);
    }

    pub fn run_shortcut(&mut self, shortcut: Shortcut) {
        match shortcut {
            Shortcut::Undo => self.undo(),
            Shortcut::Redo => self.redo(),
            Shortcut::SplitSelected => {
                self.split_selected();
            }
            Shortcut::MergeSelected => {
                self.merge_selected();
            }
            Shortcut::DeleteSelected => {
                self.delete_selected();
            }
            Shortcut::AddSnippet => {
                self.add_snippet_at_playhead();
            }
            Shortcut::SelectAll => self.select_all(),
            Shortcut::ToggleSelectedActive => {
                self.toggle_selected_active();
            }
            Shortcut::ToggleDummyCopy => {
                self.config.dummy_copy_enabled = !self.config.dummy_copy_enabled;
                info!("dummy copy {}", if self.config.dummy_copy_enabled { "on" } else { "off" });
            }
            Shortcut::FasterPlayback => self.change_playback_speed(5),
            Shortcut::SlowerPlayback => self.change_playback_speed(-5),
            Shortcut::SwitchTrack(track) => self.switch_track(track),
            Shortcut::ToggleRecording => self.toggle_recording(),
            Shortcut::StopRecording => {
                if self.model.is_recording() {
                    self.toggle_recording();
                }
            }
            Shortcut::CancelRecording => self.cancel_recording(),
            Shortcut::TrimRecording => self.trim_recording(),
            Shortcut::TogglePlayback => self.playback.toggle_play(),
            Shortcut::StepForward => self.step(1),
            Shortcut::StepBackward => self.step(-1),
        }
    }

    /// Per-frame update: dummy inputs while recording, then however many
    /// playback ticks are due. Returns the signed number of ticks stepped.
    pub fn update(&mut self, dt: f64, fire_held: bool) -> i32 {
        if self.model.is_recording() {
            recording::apply_dummy_inputs(&mut self.model, &self.config, fire_held);
        }
        let steps = self.playback.steps_due(dt);
        if steps != 0 {
            self.model.advance_tick(steps);
        }
        if self.playback.is_reversing && self.model.current_tick() == 0 {
            self.playback.stop();
        }
        steps
    }

    /// Replaces the timeline with an empty one over `world`.
    pub fn new_project(&mut self, world: W) {
        self.model = TimelineModel::new(world);
        self.history.clear();
        self.playback.stop();
        self.project_path = None;
        self.last_error = None;
        self.dirty = false;
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> ProjectResult<()> {
        save_project(path.as_ref(), &self.model)?;
        self.project_path = Some(path.as_ref().to_path_buf());
        self.dirty = false;
        Ok(())
    }

    /// Loads a project over `world`. The current timeline is kept on failure.
    pub fn load(&mut self, path: impl AsRef<Path>, world: W) -> ProjectResult<()> {
        let model = load_project(path.as_ref(), world)?;
        self.model = model;
        self.history.clear();
        self.playback.stop();
        self.interaction.drag = Default::default();
        self.project_path = Some(path.as_ref().to_path_buf());
        self.last_error = None;
        self.dirty = false;
        info!("session now editing {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::commands::tests::{Model, canonical, model_with_tracks};
    use crate::physics::sandbox::SandboxWorld;
    use crate::types::input::PlayerInput;

    fn session(tracks: usize) -> EditorSession<SandboxWorld> {
        EditorSession::new(model_with_tracks(tracks), EditorConfig::default())
    }

    fn snippet_spans(model: &Model, track: usize) -> Vec<(i32, i32)> {
        let mut spans: Vec<(i32, i32)> = model.tracks()[track]
            .snippets()
            .iter()
            .map(|s| (s.start_tick, s.end_tick()))
            .collect();
        spans.sort_unstable();
        spans
    }

    #[test]
    fn test_shortcuts_edit_and_undo() {
        let mut s = session(1);
        s.model.set_selected_track(Some(0));
        s.run_shortcut(Shortcut::AddSnippet);
        assert_eq!(snippet_spans(&s.model, 0), vec![(0, 50)]);

        let id = s.model.tracks()[0].snippets()[0].id;
        s.model.selection.add(id);
        s.model.set_current_tick(20);
        s.run_shortcut(Shortcut::SplitSelected);
        assert_eq!(snippet_spans(&s.model, 0), vec![(0, 20), (20, 50)]);
        assert!(s.dirty);

        s.run_shortcut(Shortcut::Undo);
        assert_eq!(snippet_spans(&s.model, 0), vec![(0, 50)]);
        s.run_shortcut(Shortcut::Redo);
        assert_eq!(snippet_spans(&s.model, 0), vec![(0, 20), (20, 50)]);
        assert_eq!(s.history.undo_depth(), 2);
    }

    #[test]
    fn test_refused_edit_sets_last_error() {
        let mut s = session(1);
        s.run_shortcut(Shortcut::AddSnippet);
        assert!(s.last_error.is_some());
        s.run_shortcut(Shortcut::MergeSelected);
        assert!(s.last_error.is_some());
        assert!(!s.history.can_undo());

        s.model.set_selected_track(Some(0));
        s.run_shortcut(Shortcut::AddSnippet);
        assert!(s.last_error.is_none());
    }

    #[test]
    fn test_record_while_playing_then_undo() {
        let mut s = session(1);
        s.model.set_selected_track(Some(0));
        s.run_shortcut(Shortcut::ToggleRecording);
        assert!(s.model.is_recording());

        s.model
            .set_current_input(0, PlayerInput::default().with_direction(1));
        s.run_shortcut(Shortcut::TogglePlayback);
        assert_eq!(s.update(0.1, false), 5);
        assert_eq!(s.model.current_tick(), 5);

        s.run_shortcut(Shortcut::Undo);
        assert!(s.model.is_recording());

        s.run_shortcut(Shortcut::StopRecording);
        assert!(!s.model.is_recording());
        assert_eq!(snippet_spans(&s.model, 0), vec![(0, 5)]);
        assert_eq!(s.model.input_at_tick(0, 3).direction, 1);

        s.run_shortcut(Shortcut::Undo);
        assert!(s.model.tracks()[0].snippets().is_empty());
    }

    #[test]
    fn test_live_controls_drive_recording() {
        let mut s = session(2);
        s.model.set_selected_track(Some(0));
        s.run_shortcut(Shortcut::ToggleRecording);
        let right = HeldControls {
            right: true,
            ..HeldControls::default()
        };
        s.set_live_input(&right);
        s.step(3);
        s.run_shortcut(Shortcut::SwitchTrack(1));
        assert_eq!(s.model.selected_track(), Some(1));
        s.set_live_input(&HeldControls::default());
        s.step(2);
        s.run_shortcut(Shortcut::StopRecording);

        assert_eq!(snippet_spans(&s.model, 0), vec![(0, 5)]);
        assert_eq!(snippet_spans(&s.model, 1), vec![(3, 5)]);
        assert_eq!(s.model.input_at_tick(0, 1).direction, 1);
        assert_eq!(s.history.undo_depth(), 1);
    }

    #[test]
    fn test_select_all_and_toggle_active() {
        let mut s = session(2);
        s.model.set_selected_track(Some(0));
        s.add_snippet_at_playhead();
        s.model.set_selected_track(Some(1));
        s.add_snippet_at_playhead();
        s.run_shortcut(Shortcut::SelectAll);
        assert_eq!(s.model.selection.len(), 2);
        s.run_shortcut(Shortcut::ToggleSelectedActive);
        assert!(s.model.tracks().iter().all(|t| !t.snippets()[0].is_active));
        s.run_shortcut(Shortcut::Undo);
        assert!(s.model.tracks().iter().all(|t| t.snippets()[0].is_active));
    }

    #[test]
    fn test_reverse_stops_at_zero() {
        let mut s = session(1);
        s.model.set_current_tick(3);
        s.playback.set_reversing(true);
        s.update(1.0, false);
        assert_eq!(s.model.current_tick(), 0);
        assert!(!s.playback.is_running());
    }

    #[test]
    fn test_save_and_load_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.tasl");
        let mut s = session(2);
        s.model.set_selected_track(Some(1));
        s.add_snippet_at_playhead();
        s.save(&path).unwrap();
        assert!(!s.dirty);

        let mut other = session(0);
        other.load(&path, SandboxWorld::new()).unwrap();
        assert_eq!(canonical(&other.model), canonical(&s.model));
        assert_eq!(other.project_path.as_deref(), Some(path.as_path()));
        assert!(!other.history.can_undo());

        let missing = dir.path().join("missing.tasl");
        assert!(other.load(&missing, SandboxWorld::new()).is_err());
        assert_eq!(other.model.track_count(), 2);
    }
}
