//! Entry points for scripted tools (input generators, bots) that edit the
//! timeline.
//!
//! Every `do_*` call performs its edit immediately and hands back the command,
//! so a tool can batch several edits and decide what to register for undo.

use log::{error, info, warn};

use crate::error::TimelineResult;
use crate::ops::commands::{AddSnippet, AddTrack, Command, DeleteSnippets, EditInputs};
use crate::ops::history::UndoManager;
use crate::physics::PhysicsWorld;
use crate::types::input::PlayerInput;
use crate::types::snippet::SnippetId;
use crate::types::timeline::TimelineModel;
use crate::types::track::{PlayerInfo, Track, TrackSettings};

pub struct TimelineApi<'a, W: PhysicsWorld> {
    model: &'a mut TimelineModel<W>,
    history: &'a mut UndoManager,
}

impl<'a, W: PhysicsWorld> TimelineApi<'a, W> {
    pub fn new(model: &'a mut TimelineModel<W>, history: &'a mut UndoManager) -> Self {
        TimelineApi { model, history }
    }

    pub fn get_current_tick(&self) -> i32 {
        self.model.current_tick()
    }

    pub fn get_track_count(&self) -> usize {
        self.model.track_count()
    }

    pub fn get_track(&self, index: usize) -> Option<&Track> {
        self.model.track(index)
    }

    pub fn get_selected_track(&self) -> Option<usize> {
        self.model.selected_track()
    }

    /// Simulated world after `tick` ticks of the committed inputs.
    pub fn get_world_state_at(&mut self, tick: i32) -> W {
        self.model.world_state_at_tick(tick)
    }

    pub fn do_create_track(&mut self, info: PlayerInfo) -> TimelineResult<(AddTrack, usize)> {
        let cmd = AddTrack::apply(
            self.model,
            TrackSettings {
                player_info: info,
                ..TrackSettings::default()
            },
        )?;
        let index = cmd.index;
        Ok((cmd, index))
    }

    pub fn do_create_snippet(
        &mut self,
        track: usize,
        start_tick: i32,
        duration: i32,
    ) -> TimelineResult<(AddSnippet, SnippetId)> {
        let cmd = AddSnippet::apply(self.model, track, start_tick, duration)?;
        let id = cmd.snippet.id;
        Ok((cmd, id))
    }

    pub fn do_delete_snippet(&mut self, id: SnippetId) -> TimelineResult<DeleteSnippets> {
        DeleteSnippets::apply(self.model, &[id])
    }

    /// Overwrites `inputs.len()` ticks of a snippet starting at `offset`.
    pub fn do_set_inputs(
        &mut self,
        id: SnippetId,
        offset: usize,
        inputs: &[PlayerInput],
    ) -> TimelineResult<EditInputs> {
        EditInputs::apply_range(self.model, id, offset, inputs)
    }

    pub fn register_undo_command(&mut self, command: impl Into<Command>) {
        self.history.register(command);
    }

    pub fn log_info(&self, tool: &str, message: &str) {
        info!(target: "tasline::tool", "[{}] {}", tool, message);
    }

    pub fn log_warning(&self, tool: &str, message: &str) {
        warn!(target: "tasline::tool", "[{}] {}", tool, message);
    }

    pub fn log_error(&self, tool: &str, message: &str) {
        error!(target: "tasline::tool", "[{}] {}", tool, message);
    }
}
