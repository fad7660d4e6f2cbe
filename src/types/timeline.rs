use log::{debug, warn};

use crate::error::{TimelineError, TimelineResult};
use crate::ops::layers::{
    find_available_layer, layers_are_disjoint, solve_snippet_layers, stack_size,
};
use crate::physics::PhysicsWorld;
use crate::physics::replay_cache::PhysicsReplayCache;
use crate::types::input::PlayerInput;
use crate::types::selection::SnippetIdSet;
use crate::types::snippet::{Snippet, SnippetId};
use crate::types::track::{StartingConfig, Track, TrackSettings};

/// The editing session's timeline: tracks of snippets, the replay cache built
/// from them, playhead and selection.
///
/// All snippet and track edits are methods here so that the replay cache is
/// invalidated on every change that could alter the simulation.
#[derive(Debug, Clone)]
pub struct TimelineModel<W: PhysicsWorld> {
    tracks: Vec<Track>,
    next_snippet_id: u32,
    cache: PhysicsReplayCache<W>,
    current_tick: i32,
    recording: bool,
    recording_start_tick: i32,
    selected_track: Option<usize>,
    pub selection: SnippetIdSet,
}

/// Input lookup shared by the model and the replay loop.
fn lookup_input(tracks: &[Track], recording: bool, track_index: usize, tick: i32) -> PlayerInput {
    let Some(track) = tracks.get(track_index) else {
        return PlayerInput::NONE;
    };

    if recording {
        if let Some(input) = track
            .recording_snippets()
            .iter()
            .find_map(|s| s.input_at(tick))
        {
            return *input;
        }
    }

    if let Some(input) = track
        .snippets()
        .iter()
        .filter(|s| s.is_active)
        .find_map(|s| s.input_at(tick))
    {
        return *input;
    }

    // Nothing covers the tick: hold the last input of the latest snippet that
    // ended at or before it.
    let recorded = if recording {
        track.recording_snippets()
    } else {
        &[]
    };
    track
        .snippets()
        .iter()
        .chain(recorded.iter())
        .filter(|s| !s.is_empty() && s.end_tick() <= tick)
        .max_by_key(|s| (s.end_tick(), s.is_active, s.id))
        .and_then(|s| s.last_input())
        .copied()
        .unwrap_or(PlayerInput::NONE)
}

impl<W: PhysicsWorld> TimelineModel<W> {
    /// Starts an empty timeline over `world`, the spawn state at tick 0.
    pub fn new(world: W) -> Self {
        TimelineModel {
            tracks: Vec::new(),
            next_snippet_id: 1,
            cache: PhysicsReplayCache::new(&world),
            current_tick: 0,
            recording: false,
            recording_start_tick: 0,
            selected_track: None,
            selection: SnippetIdSet::new(),
        }
    }

    /// Rebuilds a timeline from loaded tracks. The world gets one character per track.
    pub fn from_tracks(world: W, tracks: Vec<Track>) -> TimelineResult<Self> {
        let mut model = Self::new(world);
        for track in tracks {
            let index = model.tracks.len();
            model.insert_track(index, track)?;
        }
        Ok(model)
    }

    // --- queries -------------------------------------------------------------

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn current_tick(&self) -> i32 {
        self.current_tick
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn recording_start_tick(&self) -> i32 {
        self.recording_start_tick
    }

    pub fn selected_track(&self) -> Option<usize> {
        self.selected_track
    }

    pub fn next_snippet_id(&self) -> SnippetId {
        SnippetId(self.next_snippet_id)
    }

    pub fn replay_cache(&self) -> &PhysicsReplayCache<W> {
        &self.cache
    }

    /// Spawn state of the world, one character per track.
    pub fn base_world(&self) -> &W {
        self.cache.base()
    }

    pub fn is_snippet_selected(&self, id: SnippetId) -> bool {
        self.selection.contains(id)
    }

    pub fn find_snippet_by_id(&self, id: SnippetId) -> Option<(usize, &Snippet)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(i, t)| t.find_snippet(id).map(|s| (i, s)))
    }

    pub fn stack_size_at_tick_range(&self, track: usize, start: i32, end: i32) -> usize {
        self.tracks
            .get(track)
            .map(|t| stack_size(t.snippets(), start, end))
            .unwrap_or(1)
    }

    pub fn find_available_layer(
        &self,
        track: usize,
        start: i32,
        end: i32,
        exclude: Option<SnippetId>,
    ) -> Option<u8> {
        self.tracks
            .get(track)
            .and_then(|t| find_available_layer(t.snippets(), start, end, exclude))
    }

    /// Largest end tick over all committed snippets.
    pub fn max_timeline_tick(&self) -> i32 {
        self.tracks.iter().map(Track::last_tick).max().unwrap_or(0)
    }

    pub fn input_at_tick(&self, track: usize, tick: i32) -> PlayerInput {
        lookup_input(&self.tracks, self.recording, track, tick)
    }

    /// Replays the timeline up to `tick`, reusing cached checkpoints.
    pub fn world_state_at_tick(&mut self, tick: i32) -> W {
        let tracks = &self.tracks;
        let recording = self.recording;
        self.cache
            .world_at(tick.max(0), |p, t| lookup_input(tracks, recording, p, t))
    }

    pub fn current_world(&mut self) -> W {
        self.world_state_at_tick(self.current_tick)
    }

    // --- invalidation --------------------------------------------------------

    /// Drops cached physics that may depend on inputs at or after `tick`.
    pub fn recalc_physics(&mut self, tick: i32) {
        self.cache.invalidate_from(tick);
    }

    // --- ids -----------------------------------------------------------------

    pub fn allocate_snippet_id(&mut self) -> SnippetId {
        let id = SnippetId(self.next_snippet_id);
        self.next_snippet_id += 1;
        id
    }

    fn note_snippet_id(&mut self, id: SnippetId) {
        if id.0 >= self.next_snippet_id {
            self.next_snippet_id = id.0 + 1;
        }
    }

    fn check_track(&self, index: usize) -> TimelineResult<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(TimelineError::TrackOutOfRange {
                index,
                count: self.tracks.len(),
            })
        }
    }

    fn locate(&self, id: SnippetId) -> TimelineResult<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(t, track)| track.snippet_index(id).map(|i| (t, i)))
            .ok_or(TimelineError::SnippetNotFound(id))
    }

    fn snippet_mut(&mut self, id: SnippetId) -> TimelineResult<&mut Snippet> {
        let (t, i) = self.locate(id)?;
        Ok(&mut self.tracks[t].snippets_mut()[i])
    }

    // --- snippet edits -------------------------------------------------------

    /// Appends `snippet` to a track. Layers are left as given.
    pub fn insert_snippet(&mut self, track: usize, snippet: Snippet) -> TimelineResult<()> {
        let len = self.tracks.get(track).map(|t| t.snippets().len()).unwrap_or(0);
        self.insert_snippet_at(track, len, snippet)
    }

    /// Inserts at a specific array position, clamped to the track length.
    pub fn insert_snippet_at(
        &mut self,
        track: usize,
        position: usize,
        snippet: Snippet,
    ) -> TimelineResult<()> {
        self.check_track(track)?;
        let start = snippet.start_tick;
        self.note_snippet_id(snippet.id);
        let snippets = self.tracks[track].snippets_mut();
        let position = position.min(snippets.len());
        snippets.insert(position, snippet);
        self.recalc_physics(start);
        Ok(())
    }

    /// Removes a snippet by id, returning it with its former array position.
    pub fn remove_snippet(
        &mut self,
        track: usize,
        id: SnippetId,
    ) -> TimelineResult<(usize, Snippet)> {
        self.check_track(track)?;
        let position = self.tracks[track]
            .snippet_index(id)
            .ok_or(TimelineError::SnippetNotFound(id))?;
        let snippet = self.tracks[track].snippets_mut().remove(position);
        self.selection.remove(id);
        self.recalc_physics(snippet.start_tick);
        Ok((position, snippet))
    }

    /// Changes a snippet's length. A non-positive duration empties it; the caller
    /// then removes it.
    pub fn resize_snippet(&mut self, id: SnippetId, new_duration: i32) -> TimelineResult<()> {
        let snippet = self.snippet_mut(id)?;
        let old_end = snippet.end_tick();
        snippet.resize(new_duration);
        let new_end = snippet.end_tick();
        self.recalc_physics(old_end.min(new_end));
        Ok(())
    }

    /// Moves a snippet to another track/tick/layer.
    pub fn move_snippet(
        &mut self,
        id: SnippetId,
        to_track: usize,
        start_tick: i32,
        layer: u8,
    ) -> TimelineResult<()> {
        self.check_track(to_track)?;
        let (from_track, position) = self.locate(id)?;
        let mut snippet = self.tracks[from_track].snippets_mut().remove(position);
        let old_start = snippet.start_tick;
        snippet.start_tick = start_tick;
        snippet.layer = layer;
        if from_track == to_track {
            self.tracks[to_track].snippets_mut().insert(position, snippet);
        } else {
            self.tracks[to_track].snippets_mut().push(snippet);
        }
        self.recalc_physics(old_start.min(start_tick));
        Ok(())
    }

    pub fn set_snippet_layer(&mut self, id: SnippetId, layer: u8) -> TimelineResult<()> {
        self.snippet_mut(id)?.layer = layer;
        Ok(())
    }

    pub fn set_snippet_active(&mut self, id: SnippetId, active: bool) -> TimelineResult<()> {
        let snippet = self.snippet_mut(id)?;
        let start = snippet.start_tick;
        if snippet.is_active != active {
            snippet.is_active = active;
            self.recalc_physics(start);
        }
        Ok(())
    }

    /// Activates a snippet and deactivates every active sibling overlapping it.
    /// Returns the ids that were switched off.
    pub fn activate_snippet(&mut self, track: usize, id: SnippetId) -> TimelineResult<Vec<SnippetId>> {
        self.check_track(track)?;
        let target = self.tracks[track]
            .find_snippet(id)
            .ok_or(TimelineError::SnippetNotFound(id))?;
        let (start, end) = (target.start_tick, target.end_tick());

        let mut deactivated = Vec::new();
        for s in self.tracks[track].snippets_mut() {
            if s.id != id && s.is_active && s.overlaps(start, end) {
                s.is_active = false;
                deactivated.push(s.id);
            }
        }
        if let Some(s) = self.tracks[track].find_snippet_mut(id) {
            s.is_active = true;
        }
        self.recalc_physics(start);
        Ok(deactivated)
    }

    /// Overwrites inputs from `offset`, returning the values that were replaced.
    pub fn set_snippet_inputs(
        &mut self,
        id: SnippetId,
        offset: usize,
        inputs: &[PlayerInput],
    ) -> TimelineResult<Vec<PlayerInput>> {
        let snippet = self.snippet_mut(id)?;
        let end = offset + inputs.len();
        let len = snippet.inputs().len();
        if end > len {
            return Err(TimelineError::InputRange { offset, end, len });
        }
        let before = snippet.inputs()[offset..end].to_vec();
        snippet.write_inputs(offset, inputs);
        let tick = snippet.start_tick + offset as i32;
        self.recalc_physics(tick);
        Ok(before)
    }

    /// Cuts a snippet at `offset`, returning the removed tail.
    pub fn truncate_snippet(&mut self, id: SnippetId, offset: usize) -> TimelineResult<Vec<PlayerInput>> {
        let snippet = self.snippet_mut(id)?;
        let tail = snippet.split_off_inputs(offset);
        let end = snippet.end_tick();
        self.recalc_physics(end);
        Ok(tail)
    }

    pub fn append_snippet_inputs(&mut self, id: SnippetId, inputs: &[PlayerInput]) -> TimelineResult<()> {
        let snippet = self.snippet_mut(id)?;
        let end = snippet.end_tick();
        snippet.append_inputs(inputs);
        self.recalc_physics(end);
        Ok(())
    }

    /// Swaps a track's whole committed snippet list, returning the old one.
    pub fn replace_track_snippets(
        &mut self,
        track: usize,
        snippets: Vec<Snippet>,
    ) -> TimelineResult<Vec<Snippet>> {
        self.check_track(track)?;
        for s in &snippets {
            self.note_snippet_id(s.id);
        }
        let old = std::mem::replace(self.tracks[track].snippets_mut(), snippets);
        let first = old
            .iter()
            .chain(self.tracks[track].snippets().iter())
            .map(|s| s.start_tick)
            .min()
            .unwrap_or(0);
        self.recalc_physics(first);
        Ok(old)
    }

    /// Re-packs layers of every snippet on a track.
    pub fn compact_layers(&mut self, track: usize) {
        if let Some(t) = self.tracks.get_mut(track) {
            solve_snippet_layers(t.snippets_mut());
            debug_assert!(layers_are_disjoint(t.snippets()));
        }
    }

    // --- tracks --------------------------------------------------------------

    /// Appends `count` tracks and their characters. Returns the first new index.
    pub fn add_new_track(&mut self, count: usize, settings: TrackSettings) -> TimelineResult<usize> {
        let mut base = self.cache.base().clone();
        if !base.add_characters(count) {
            return Err(TimelineError::CharacterLimit(count));
        }
        let first = self.tracks.len();
        for i in first..first + count {
            base.apply_starting_config(i, &settings.starting_config);
            self.tracks.push(Track::new(settings.clone()));
        }
        self.cache.reset(&base);
        debug!("added {} track(s) at {}", count, first);
        Ok(first)
    }

    /// Removes a track and its character, keeping the selected track pointing at
    /// the same lane.
    pub fn remove_track(&mut self, index: usize) -> TimelineResult<Track> {
        self.check_track(index)?;
        let track = self.tracks.remove(index);
        self.cache.edit_base(|w| w.remove_character(index));
        for s in track.snippets() {
            self.selection.remove(s.id);
        }
        self.selected_track = match self.selected_track {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        debug!("removed track {}", index);
        Ok(track)
    }

    /// Index-preserving inverse of `remove_track`.
    pub fn insert_track(&mut self, index: usize, track: Track) -> TimelineResult<()> {
        if index > self.tracks.len() {
            return Err(TimelineError::TrackOutOfRange {
                index,
                count: self.tracks.len(),
            });
        }
        let mut probe = self.cache.base().clone();
        if !probe.add_characters(1) {
            return Err(TimelineError::CharacterLimit(1));
        }
        for s in track.snippets() {
            self.note_snippet_id(s.id);
        }
        let config = track.settings.starting_config;
        self.cache.edit_base(|w| {
            w.insert_character(index);
            w.apply_starting_config(index, &config);
        });
        self.tracks.insert(index, track);
        if let Some(sel) = self.selected_track {
            if sel >= index {
                self.selected_track = Some(sel + 1);
            }
        }
        Ok(())
    }

    /// Replaces a track's settings, returning the previous ones. A changed
    /// starting config respawns the character and invalidates everything.
    pub fn set_track_settings(
        &mut self,
        index: usize,
        settings: TrackSettings,
    ) -> TimelineResult<TrackSettings> {
        self.check_track(index)?;
        let config = settings.starting_config;
        let old = std::mem::replace(&mut self.tracks[index].settings, settings);
        if old.starting_config != config {
            self.apply_starting_config(index, config);
        }
        Ok(old)
    }

    fn apply_starting_config(&mut self, index: usize, config: StartingConfig) {
        self.cache
            .edit_base(|w| w.apply_starting_config(index, &config));
    }

    pub fn set_selected_track(&mut self, index: Option<usize>) {
        self.selected_track = index.filter(|&i| i < self.tracks.len());
    }

    /// Live input for a track this frame. Used by recording and dummy prediction.
    pub fn set_current_input(&mut self, track: usize, input: PlayerInput) {
        if let Some(t) = self.tracks.get_mut(track) {
            t.current_input = input;
        }
    }

    // --- playhead and recording buffers ---------------------------------------

    /// Moves the playhead by `steps`, never below zero. While recording, the
    /// playhead stays at or after the recording start and every recording
    /// snippet that falls behind it is extended with its track's live input.
    /// Moving backward never overwrites recorded samples.
    pub fn advance_tick(&mut self, steps: i32) {
        let mut tick = (self.current_tick + steps).max(0);
        if self.recording {
            tick = tick.max(self.recording_start_tick);
            let mut first_changed = None;
            for track in &mut self.tracks {
                let input = track.current_input;
                if let Some(snippet) = track.recording_snippets_mut().last_mut() {
                    let end = snippet.end_tick();
                    if tick > end {
                        snippet.extend_with((tick - end) as usize, input);
                        first_changed = Some(first_changed.map_or(end, |f: i32| f.min(end)));
                    }
                }
            }
            if let Some(tick) = first_changed {
                self.recalc_physics(tick);
            }
        }
        self.current_tick = tick;
    }

    pub fn set_current_tick(&mut self, tick: i32) {
        self.advance_tick(tick - self.current_tick);
    }

    /// Opens a recording snippet at the playhead on each listed track.
    pub fn begin_recording(&mut self, targets: &[usize]) -> TimelineResult<()> {
        if self.recording {
            return Err(TimelineError::AlreadyRecording);
        }
        for &t in targets {
            self.check_track(t)?;
        }
        self.recording = true;
        self.recording_start_tick = self.current_tick;
        for &t in targets {
            self.open_recording_snippet(t);
        }
        Ok(())
    }

    /// Starts a recording snippet on `track` unless it already has one.
    pub fn open_recording_snippet(&mut self, track: usize) -> bool {
        if !self.recording || track >= self.tracks.len() {
            return false;
        }
        if !self.tracks[track].recording_snippets().is_empty() {
            return false;
        }
        let id = self.allocate_snippet_id();
        let snippet = Snippet::new(id, self.current_tick, 0);
        self.tracks[track].recording_snippets_mut().push(snippet);
        true
    }

    /// Cuts every recording snippet so it ends at `tick`, dropping those that
    /// start after it. Tracks left without a snippet ending at `tick` get a fresh
    /// one so recording carries on from there.
    pub fn trim_recording(&mut self, tick: i32) -> TimelineResult<()> {
        if !self.recording {
            return Err(TimelineError::NotRecording);
        }
        let tick = tick.max(self.recording_start_tick);
        for t in 0..self.tracks.len() {
            let buffer = self.tracks[t].recording_snippets_mut();
            if buffer.is_empty() {
                continue;
            }
            buffer.retain(|s| s.start_tick <= tick);
            for snippet in buffer.iter_mut() {
                let keep = (tick - snippet.start_tick) as usize;
                snippet.split_off_inputs(keep);
            }
            buffer.retain(|s| !s.is_empty() || s.start_tick == tick);
            // Only the last buffer snippet is extended by `advance_tick`.
            if let Some(pos) = buffer.iter().position(|s| s.end_tick() == tick) {
                let open = buffer.remove(pos);
                buffer.push(open);
            } else {
                let id = self.allocate_snippet_id();
                self.tracks[t]
                    .recording_snippets_mut()
                    .push(Snippet::new(id, tick, 0));
            }
        }
        self.recalc_physics(tick);
        self.current_tick = tick;
        Ok(())
    }

    /// Leaves recording mode, handing back every track's recorded snippets.
    pub fn end_recording(&mut self) -> TimelineResult<Vec<(usize, Vec<Snippet>)>> {
        if !self.recording {
            return Err(TimelineError::NotRecording);
        }
        let buffers = self
            .tracks
            .iter_mut()
            .enumerate()
            .filter_map(|(i, t)| {
                let taken = std::mem::take(t.recording_snippets_mut());
                (!taken.is_empty()).then_some((i, taken))
            })
            .collect();
        self.recording = false;
        self.recalc_physics(self.recording_start_tick);
        Ok(buffers)
    }

    /// Leaves recording mode and throws the recorded samples away.
    pub fn discard_recording(&mut self) -> TimelineResult<()> {
        let dropped = self.end_recording()?;
        if !dropped.is_empty() {
            warn!("discarded recordings on {} track(s)", dropped.len());
        }
        Ok(())
    }
}
