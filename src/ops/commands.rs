//! Reversible timeline edits.
//!
//! Every command is built by an `apply` constructor that performs the edit right
//! away and keeps owned copies of whatever it needs to undo it. A constructor
//! that returns `Err` has changed nothing.

use log::{debug, warn};

use crate::error::{TimelineError, TimelineResult};
use crate::ops::layers::{SpanPreview, find_available_layer};
use crate::ops::snippet_ops::{adjacent_runs, cut_snippet_at};
use crate::physics::PhysicsWorld;
use crate::types::input::PlayerInput;
use crate::types::snippet::{Snippet, SnippetId};
use crate::types::timeline::TimelineModel;
use crate::types::track::{Track, TrackSettings};

pub trait UndoableCommand {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()>;
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()>;
    fn label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddSnippet(AddSnippet),
    DeleteSnippets(DeleteSnippets),
    MoveSnippets(MoveSnippets),
    DuplicateSnippets(DuplicateSnippets),
    MultiSplit(MultiSplit),
    MergeSnippets(MergeSnippets),
    AddTrack(AddTrack),
    RemoveTrack(RemoveTrack),
    EditInputs(EditInputs),
    ActivateSnippet(ActivateSnippet),
    ToggleActive(ToggleActive),
    CommitRecording(CommitRecording),
    EditTrackSettings(EditTrackSettings),
}

macro_rules! dispatch {
    ($self:ident, $cmd:ident => $body:expr) => {
        match $self {
            Command::AddSnippet($cmd) => $body,
            Command::DeleteSnippets($cmd) => $body,
            Command::MoveSnippets($cmd) => $body,
            Command::DuplicateSnippets($cmd) => $body,
            Command::MultiSplit($cmd) => $body,
            Command::MergeSnippets($cmd) => $body,
            Command::AddTrack($cmd) => $body,
            Command::RemoveTrack($cmd) => $body,
            Command::EditInputs($cmd) => $body,
            Command::ActivateSnippet($cmd) => $body,
            Command::ToggleActive($cmd) => $body,
            Command::CommitRecording($cmd) => $body,
            Command::EditTrackSettings($cmd) => $body,
        }
    };
}

impl UndoableCommand for Command {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        dispatch!(self, c => c.undo(model))
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        dispatch!(self, c => c.redo(model))
    }
    fn label(&self) -> String {
        dispatch!(self, c => c.label())
    }
}

macro_rules! impl_from_command {
    ($($kind:ident),* $(,)?) => {
        $(impl From<$kind> for Command {
            fn from(c: $kind) -> Self {
                Command::$kind(c)
            }
        })*
    };
}

impl_from_command!(
    AddSnippet,
    DeleteSnippets,
    MoveSnippets,
    DuplicateSnippets,
    MultiSplit,
    MergeSnippets,
    AddTrack,
    RemoveTrack,
    EditInputs,
    ActivateSnippet,
    ToggleActive,
    CommitRecording,
    EditTrackSettings,
);

/// Layers of every snippet on a track, so compaction can be reverted exactly.
#[derive(Debug, Clone, PartialEq)]
struct LayerSnapshot {
    track: usize,
    layers: Vec<(SnippetId, u8)>,
}

fn snapshot_layers<W: PhysicsWorld>(model: &TimelineModel<W>, tracks: &[usize]) -> Vec<LayerSnapshot> {
    tracks
        .iter()
        .filter_map(|&t| {
            model.track(t).map(|track| LayerSnapshot {
                track: t,
                layers: track.snippets().iter().map(|s| (s.id, s.layer)).collect(),
            })
        })
        .collect()
}

fn restore_layers<W: PhysicsWorld>(model: &mut TimelineModel<W>, snapshots: &[LayerSnapshot]) {
    for snap in snapshots {
        for &(id, layer) in &snap.layers {
            if model.set_snippet_layer(id, layer).is_err() {
                warn!("layer restore: snippet {} is gone", id);
            }
        }
    }
}

fn touched(tracks: impl IntoIterator<Item = usize>) -> Vec<usize> {
    let mut out: Vec<usize> = tracks.into_iter().collect();
    out.sort_unstable();
    out.dedup();
    out
}

// --- AddSnippet ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AddSnippet {
    pub track: usize,
    pub snippet: Snippet,
}

impl AddSnippet {
    /// Adds `duration` neutral ticks at `start_tick` on the lowest free layer.
    pub fn apply<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        track: usize,
        start_tick: i32,
        duration: i32,
    ) -> TimelineResult<Self> {
        if duration <= 0 {
            return Err(TimelineError::InvalidDuration(duration));
        }
        Self::apply_inputs(
            model,
            track,
            start_tick,
            vec![PlayerInput::default(); duration as usize],
        )
    }

    pub fn apply_inputs<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        track: usize,
        start_tick: i32,
        inputs: Vec<PlayerInput>,
    ) -> TimelineResult<Self> {
        if inputs.is_empty() {
            return Err(TimelineError::InvalidDuration(0));
        }
        if track >= model.track_count() {
            return Err(TimelineError::TrackOutOfRange {
                index: track,
                count: model.track_count(),
            });
        }
        let start = start_tick.max(0);
        let end = start + inputs.len() as i32;
        let layer = model
            .find_available_layer(track, start, end, None)
            .ok_or(TimelineError::NoFreeLayer { track, start, end })?;

        let id = model.allocate_snippet_id();
        let mut snippet = Snippet::from_inputs(id, start, inputs);
        snippet.layer = layer;
        model.insert_snippet(track, snippet.clone())?;
        debug!("added snippet {} on track {} at {}..{}", id, track, start, end);
        Ok(AddSnippet { track, snippet })
    }
}

impl UndoableCommand for AddSnippet {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.remove_snippet(self.track, self.snippet.id).map(|_| ())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.insert_snippet(self.track, self.snippet.clone())
    }
    fn label(&self) -> String {
        format!("Add snippet {}", self.snippet.id)
    }
}

// --- DeleteSnippets -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedSnippet {
    pub track: usize,
    pub position: usize,
    pub snippet: Snippet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSnippets {
    pub deleted: Vec<DeletedSnippet>,
}

impl DeleteSnippets {
    pub fn apply<W: PhysicsWorld>(model: &mut TimelineModel<W>, ids: &[SnippetId]) -> TimelineResult<Self> {
        let targets: Vec<(usize, SnippetId)> = ids
            .iter()
            .filter_map(|&id| match model.find_snippet_by_id(id) {
                Some((track, _)) => Some((track, id)),
                None => {
                    warn!("delete: snippet {} no longer exists", id);
                    None
                }
            })
            .collect();
        if targets.is_empty() {
            return Err(TimelineError::NothingSelected);
        }

        let mut deleted = Vec::with_capacity(targets.len());
        for (track, id) in targets {
            let (position, snippet) = model.remove_snippet(track, id)?;
            deleted.push(DeletedSnippet {
                track,
                position,
                snippet,
            });
        }
        Ok(DeleteSnippets { deleted })
    }

    pub fn apply_selected<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<Self> {
        let ids: Vec<SnippetId> = model.selection.iter().collect();
        let cmd = Self::apply(model, &ids)?;
        model.selection.clear();
        Ok(cmd)
    }
}

impl UndoableCommand for DeleteSnippets {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for d in self.deleted.iter().rev() {
            model.insert_snippet_at(d.track, d.position, d.snippet.clone())?;
        }
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for d in &self.deleted {
            model.remove_snippet(d.track, d.snippet.id)?;
        }
        Ok(())
    }
    fn label(&self) -> String {
        format!("Delete {} snippet(s)", self.deleted.len())
    }
}

// --- MoveSnippets ---------------------------------------------------------------

/// Where a dragged snippet should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub id: SnippetId,
    pub to_track: usize,
    pub to_tick: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetMove {
    pub id: SnippetId,
    pub from_track: usize,
    pub from_tick: i32,
    pub from_layer: u8,
    pub to_track: usize,
    pub to_tick: i32,
    pub to_layer: u8,
}

/// Checks each request in order against the layout left by the requests
/// accepted before it, and keeps the ones that fit.
fn plan_moves<W: PhysicsWorld>(
    model: &TimelineModel<W>,
    requests: &[MoveRequest],
) -> TimelineResult<Vec<SnippetMove>> {
    let mut layout: Vec<Vec<SpanPreview>> = model
        .tracks()
        .iter()
        .map(|t| t.snippets().iter().map(SpanPreview::of).collect())
        .collect();
    let mut planned = Vec::new();
    let mut first_error = None;
    for req in requests {
        if planned.iter().any(|m: &SnippetMove| m.id == req.id) {
            continue;
        }
        let Some((from_track, snippet)) = model.find_snippet_by_id(req.id) else {
            warn!("move: snippet {} no longer exists", req.id);
            first_error.get_or_insert(TimelineError::SnippetNotFound(req.id));
            continue;
        };
        if req.to_track >= model.track_count() {
            first_error.get_or_insert(TimelineError::TrackOutOfRange {
                index: req.to_track,
                count: model.track_count(),
            });
            continue;
        }
        let to_tick = req.to_tick.max(0);
        let end = to_tick + snippet.duration();
        let Some(layer) = find_available_layer(&layout[req.to_track], to_tick, end, Some(req.id)) else {
            debug!("move: no free layer for {} on track {}", req.id, req.to_track);
            first_error.get_or_insert(TimelineError::NoFreeLayer {
                track: req.to_track,
                start: to_tick,
                end,
            });
            continue;
        };
        layout[from_track].retain(|span| span.id != req.id);
        layout[req.to_track].push(SpanPreview {
            id: req.id,
            start: to_tick,
            end,
            layer,
        });
        planned.push(SnippetMove {
            id: req.id,
            from_track,
            from_tick: snippet.start_tick,
            from_layer: snippet.layer,
            to_track: req.to_track,
            to_tick,
            to_layer: layer,
        });
    }
    match (planned.is_empty(), first_error) {
        (true, Some(err)) => Err(err),
        (true, None) => Err(TimelineError::NothingSelected),
        _ => Ok(planned),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveSnippets {
    pub moves: Vec<SnippetMove>,
    /// Active siblings switched off because a moved snippet landed on them.
    pub deactivated: Vec<SnippetId>,
    layers_before: Vec<LayerSnapshot>,
}

impl MoveSnippets {
    /// Moves every request that has a free layer at its destination. Requests
    /// that do not fit are skipped; the call fails only if none fit.
    pub fn apply<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        requests: &[MoveRequest],
    ) -> TimelineResult<Self> {
        let moves = plan_moves(model, requests)?;
        let tracks = touched(moves.iter().flat_map(|m| [m.from_track, m.to_track]));
        let layers_before = snapshot_layers(model, &tracks);

        let moving: Vec<SnippetId> = moves.iter().map(|m| m.id).collect();
        let mut deactivated = Vec::new();
        for m in &moves {
            let Some((_, snippet)) = model.find_snippet_by_id(m.id) else {
                continue;
            };
            if !snippet.is_active {
                continue;
            }
            let end = m.to_tick + snippet.duration();
            let Some(target) = model.track(m.to_track) else {
                continue;
            };
            deactivated.extend(
                target
                    .snippets()
                    .iter()
                    .filter(|o| !moving.contains(&o.id) && o.is_active && o.overlaps(m.to_tick, end))
                    .map(|o| o.id),
            );
        }
        deactivated.sort_unstable();
        deactivated.dedup();

        let cmd = MoveSnippets {
            moves,
            deactivated,
            layers_before,
        };
        cmd.redo(model)?;
        Ok(cmd)
    }

    fn tracks(&self) -> Vec<usize> {
        touched(self.moves.iter().flat_map(|m| [m.from_track, m.to_track]))
    }
}

impl UndoableCommand for MoveSnippets {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for m in self.moves.iter().rev() {
            model.move_snippet(m.id, m.from_track, m.from_tick, m.from_layer)?;
        }
        for &id in &self.deactivated {
            model.set_snippet_active(id, true)?;
        }
        restore_layers(model, &self.layers_before);
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for &id in &self.deactivated {
            model.set_snippet_active(id, false)?;
        }
        for m in &self.moves {
            model.move_snippet(m.id, m.to_track, m.to_tick, m.to_layer)?;
        }
        for t in self.tracks() {
            model.compact_layers(t);
        }
        Ok(())
    }
    fn label(&self) -> String {
        format!("Move {} snippet(s)", self.moves.len())
    }
}

// --- DuplicateSnippets -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateSnippets {
    /// The copies, as inserted.
    pub copies: Vec<(usize, Snippet)>,
}

impl DuplicateSnippets {
    /// Places a copy of each requested snippet at its destination with a fresh id.
    pub fn apply<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        requests: &[MoveRequest],
    ) -> TimelineResult<Self> {
        let mut copies = Vec::new();
        let mut first_error = None;
        for req in requests {
            let Some((_, source)) = model.find_snippet_by_id(req.id) else {
                first_error.get_or_insert(TimelineError::SnippetNotFound(req.id));
                continue;
            };
            let source = source.clone();
            let start = req.to_tick.max(0);
            let end = start + source.duration();
            let Some(layer) = model.find_available_layer(req.to_track, start, end, None) else {
                first_error.get_or_insert(TimelineError::NoFreeLayer {
                    track: req.to_track,
                    start,
                    end,
                });
                continue;
            };
            let mut copy = source;
            copy.id = model.allocate_snippet_id();
            copy.start_tick = start;
            copy.layer = layer;
            model.insert_snippet(req.to_track, copy.clone())?;
            copies.push((req.to_track, copy));
        }
        if copies.is_empty() {
            return Err(first_error.unwrap_or(TimelineError::NothingSelected));
        }
        Ok(DuplicateSnippets { copies })
    }
}

impl UndoableCommand for DuplicateSnippets {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for (track, copy) in self.copies.iter().rev() {
            model.remove_snippet(*track, copy.id)?;
        }
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for (track, copy) in &self.copies {
            model.insert_snippet(*track, copy.clone())?;
        }
        Ok(())
    }
    fn label(&self) -> String {
        format!("Duplicate {} snippet(s)", self.copies.len())
    }
}

// --- MultiSplit --------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    pub track: usize,
    pub original_id: SnippetId,
    pub new_id: SnippetId,
    pub moved_inputs: Vec<PlayerInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiSplit {
    pub split_tick: i32,
    pub splits: Vec<SplitInfo>,
    layers_before: Vec<LayerSnapshot>,
}

impl MultiSplit {
    /// Splits every selected snippet the playhead is strictly inside. The right
    /// halves are added to the selection.
    pub fn apply<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<Self> {
        if model.selection.is_empty() {
            return Err(TimelineError::NothingSelected);
        }
        let split_tick = model.current_tick();
        let selected: Vec<SnippetId> = model.selection.iter().collect();

        let mut splits = Vec::new();
        for id in selected {
            let Some((track, snippet)) = model.find_snippet_by_id(id) else {
                continue;
            };
            let Some((_, right)) = cut_snippet_at(snippet, split_tick, model.next_snippet_id()) else {
                continue;
            };
            let new_id = model.allocate_snippet_id();
            splits.push(SplitInfo {
                track,
                original_id: id,
                new_id,
                moved_inputs: right.inputs().to_vec(),
            });
        }
        if splits.is_empty() {
            return Err(TimelineError::NothingToSplit(split_tick));
        }

        let tracks = touched(splits.iter().map(|s| s.track));
        let cmd = MultiSplit {
            split_tick,
            layers_before: snapshot_layers(model, &tracks),
            splits,
        };
        cmd.redo(model)?;
        Ok(cmd)
    }
}

impl UndoableCommand for MultiSplit {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for info in self.splits.iter().rev() {
            model.remove_snippet(info.track, info.new_id)?;
            model.append_snippet_inputs(info.original_id, &info.moved_inputs)?;
        }
        restore_layers(model, &self.layers_before);
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for info in &self.splits {
            let (_, original) = model
                .find_snippet_by_id(info.original_id)
                .ok_or(TimelineError::SnippetNotFound(info.original_id))?;
            let offset = (self.split_tick - original.start_tick) as usize;
            let mut right = Snippet::from_inputs(info.new_id, self.split_tick, info.moved_inputs.clone());
            right.is_active = original.is_active;
            right.layer = original.layer;

            model.truncate_snippet(info.original_id, offset)?;
            model.insert_snippet(info.track, right)?;
            model.selection.add(info.new_id);
        }
        for snap in &self.layers_before {
            model.compact_layers(snap.track);
        }
        Ok(())
    }
    fn label(&self) -> String {
        format!("Split {} snippet(s) at {}", self.splits.len(), self.split_tick)
    }
}

// --- MergeSnippets -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MergeRun {
    pub target_id: SnippetId,
    pub original_target_end: i32,
    pub absorbed: Vec<Snippet>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeSnippets {
    pub track: usize,
    pub runs: Vec<MergeRun>,
    layers_before: Vec<LayerSnapshot>,
}

impl MergeSnippets {
    /// On the first track holding two or more selected snippets that touch,
    /// glues each chain of adjacent selected snippets into its earliest member.
    pub fn apply<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<Self> {
        if model.selection.len() < 2 {
            return Err(TimelineError::NothingToMerge);
        }
        let (track, runs) = model
            .tracks()
            .iter()
            .enumerate()
            .find_map(|(t, track)| {
                let candidates: Vec<&Snippet> = track
                    .snippets()
                    .iter()
                    .filter(|s| model.selection.contains(s.id))
                    .collect();
                if candidates.len() < 2 {
                    return None;
                }
                let runs = merge_runs(track, adjacent_runs(candidates));
                (!runs.is_empty()).then_some((t, runs))
            })
            .ok_or(TimelineError::NothingToMerge)?;

        let cmd = MergeSnippets {
            track,
            runs,
            layers_before: snapshot_layers(model, &[track]),
        };
        cmd.redo(model)?;
        Ok(cmd)
    }
}

fn merge_runs(track: &Track, chains: Vec<Vec<SnippetId>>) -> Vec<MergeRun> {
    chains
        .into_iter()
        .filter_map(|chain| {
            let (target_id, rest) = chain.split_first()?;
            let target = track.find_snippet(*target_id)?;
            Some(MergeRun {
                target_id: *target_id,
                original_target_end: target.end_tick(),
                absorbed: rest
                    .iter()
                    .filter_map(|id| track.find_snippet(*id).cloned())
                    .collect(),
            })
        })
        .collect()
}

impl UndoableCommand for MergeSnippets {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for run in self.runs.iter().rev() {
            let (_, target) = model
                .find_snippet_by_id(run.target_id)
                .ok_or(TimelineError::SnippetNotFound(run.target_id))?;
            let keep = (run.original_target_end - target.start_tick).max(0) as usize;
            model.truncate_snippet(run.target_id, keep)?;
            for s in &run.absorbed {
                model.insert_snippet(self.track, s.clone())?;
            }
        }
        restore_layers(model, &self.layers_before);
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for run in &self.runs {
            for s in &run.absorbed {
                model.append_snippet_inputs(run.target_id, s.inputs())?;
                model.remove_snippet(self.track, s.id)?;
            }
        }
        model.compact_layers(self.track);
        Ok(())
    }
    fn label(&self) -> String {
        let absorbed: usize = self.runs.iter().map(|r| r.absorbed.len()).sum();
        format!("Merge {} snippet(s)", absorbed + self.runs.len())
    }
}

// --- Tracks ------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AddTrack {
    pub index: usize,
    pub settings: TrackSettings,
}

impl AddTrack {
    pub fn apply<W: PhysicsWorld>(model: &mut TimelineModel<W>, settings: TrackSettings) -> TimelineResult<Self> {
        let index = model.add_new_track(1, settings.clone())?;
        Ok(AddTrack { index, settings })
    }
}

impl UndoableCommand for AddTrack {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.remove_track(self.index).map(|_| ())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.insert_track(self.index, Track::new(self.settings.clone()))
    }
    fn label(&self) -> String {
        format!("Add track '{}'", self.settings.player_info.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveTrack {
    pub index: usize,
    pub track: Track,
    pub was_selected: bool,
}

impl RemoveTrack {
    pub fn apply<W: PhysicsWorld>(model: &mut TimelineModel<W>, index: usize) -> TimelineResult<Self> {
        let was_selected = model.selected_track() == Some(index);
        let track = model.remove_track(index)?;
        Ok(RemoveTrack {
            index,
            track,
            was_selected,
        })
    }
}

impl UndoableCommand for RemoveTrack {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.insert_track(self.index, self.track.clone())?;
        if self.was_selected {
            model.set_selected_track(Some(self.index));
        }
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.remove_track(self.index).map(|_| ())
    }
    fn label(&self) -> String {
        format!("Remove track '{}'", self.track.settings.player_info.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditTrackSettings {
    pub index: usize,
    pub before: TrackSettings,
    pub after: TrackSettings,
}

impl EditTrackSettings {
    pub fn apply<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        index: usize,
        settings: TrackSettings,
    ) -> TimelineResult<Self> {
        let before = model.set_track_settings(index, settings.clone())?;
        Ok(EditTrackSettings {
            index,
            before,
            after: settings,
        })
    }
}

impl UndoableCommand for EditTrackSettings {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.set_track_settings(self.index, self.before.clone()).map(|_| ())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.set_track_settings(self.index, self.after.clone()).map(|_| ())
    }
    fn label(&self) -> String {
        format!("Edit track {}", self.index)
    }
}

// --- EditInputs ------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEdit {
    pub index: usize,
    pub before: PlayerInput,
    pub after: PlayerInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditInputs {
    pub snippet_id: SnippetId,
    pub edits: Vec<InputEdit>,
}

impl EditInputs {
    /// Writes sparse `(index, input)` cells into one snippet.
    pub fn apply<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        snippet_id: SnippetId,
        cells: &[(usize, PlayerInput)],
    ) -> TimelineResult<Self> {
        let (_, snippet) = model
            .find_snippet_by_id(snippet_id)
            .ok_or(TimelineError::SnippetNotFound(snippet_id))?;
        let len = snippet.inputs().len();
        if let Some(&(bad, _)) = cells.iter().find(|(i, _)| *i >= len) {
            return Err(TimelineError::InputRange {
                offset: bad,
                end: bad + 1,
                len,
            });
        }
        if cells.is_empty() {
            return Err(TimelineError::InputRange {
                offset: 0,
                end: 0,
                len,
            });
        }

        let mut edits = Vec::with_capacity(cells.len());
        for &(index, after) in cells {
            let before = model.set_snippet_inputs(snippet_id, index, &[after])?;
            edits.push(InputEdit {
                index,
                before: before[0],
                after,
            });
        }
        Ok(EditInputs { snippet_id, edits })
    }

    /// Overwrites a contiguous run starting at `offset`.
    pub fn apply_range<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        snippet_id: SnippetId,
        offset: usize,
        inputs: &[PlayerInput],
    ) -> TimelineResult<Self> {
        let cells: Vec<(usize, PlayerInput)> = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| (offset + i, *input))
            .collect();
        Self::apply(model, snippet_id, &cells)
    }
}

impl UndoableCommand for EditInputs {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for e in self.edits.iter().rev() {
            model.set_snippet_inputs(self.snippet_id, e.index, &[e.before])?;
        }
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for e in &self.edits {
            model.set_snippet_inputs(self.snippet_id, e.index, &[e.after])?;
        }
        Ok(())
    }
    fn label(&self) -> String {
        format!("Edit {} input(s) of {}", self.edits.len(), self.snippet_id)
    }
}

// --- ActivateSnippet -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ActivateSnippet {
    pub track: usize,
    pub id: SnippetId,
    pub was_active: bool,
    pub deactivated: Vec<SnippetId>,
}

impl ActivateSnippet {
    pub fn apply<W: PhysicsWorld>(model: &mut TimelineModel<W>, id: SnippetId) -> TimelineResult<Self> {
        let (track, snippet) = model
            .find_snippet_by_id(id)
            .ok_or(TimelineError::SnippetNotFound(id))?;
        let was_active = snippet.is_active;
        let deactivated = model.activate_snippet(track, id)?;
        Ok(ActivateSnippet {
            track,
            id,
            was_active,
            deactivated,
        })
    }
}

impl UndoableCommand for ActivateSnippet {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for &other in &self.deactivated {
            model.set_snippet_active(other, true)?;
        }
        model.set_snippet_active(self.id, self.was_active)
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        model.activate_snippet(self.track, self.id).map(|_| ())
    }
    fn label(&self) -> String {
        format!("Activate {}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChange {
    pub track: usize,
    pub id: SnippetId,
    pub was_active: bool,
    /// Siblings switched off when this snippet was switched on.
    pub deactivated: Vec<SnippetId>,
}

/// Flips the active flag of each selected snippet. Switching one on switches
/// off whatever active snippets it overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleActive {
    pub changes: Vec<ActiveChange>,
}

impl ToggleActive {
    pub fn apply_selected<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<Self> {
        let ids: Vec<SnippetId> = model.selection.iter().collect();
        let mut changes = Vec::with_capacity(ids.len());
        for id in ids {
            let Some((track, snippet)) = model.find_snippet_by_id(id) else {
                continue;
            };
            let was_active = snippet.is_active;
            let deactivated = if was_active {
                model.set_snippet_active(id, false)?;
                Vec::new()
            } else {
                model.activate_snippet(track, id)?
            };
            changes.push(ActiveChange {
                track,
                id,
                was_active,
                deactivated,
            });
        }
        if changes.is_empty() {
            return Err(TimelineError::NothingSelected);
        }
        Ok(ToggleActive { changes })
    }
}

impl UndoableCommand for ToggleActive {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for c in self.changes.iter().rev() {
            for &other in &c.deactivated {
                model.set_snippet_active(other, true)?;
            }
            model.set_snippet_active(c.id, c.was_active)?;
        }
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for c in &self.changes {
            if c.was_active {
                model.set_snippet_active(c.id, false)?;
            } else {
                model.activate_snippet(c.track, c.id)?;
            }
        }
        Ok(())
    }
    fn label(&self) -> String {
        format!("Toggle active on {} snippet(s)", self.changes.len())
    }
}

// --- CommitRecording -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRewrite {
    pub track: usize,
    pub before: Vec<Snippet>,
    pub after: Vec<Snippet>,
}

/// A finished recording merged into the committed snippets of each track.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecording {
    pub rewrites: Vec<TrackRewrite>,
}

impl CommitRecording {
    pub fn apply<W: PhysicsWorld>(
        model: &mut TimelineModel<W>,
        merged: Vec<(usize, Vec<Snippet>)>,
    ) -> TimelineResult<Self> {
        if let Some(&(bad, _)) = merged.iter().find(|(t, _)| *t >= model.track_count()) {
            return Err(TimelineError::TrackOutOfRange {
                index: bad,
                count: model.track_count(),
            });
        }
        let mut rewrites = Vec::with_capacity(merged.len());
        for (track, after) in merged {
            let before = model.replace_track_snippets(track, after.clone())?;
            rewrites.push(TrackRewrite {
                track,
                before,
                after,
            });
        }
        Ok(CommitRecording { rewrites })
    }
}

impl UndoableCommand for CommitRecording {
    fn undo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for r in self.rewrites.iter().rev() {
            model.replace_track_snippets(r.track, r.before.clone())?;
        }
        Ok(())
    }
    fn redo<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>) -> TimelineResult<()> {
        for r in &self.rewrites {
            model.replace_track_snippets(r.track, r.after.clone())?;
        }
        Ok(())
    }
    fn label(&self) -> String {
        format!("Record on {} track(s)", self.rewrites.len())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ops::layers::layers_are_disjoint;
    use crate::physics::sandbox::SandboxWorld;
    use crate::types::project::{decode_tracks, encode_project};
    use crate::types::snippet::MAX_SNIPPET_LAYERS;
    use crate::types::track::PlayerInfo;

    pub(crate) type Model = TimelineModel<SandboxWorld>;

    /// Track contents with snippets ordered by id, so array order does not matter.
    pub(crate) fn canonical(model: &Model) -> Vec<(TrackSettings, Vec<Snippet>)> {
        model
            .tracks()
            .iter()
            .map(|t| {
                let mut snippets = t.snippets().to_vec();
                snippets.sort_by_key(|s| s.id);
                (t.settings.clone(), snippets)
            })
            .collect()
    }

    pub(crate) fn model_with_tracks(n: usize) -> Model {
        let mut model = TimelineModel::new(SandboxWorld::new());
        for i in 0..n {
            model
                .add_new_track(
                    1,
                    TrackSettings {
                        player_info: PlayerInfo::named(format!("tee {}", i)),
                        ..TrackSettings::default()
                    },
                )
                .unwrap();
        }
        model
    }

    fn marked(start: i32, len: i32) -> Vec<PlayerInput> {
        (0..len)
            .map(|i| PlayerInput::default().with_target(start + i, 0))
            .collect()
    }

    fn add(model: &mut Model, track: usize, start: i32, len: i32) -> SnippetId {
        AddSnippet::apply_inputs(model, track, start, marked(start, len))
            .unwrap()
            .snippet
            .id
    }

    /// apply → undo restores the before state, redo restores the after state.
    fn assert_round_trip(model: &mut Model, before: &[(TrackSettings, Vec<Snippet>)], cmd: &Command) {
        let after = canonical(model);
        cmd.undo(model).unwrap();
        assert_eq!(canonical(model), before, "undo of {}", cmd.label());
        cmd.redo(model).unwrap();
        assert_eq!(canonical(model), after, "redo of {}", cmd.label());
        for t in model.tracks() {
            assert!(layers_are_disjoint(t.snippets()));
        }
    }

    #[test]
    fn test_add_snippet_picks_free_layer_and_round_trips() {
        let mut model = model_with_tracks(1);
        add(&mut model, 0, 0, 100);
        let before = canonical(&model);
        let cmd = AddSnippet::apply(&mut model, 0, 50, 20).unwrap();
        assert_eq!(cmd.snippet.layer, 1);
        assert_eq!(cmd.snippet.inputs(), &[PlayerInput::default(); 20][..]);
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_add_snippet_refuses_without_mutation() {
        let mut model = model_with_tracks(1);
        for _ in 0..8 {
            add(&mut model, 0, 0, 10);
        }
        let before = canonical(&model);
        let next = model.next_snippet_id();
        let err = AddSnippet::apply(&mut model, 0, 5, 3).unwrap_err();
        assert!(matches!(err, TimelineError::NoFreeLayer { .. }));
        assert_eq!(canonical(&model), before);
        assert_eq!(model.next_snippet_id(), next);

        assert!(AddSnippet::apply(&mut model, 0, 5, 0).is_err());
        assert!(AddSnippet::apply(&mut model, 4, 5, 3).is_err());
    }

    #[test]
    fn test_delete_selected_round_trips() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 10);
        add(&mut model, 0, 20, 10);
        let c = add(&mut model, 1, 5, 10);
        model.selection.add(a);
        model.selection.add(c);
        let before = canonical(&model);

        let cmd = DeleteSnippets::apply_selected(&mut model).unwrap();
        assert!(model.selection.is_empty());
        assert_eq!(model.track(0).unwrap().snippets().len(), 1);
        assert!(model.track(1).unwrap().snippets().is_empty());
        assert_round_trip(&mut model, &before, &cmd.into());

        assert_eq!(
            DeleteSnippets::apply_selected(&mut model).unwrap_err(),
            TimelineError::NothingSelected
        );
    }

    #[test]
    fn test_move_across_tracks_round_trips() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 30);
        let b = add(&mut model, 0, 10, 30);
        let c = add(&mut model, 1, 100, 10);
        let before = canonical(&model);

        let cmd = MoveSnippets::apply(
            &mut model,
            &[
                MoveRequest { id: b, to_track: 1, to_tick: 95 },
                MoveRequest { id: a, to_track: 0, to_tick: 40 },
            ],
        )
        .unwrap();
        // b lands on c, which is switched off.
        assert_eq!(cmd.deactivated, vec![c]);
        let (track, moved) = model.find_snippet_by_id(b).unwrap();
        assert_eq!((track, moved.start_tick), (1, 95));
        assert!(!model.find_snippet_by_id(c).unwrap().1.is_active);
        assert_eq!(model.find_snippet_by_id(a).unwrap().1.layer, 0);
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_move_skips_requests_without_room() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 10);
        for _ in 0..8 {
            add(&mut model, 1, 0, 50);
        }
        let b = add(&mut model, 0, 20, 10);
        let cmd = MoveSnippets::apply(
            &mut model,
            &[
                MoveRequest { id: a, to_track: 1, to_tick: 5 },
                MoveRequest { id: b, to_track: 0, to_tick: 60 },
            ],
        )
        .unwrap();
        assert_eq!(cmd.moves.len(), 1);
        assert_eq!(model.find_snippet_by_id(a).unwrap().0, 0);

        let err = MoveSnippets::apply(
            &mut model,
            &[MoveRequest { id: a, to_track: 1, to_tick: 5 }],
        )
        .unwrap_err();
        assert!(matches!(err, TimelineError::NoFreeLayer { track: 1, .. }));
    }

    #[test]
    fn test_batch_move_counts_earlier_destinations() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 10);
        let b = add(&mut model, 0, 20, 10);
        for _ in 0..MAX_SNIPPET_LAYERS - 1 {
            add(&mut model, 1, 0, 50);
        }
        let before = canonical(&model);

        // One layer is left over [5, 18); only the first request gets it.
        let cmd = MoveSnippets::apply(
            &mut model,
            &[
                MoveRequest { id: a, to_track: 1, to_tick: 5 },
                MoveRequest { id: b, to_track: 1, to_tick: 8 },
            ],
        )
        .unwrap();
        assert_eq!(cmd.moves.len(), 1);
        assert_eq!(cmd.moves[0].id, a);
        assert_eq!(model.find_snippet_by_id(b).unwrap().0, 0);

        let track = model.track(1).unwrap();
        assert!(track.snippets().iter().all(|s| s.layer < MAX_SNIPPET_LAYERS));
        let loaded = decode_tracks(&encode_project(&model)).unwrap();
        assert_eq!(loaded[1].snippets(), track.snippets());
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_batch_move_ignores_repeated_ids() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 10);
        let cmd = MoveSnippets::apply(
            &mut model,
            &[
                MoveRequest { id: a, to_track: 0, to_tick: 30 },
                MoveRequest { id: a, to_track: 0, to_tick: 60 },
            ],
        )
        .unwrap();
        assert_eq!(cmd.moves.len(), 1);
        assert_eq!(model.find_snippet_by_id(a).unwrap().1.start_tick, 30);
    }

    #[test]
    fn test_duplicate_round_trips() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 10);
        let before = canonical(&model);
        let cmd = DuplicateSnippets::apply(
            &mut model,
            &[MoveRequest { id: a, to_track: 1, to_tick: 30 }],
        )
        .unwrap();
        let (_, copy) = &cmd.copies[0];
        assert_ne!(copy.id, a);
        assert_eq!(copy.inputs(), model.find_snippet_by_id(a).unwrap().1.inputs());
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_split_at_playhead_round_trips() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 100);
        let b = add(&mut model, 1, 20, 100);
        let c = add(&mut model, 1, 200, 10);
        for id in [a, b, c] {
            model.selection.add(id);
        }
        model.set_current_tick(60);
        let before = canonical(&model);

        let cmd = MultiSplit::apply(&mut model).unwrap();
        assert_eq!(cmd.splits.len(), 2);
        let right = cmd.splits[0].new_id;
        let (_, right_snippet) = model.find_snippet_by_id(right).unwrap();
        assert_eq!(right_snippet.start_tick, 60);
        assert_eq!(right_snippet.end_tick(), 100);
        assert_eq!(right_snippet.inputs()[0].target_x, 60);
        assert_eq!(model.find_snippet_by_id(a).unwrap().1.end_tick(), 60);
        assert!(model.selection.contains(right));
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_split_outside_every_selected_snippet_fails() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 10, 10);
        model.selection.add(a);
        model.set_current_tick(10);
        assert_eq!(
            MultiSplit::apply(&mut model).unwrap_err(),
            TimelineError::NothingToSplit(10)
        );
    }

    #[test]
    fn test_merge_adjacent_pair_restores_ids_and_layers() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 100);
        let b = add(&mut model, 0, 100, 100);
        model.selection.add(b);
        model.selection.add(a);
        let before = canonical(&model);

        let cmd = MergeSnippets::apply(&mut model).unwrap();
        let snippets = model.track(0).unwrap().snippets();
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].id, a);
        assert_eq!(snippets[0].start_tick, 0);
        assert_eq!(snippets[0].end_tick(), 200);
        assert_eq!(snippets[0].inputs(), &marked(0, 200)[..]);

        let cmd: Command = cmd.into();
        cmd.undo(&mut model).unwrap();
        assert_eq!(canonical(&model), before);
        let restored = model.track(0).unwrap();
        assert_eq!(restored.find_snippet(a).map(|s| (s.end_tick(), s.layer)), Some((100, 0)));
        assert_eq!(restored.find_snippet(b).map(|s| (s.start_tick, s.layer)), Some((100, 0)));
        cmd.redo(&mut model).unwrap();
        assert_eq!(model.track(0).unwrap().snippets().len(), 1);
    }

    #[test]
    fn test_merge_chains_three_and_skips_gaps() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 10);
        let b = add(&mut model, 0, 10, 10);
        let c = add(&mut model, 0, 20, 10);
        let d = add(&mut model, 0, 50, 10);
        for id in [c, a, d, b] {
            model.selection.add(id);
        }
        let before = canonical(&model);
        let cmd = MergeSnippets::apply(&mut model).unwrap();
        assert_eq!(cmd.runs.len(), 1);
        assert_eq!(cmd.runs[0].absorbed.len(), 2);
        assert_eq!(model.track(0).unwrap().snippets().len(), 2);
        assert_round_trip(&mut model, &before, &cmd.into());

        model.selection.clear();
        model.selection.add(d);
        assert_eq!(
            MergeSnippets::apply(&mut model).unwrap_err(),
            TimelineError::NothingToMerge
        );
    }

    #[test]
    fn test_add_and_remove_track_round_trip() {
        let mut model = model_with_tracks(2);
        add(&mut model, 1, 0, 40);
        model.set_selected_track(Some(1));
        let before = canonical(&model);

        let cmd = RemoveTrack::apply(&mut model, 1).unwrap();
        assert_eq!(model.track_count(), 1);
        assert_eq!(model.base_world().num_characters(), 1);
        assert_round_trip(&mut model, &before, &cmd.clone().into());
        cmd.undo(&mut model).unwrap();
        assert_eq!(model.selected_track(), Some(1));

        let before = canonical(&model);
        let cmd = AddTrack::apply(&mut model, TrackSettings::default()).unwrap();
        assert_eq!(cmd.index, 2);
        assert_eq!(model.base_world().num_characters(), 3);
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_edit_inputs_round_trips() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 20);
        let before = canonical(&model);
        let jump = PlayerInput {
            jump: 1,
            ..PlayerInput::default()
        };
        let cmd = EditInputs::apply(&mut model, a, &[(3, jump), (17, jump)]).unwrap();
        assert_eq!(cmd.edits[0].before.target_x, 3);
        assert_eq!(model.input_at_tick(0, 17), jump);
        assert_round_trip(&mut model, &before, &cmd.into());

        let err = EditInputs::apply(&mut model, a, &[(2, jump), (20, jump)]).unwrap_err();
        assert!(matches!(err, TimelineError::InputRange { offset: 20, .. }));
        assert_eq!(model.input_at_tick(0, 2).jump, 0);
    }

    #[test]
    fn test_activate_round_trips() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 50);
        let b = add(&mut model, 0, 20, 50);
        model.set_snippet_active(b, false).unwrap();
        let before = canonical(&model);
        let cmd = ActivateSnippet::apply(&mut model, b).unwrap();
        assert_eq!(cmd.deactivated, vec![a]);
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_toggle_active_round_trips() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 50);
        let b = add(&mut model, 0, 20, 50);
        let c = add(&mut model, 0, 200, 10);
        model.set_snippet_active(b, false).unwrap();
        model.selection.add(b);
        model.selection.add(c);
        let before = canonical(&model);

        let cmd = ToggleActive::apply_selected(&mut model).unwrap();
        let active = |m: &Model, id| m.find_snippet_by_id(id).unwrap().1.is_active;
        assert!(!active(&model, a));
        assert!(active(&model, b));
        assert!(!active(&model, c));
        assert_round_trip(&mut model, &before, &cmd.into());

        model.selection.clear();
        assert_eq!(
            ToggleActive::apply_selected(&mut model),
            Err(TimelineError::NothingSelected)
        );
    }

    #[test]
    fn test_track_settings_round_trip() {
        let mut model = model_with_tracks(1);
        let before = canonical(&model);
        let mut settings = model.track(0).unwrap().settings.clone();
        settings.is_dummy = true;
        settings.player_info.name = "dummy".to_string();
        let cmd = EditTrackSettings::apply(&mut model, 0, settings).unwrap();
        assert!(model.track(0).unwrap().is_dummy());
        assert_round_trip(&mut model, &before, &cmd.into());
    }

    #[test]
    fn test_input_edit_scenario_velocity() {
        let mut model = model_with_tracks(1);
        let id = AddSnippet::apply(&mut model, 0, 0, 50).unwrap().snippet.id;
        let baseline_10 = model.world_state_at_tick(10).character_velocity(0);
        let baseline_11 = model.world_state_at_tick(11).character_velocity(0);

        let cmd = EditInputs::apply(
            &mut model,
            id,
            &[(10, PlayerInput::default().with_direction(1))],
        )
        .unwrap();
        // The tick-10 input drives the step from 10 to 11.
        assert_eq!(model.world_state_at_tick(10).character_velocity(0), baseline_10);
        assert_ne!(model.world_state_at_tick(11).character_velocity(0), baseline_11);

        cmd.undo(&mut model).unwrap();
        assert_eq!(model.world_state_at_tick(11).character_velocity(0), baseline_11);
    }
}
