//! Live recording into per-track buffers and the dummy tracks that follow along.

use log::{debug, info, warn};

use crate::error::{TimelineError, TimelineResult};
use crate::ops::commands::CommitRecording;
use crate::ops::layers::{find_available_layer, solve_snippet_layers};
use crate::physics::PhysicsWorld;
use crate::types::config::{DummyAction, EditorConfig};
use crate::types::input::PlayerInput;
use crate::types::snippet::{MAX_SNIPPET_LAYERS, Snippet, SnippetId};
use crate::types::timeline::TimelineModel;
use crate::types::track::{DummyCopyFlags, TrackSettings};

/// Starts recording on the selected track and every dummy track, or stops and
/// folds the recorded samples into the committed snippets.
///
/// Stopping returns the commit as a command so it can be undone; it is `None`
/// when nothing was recorded.
pub fn toggle_recording<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<Option<CommitRecording>> {
    if model.is_recording() {
        return stop_recording(model);
    }

    let targets: Vec<usize> = model
        .tracks()
        .iter()
        .enumerate()
        .filter(|(i, t)| model.selected_track() == Some(*i) || t.is_dummy())
        .map(|(i, _)| i)
        .collect();
    if targets.is_empty() {
        return Err(TimelineError::NoRecordingTarget);
    }
    model.begin_recording(&targets)?;
    info!("recording on {} track(s) from tick {}", targets.len(), model.current_tick());
    Ok(None)
}

fn stop_recording<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<Option<CommitRecording>> {
    let buffers = model.end_recording()?;
    let mut merged = Vec::new();
    for (track, recorded) in buffers {
        if recorded.iter().all(Snippet::is_empty) {
            continue;
        }
        let committed = model
            .track(track)
            .map(|t| t.snippets().to_vec())
            .unwrap_or_default();
        let snippets = merge_recorded(committed, &recorded, || model.allocate_snippet_id());
        merged.push((track, snippets));
    }
    if merged.is_empty() {
        info!("recording stopped, nothing recorded");
        return Ok(None);
    }
    let commit = CommitRecording::apply(model, merged)?;
    info!("recording committed on {} track(s)", commit.rewrites.len());
    Ok(Some(commit))
}

/// Writes recorded samples into a track's committed snippets one tick at a time.
///
/// A tick inside an active snippet overwrites it. Otherwise an active snippet
/// ending exactly at the tick grows by one. Otherwise a new one-tick snippet
/// starts on a free layer. Layers are re-solved at the end.
///
/// A tick where all `MAX_SNIPPET_LAYERS` layers are already taken by inactive
/// snippets has nowhere to go; its sample is dropped with a warning.
pub fn merge_recorded(
    mut committed: Vec<Snippet>,
    recorded: &[Snippet],
    mut next_id: impl FnMut() -> SnippetId,
) -> Vec<Snippet> {
    let mut dropped = 0usize;
    for rec in recorded {
        for (k, input) in rec.inputs().iter().enumerate() {
            let tick = rec.start_tick + k as i32;
            if !write_recorded_tick(&mut committed, tick, *input, &mut next_id) {
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!("{} recorded tick(s) dropped, every layer was taken", dropped);
    }
    solve_snippet_layers(&mut committed);
    committed
}

/// Returns false when the tick has no room left.
fn write_recorded_tick(
    snippets: &mut Vec<Snippet>,
    tick: i32,
    input: PlayerInput,
    next_id: &mut impl FnMut() -> SnippetId,
) -> bool {
    if let Some(s) = snippets.iter_mut().find(|s| s.is_active && s.covers(tick)) {
        let offset = (tick - s.start_tick) as usize;
        s.write_inputs(offset, &[input]);
        return true;
    }
    // Both remaining cases stack one more span over `tick`. Keeping the depth
    // within the cap keeps the final solve within it too.
    let depth = snippets.iter().filter(|s| s.covers(tick)).count();
    if depth >= MAX_SNIPPET_LAYERS as usize {
        return false;
    }
    if let Some(s) = snippets
        .iter_mut()
        .find(|s| s.is_active && !s.is_empty() && s.end_tick() == tick)
    {
        s.append_inputs(&[input]);
        return true;
    }
    // Layers may be out of date after appends; the solve in `merge_recorded`
    // settles them.
    let layer = find_available_layer(snippets, tick, tick + 1, None).unwrap_or(depth as u8);
    let mut fresh = Snippet::from_inputs(next_id(), tick, vec![input]);
    fresh.layer = layer;
    snippets.push(fresh);
    true
}

pub fn cancel_recording<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<()> {
    model.discard_recording()?;
    info!("recording cancelled");
    Ok(())
}

/// Cuts the recording back to the playhead.
pub fn trim_recording<W: PhysicsWorld>(model: &mut TimelineModel<W>) -> TimelineResult<()> {
    let tick = model.current_tick();
    model.trim_recording(tick)?;
    debug!("recording trimmed to {}", tick);
    Ok(())
}

/// Hands recording over to another track without stopping.
pub fn switch_recording_target<W: PhysicsWorld>(model: &mut TimelineModel<W>, track: usize) -> TimelineResult<()> {
    if !model.is_recording() {
        return Err(TimelineError::NotRecording);
    }
    if track >= model.track_count() {
        return Err(TimelineError::TrackOutOfRange {
            index: track,
            count: model.track_count(),
        });
    }
    model.set_selected_track(Some(track));
    model.open_recording_snippet(track);
    Ok(())
}

/// Input a dummy should produce this frame, given the recorded track's live
/// input and both characters' positions.
pub fn predict_dummy_input(
    settings: &TrackSettings,
    config: &EditorConfig,
    fire_held: bool,
    source: &PlayerInput,
    source_pos: [f32; 2],
    dummy_pos: [f32; 2],
) -> PlayerInput {
    let flags = settings.dummy_copy_flags;
    let mut out = PlayerInput::default();
    for action in &config.dummy_action_priority {
        match action {
            DummyAction::Copy if config.dummy_copy_enabled => {
                if flags.contains(DummyCopyFlags::DIRECTION) {
                    out.direction = source.direction;
                }
                if flags.contains(DummyCopyFlags::TARGET) {
                    out.target_x = source.target_x;
                    out.target_y = source.target_y;
                }
                if flags.contains(DummyCopyFlags::JUMP) {
                    out.jump = source.jump;
                }
                if flags.contains(DummyCopyFlags::FIRE) {
                    out.fire = source.fire;
                }
                if flags.contains(DummyCopyFlags::HOOK) {
                    out.hook = source.hook;
                }
                if flags.contains(DummyCopyFlags::WEAPON) {
                    out.wanted_weapon = source.wanted_weapon;
                }
                if flags.contains(DummyCopyFlags::MIRROR_X) {
                    out.target_x = -out.target_x;
                    out.direction = -out.direction;
                }
                if flags.contains(DummyCopyFlags::MIRROR_Y) {
                    out.target_y = -out.target_y;
                }
            }
            DummyAction::Fire if fire_held && settings.allow_dummy_fire => {
                out.fire = 1;
                if settings.dummy_fire_aimbot {
                    out.target_x = (source_pos[0] - dummy_pos[0]) as i32;
                    out.target_y = (source_pos[1] - dummy_pos[1]) as i32;
                }
            }
            _ => {}
        }
    }
    out
}

/// Sets every dummy track's live input from the recorded track. Runs once per
/// frame while recording.
pub fn apply_dummy_inputs<W: PhysicsWorld>(model: &mut TimelineModel<W>, config: &EditorConfig, fire_held: bool) {
    if !model.is_recording() {
        return;
    }
    let Some(source_index) = model.selected_track() else {
        return;
    };
    let world = model.current_world();
    let (Some(source_pos), Some(source)) = (
        world.character_position(source_index),
        model.track(source_index).map(|t| t.current_input),
    ) else {
        return;
    };

    for i in 0..model.track_count() {
        if i == source_index {
            continue;
        }
        let Some(track) = model.track(i) else {
            continue;
        };
        if !track.is_dummy() {
            continue;
        }
        let Some(dummy_pos) = world.character_position(i) else {
            continue;
        };
        let input = predict_dummy_input(&track.settings, config, fire_held, &source, source_pos, dummy_pos);
        model.set_current_input(i, input);
    }
}
