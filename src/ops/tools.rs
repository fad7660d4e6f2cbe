//! Built-in tools. They only go through [`TimelineApi`], the same surface an
//! external input generator gets.

use crate::error::{TimelineError, TimelineResult};
use crate::ops::api::TimelineApi;
use crate::ops::commands::Command;
use crate::physics::PhysicsWorld;
use crate::types::input::PlayerInput;
use crate::types::snippet::SnippetId;
use crate::types::track::PlayerInfo;

const HOLD_TOOL: &str = "hold input";
const COPY_TOOL: &str = "duplicate track";

fn selected_track<W: PhysicsWorld>(api: &TimelineApi<'_, W>) -> TimelineResult<usize> {
    let index = api.get_selected_track().ok_or(TimelineError::NothingSelected)?;
    if index >= api.get_track_count() {
        return Err(TimelineError::TrackOutOfRange {
            index,
            count: api.get_track_count(),
        });
    }
    Ok(index)
}

/// Repeats the input at the playhead until the end of the active snippet under
/// it on the selected track. Returns how many ticks were overwritten.
pub fn hold_input_to_end<W: PhysicsWorld>(api: &mut TimelineApi<'_, W>) -> TimelineResult<usize> {
    let tick = api.get_current_tick();
    let track_index = selected_track(api)?;
    let found = api.get_track(track_index).and_then(|track| {
        track
            .snippets()
            .iter()
            .filter(|s| s.is_active)
            .find_map(|s| Some((s.id, s.start_tick, s.end_tick(), *s.input_at(tick)?)))
    });
    let Some((id, start, end, held)) = found else {
        api.log_warning(
            HOLD_TOOL,
            &format!("no active snippet at tick {} on track {}", tick, track_index),
        );
        return Err(TimelineError::NoSnippetAtTick {
            track: track_index,
            tick,
        });
    };

    let offset = (tick - start) as usize + 1;
    let remaining = (end - tick - 1) as usize;
    if remaining == 0 {
        return Ok(0);
    }
    let cmd = api.do_set_inputs(id, offset, &vec![held; remaining])?;
    api.register_undo_command(cmd);

    match api.get_world_state_at(end).character_position(track_index) {
        Some([x, y]) => api.log_info(
            HOLD_TOOL,
            &format!("held {} ticks of {}, character ends at {:.1}, {:.1}", remaining, id, x, y),
        ),
        None => api.log_info(HOLD_TOOL, &format!("held {} ticks of {}", remaining, id)),
    }
    Ok(remaining)
}

fn copy_snippet<W: PhysicsWorld>(
    api: &mut TimelineApi<'_, W>,
    track: usize,
    start: i32,
    inputs: &[PlayerInput],
    created: &mut Vec<SnippetId>,
) -> TimelineResult<[Command; 2]> {
    let (add, id) = api.do_create_snippet(track, start, inputs.len() as i32)?;
    created.push(id);
    let edit = api.do_set_inputs(id, 0, inputs)?;
    Ok([add.into(), edit.into()])
}

/// Copies what the selected track plays (its active snippets) onto a new track.
/// Returns the new track's index.
pub fn duplicate_track<W: PhysicsWorld>(api: &mut TimelineApi<'_, W>) -> TimelineResult<usize> {
    let source_index = selected_track(api)?;
    let Some(source) = api.get_track(source_index) else {
        return Err(TimelineError::NothingSelected);
    };
    let info = PlayerInfo {
        name: format!("{} copy", source.settings.player_info.name),
        ..source.settings.player_info.clone()
    };
    let snippets: Vec<(i32, Vec<PlayerInput>)> = source
        .snippets()
        .iter()
        .filter(|s| s.is_active)
        .map(|s| (s.start_tick, s.inputs().to_vec()))
        .collect();

    let (cmd, track) = api.do_create_track(info)?;
    api.register_undo_command(cmd);

    let mut commands = Vec::with_capacity(snippets.len() * 2);
    let mut created = Vec::new();
    for (start, inputs) in &snippets {
        match copy_snippet(api, track, *start, inputs, &mut created) {
            Ok(pair) => commands.extend(pair),
            Err(err) => {
                for id in created {
                    if let Err(cleanup) = api.do_delete_snippet(id) {
                        api.log_error(COPY_TOOL, &cleanup.to_string());
                    }
                }
                api.log_error(COPY_TOOL, &format!("copy onto track {} stopped: {}", track, err));
                return Err(err);
            }
        }
    }
    for cmd in commands {
        api.register_undo_command(cmd);
    }
    api.log_info(
        COPY_TOOL,
        &format!("copied {} snippet(s) from track {} to {}", snippets.len(), source_index, track),
    );
    Ok(track)
}
