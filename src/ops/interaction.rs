//! Pointer and keyboard handling for the timeline, kept free of any drawing so
//! the widget only forwards events and paints what this module reports.

use eframe::egui::{InputState, Key, Modifiers, Pos2, Rect, Vec2, pos2, vec2};
use log::debug;

use crate::error::TimelineResult;
use crate::ops::commands::{Command, DuplicateSnippets, MoveRequest, MoveSnippets};
use crate::ops::layers::{SpanPreview, solve_snippet_layers};
use crate::physics::PhysicsWorld;
use crate::types::config::EditorConfig;
use crate::types::input::{PLAYERFLAG_KILL, PlayerInput};
use crate::types::snippet::{Snippet, SnippetId};
use crate::types::timeline::TimelineModel;
use crate::types::view::ViewTransform;

pub const DRAG_THRESHOLD_PX: f32 = 5.0;
pub const SNAP_THRESHOLD_PX: f32 = 5.0;
/// Zoom factor for one wheel notch or zoom key press.
pub const ZOOM_STEP: f32 = 1.1;
/// Vertical inset of a snippet inside its sub-lane.
const SNIPPET_MARGIN: f32 = 2.0;

/// Screen placement of the track rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackArea {
    pub rect: Rect,
    pub scroll_y: f32,
}

impl TrackArea {
    pub fn new(rect: Rect) -> Self {
        TrackArea { rect, scroll_y: 0.0 }
    }
}

/// A dragged snippet and its track distance from the one under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragInfo {
    pub id: SnippetId,
    pub track_offset: isize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed on a snippet, not yet past the drag threshold.
    Pending { snippet: SnippetId, press_pos: Pos2 },
    Dragging {
        grabbed: SnippetId,
        /// Pointer tick minus the grabbed snippet's start when the drag began.
        grab_offset_ticks: i32,
        infos: Vec<DragInfo>,
    },
    SelectionBox { start: Pos2, current: Pos2 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineInteraction {
    pub view: ViewTransform,
    /// Vertical scroll of the track rows in pixels.
    pub scroll_y: f32,
    pub drag: DragState,
    pub snap_threshold_px: f32,
    pub drag_threshold_px: f32,
}

impl Default for TimelineInteraction {
    fn default() -> Self {
        TimelineInteraction {
            view: ViewTransform::default(),
            scroll_y: 0.0,
            drag: DragState::Idle,
            snap_threshold_px: SNAP_THRESHOLD_PX,
            drag_threshold_px: DRAG_THRESHOLD_PX,
        }
    }
}

fn additive(modifiers: Modifiers) -> bool {
    modifiers.shift || modifiers.ctrl || modifiers.command
}

/// Start tick for a snippet dropped at `desired_start`, pulled onto the nearest
/// edge within `threshold_px`. Candidates are the playhead, tick 0 and both edges
/// of every other snippet, matched against the dragged start and end alike.
pub fn snapped_start_tick<W: PhysicsWorld>(
    model: &TimelineModel<W>,
    desired_start: i32,
    duration: i32,
    exclude: SnippetId,
    zoom: f32,
    threshold_px: f32,
) -> i32 {
    let mut snapped = desired_start;
    let mut best = threshold_px;
    let mut consider = |edge: i32, candidate: i32, dragged_edge: i32| {
        let dist = ((dragged_edge - edge) as f32 * zoom).abs();
        if dist < best {
            best = dist;
            snapped = candidate;
        }
    };

    consider(model.current_tick(), model.current_tick(), desired_start);
    consider(0, 0, desired_start);
    let desired_end = desired_start + duration;
    for other in model.tracks().iter().flat_map(|t| t.snippets()) {
        if other.id == exclude {
            continue;
        }
        consider(other.start_tick, other.start_tick, desired_start);
        consider(other.end_tick(), other.end_tick(), desired_start);
        consider(other.start_tick, other.start_tick - duration, desired_end);
        consider(other.end_tick(), other.end_tick() - duration, desired_end);
    }
    snapped.max(0)
}

impl TimelineInteraction {
    pub fn new(config: &EditorConfig) -> Self {
        TimelineInteraction {
            view: ViewTransform::new(config.zoom, config.track_height),
            scroll_y: 0.0,
            drag: DragState::Idle,
            snap_threshold_px: config.snap_threshold_px,
            drag_threshold_px: config.drag_threshold_px,
        }
    }

    /// On-screen box of a tick span on `layer` of a track split into `stack` sub-lanes.
    pub fn span_rect(
        &self,
        area: &TrackArea,
        track_index: usize,
        start: i32,
        end: i32,
        layer: u8,
        stack: usize,
    ) -> Rect {
        let top = self
            .view
            .track_screen_y(track_index, area.rect.top(), area.scroll_y);
        let x0 = self.view.tick_to_screen_x(start, area.rect.left());
        let x1 = self.view.tick_to_screen_x(end, area.rect.left());
        let lane = self.view.track_height / stack.max(1) as f32;
        Rect::from_min_size(
            pos2(x0, top + layer as f32 * lane + SNIPPET_MARGIN),
            vec2((x1 - x0).max(1.0), (lane - 2.0 * SNIPPET_MARGIN).max(1.0)),
        )
    }

    /// On-screen box of a snippet, stacked into its layer's sub-lane.
    pub fn snippet_rect<W: PhysicsWorld>(
        &self,
        model: &TimelineModel<W>,
        area: &TrackArea,
        track_index: usize,
        snippet: &Snippet,
    ) -> Rect {
        let (start, end) = (snippet.start_tick, snippet.end_tick());
        let stack = model.stack_size_at_tick_range(track_index, start, end);
        self.span_rect(area, track_index, start, end, snippet.layer, stack)
    }

    pub fn hit_test<W: PhysicsWorld>(&self, model: &TimelineModel<W>, area: &TrackArea, pos: Pos2) -> Option<SnippetId> {
        model.tracks().iter().enumerate().find_map(|(t, track)| {
            track
                .snippets()
                .iter()
                .find(|s| self.snippet_rect(model, area, t, s).contains(pos))
                .map(|s| s.id)
        })
    }

    pub fn track_at(&self, track_count: usize, area: &TrackArea, y: f32) -> Option<usize> {
        self.view
            .screen_y_to_track_index(y, area.rect.top(), area.scroll_y, track_count)
    }

    pub fn pointer_pressed<W: PhysicsWorld>(
        &mut self,
        model: &mut TimelineModel<W>,
        area: &TrackArea,
        pos: Pos2,
        modifiers: Modifiers,
    ) {
        if let Some(id) = self.hit_test(model, area, pos) {
            if additive(modifiers) {
                model.selection.toggle(id);
            } else if !model.is_snippet_selected(id) {
                model.selection.clear();
                model.selection.add(id);
            }
            self.drag = DragState::Pending {
                snippet: id,
                press_pos: pos,
            };
            return;
        }

        if let Some(track) = self.track_at(model.track_count(), area, pos.y) {
            model.set_selected_track(Some(track));
        }
        if !additive(modifiers) {
            model.selection.clear();
        }
        self.drag = DragState::SelectionBox {
            start: pos,
            current: pos,
        };
    }

    pub fn pointer_moved<W: PhysicsWorld>(&mut self, model: &mut TimelineModel<W>, area: &TrackArea, pos: Pos2) {
        let threshold = self.drag_threshold_px;
        match &mut self.drag {
            DragState::Pending { snippet, press_pos } => {
                if press_pos.distance(pos) > threshold {
                    let (id, origin) = (*snippet, *press_pos);
                    self.start_drag(model, area, id, origin);
                }
            }
            DragState::SelectionBox { current, .. } => *current = pos,
            _ => {}
        }
    }

    fn start_drag<W: PhysicsWorld>(
        &mut self,
        model: &mut TimelineModel<W>,
        area: &TrackArea,
        grabbed: SnippetId,
        press_pos: Pos2,
    ) {
        let Some((grabbed_track, snippet)) = model.find_snippet_by_id(grabbed) else {
            self.drag = DragState::Idle;
            return;
        };
        let pointer_tick = self.view.screen_x_to_tick(press_pos.x, area.rect.left());
        let grab_offset_ticks = pointer_tick - snippet.start_tick;

        if !model.is_snippet_selected(grabbed) {
            model.selection.clear();
            model.selection.add(grabbed);
        }
        let infos: Vec<DragInfo> = model
            .selection
            .iter()
            .filter_map(|id| {
                model.find_snippet_by_id(id).map(|(t, _)| DragInfo {
                    id,
                    track_offset: t as isize - grabbed_track as isize,
                })
            })
            .collect();
        debug!("dragging {} snippet(s) grabbed by {}", infos.len(), grabbed);
        self.drag = DragState::Dragging {
            grabbed,
            grab_offset_ticks,
            infos,
        };
    }

    /// Where each dragged snippet would land if released at `pos`.
    pub fn drop_requests<W: PhysicsWorld>(&self, model: &TimelineModel<W>, area: &TrackArea, pos: Pos2) -> Vec<MoveRequest> {
        let DragState::Dragging {
            grabbed,
            grab_offset_ticks,
            infos,
        } = &self.drag
        else {
            return Vec::new();
        };
        let Some((_, anchor)) = model.find_snippet_by_id(*grabbed) else {
            return Vec::new();
        };
        let count = model.track_count();
        if count == 0 {
            return Vec::new();
        }

        let desired = self.view.screen_x_to_tick(pos.x, area.rect.left()) - grab_offset_ticks;
        let snapped = snapped_start_tick(
            model,
            desired,
            anchor.duration(),
            anchor.id,
            self.view.zoom,
            self.snap_threshold_px,
        );
        let base_track = self
            .track_at(count, area, pos.y)
            .unwrap_or(if pos.y < area.rect.top() { 0 } else { count - 1 });
        let tick_delta = snapped - anchor.start_tick;

        infos
            .iter()
            .filter_map(|info| {
                let (_, s) = model.find_snippet_by_id(info.id)?;
                let to_track = base_track as isize + info.track_offset;
                if to_track < 0 || to_track as usize >= count {
                    return None;
                }
                Some(MoveRequest {
                    id: info.id,
                    to_track: to_track as usize,
                    to_tick: s.start_tick + tick_delta,
                })
            })
            .collect()
    }

    /// Layout the dragged snippets would get at `pos`, solved on throwaway spans.
    pub fn drag_preview<W: PhysicsWorld>(
        &self,
        model: &TimelineModel<W>,
        area: &TrackArea,
        pos: Pos2,
    ) -> Vec<(usize, SpanPreview)> {
        let requests = self.drop_requests(model, area, pos);
        let mut tracks: Vec<usize> = requests.iter().map(|r| r.to_track).collect();
        tracks.sort_unstable();
        tracks.dedup();

        let mut out = Vec::new();
        for t in tracks {
            let Some(track) = model.track(t) else {
                continue;
            };
            let mut spans: Vec<SpanPreview> = track
                .snippets()
                .iter()
                .filter(|s| !requests.iter().any(|r| r.id == s.id))
                .map(SpanPreview::of)
                .collect();
            let fixed = spans.len();
            for r in requests.iter().filter(|r| r.to_track == t) {
                if let Some((_, s)) = model.find_snippet_by_id(r.id) {
                    let start = r.to_tick.max(0);
                    spans.push(SpanPreview {
                        id: s.id,
                        start,
                        end: start + s.duration(),
                        layer: 0,
                    });
                }
            }
            solve_snippet_layers(&mut spans);
            out.extend(spans.drain(fixed..).map(|span| (t, span)));
        }
        out
    }

    /// Finishes whatever the pointer was doing. A drop yields a move (or, with
    /// Alt, a duplicate) that the caller registers for undo.
    pub fn pointer_released<W: PhysicsWorld>(
        &mut self,
        model: &mut TimelineModel<W>,
        area: &TrackArea,
        pos: Pos2,
        modifiers: Modifiers,
    ) -> TimelineResult<Option<Command>> {
        let result = match &self.drag {
            DragState::Dragging { .. } => {
                let requests = self.drop_requests(model, area, pos);
                if requests.is_empty() {
                    Ok(None)
                } else if modifiers.alt {
                    DuplicateSnippets::apply(model, &requests).map(|c| Some(c.into()))
                } else {
                    MoveSnippets::apply(model, &requests).map(|c| Some(c.into()))
                }
            }
            DragState::SelectionBox { start, .. } => {
                let rect = Rect::from_two_pos(*start, pos);
                self.select_in_rect(model, area, rect, additive(modifiers));
                Ok(None)
            }
            _ => Ok(None),
        };
        self.drag = DragState::Idle;
        result
    }

    /// Selects every snippet whose drawn box touches `rect`.
    pub fn select_in_rect<W: PhysicsWorld>(
        &self,
        model: &mut TimelineModel<W>,
        area: &TrackArea,
        rect: Rect,
        additive: bool,
    ) {
        if !additive {
            model.selection.clear();
        }
        let layout: &TimelineModel<W> = model;
        let hits: Vec<SnippetId> = layout
            .tracks()
            .iter()
            .enumerate()
            .flat_map(|(t, track)| {
                track
                    .snippets()
                    .iter()
                    .filter(move |s| {
                        let b = self.snippet_rect(layout, area, t, s);
                        rect.max.x >= b.min.x
                            && rect.min.x <= b.max.x
                            && rect.max.y >= b.min.y
                            && rect.min.y <= b.max.y
                    })
                    .map(|s| s.id)
            })
            .collect();
        for id in hits {
            model.selection.add(id);
        }
    }

    /// Track area for this frame's layout at the current vertical scroll.
    pub fn area(&self, rect: Rect) -> TrackArea {
        TrackArea {
            rect,
            scroll_y: self.scroll_y,
        }
    }

    /// Zooms by `factor` around the pointer.
    pub fn zoom(&mut self, factor: f32, pointer_x: f32, area: &TrackArea) {
        self.view.zoom_at(factor, pointer_x, area.rect.left());
    }

    /// Wheel over the timeline: horizontal scrolls ticks, vertical scrolls tracks.
    pub fn scroll(&mut self, delta: Vec2, area: &TrackArea, track_count: usize) {
        self.view.pan_pixels(delta.x);
        let content = track_count as f32 * self.view.track_height;
        let max_scroll = (content - area.rect.height()).max(0.0);
        self.scroll_y = (self.scroll_y - delta.y).clamp(0.0, max_scroll);
    }

    /// Seeks from a ruler click. The playhead is left alone while recording.
    pub fn scrub<W: PhysicsWorld>(&self, model: &mut TimelineModel<W>, x: f32, area: &TrackArea) {
        if model.is_recording() {
            return;
        }
        let tick = self.view.screen_x_to_tick(x, area.rect.left()).max(0);
        model.set_current_tick(tick);
    }

    pub fn selection_rect(&self) -> Option<Rect> {
        match self.drag {
            DragState::SelectionBox { start, current } => Some(Rect::from_two_pos(start, current)),
            _ => None,
        }
    }
}

/// Keyboard actions the editor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
    SelectAll,
    SplitSelected,
    MergeSelected,
    DeleteSelected,
    ToggleSelectedActive,
    AddSnippet,
    ToggleRecording,
    StopRecording,
    CancelRecording,
    TrimRecording,
    ToggleDummyCopy,
    TogglePlayback,
    StepForward,
    StepBackward,
    FasterPlayback,
    SlowerPlayback,
    SwitchTrack(usize),
}

impl Shortcut {
    /// Maps a key press to an action. Keys that drive the character while
    /// recording are read separately by [`HeldControls`].
    pub fn from_key(key: Key, modifiers: Modifiers, recording: bool) -> Option<Shortcut> {
        let ctrl = modifiers.ctrl || modifiers.command;
        if modifiers.alt {
            let digit = [
                Key::Num1,
                Key::Num2,
                Key::Num3,
                Key::Num4,
                Key::Num5,
                Key::Num6,
                Key::Num7,
                Key::Num8,
                Key::Num9,
            ]
            .iter()
            .position(|k| *k == key)?;
            return Some(Shortcut::SwitchTrack(digit));
        }
        let shortcut = match key {
            Key::Z if ctrl && modifiers.shift => Shortcut::Redo,
            Key::Z if ctrl => Shortcut::Undo,
            Key::Y if ctrl => Shortcut::Redo,
            Key::A if ctrl => Shortcut::SelectAll,
            Key::R if ctrl => Shortcut::SplitSelected,
            Key::M if ctrl => Shortcut::MergeSelected,
            Key::R if modifiers.shift => Shortcut::ToggleRecording,
            Key::R => Shortcut::ToggleDummyCopy,
            Key::Escape if modifiers.shift => Shortcut::CancelRecording,
            Key::Escape => Shortcut::StopRecording,
            Key::F if recording => Shortcut::TrimRecording,
            Key::Delete if !recording => Shortcut::DeleteSelected,
            Key::A if !recording => Shortcut::ToggleSelectedActive,
            Key::Insert if !recording => Shortcut::AddSnippet,
            Key::X => Shortcut::TogglePlayback,
            Key::ArrowRight => Shortcut::StepForward,
            Key::ArrowLeft => Shortcut::StepBackward,
            Key::ArrowUp => Shortcut::FasterPlayback,
            Key::ArrowDown => Shortcut::SlowerPlayback,
            _ => return None,
        };
        Some(shortcut)
    }
}

/// Controls held this frame that make up the recorded character's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeldControls {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub fire: bool,
    pub hook: bool,
    pub kill: bool,
    /// Weapon slot picked this frame, if any.
    pub weapon: Option<u8>,
}

impl HeldControls {
    pub fn read(input: &InputState) -> Self {
        let weapon = [Key::Num1, Key::Num2, Key::Num3, Key::Num4, Key::Num5]
            .iter()
            .position(|k| input.key_pressed(*k))
            .map(|slot| slot as u8);
        HeldControls {
            left: input.key_down(Key::A),
            right: input.key_down(Key::D),
            jump: input.key_down(Key::Space),
            fire: input.pointer.primary_down(),
            hook: input.pointer.secondary_down(),
            kill: input.key_down(Key::K),
            weapon,
        }
    }

    /// Live input for the recorded track. Aim and the selected weapon carry
    /// over from `previous`.
    pub fn to_input(&self, previous: PlayerInput) -> PlayerInput {
        let mut input = previous.with_direction(self.right as i8 - self.left as i8);
        input.jump = self.jump as u8;
        input.fire = self.fire as u8;
        input.hook = self.hook as u8;
        if let Some(weapon) = self.weapon {
            input.wanted_weapon = weapon;
        }
        if self.kill {
            input.player_flags |= PLAYERFLAG_KILL;
        } else {
            input.player_flags &= !PLAYERFLAG_KILL;
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::commands::tests::{Model, model_with_tracks};
    use crate::ops::commands::{AddSnippet, UndoableCommand};

    fn area() -> TrackArea {
        TrackArea::new(Rect::from_min_size(pos2(100.0, 50.0), vec2(800.0, 400.0)))
    }

    /// View at one pixel per tick so positions are easy to read.
    fn interaction() -> TimelineInteraction {
        let mut it = TimelineInteraction::default();
        it.view.zoom = 1.0;
        it
    }

    fn add(model: &mut Model, track: usize, start: i32, len: i32) -> SnippetId {
        AddSnippet::apply(model, track, start, len).unwrap().snippet.id
    }

    /// Middle of `track`'s row at `tick`, given the 1 px/tick view.
    fn at(track: usize, tick: i32) -> Pos2 {
        pos2(100.0 + tick as f32, 50.0 + track as f32 * 60.0 + 30.0)
    }

    #[test]
    fn test_snap_to_edges_and_playhead() {
        let mut model = model_with_tracks(1);
        add(&mut model, 0, 100, 50);
        let moving = add(&mut model, 0, 300, 10);

        // 2 ticks away at 1 px/tick snaps, at 4 px/tick does not.
        assert_eq!(snapped_start_tick(&model, 98, 10, moving, 1.0, 5.0), 100);
        assert_eq!(snapped_start_tick(&model, 98, 10, moving, 4.0, 5.0), 98);
        // End edge onto the other's start.
        assert_eq!(snapped_start_tick(&model, 88, 10, moving, 1.0, 5.0), 90);
        // Start onto the other's end.
        assert_eq!(snapped_start_tick(&model, 152, 10, moving, 1.0, 5.0), 150);

        model.set_current_tick(220);
        assert_eq!(snapped_start_tick(&model, 223, 10, moving, 1.0, 5.0), 220);
        assert_eq!(snapped_start_tick(&model, -30, 10, moving, 1.0, 5.0), 0);
        assert_eq!(snapped_start_tick(&model, 3, 10, moving, 1.0, 5.0), 0);
    }

    #[test]
    fn test_snippet_rect_uses_sub_lanes() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 1, 0, 100);
        let b = add(&mut model, 1, 50, 100);
        let it = interaction();
        let track = model.track(1).unwrap();
        let ra = it.snippet_rect(&model, &area(), 1, track.find_snippet(a).unwrap());
        let rb = it.snippet_rect(&model, &area(), 1, track.find_snippet(b).unwrap());
        assert_eq!(ra.min, pos2(100.0, 112.0));
        assert_eq!(ra.height(), 26.0);
        assert_eq!(rb.min, pos2(150.0, 142.0));
        assert_eq!(it.hit_test(&model, &area(), pos2(160.0, 120.0)), Some(a));
        assert_eq!(it.hit_test(&model, &area(), pos2(160.0, 150.0)), Some(b));
        assert_eq!(it.hit_test(&model, &area(), pos2(400.0, 150.0)), None);
    }

    #[test]
    fn test_click_below_threshold_only_selects() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 100);
        let mut it = interaction();
        it.pointer_pressed(&mut model, &area(), at(0, 10), Modifiers::NONE);
        assert!(model.is_snippet_selected(a));
        it.pointer_moved(&mut model, &area(), at(0, 13));
        assert!(matches!(it.drag, DragState::Pending { .. }));
        let cmd = it
            .pointer_released(&mut model, &area(), at(0, 13), Modifiers::NONE)
            .unwrap();
        assert!(cmd.is_none());
        assert_eq!(model.find_snippet_by_id(a).unwrap().1.start_tick, 0);
        assert_eq!(it.drag, DragState::Idle);
    }

    #[test]
    fn test_drag_moves_selection_across_tracks() {
        let mut model = model_with_tracks(3);
        let a = add(&mut model, 0, 0, 100);
        let b = add(&mut model, 1, 20, 30);
        model.selection.add(a);
        model.selection.add(b);

        let mut it = interaction();
        it.pointer_pressed(&mut model, &area(), at(0, 10), Modifiers::NONE);
        it.pointer_moved(&mut model, &area(), at(1, 210));
        assert!(matches!(it.drag, DragState::Dragging { .. }));

        let preview = it.drag_preview(&model, &area(), at(1, 210));
        assert_eq!(preview.len(), 2);
        assert_eq!(model.find_snippet_by_id(a).unwrap().0, 0);

        let cmd = it
            .pointer_released(&mut model, &area(), at(1, 410), Modifiers::NONE)
            .unwrap()
            .unwrap();
        assert!(matches!(cmd, Command::MoveSnippets(_)));
        let (ta, sa) = model.find_snippet_by_id(a).unwrap();
        assert_eq!((ta, sa.start_tick), (1, 400));
        let (tb, sb) = model.find_snippet_by_id(b).unwrap();
        assert_eq!((tb, sb.start_tick), (2, 420));

        cmd.undo(&mut model).unwrap();
        assert_eq!(model.find_snippet_by_id(b).unwrap().0, 1);
    }

    #[test]
    fn test_drag_past_last_track_skips_only_that_snippet() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 50);
        let b = add(&mut model, 1, 0, 50);
        model.selection.add(a);
        model.selection.add(b);
        let mut it = interaction();
        it.pointer_pressed(&mut model, &area(), at(0, 10), Modifiers::NONE);
        it.pointer_moved(&mut model, &area(), at(1, 300));
        let requests = it.drop_requests(&model, &area(), at(1, 300));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, a);
        assert_eq!(requests[0].to_track, 1);
    }

    #[test]
    fn test_alt_drop_duplicates() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 50);
        let mut it = interaction();
        it.pointer_pressed(&mut model, &area(), at(0, 10), Modifiers::NONE);
        it.pointer_moved(&mut model, &area(), at(0, 300));
        let cmd = it
            .pointer_released(&mut model, &area(), at(0, 300), Modifiers::ALT)
            .unwrap()
            .unwrap();
        assert!(matches!(cmd, Command::DuplicateSnippets(_)));
        assert_eq!(model.track(0).unwrap().snippets().len(), 2);
        assert_eq!(model.find_snippet_by_id(a).unwrap().1.start_tick, 0);
    }

    #[test]
    fn test_selection_box() {
        let mut model = model_with_tracks(2);
        let a = add(&mut model, 0, 0, 50);
        let b = add(&mut model, 1, 100, 50);
        let c = add(&mut model, 1, 400, 50);
        let mut it = interaction();

        it.pointer_pressed(&mut model, &area(), at(0, 200), Modifiers::NONE);
        assert_eq!(model.selected_track(), Some(0));
        it.pointer_moved(&mut model, &area(), at(1, 40));
        assert!(it.selection_rect().is_some());
        it.pointer_released(&mut model, &area(), at(1, 40), Modifiers::NONE)
            .unwrap();
        assert!(model.is_snippet_selected(a));
        assert!(model.is_snippet_selected(b));
        assert!(!model.is_snippet_selected(c));

        it.pointer_pressed(&mut model, &area(), at(1, 300), Modifiers::SHIFT);
        it.pointer_released(&mut model, &area(), at(1, 420), Modifiers::SHIFT)
            .unwrap();
        assert_eq!(model.selection.len(), 3);
    }

    #[test]
    fn test_shift_click_toggles() {
        let mut model = model_with_tracks(1);
        let a = add(&mut model, 0, 0, 50);
        let b = add(&mut model, 0, 100, 50);
        let mut it = interaction();
        it.pointer_pressed(&mut model, &area(), at(0, 10), Modifiers::NONE);
        it.pointer_released(&mut model, &area(), at(0, 10), Modifiers::NONE).unwrap();
        it.pointer_pressed(&mut model, &area(), at(0, 110), Modifiers::SHIFT);
        it.pointer_released(&mut model, &area(), at(0, 110), Modifiers::SHIFT).unwrap();
        assert_eq!(model.selection.as_slice(), &[a, b]);
        it.pointer_pressed(&mut model, &area(), at(0, 10), Modifiers::SHIFT);
        assert_eq!(model.selection.as_slice(), &[b]);
    }

    #[test]
    fn test_scrub_ignored_while_recording() {
        let mut model = model_with_tracks(1);
        let it = interaction();
        it.scrub(&mut model, 150.0, &area());
        assert_eq!(model.current_tick(), 50);
        model.set_selected_track(Some(0));
        model.begin_recording(&[0]).unwrap();
        it.scrub(&mut model, 400.0, &area());
        assert_eq!(model.current_tick(), 50);
    }

    #[test]
    fn test_zoom_and_scroll() {
        let mut it = interaction();
        let area = area();
        it.scroll(vec2(-50.0, 0.0), &area, 2);
        assert_eq!(it.view.view_start_tick, 50);

        let under = it.view.screen_x_to_tick(300.0, area.rect.left());
        it.zoom(ZOOM_STEP, 300.0, &area);
        assert!((it.view.zoom - 1.1).abs() < 1e-6);
        assert_eq!(it.view.screen_x_to_tick(300.0, area.rect.left()), under);

        it.scroll(vec2(0.0, -500.0), &area, 10);
        assert_eq!(it.scroll_y, 200.0);
        it.scroll(vec2(0.0, 1000.0), &area, 10);
        assert_eq!(it.scroll_y, 0.0);
        it.scroll(vec2(0.0, -100.0), &area, 2);
        assert_eq!(it.scroll_y, 0.0);
    }

    #[test]
    fn test_shortcut_mapping() {
        let none = Modifiers::NONE;
        assert_eq!(Shortcut::from_key(Key::Z, Modifiers::CTRL, false), Some(Shortcut::Undo));
        assert_eq!(
            Shortcut::from_key(Key::Z, Modifiers::CTRL | Modifiers::SHIFT, false),
            Some(Shortcut::Redo)
        );
        assert_eq!(
            Shortcut::from_key(Key::R, Modifiers::COMMAND, false),
            Some(Shortcut::SplitSelected)
        );
        assert_eq!(Shortcut::from_key(Key::R, none, false), Some(Shortcut::ToggleDummyCopy));
        assert_eq!(
            Shortcut::from_key(Key::R, Modifiers::SHIFT, false),
            Some(Shortcut::ToggleRecording)
        );
        assert_eq!(
            Shortcut::from_key(Key::Escape, Modifiers::SHIFT, true),
            Some(Shortcut::CancelRecording)
        );
        assert_eq!(
            Shortcut::from_key(Key::Num3, Modifiers::ALT, false),
            Some(Shortcut::SwitchTrack(2))
        );
        assert_eq!(Shortcut::from_key(Key::Q, Modifiers::ALT, false), None);
        // Movement keys belong to the character while recording.
        assert_eq!(
            Shortcut::from_key(Key::A, none, false),
            Some(Shortcut::ToggleSelectedActive)
        );
        assert_eq!(Shortcut::from_key(Key::A, none, true), None);
        assert_eq!(Shortcut::from_key(Key::F, none, true), Some(Shortcut::TrimRecording));
        assert_eq!(Shortcut::from_key(Key::Q, none, false), None);
    }

    #[test]
    fn test_held_controls_build_input() {
        let aimed = PlayerInput::default().with_target(40, -20);
        let controls = HeldControls {
            left: true,
            jump: true,
            kill: true,
            weapon: Some(3),
            ..HeldControls::default()
        };
        let input = controls.to_input(aimed);
        assert_eq!(input.direction, -1);
        assert_eq!((input.jump, input.fire), (1, 0));
        assert_eq!(input.wanted_weapon, 3);
        assert_eq!((input.target_x, input.target_y), (40, -20));
        assert_ne!(input.player_flags & PLAYERFLAG_KILL, 0);

        let released = HeldControls::default().to_input(input);
        assert_eq!(released.direction, 0);
        assert_eq!(released.wanted_weapon, 3);
        assert_eq!(released.player_flags & PLAYERFLAG_KILL, 0);
    }
}
