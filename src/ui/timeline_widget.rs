use eframe::egui::{self, StrokeKind};

use crate::ops::interaction::{DragState, TrackArea};
use crate::physics::PhysicsWorld;
use crate::types::session::EditorSession;
use crate::types::snippet::Snippet;

pub const RULER_HEIGHT: f32 = 30.0;
pub const TRACK_LABEL_WIDTH: f32 = 120.0;
/// Game ticks per second, used for time labels only.
pub const SERVER_TICK_RATE: i32 = 50;

const ACTIVE_COLOR: egui::Color32 = egui::Color32::from_rgb(100, 180, 255);
const INACTIVE_COLOR: egui::Color32 = egui::Color32::from_gray(90);
const SELECTED_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 180, 100);
const RECORDING_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 60, 60);

/// Timeline widget state that persists between frames
#[derive(Debug, Default)]
pub struct TimelineState {
    /// Tick under the pointer, if it is over the tracks
    pub hovered_tick: Option<i32>,
    pub hovered_track: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// Playhead moved by a ruler click or drag
    Seeked(i32),
    /// An undoable edit went through; carries its history label
    Edited(String),
    TrackSelected(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextAction {
    AddSnippet,
    Split,
    Merge,
    ToggleActive,
    Delete,
}

/// Ruler spacing in ticks, (major, minor), so that labels stay readable.
pub fn ruler_intervals(zoom: f32) -> (i32, i32) {
    const STEPS: [i32; 12] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000];
    let major = STEPS
        .iter()
        .copied()
        .find(|step| *step as f32 * zoom >= 60.0)
        .unwrap_or(STEPS[STEPS.len() - 1]);
    (major, (major / 5).max(1))
}

pub fn format_tick(tick: i32) -> String {
    let total_centis = tick as i64 * 100 / SERVER_TICK_RATE as i64;
    let minutes = total_centis / 6000;
    let seconds = (total_centis % 6000) / 100;
    let centis = total_centis % 100;
    format!("{} ({}:{:02}.{:02})", tick, minutes, seconds, centis)
}

pub struct TimelineWidget<'a, W: PhysicsWorld> {
    session: &'a mut EditorSession<W>,
    state: &'a mut TimelineState,
}

impl<'a, W: PhysicsWorld> TimelineWidget<'a, W> {
    pub fn new(session: &'a mut EditorSession<W>, state: &'a mut TimelineState) -> Self {
        Self { session, state }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> Vec<TimelineEvent> {
        let mut events = Vec::new();

        let (timeline_rect, _) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
        let ruler_rect = egui::Rect::from_min_max(
            timeline_rect.left_top() + egui::vec2(TRACK_LABEL_WIDTH, 0.0),
            egui::pos2(timeline_rect.right(), timeline_rect.top() + RULER_HEIGHT),
        );
        let tracks_rect = egui::Rect::from_min_max(
            timeline_rect.left_top() + egui::vec2(TRACK_LABEL_WIDTH, RULER_HEIGHT),
            timeline_rect.right_bottom(),
        );
        let track_list_rect = egui::Rect::from_min_max(
            timeline_rect.left_top() + egui::vec2(0.0, RULER_HEIGHT),
            egui::pos2(timeline_rect.left() + TRACK_LABEL_WIDTH, timeline_rect.bottom()),
        );

        if self.session.playback.auto_scroll
            && (self.session.playback.is_running() || self.session.model.is_recording())
        {
            let tick = self.session.model.current_tick();
            self.session.interaction.view.follow(tick, tracks_rect.width());
        }

        self.handle_track_input(ui, tracks_rect, &mut events);
        self.handle_ruler_input(ui, ruler_rect, tracks_rect, &mut events);
        self.handle_track_labels(ui, track_list_rect, &mut events);

        let painter = ui.painter_at(timeline_rect);
        painter.rect_filled(timeline_rect, 0.0, ui.style().visuals.window_fill);
        let area = self.session.interaction.area(tracks_rect);
        self.draw_tracks(&painter.with_clip_rect(tracks_rect), &area);
        self.draw_track_labels(&painter.with_clip_rect(track_list_rect), track_list_rect);
        self.draw_ruler(&painter, ruler_rect);
        self.draw_playhead(&painter, ruler_rect, tracks_rect);

        if let Some(rect) = self.session.interaction.selection_rect() {
            painter.rect_filled(
                rect,
                0.0,
                egui::Color32::from_rgba_unmultiplied(100, 150, 255, 40),
            );
            painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::from_rgb(100, 150, 255)),
                StrokeKind::Inside,
            );
        }

        events
    }

    /// Pointer handling for the track rows: selection, drag and drop, pan,
    /// scroll and the context menu.
    fn handle_track_input(
        &mut self,
        ui: &mut egui::Ui,
        tracks_rect: egui::Rect,
        events: &mut Vec<TimelineEvent>,
    ) {
        let response = ui.interact(
            tracks_rect,
            ui.id().with("timeline_tracks"),
            egui::Sense::click_and_drag(),
        );
        let area = self.session.interaction.area(tracks_rect);
        let track_count = self.session.model.track_count();
        let (modifiers, pressed, released, pointer, scroll, zoom) = ui.input(|i| {
            (
                i.modifiers,
                i.pointer.primary_pressed(),
                i.pointer.primary_released() || !i.pointer.primary_down(),
                i.pointer.latest_pos(),
                i.raw_scroll_delta,
                i.zoom_delta(),
            )
        });

        self.state.hovered_tick = None;
        self.state.hovered_track = None;
        if let Some(pos) = response.hover_pos() {
            let interaction = &self.session.interaction;
            self.state.hovered_tick =
                Some(interaction.view.screen_x_to_tick(pos.x, tracks_rect.left()).max(0));
            self.state.hovered_track = interaction.track_at(track_count, &area, pos.y);
        }

        if let Some(pos) = pointer {
            let interaction = &mut self.session.interaction;
            if pressed && response.hovered() {
                interaction.pointer_pressed(&mut self.session.model, &area, pos, modifiers);
            } else if interaction.drag != DragState::Idle {
                if released {
                    match interaction.pointer_released(&mut self.session.model, &area, pos, modifiers)
                    {
                        Ok(Some(cmd)) => {
                            if self.session.execute(Ok(cmd)) {
                                events.push(self.edited());
                            }
                        }
                        Ok(None) => {}
                        Err(err) => self.session.report(err),
                    }
                } else {
                    interaction.pointer_moved(&mut self.session.model, &area, pos);
                }
            }
        }

        if response.dragged_by(egui::PointerButton::Middle) {
            self.session.interaction.view.pan_pixels(response.drag_delta().x);
        }
        if response.hovered() {
            if zoom != 1.0 {
                if let Some(pos) = pointer {
                    self.session.interaction.zoom(zoom, pos.x, &area);
                }
            }
            if scroll != egui::Vec2::ZERO {
                self.session.interaction.scroll(scroll, &area, track_count);
            }
        }

        if response.secondary_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.select_under_pointer(&area, pos);
            }
        }

        let mut action = None;
        response.context_menu(|ui| {
            let items = [
                ("Add Snippet (Ins)", ContextAction::AddSnippet),
                ("Split (Ctrl+R)", ContextAction::Split),
                ("Merge (Ctrl+M)", ContextAction::Merge),
                ("Toggle Active (A)", ContextAction::ToggleActive),
                ("Delete (Del)", ContextAction::Delete),
            ];
            for (label, item) in items {
                if ui.button(label).clicked() {
                    action = Some(item);
                    ui.close_menu();
                }
            }
        });
        if let Some(action) = action {
            let done = match action {
                ContextAction::AddSnippet => self.session.add_snippet_at_playhead(),
                ContextAction::Split => self.session.split_selected(),
                ContextAction::Merge => self.session.merge_selected(),
                ContextAction::ToggleActive => self.session.toggle_selected_active(),
                ContextAction::Delete => self.session.delete_selected(),
            };
            if done {
                events.push(self.edited());
            }
        }
    }

    /// Right click picks the track under the pointer and, unless it is already
    /// part of the selection, the snippet there.
    fn select_under_pointer(&mut self, area: &TrackArea, pos: egui::Pos2) {
        let interaction = &self.session.interaction;
        let model = &mut self.session.model;
        if let Some(track) = interaction.track_at(model.track_count(), area, pos.y) {
            model.set_selected_track(Some(track));
        }
        if let Some(id) = interaction.hit_test(model, area, pos) {
            if !model.is_snippet_selected(id) {
                model.selection.clear();
                model.selection.add(id);
            }
        }
    }

    fn handle_ruler_input(
        &mut self,
        ui: &mut egui::Ui,
        ruler_rect: egui::Rect,
        tracks_rect: egui::Rect,
        events: &mut Vec<TimelineEvent>,
    ) {
        let response = ui.interact(
            ruler_rect,
            ui.id().with("timeline_ruler"),
            egui::Sense::click_and_drag(),
        );
        if !(response.clicked() || response.dragged()) {
            return;
        }
        if let Some(pos) = response.interact_pointer_pos() {
            let before = self.session.model.current_tick();
            let area = self.session.interaction.area(tracks_rect);
            self.session
                .interaction
                .scrub(&mut self.session.model, pos.x, &area);
            let after = self.session.model.current_tick();
            if after != before {
                events.push(TimelineEvent::Seeked(after));
            }
        }
    }

    fn handle_track_labels(
        &mut self,
        ui: &mut egui::Ui,
        track_list_rect: egui::Rect,
        events: &mut Vec<TimelineEvent>,
    ) {
        let view = self.session.interaction.view;
        let scroll_y = self.session.interaction.scroll_y;
        for index in 0..self.session.model.track_count() {
            let top = view.track_screen_y(index, track_list_rect.top(), scroll_y);
            let rect = egui::Rect::from_min_size(
                egui::pos2(track_list_rect.left(), top),
                egui::vec2(TRACK_LABEL_WIDTH, view.track_height),
            )
            .intersect(track_list_rect);
            if rect.height() <= 0.0 {
                continue;
            }
            let response = ui.interact(
                rect,
                ui.id().with(("track_label", index)),
                egui::Sense::click(),
            );
            if response.clicked() {
                self.session.switch_track(index);
                events.push(TimelineEvent::TrackSelected(index));
            }
        }
    }

    fn edited(&self) -> TimelineEvent {
        TimelineEvent::Edited(self.session.history.undo_label().unwrap_or_default())
    }

    fn snippet_fill(&self, snippet: &Snippet) -> egui::Color32 {
        let model = &self.session.model;
        let selected = model.is_snippet_selected(snippet.id);
        let fill = if selected {
            SELECTED_COLOR
        } else if snippet.is_active {
            ACTIVE_COLOR
        } else {
            INACTIVE_COLOR
        };
        // The originals fade while their preview follows the pointer
        if selected && matches!(self.session.interaction.drag, DragState::Dragging { .. }) {
            fill.gamma_multiply(0.35)
        } else {
            fill
        }
    }

    fn draw_tracks(&self, painter: &egui::Painter, area: &TrackArea) {
        let model = &self.session.model;
        let interaction = &self.session.interaction;
        let view = interaction.view;
        let tracks_rect = area.rect;

        if model.track_count() == 0 {
            painter.text(
                tracks_rect.center(),
                egui::Align2::CENTER_CENTER,
                "No tracks. Add one from the Track menu.",
                egui::FontId::proportional(14.0),
                egui::Color32::from_gray(140),
            );
            return;
        }

        for (index, track) in model.tracks().iter().enumerate() {
            let top = view.track_screen_y(index, tracks_rect.top(), area.scroll_y);
            if top > tracks_rect.bottom() || top + view.track_height < tracks_rect.top() {
                continue;
            }
            let row = egui::Rect::from_min_size(
                egui::pos2(tracks_rect.left(), top),
                egui::vec2(tracks_rect.width(), view.track_height),
            );
            let background = if model.selected_track() == Some(index) {
                egui::Color32::from_rgb(40, 48, 60)
            } else if index % 2 == 0 {
                egui::Color32::from_gray(30)
            } else {
                egui::Color32::from_gray(35)
            };
            painter.rect_filled(row, 0.0, background);
            painter.line_segment(
                [row.left_bottom(), row.right_bottom()],
                egui::Stroke::new(1.0, egui::Color32::from_gray(50)),
            );

            for snippet in track.snippets() {
                let rect = interaction.snippet_rect(model, area, index, snippet);
                if !rect.intersects(tracks_rect) {
                    continue;
                }
                painter.rect_filled(rect, 3.0, self.snippet_fill(snippet));
                if model.is_snippet_selected(snippet.id) {
                    painter.rect_stroke(
                        rect,
                        3.0,
                        egui::Stroke::new(2.0, egui::Color32::WHITE),
                        StrokeKind::Outside,
                    );
                }
                if rect.width() > 30.0 {
                    painter.text(
                        rect.left_center() + egui::vec2(4.0, 0.0),
                        egui::Align2::LEFT_CENTER,
                        snippet.id.to_string(),
                        egui::FontId::proportional(11.0),
                        egui::Color32::BLACK,
                    );
                }
            }

            for recording in track.recording_snippets() {
                let rect = interaction.span_rect(
                    area,
                    index,
                    recording.start_tick,
                    recording.end_tick(),
                    0,
                    1,
                );
                painter.rect_filled(rect, 3.0, RECORDING_COLOR.gamma_multiply(0.6));
                painter.rect_stroke(
                    rect,
                    3.0,
                    egui::Stroke::new(1.0, RECORDING_COLOR),
                    StrokeKind::Inside,
                );
            }
        }

        if let DragState::Dragging { .. } = interaction.drag {
            if let Some(pos) = painter.ctx().input(|i| i.pointer.latest_pos()) {
                for (track, span) in interaction.drag_preview(model, area, pos) {
                    let stack = model
                        .stack_size_at_tick_range(track, span.start, span.end)
                        .max(span.layer as usize + 1);
                    let rect =
                        interaction.span_rect(area, track, span.start, span.end, span.layer, stack);
                    painter.rect_filled(rect, 3.0, SELECTED_COLOR.gamma_multiply(0.5));
                    painter.rect_stroke(
                        rect,
                        3.0,
                        egui::Stroke::new(2.0, egui::Color32::YELLOW),
                        StrokeKind::Inside,
                    );
                }
            }
        }

        if model.is_recording() {
            let x = view.tick_to_screen_x(model.recording_start_tick(), tracks_rect.left());
            painter.line_segment(
                [
                    egui::pos2(x, tracks_rect.top()),
                    egui::pos2(x, tracks_rect.bottom()),
                ],
                egui::Stroke::new(1.0, RECORDING_COLOR.gamma_multiply(0.5)),
            );
        }
    }

    fn draw_track_labels(&self, painter: &egui::Painter, track_list_rect: egui::Rect) {
        let model = &self.session.model;
        let view = self.session.interaction.view;
        let scroll_y = self.session.interaction.scroll_y;
        painter.rect_filled(track_list_rect, 0.0, egui::Color32::from_gray(25));

        for (index, track) in model.tracks().iter().enumerate() {
            let top = view.track_screen_y(index, track_list_rect.top(), scroll_y);
            let rect = egui::Rect::from_min_size(
                egui::pos2(track_list_rect.left(), top),
                egui::vec2(TRACK_LABEL_WIDTH, view.track_height),
            );
            if !rect.intersects(track_list_rect) {
                continue;
            }
            let selected = model.selected_track() == Some(index);
            painter.rect_filled(
                rect.shrink(1.0),
                2.0,
                if selected {
                    egui::Color32::from_rgb(60, 80, 110)
                } else {
                    egui::Color32::DARK_GRAY
                },
            );

            let recording_here = model.is_recording() && !track.recording_snippets().is_empty();
            let mut name = track.settings.player_info.name.clone();
            if track.is_dummy() {
                name.push_str(" (dummy)");
            }
            painter.text(
                rect.left_center() + egui::vec2(8.0, 0.0),
                egui::Align2::LEFT_CENTER,
                name,
                egui::FontId::proportional(13.0),
                egui::Color32::WHITE,
            );
            if recording_here {
                painter.circle_filled(
                    rect.right_center() - egui::vec2(10.0, 0.0),
                    4.0,
                    RECORDING_COLOR,
                );
            }
        }
    }

    fn draw_ruler(&self, painter: &egui::Painter, ruler_rect: egui::Rect) {
        let view = self.session.interaction.view;
        painter.rect_filled(ruler_rect, 0.0, egui::Color32::from_gray(40));

        let (major_interval, minor_interval) = ruler_intervals(view.zoom);
        let start_tick = view.view_start_tick;
        let end_tick = start_tick + view.visible_ticks(ruler_rect.width());
        let painter = painter.with_clip_rect(ruler_rect);

        // Minor ticks
        let mut tick = start_tick - start_tick % minor_interval;
        while tick <= end_tick {
            let x = view.tick_to_screen_x(tick, ruler_rect.left());
            painter.line_segment(
                [
                    egui::pos2(x, ruler_rect.bottom() - 5.0),
                    egui::pos2(x, ruler_rect.bottom()),
                ],
                egui::Stroke::new(1.0, egui::Color32::from_gray(120)),
            );
            tick += minor_interval;
        }

        // Major ticks with labels
        let mut tick = start_tick - start_tick % major_interval;
        while tick <= end_tick {
            let x = view.tick_to_screen_x(tick, ruler_rect.left());
            painter.line_segment(
                [
                    egui::pos2(x, ruler_rect.bottom() - 15.0),
                    egui::pos2(x, ruler_rect.bottom()),
                ],
                egui::Stroke::new(2.0, egui::Color32::WHITE),
            );
            painter.text(
                egui::pos2(x + 2.0, ruler_rect.center().y - 4.0),
                egui::Align2::LEFT_CENTER,
                tick.to_string(),
                egui::FontId::proportional(11.0),
                egui::Color32::WHITE,
            );
            tick += major_interval;
        }
    }

    fn draw_playhead(&self, painter: &egui::Painter, ruler_rect: egui::Rect, tracks_rect: egui::Rect) {
        let view = self.session.interaction.view;
        let x = view.tick_to_screen_x(self.session.model.current_tick(), tracks_rect.left());
        if x < tracks_rect.left() || x > tracks_rect.right() {
            return;
        }
        let color = if self.session.model.is_recording() {
            RECORDING_COLOR
        } else {
            egui::Color32::RED
        };
        painter.line_segment(
            [
                egui::pos2(x, ruler_rect.top()),
                egui::pos2(x, tracks_rect.bottom()),
            ],
            egui::Stroke::new(2.0, color),
        );
        let handle_rect = egui::Rect::from_center_size(
            egui::pos2(x, ruler_rect.top() + 15.0),
            egui::vec2(12.0, 12.0),
        );
        painter.rect_filled(handle_rect, 6.0, color);
    }
}
