use eframe::egui;
use log::{error, info};
use std::path::PathBuf;

use crate::ops::api::TimelineApi;
use crate::ops::commands::{EditInputs, EditTrackSettings};
use crate::ops::interaction::{HeldControls, Shortcut, ZOOM_STEP};
use crate::ops::tools;
use crate::physics::PhysicsWorld;
use crate::physics::sandbox::SandboxWorld;
use crate::types::config::CONFIG_FILE_NAME;
use crate::types::input::{NUM_WEAPONS, PlayerInput};
use crate::types::project::PROJECT_EXTENSION;
use crate::types::session::EditorSession;
use crate::types::snippet::SnippetId;
use crate::types::timeline::TimelineModel;
use crate::types::track::{DummyCopyFlags, TrackSettings};
use crate::ui::timeline_widget::{TimelineEvent, TimelineState, TimelineWidget, format_tick};

const DUMMY_COPY_FIELDS: [(&str, DummyCopyFlags); 8] = [
    ("Direction", DummyCopyFlags::DIRECTION),
    ("Aim", DummyCopyFlags::TARGET),
    ("Jump", DummyCopyFlags::JUMP),
    ("Fire", DummyCopyFlags::FIRE),
    ("Hook", DummyCopyFlags::HOOK),
    ("Weapon", DummyCopyFlags::WEAPON),
    ("Mirror X", DummyCopyFlags::MIRROR_X),
    ("Mirror Y", DummyCopyFlags::MIRROR_Y),
];

/// Empty timeline with one selected track, what a new project starts from.
pub fn starter_timeline() -> TimelineModel<SandboxWorld> {
    let mut model = TimelineModel::new(SandboxWorld::new());
    match model.add_new_track(1, TrackSettings::default()) {
        Ok(index) => model.set_selected_track(Some(index)),
        Err(err) => error!("could not create the first track: {}", err),
    }
    model
}

pub struct AppState {
    pub session: EditorSession<SandboxWorld>,
    pub timeline_state: TimelineState,
    /// Track settings being edited in the side panel, applied as one undo step
    pub settings_draft: Option<(usize, TrackSettings)>,
    pub settings_dirty: bool,
    /// Last thing worth telling the user, shown in the status bar
    pub status: String,
}

impl AppState {
    pub fn new(session: EditorSession<SandboxWorld>) -> Self {
        Self {
            session,
            timeline_state: TimelineState::default(),
            settings_draft: None,
            settings_dirty: false,
            status: String::new(),
        }
    }
}

pub struct TaslineApp {
    pub state: AppState,
}

impl TaslineApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn project_dialog() -> rfd::FileDialog {
        rfd::FileDialog::new().add_filter("Tasline project", &[PROJECT_EXTENSION])
    }

    fn new_project(&mut self) {
        let session = &mut self.state.session;
        session.new_project(SandboxWorld::new());
        session.model = starter_timeline();
        self.state.settings_draft = None;
        self.state.status = "New project".to_string();
    }

    fn open_project(&mut self) {
        let Some(path) = Self::project_dialog().pick_file() else {
            return;
        };
        match self.state.session.load(&path, SandboxWorld::new()) {
            Ok(()) => {
                self.state.settings_draft = None;
                self.state.status = format!("Opened {}", path.display());
            }
            Err(err) => {
                error!("failed to open {}: {}", path.display(), err);
                self.state.session.report(err);
            }
        }
    }

    fn save_project(&mut self, save_as: bool) {
        let path: PathBuf = match (&self.state.session.project_path, save_as) {
            (Some(path), false) => path.clone(),
            _ => {
                let dialog = Self::project_dialog()
                    .set_file_name(format!("untitled.{}", PROJECT_EXTENSION));
                match dialog.save_file() {
                    Some(path) => path,
                    None => return,
                }
            }
        };
        match self.state.session.save(&path) {
            Ok(()) => self.state.status = format!("Saved {}", path.display()),
            Err(err) => {
                error!("failed to save {}: {}", path.display(), err);
                self.state.session.report(err);
            }
        }
    }

    fn save_settings(&mut self) {
        match self.state.session.config.save_to_file(CONFIG_FILE_NAME) {
            Ok(()) => self.state.status = format!("Saved settings to {}", CONFIG_FILE_NAME),
            Err(err) => self.state.session.report(err),
        }
    }

    /// Keyboard shortcuts, hold-to-rewind and the live recording controls.
    fn handle_input(&mut self, ctx: &egui::Context) {
        let session = &mut self.state.session;
        let dt = ctx.input(|i| i.stable_dt) as f64;
        if ctx.wants_keyboard_input() {
            session.update(dt, false);
            return;
        }

        let recording = session.model.is_recording();
        let (shortcuts, rewinding, controls) = ctx.input(|i| {
            let shortcuts: Vec<Shortcut> = i
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat,
                        modifiers,
                        ..
                    } => {
                        // Only stepping auto-repeats
                        let steps = matches!(key, egui::Key::ArrowLeft | egui::Key::ArrowRight);
                        if *repeat && !steps {
                            return None;
                        }
                        Shortcut::from_key(*key, *modifiers, recording)
                    }
                    _ => None,
                })
                .collect();
            let rewinding = i.key_down(egui::Key::C) && !i.modifiers.any();
            (shortcuts, rewinding, HeldControls::read(i))
        });

        for shortcut in shortcuts {
            session.run_shortcut(shortcut);
        }
        session.playback.set_reversing(rewinding);
        session.set_live_input(&controls);
        session.update(dt, controls.fire);
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("New").clicked() {
                    self.new_project();
                    ui.close_menu();
                }
                if ui.button("Open…").clicked() {
                    self.open_project();
                    ui.close_menu();
                }
                if ui.button("Save").clicked() {
                    self.save_project(false);
                    ui.close_menu();
                }
                if ui.button("Save As…").clicked() {
                    self.save_project(true);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Save Settings").clicked() {
                    self.save_settings();
                    ui.close_menu();
                }
                if ui.button("Quit").clicked() {
                    ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                let session = &mut self.state.session;
                let undo = session.history.undo_label();
                let redo = session.history.redo_label();
                let entries = [
                    (
                        format!("Undo {}", undo.clone().unwrap_or_default()),
                        Shortcut::Undo,
                        undo.is_some(),
                    ),
                    (
                        format!("Redo {}", redo.unwrap_or_default()),
                        Shortcut::Redo,
                        session.history.can_redo(),
                    ),
                    ("Select All".to_string(), Shortcut::SelectAll, true),
                    ("Split".to_string(), Shortcut::SplitSelected, true),
                    ("Merge".to_string(), Shortcut::MergeSelected, true),
                    ("Toggle Active".to_string(), Shortcut::ToggleSelectedActive, true),
                    ("Delete".to_string(), Shortcut::DeleteSelected, true),
                ];
                for (label, shortcut, enabled) in entries {
                    if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                        session.run_shortcut(shortcut);
                        ui.close_menu();
                    }
                }
            });

            ui.menu_button("Track", |ui| {
                let session = &mut self.state.session;
                let recording = session.model.is_recording();
                if ui.add_enabled(!recording, egui::Button::new("Add Track")).clicked() {
                    session.add_track(TrackSettings::default());
                    ui.close_menu();
                }
                if ui
                    .add_enabled(!recording, egui::Button::new("Add Dummy Track"))
                    .clicked()
                {
                    session.add_track(TrackSettings {
                        is_dummy: true,
                        ..TrackSettings::default()
                    });
                    ui.close_menu();
                }
                if ui
                    .add_enabled(!recording, egui::Button::new("Remove Selected Track"))
                    .clicked()
                {
                    session.remove_selected_track();
                    ui.close_menu();
                }
            });

            ui.menu_button("Tools", |ui| {
                let session = &mut self.state.session;
                let enabled = !session.model.is_recording();
                if ui
                    .add_enabled(enabled, egui::Button::new("Hold Input to Snippet End"))
                    .clicked()
                {
                    let result = tools::hold_input_to_end(&mut TimelineApi::new(
                        &mut session.model,
                        &mut session.history,
                    ));
                    match result {
                        Ok(ticks) => {
                            session.dirty |= ticks > 0;
                            self.state.status = format!("Held input for {} tick(s)", ticks);
                        }
                        Err(err) => session.report(err),
                    }
                    ui.close_menu();
                }
                if ui
                    .add_enabled(enabled, egui::Button::new("Duplicate Track"))
                    .clicked()
                {
                    let result = tools::duplicate_track(&mut TimelineApi::new(
                        &mut session.model,
                        &mut session.history,
                    ));
                    match result {
                        Ok(track) => {
                            session.dirty = true;
                            session.model.set_selected_track(Some(track));
                            self.state.status = format!("Created track {}", track + 1);
                        }
                        Err(err) => session.report(err),
                    }
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                let session = &mut self.state.session;
                if ui.button("Zoom In").clicked() {
                    session.interaction.view.zoom_at(ZOOM_STEP, 0.0, 0.0);
                }
                if ui.button("Zoom Out").clicked() {
                    session.interaction.view.zoom_at(1.0 / ZOOM_STEP, 0.0, 0.0);
                }
                ui.checkbox(&mut session.playback.auto_scroll, "Follow playhead");
                ui.checkbox(&mut session.config.dummy_copy_enabled, "Dummy copy (R)");
            });
        });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let session = &mut self.state.session;
        ui.horizontal(|ui| {
            let recording = session.model.is_recording();
            if ui.button("⏮").clicked() && !recording {
                session.playback.stop();
                session.model.set_current_tick(0);
            }
            if ui.button("⏪").clicked() {
                session.step(-1);
            }
            let play_label = if session.playback.is_playing { "⏸" } else { "▶" };
            if ui.button(play_label).clicked() {
                session.playback.toggle_play();
            }
            if ui.button("⏩").clicked() {
                session.step(1);
            }
            if ui.button("⏭").clicked() && !recording {
                session.playback.stop();
                session.model.set_current_tick(session.model.max_timeline_tick());
            }
            ui.separator();

            let record_label = if recording { "⏹ Stop" } else { "⏺ Record" };
            if ui.button(record_label).clicked() {
                session.toggle_recording();
            }
            if ui.add_enabled(recording, egui::Button::new("Trim")).clicked() {
                session.trim_recording();
            }
            if ui.add_enabled(recording, egui::Button::new("Cancel")).clicked() {
                session.cancel_recording();
            }
            ui.separator();

            let mut speed = session.playback.playback_speed;
            let response = ui.add(
                egui::DragValue::new(&mut speed)
                    .range(1..=1000)
                    .suffix(" ticks/s"),
            );
            if response.changed() {
                session.change_playback_speed(speed as i32 - session.playback.playback_speed as i32);
            }
            ui.label(format!("Tick {}", format_tick(session.model.current_tick())));
        });
    }

    fn track_properties(&mut self, ui: &mut egui::Ui) {
        let state = &mut self.state;
        let session = &mut state.session;
        let Some(index) = session.model.selected_track() else {
            ui.label("No track selected");
            state.settings_draft = None;
            return;
        };
        let Some(current) = session.model.track(index).map(|t| t.settings.clone()) else {
            return;
        };
        let stale = match &state.settings_draft {
            Some((draft_index, _)) => *draft_index != index || !state.settings_dirty,
            None => true,
        };
        if stale {
            state.settings_draft = Some((index, current.clone()));
            state.settings_dirty = false;
        }
        let Some((_, draft)) = state.settings_draft.as_mut() else {
            return;
        };

        ui.heading(format!("Track {}", index + 1));
        let mut changed = false;
        egui::Grid::new("track_settings")
            .num_columns(2)
            .show(ui, |ui| {
                ui.label("Name");
                changed |= ui
                    .text_edit_singleline(&mut draft.player_info.name)
                    .changed();
                ui.end_row();
                ui.label("Clan");
                changed |= ui
                    .text_edit_singleline(&mut draft.player_info.clan)
                    .changed();
                ui.end_row();
                ui.label("Skin");
                changed |= ui.add(egui::DragValue::new(&mut draft.player_info.skin)).changed();
                ui.end_row();
                changed |= ui
                    .checkbox(&mut draft.player_info.use_custom_color, "Custom color")
                    .changed();
                changed |= ui
                    .color_edit_button_rgb(&mut draft.player_info.color)
                    .changed();
                ui.end_row();
            });

        ui.collapsing("Starting config", |ui| {
            let start = &mut draft.starting_config;
            changed |= ui.checkbox(&mut start.enabled, "Override spawn").changed();
            ui.add_enabled_ui(start.enabled, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Position");
                    changed |= ui.add(egui::DragValue::new(&mut start.position[0])).changed();
                    changed |= ui.add(egui::DragValue::new(&mut start.position[1])).changed();
                });
                ui.horizontal(|ui| {
                    ui.label("Velocity");
                    changed |= ui
                        .add(egui::DragValue::new(&mut start.velocity[0]).speed(0.1))
                        .changed();
                    changed |= ui
                        .add(egui::DragValue::new(&mut start.velocity[1]).speed(0.1))
                        .changed();
                });
                ui.horizontal(|ui| {
                    ui.label("Weapon");
                    changed |= ui
                        .add(
                            egui::DragValue::new(&mut start.active_weapon)
                                .range(0..=NUM_WEAPONS as i32 - 1),
                        )
                        .changed();
                });
                ui.horizontal_wrapped(|ui| {
                    for (slot, has) in start.has_weapons.iter_mut().enumerate() {
                        changed |= ui.checkbox(has, slot.to_string()).changed();
                    }
                });
            });
        });

        ui.collapsing("Dummy", |ui| {
            changed |= ui.checkbox(&mut draft.is_dummy, "Is dummy").changed();
            ui.add_enabled_ui(draft.is_dummy, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for (label, flag) in DUMMY_COPY_FIELDS {
                        let mut on = draft.dummy_copy_flags.contains(flag);
                        if ui.checkbox(&mut on, label).changed() {
                            draft.dummy_copy_flags.set(flag, on);
                            changed = true;
                        }
                    }
                });
                changed |= ui
                    .checkbox(&mut draft.allow_dummy_fire, "Fire with the recorded track")
                    .changed();
                changed |= ui
                    .checkbox(&mut draft.dummy_fire_aimbot, "Aim at the recorded character")
                    .changed();
            });
        });

        state.settings_dirty |= changed;
        let dirty = state.settings_dirty && *draft != current;
        ui.horizontal(|ui| {
            if ui.add_enabled(dirty, egui::Button::new("Apply")).clicked() {
                let result = EditTrackSettings::apply(&mut session.model, index, draft.clone());
                session.execute(result);
                state.settings_dirty = false;
            }
            if ui.add_enabled(state.settings_dirty, egui::Button::new("Revert")).clicked() {
                state.settings_dirty = false;
            }
        });
    }

    /// Edits the input at the playhead of the selected snippet under it.
    fn input_inspector(&mut self, ui: &mut egui::Ui) {
        let session = &mut self.state.session;
        let tick = session.model.current_tick();
        ui.heading("Input at playhead");

        let found = session.model.selection.iter().find_map(|id| {
            let (_, snippet) = session.model.find_snippet_by_id(id)?;
            let input = *snippet.input_at(tick)?;
            Some((snippet.id, (tick - snippet.start_tick) as usize, input))
        });
        let Some((id, offset, original)) = found else {
            if let Some(track) = session.model.selected_track() {
                let input = session.model.input_at_tick(track, tick);
                if input.is_none() {
                    ui.label("No input reaches this tick");
                } else {
                    ui.label(format!(
                        "Plays direction {}, jump {}, fire {}, hook {}",
                        input.direction, input.jump, input.fire, input.hook
                    ));
                }
            }
            ui.label("Select a snippet under the playhead to edit it");
            return;
        };

        let mut input = original;
        ui.label(format!("{} tick {}", id, offset));
        ui.horizontal(|ui| {
            ui.selectable_value(&mut input.direction, -1, "◀");
            ui.selectable_value(&mut input.direction, 0, "·");
            ui.selectable_value(&mut input.direction, 1, "▶");
        });
        ui.horizontal(|ui| {
            flag_checkbox(ui, &mut input.jump, "Jump");
            flag_checkbox(ui, &mut input.fire, "Fire");
            flag_checkbox(ui, &mut input.hook, "Hook");
        });
        egui::ComboBox::from_label("Weapon")
            .selected_text(input.wanted_weapon.to_string())
            .show_ui(ui, |ui| {
                for weapon in 0..NUM_WEAPONS as u8 {
                    ui.selectable_value(&mut input.wanted_weapon, weapon, weapon.to_string());
                }
            });
        ui.label(format!("Aim {}, {}", input.target_x, input.target_y));

        if input != original {
            commit_input(session, id, offset, input);
        }
    }

    fn history_panel(&self, ui: &mut egui::Ui) {
        let history = &self.state.session.history;
        ui.heading(format!("History ({})", history.undo_depth()));
        if let Some(redo) = history.redo_label() {
            ui.weak(format!("↷ {}", redo));
        }
        for label in history.undo_labels().take(20) {
            ui.label(label);
        }
        if !history.can_undo() {
            ui.weak("Nothing to undo");
        }
    }

    fn status_bar(&mut self, ui: &mut egui::Ui) {
        let state = &mut self.state;
        ui.horizontal(|ui| {
            match &state.session.last_error {
                Some(err) => {
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
                None => {
                    ui.label(&state.status);
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let session = &mut state.session;
                if session.model.is_recording() {
                    ui.colored_label(egui::Color32::RED, "● REC");
                }
                if let Some(tick) = state.timeline_state.hovered_tick {
                    ui.label(format!("Cursor {}", tick));
                }
                if let Some(track) = session.model.selected_track() {
                    if let Some([x, y]) = session.model.current_world().character_position(track) {
                        ui.label(format!("Pos {:.1}, {:.1}", x, y));
                    }
                }
                if session.dirty {
                    ui.label("modified");
                }
            });
        });
    }
}

fn flag_checkbox(ui: &mut egui::Ui, value: &mut u8, label: &str) {
    let mut on = *value != 0;
    if ui.checkbox(&mut on, label).changed() {
        *value = on as u8;
    }
}

fn commit_input(
    session: &mut EditorSession<SandboxWorld>,
    id: SnippetId,
    offset: usize,
    input: PlayerInput,
) {
    let result = EditInputs::apply(&mut session.model, id, &[(offset, input)]);
    if session.execute(result) {
        info!("edited input {} of {}", offset, id);
    }
}

impl eframe::App for TaslineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);

        egui::TopBottomPanel::top("menu_panel").show(ctx, |ui| {
            self.menu_bar(ui);
            self.toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            self.status_bar(ui);
        });

        egui::SidePanel::left("properties_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.track_properties(ui);
                    ui.separator();
                    self.input_inspector(ui);
                    ui.separator();
                    self.history_panel(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let events = TimelineWidget::new(
                &mut self.state.session,
                &mut self.state.timeline_state,
            )
            .show(ui);

            for event in events {
                self.state.status = match event {
                    TimelineEvent::Seeked(tick) => format!("Seek to {}", format_tick(tick)),
                    TimelineEvent::Edited(label) => label,
                    TimelineEvent::TrackSelected(index) => format!("Track {} selected", index + 1),
                };
            }
        });

        let session = &self.state.session;
        if session.playback.is_running() || session.model.is_recording() {
            ctx.request_repaint();
        }
    }
}
