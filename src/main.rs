mod error;
mod ops;
mod physics;
mod types;
mod ui;

use log::{error, info, warn};

use crate::physics::sandbox::SandboxWorld;
use crate::types::config::{CONFIG_FILE_NAME, EditorConfig};
use crate::types::session::EditorSession;
use crate::ui::app::{AppState, TaslineApp, starter_timeline};

fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = match EditorConfig::load_or_default(CONFIG_FILE_NAME) {
        Ok(config) => config,
        Err(err) => {
            warn!("ignoring {}: {}", CONFIG_FILE_NAME, err);
            EditorConfig::default()
        }
    };

    let mut session = EditorSession::new(starter_timeline(), config);
    if let Some(path) = std::env::args().nth(1) {
        if let Err(err) = session.load(&path, SandboxWorld::new()) {
            error!("failed to open {}: {}", path, err);
            session.report(err);
        }
    }
    info!("starting with {} track(s)", session.model.track_count());

    let app = TaslineApp::new(AppState::new(session));

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Tasline",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )?;
    Ok(())
}
