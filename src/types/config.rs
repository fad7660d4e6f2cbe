use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::ProjectResult;
use crate::types::view::DEFAULT_TRACK_HEIGHT;

pub const CONFIG_FILE_NAME: &str = "tasline.json";

/// What a dummy track does each recording frame, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DummyAction {
    /// Mirror masked fields of the recorded track's live input.
    Copy,
    /// Fire while the dummy-fire key is held, optionally aiming at the recorded character.
    Fire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub track_height: f32,
    /// Initial zoom in pixels per tick.
    pub zoom: f32,
    pub default_snippet_duration: i32,
    pub snap_threshold_px: f32,
    pub drag_threshold_px: f32,
    /// Playback rate in ticks per second.
    pub playback_speed: u32,
    pub max_undo_depth: usize,
    pub auto_scroll: bool,
    pub dummy_action_priority: Vec<DummyAction>,
    pub dummy_copy_enabled: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            track_height: DEFAULT_TRACK_HEIGHT,
            zoom: 4.0,
            default_snippet_duration: 50,
            snap_threshold_px: 5.0,
            drag_threshold_px: 5.0,
            playback_speed: 50,
            max_undo_depth: 500,
            auto_scroll: true,
            dummy_action_priority: vec![DummyAction::Copy, DummyAction::Fire],
            dummy_copy_enabled: true,
        }
    }
}

impl EditorConfig {
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> ProjectResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path.as_ref())?;
        file.write_all(json.as_bytes())?;
        info!("saved config to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> ProjectResult<EditorConfig> {
        let mut file = File::open(path.as_ref())?;
        let mut json = String::new();
        file.read_to_string(&mut json)?;
        let config = serde_json::from_str(&json)?;
        info!("loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Defaults when the file does not exist; a malformed file is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> ProjectResult<EditorConfig> {
        if !path.as_ref().exists() {
            return Ok(EditorConfig::default());
        }
        Self::load_from_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProjectError;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = EditorConfig {
            zoom: 7.5,
            dummy_action_priority: vec![DummyAction::Fire, DummyAction::Copy],
            ..EditorConfig::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(EditorConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{ "playback_speed": 25 }"#).unwrap();
        assert_eq!(config.playback_speed, 25);
        assert_eq!(config.default_snippet_duration, 50);
        assert_eq!(config.dummy_action_priority, vec![DummyAction::Copy, DummyAction::Fire]);
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(EditorConfig::load_or_default(&path).unwrap(), EditorConfig::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EditorConfig::load_or_default(&path),
            Err(ProjectError::Json(_))
        ));
    }
}
