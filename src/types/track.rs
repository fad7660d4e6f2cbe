use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::types::input::{NUM_WEAPONS, PlayerInput};
use crate::types::snippet::{Snippet, SnippetId};

bitflags! {
    /// Which fields a dummy track copies from the recording track.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DummyCopyFlags: u32 {
        const DIRECTION = 1 << 0;
        const TARGET = 1 << 1;
        const JUMP = 1 << 2;
        const FIRE = 1 << 3;
        const HOOK = 1 << 4;
        const WEAPON = 1 << 5;
        const MIRROR_X = 1 << 6;
        const MIRROR_Y = 1 << 7;
        const ALL = Self::DIRECTION.bits()
            | Self::TARGET.bits()
            | Self::JUMP.bits()
            | Self::FIRE.bits()
            | Self::HOOK.bits()
            | Self::WEAPON.bits();
    }
}

impl Default for DummyCopyFlags {
    fn default() -> Self {
        DummyCopyFlags::ALL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub clan: String,
    pub skin: i32,
    pub color: [f32; 3],
    pub use_custom_color: bool,
}

impl PlayerInfo {
    pub fn named(name: impl Into<String>) -> Self {
        PlayerInfo {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for PlayerInfo {
    fn default() -> Self {
        PlayerInfo {
            name: "nameless tee".to_string(),
            clan: String::new(),
            skin: 0,
            color: [1.0, 1.0, 1.0],
            use_custom_color: false,
        }
    }
}

/// Spawn override applied to the character at tick 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StartingConfig {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub active_weapon: i32,
    pub has_weapons: [bool; NUM_WEAPONS],
    pub enabled: bool,
}

/// Per-track settings that do not vary over time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackSettings {
    pub player_info: PlayerInfo,
    pub starting_config: StartingConfig,
    pub is_dummy: bool,
    pub dummy_copy_flags: DummyCopyFlags,
    pub allow_dummy_fire: bool,
    pub dummy_fire_aimbot: bool,
}

/// One character lane: committed snippets plus the recording overlay.
///
/// Snippet storage is only reachable mutably from within `types`, so every edit
/// goes through the timeline model and invalidates the replay cache.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    snippets: Vec<Snippet>,
    recording_snippets: Vec<Snippet>,
    pub settings: TrackSettings,
    /// Live input for the current frame. Not persisted.
    pub current_input: PlayerInput,
}

impl Track {
    pub fn new(settings: TrackSettings) -> Self {
        Track {
            settings,
            ..Self::default()
        }
    }

    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn recording_snippets(&self) -> &[Snippet] {
        &self.recording_snippets
    }

    pub fn is_dummy(&self) -> bool {
        self.settings.is_dummy
    }

    pub fn find_snippet(&self, id: SnippetId) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.id == id)
    }

    pub fn snippet_index(&self, id: SnippetId) -> Option<usize> {
        self.snippets.iter().position(|s| s.id == id)
    }

    pub(in crate::types) fn snippets_mut(&mut self) -> &mut Vec<Snippet> {
        &mut self.snippets
    }

    pub(in crate::types) fn recording_snippets_mut(&mut self) -> &mut Vec<Snippet> {
        &mut self.recording_snippets
    }

    pub(in crate::types) fn find_snippet_mut(&mut self, id: SnippetId) -> Option<&mut Snippet> {
        self.snippets.iter_mut().find(|s| s.id == id)
    }

    /// Largest end tick of any committed snippet.
    pub fn last_tick(&self) -> i32 {
        self.snippets.iter().map(Snippet::end_tick).max().unwrap_or(0)
    }

    /// Track rebuilt from stored parts, used by project loading.
    pub(crate) fn from_parts(settings: TrackSettings, snippets: Vec<Snippet>) -> Self {
        Track {
            snippets,
            settings,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_all_excludes_mirrors() {
        let all = DummyCopyFlags::ALL;
        assert!(all.contains(DummyCopyFlags::DIRECTION | DummyCopyFlags::WEAPON));
        assert!(!all.intersects(DummyCopyFlags::MIRROR_X | DummyCopyFlags::MIRROR_Y));
        assert_eq!(DummyCopyFlags::default(), DummyCopyFlags::ALL);
    }

    #[test]
    fn test_track_lookup_by_id() {
        let track = Track::from_parts(
            TrackSettings::default(),
            vec![
                Snippet::new(SnippetId(3), 0, 10),
                Snippet::new(SnippetId(9), 40, 20),
            ],
        );
        assert_eq!(track.snippet_index(SnippetId(9)), Some(1));
        assert!(track.find_snippet(SnippetId(4)).is_none());
        assert_eq!(track.last_tick(), 60);
        assert!(track.recording_snippets().is_empty());
    }
}
