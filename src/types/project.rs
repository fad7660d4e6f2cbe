//! Binary project files.
//!
//! Layout: a [`FileHeader`], then per track a [`TrackRecord`] followed by its
//! snippets, each a [`SnippetRecord`] plus `input_count` raw [`PlayerInput`]
//! records. All records are `Pod` with no padding and are written in host byte
//! order, which is little-endian on every platform the editor ships for.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use log::{info, warn};
use std::collections::HashSet;
use std::mem::size_of;
use std::path::Path;

use crate::error::{ProjectError, ProjectResult};
use crate::ops::layers::layers_are_disjoint;
use crate::physics::PhysicsWorld;
use crate::types::input::{NUM_WEAPONS, PlayerInput};
use crate::types::snippet::{MAX_SNIPPET_LAYERS, Snippet, SnippetId};
use crate::types::timeline::TimelineModel;
use crate::types::track::{DummyCopyFlags, PlayerInfo, StartingConfig, Track, TrackSettings};

pub const PROJECT_MAGIC: [u8; 4] = *b"TASL";
pub const PROJECT_VERSION: u32 = 1;
pub const PROJECT_EXTENSION: &str = "tasl";

const NAME_LEN: usize = 32;
const CLAN_LEN: usize = 16;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct TrackFlags: u32 {
        const DUMMY = 1 << 0;
        const ALLOW_DUMMY_FIRE = 1 << 1;
        const DUMMY_FIRE_AIMBOT = 1 << 2;
        const CUSTOM_COLOR = 1 << 3;
        const STARTING_CONFIG = 1 << 4;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FileHeader {
    magic: [u8; 4],
    version: u32,
    track_count: u32,
    reserved: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct PlayerInfoRecord {
    name: [u8; NAME_LEN],
    clan: [u8; CLAN_LEN],
    skin: i32,
    color: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct StartingConfigRecord {
    position: [f32; 2],
    velocity: [f32; 2],
    active_weapon: i32,
    /// Bit `i` set when weapon `i` is owned.
    weapons: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct TrackRecord {
    player: PlayerInfoRecord,
    start: StartingConfigRecord,
    flags: u32,
    dummy_copy_flags: u32,
    snippet_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SnippetRecord {
    id: u32,
    start_tick: i32,
    end_tick: i32,
    is_active: u32,
    layer: u32,
    input_count: u32,
}

/// Copies as much of `text` as fits, cutting on a char boundary.
fn fixed_str<const N: usize>(text: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let mut len = text.len().min(N);
    while !text.is_char_boundary(len) {
        len -= 1;
    }
    out[..len].copy_from_slice(&text.as_bytes()[..len]);
    out
}

fn read_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl TrackRecord {
    fn from_track(track: &Track) -> Self {
        let s = &track.settings;
        let mut flags = TrackFlags::empty();
        flags.set(TrackFlags::DUMMY, s.is_dummy);
        flags.set(TrackFlags::ALLOW_DUMMY_FIRE, s.allow_dummy_fire);
        flags.set(TrackFlags::DUMMY_FIRE_AIMBOT, s.dummy_fire_aimbot);
        flags.set(TrackFlags::CUSTOM_COLOR, s.player_info.use_custom_color);
        flags.set(TrackFlags::STARTING_CONFIG, s.starting_config.enabled);

        let weapons = s
            .starting_config
            .has_weapons
            .iter()
            .enumerate()
            .filter(|(_, has)| **has)
            .fold(0u32, |bits, (i, _)| bits | 1 << i);

        TrackRecord {
            player: PlayerInfoRecord {
                name: fixed_str(&s.player_info.name),
                clan: fixed_str(&s.player_info.clan),
                skin: s.player_info.skin,
                color: s.player_info.color,
            },
            start: StartingConfigRecord {
                position: s.starting_config.position,
                velocity: s.starting_config.velocity,
                active_weapon: s.starting_config.active_weapon,
                weapons,
            },
            flags: flags.bits(),
            dummy_copy_flags: s.dummy_copy_flags.bits(),
            snippet_count: track.snippets().len() as u32,
        }
    }

    fn settings(&self) -> TrackSettings {
        let flags = TrackFlags::from_bits_truncate(self.flags);
        let mut has_weapons = [false; NUM_WEAPONS];
        for (i, has) in has_weapons.iter_mut().enumerate() {
            *has = self.start.weapons & (1 << i) != 0;
        }
        TrackSettings {
            player_info: PlayerInfo {
                name: read_str(&self.player.name),
                clan: read_str(&self.player.clan),
                skin: self.player.skin,
                color: self.player.color,
                use_custom_color: flags.contains(TrackFlags::CUSTOM_COLOR),
            },
            starting_config: StartingConfig {
                position: self.start.position,
                velocity: self.start.velocity,
                active_weapon: self.start.active_weapon,
                has_weapons,
                enabled: flags.contains(TrackFlags::STARTING_CONFIG),
            },
            is_dummy: flags.contains(TrackFlags::DUMMY),
            dummy_copy_flags: DummyCopyFlags::from_bits_truncate(self.dummy_copy_flags),
            allow_dummy_fire: flags.contains(TrackFlags::ALLOW_DUMMY_FIRE),
            dummy_fire_aimbot: flags.contains(TrackFlags::DUMMY_FIRE_AIMBOT),
        }
    }
}

/// Serializes the committed tracks. Recording buffers are not saved.
pub fn encode_project<W: PhysicsWorld>(model: &TimelineModel<W>) -> Vec<u8> {
    let mut out = Vec::new();
    let header = FileHeader {
        magic: PROJECT_MAGIC,
        version: PROJECT_VERSION,
        track_count: model.track_count() as u32,
        reserved: 0,
    };
    out.extend_from_slice(bytemuck::bytes_of(&header));

    for track in model.tracks() {
        out.extend_from_slice(bytemuck::bytes_of(&TrackRecord::from_track(track)));
        for snippet in track.snippets() {
            let record = SnippetRecord {
                id: snippet.id.0,
                start_tick: snippet.start_tick,
                end_tick: snippet.end_tick(),
                is_active: snippet.is_active as u32,
                layer: snippet.layer as u32,
                input_count: snippet.duration() as u32,
            };
            out.extend_from_slice(bytemuck::bytes_of(&record));
            out.extend_from_slice(bytemuck::cast_slice(snippet.inputs()));
        }
    }
    out
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, what: &'static str) -> ProjectResult<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(ProjectError::Truncated(what));
        }
        let (head, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(head)
    }

    fn record<T: Pod>(&mut self, what: &'static str) -> ProjectResult<T> {
        let bytes = self.take(size_of::<T>(), what)?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn inputs(&mut self, count: usize) -> ProjectResult<Vec<PlayerInput>> {
        let len = count
            .checked_mul(size_of::<PlayerInput>())
            .ok_or(ProjectError::Truncated("snippet inputs"))?;
        let bytes = self.take(len, "snippet inputs")?;
        Ok(bytes
            .chunks_exact(size_of::<PlayerInput>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

/// Parses and validates project bytes into tracks.
pub fn decode_tracks(bytes: &[u8]) -> ProjectResult<Vec<Track>> {
    let mut reader = Reader { bytes };
    let header: FileHeader = reader.record("header")?;
    if header.magic != PROJECT_MAGIC {
        return Err(ProjectError::BadMagic(header.magic));
    }
    if header.version != PROJECT_VERSION {
        return Err(ProjectError::UnsupportedVersion(header.version));
    }

    let mut seen = HashSet::new();
    let mut tracks = Vec::new();
    for t in 0..header.track_count {
        let record: TrackRecord = reader.record("track")?;
        let mut snippets = Vec::with_capacity(record.snippet_count.min(1024) as usize);
        for _ in 0..record.snippet_count {
            let s: SnippetRecord = reader.record("snippet")?;
            if s.end_tick.checked_sub(s.start_tick) != Some(s.input_count as i32) || s.start_tick < 0 {
                return Err(ProjectError::Corrupt(format!(
                    "snippet {} on track {} spans {}..{} with {} inputs",
                    s.id, t, s.start_tick, s.end_tick, s.input_count
                )));
            }
            if s.layer >= MAX_SNIPPET_LAYERS as u32 {
                return Err(ProjectError::Corrupt(format!("snippet {} on layer {}", s.id, s.layer)));
            }
            if !seen.insert(s.id) {
                return Err(ProjectError::Corrupt(format!("duplicate snippet id {}", s.id)));
            }
            let inputs = reader.inputs(s.input_count as usize)?;
            let mut snippet = Snippet::from_inputs(SnippetId(s.id), s.start_tick, inputs);
            snippet.is_active = s.is_active != 0;
            snippet.layer = s.layer as u8;
            snippets.push(snippet);
        }
        if !layers_are_disjoint(&snippets) {
            return Err(ProjectError::Corrupt(format!(
                "overlapping snippets share a layer on track {}",
                t
            )));
        }
        tracks.push(Track::from_parts(record.settings(), snippets));
    }
    if !reader.bytes.is_empty() {
        warn!("ignoring {} trailing bytes in project", reader.bytes.len());
    }
    Ok(tracks)
}

pub fn save_project<W: PhysicsWorld>(path: impl AsRef<Path>, model: &TimelineModel<W>) -> ProjectResult<()> {
    std::fs::write(path.as_ref(), encode_project(model))?;
    info!(
        "saved {} track(s) to {}",
        model.track_count(),
        path.as_ref().display()
    );
    Ok(())
}

/// Loads a project on top of `world`, which should hold no characters yet.
pub fn load_project<W: PhysicsWorld>(path: impl AsRef<Path>, world: W) -> ProjectResult<TimelineModel<W>> {
    let bytes = std::fs::read(path.as_ref())?;
    let tracks = decode_tracks(&bytes)?;
    let model = TimelineModel::from_tracks(world, tracks)?;
    info!(
        "loaded {} track(s) from {}",
        model.track_count(),
        path.as_ref().display()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::commands::tests::{canonical, model_with_tracks};
    use crate::ops::commands::{ActivateSnippet, AddSnippet};
    use crate::physics::sandbox::SandboxWorld;

    fn sample_model() -> crate::ops::commands::tests::Model {
        let mut model = model_with_tracks(2);
        let inputs: Vec<PlayerInput> = (0..30)
            .map(|i| PlayerInput::default().with_direction(1).with_target(i, -i))
            .collect();
        AddSnippet::apply_inputs(&mut model, 0, 10, inputs).unwrap();
        let over = AddSnippet::apply(&mut model, 0, 20, 5).unwrap();
        ActivateSnippet::apply(&mut model, over.snippet.id).unwrap();
        AddSnippet::apply(&mut model, 1, 0, 100).unwrap();

        let mut settings = model.track(1).unwrap().settings.clone();
        settings.is_dummy = true;
        settings.allow_dummy_fire = true;
        settings.dummy_copy_flags = DummyCopyFlags::DIRECTION | DummyCopyFlags::MIRROR_X;
        settings.player_info.clan = "clan".to_string();
        settings.starting_config = StartingConfig {
            position: [64.0, 128.0],
            velocity: [1.5, -2.0],
            active_weapon: 2,
            has_weapons: [true, true, false, true, false, false],
            enabled: true,
        };
        model.set_track_settings(1, settings).unwrap();
        model
    }

    #[test]
    fn test_save_and_load_project() {
        let model = sample_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.tasl");
        save_project(&path, &model).unwrap();

        let loaded = load_project(&path, SandboxWorld::new()).unwrap();
        assert_eq!(canonical(&loaded), canonical(&model));
        assert_eq!(loaded.next_snippet_id(), model.next_snippet_id());
        let inactive = loaded.tracks()[0].snippets().iter().filter(|s| !s.is_active).count();
        assert_eq!(inactive, 1);
    }

    #[test]
    fn test_rejects_foreign_and_future_files() {
        let mut bytes = encode_project(&sample_model());
        bytes[0] = b'X';
        assert!(matches!(decode_tracks(&bytes), Err(ProjectError::BadMagic(_))));

        let mut bytes = encode_project(&sample_model());
        bytes[4..8].copy_from_slice(&7u32.to_ne_bytes());
        assert!(matches!(decode_tracks(&bytes), Err(ProjectError::UnsupportedVersion(7))));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = encode_project(&sample_model());
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(decode_tracks(cut), Err(ProjectError::Truncated("snippet inputs"))));
        assert!(matches!(decode_tracks(&bytes[..6]), Err(ProjectError::Truncated("header"))));
    }

    #[test]
    fn test_inconsistent_snippet_is_corrupt() {
        let mut model = model_with_tracks(1);
        AddSnippet::apply(&mut model, 0, 0, 4).unwrap();
        let mut bytes = encode_project(&model);
        let end_offset = size_of::<FileHeader>() + size_of::<TrackRecord>() + 8;
        bytes[end_offset..end_offset + 4].copy_from_slice(&9i32.to_ne_bytes());
        assert!(matches!(decode_tracks(&bytes), Err(ProjectError::Corrupt(_))));
    }

    #[test]
    fn test_overlapping_snippets_on_one_layer_are_corrupt() {
        let mut model = model_with_tracks(1);
        AddSnippet::apply(&mut model, 0, 0, 10).unwrap();
        let second = AddSnippet::apply(&mut model, 0, 5, 10).unwrap();
        assert_eq!(second.snippet.layer, 1);
        assert!(decode_tracks(&encode_project(&model)).is_ok());

        let mut bytes = encode_project(&model);
        let layer_offset = size_of::<FileHeader>()
            + size_of::<TrackRecord>()
            + size_of::<SnippetRecord>()
            + 10 * size_of::<PlayerInput>()
            + 16;
        bytes[layer_offset..layer_offset + 4].copy_from_slice(&0u32.to_ne_bytes());
        assert!(matches!(decode_tracks(&bytes), Err(ProjectError::Corrupt(_))));
    }

    #[test]
    fn test_long_names_are_cut_on_char_boundary() {
        let name = "ö".repeat(20);
        let stored: [u8; NAME_LEN] = fixed_str(&name);
        assert_eq!(read_str(&stored), "ö".repeat(16));
    }
}
