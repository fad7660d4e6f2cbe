pub mod replay_cache;
pub mod sandbox;

use crate::types::input::PlayerInput;
use crate::types::track::StartingConfig;

/// Deterministic tick-based world the timeline replays inputs into.
///
/// Worlds are plain owned values: cloning one yields an independent snapshot.
/// `on_input` must be called for every character before `tick`.
pub trait PhysicsWorld: Clone {
    fn game_tick(&self) -> i32;
    fn num_characters(&self) -> usize;
    fn on_input(&mut self, character: usize, input: &PlayerInput);
    fn tick(&mut self);

    /// Adds `count` characters at the end. Returns false if the world is full.
    fn add_characters(&mut self, count: usize) -> bool;
    fn remove_character(&mut self, index: usize);
    /// Inserts a fresh character so that it ends up at `index`.
    fn insert_character(&mut self, index: usize);

    fn character_position(&self, index: usize) -> Option<[f32; 2]>;
    fn character_velocity(&self, index: usize) -> Option<[f32; 2]>;
    fn apply_starting_config(&mut self, index: usize, config: &StartingConfig);
}
