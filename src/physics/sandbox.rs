//! Small deterministic stand-in for the game's physics: running, jumping and
//! gravity on a flat floor. Good enough to exercise replay and to preview inputs.

use crate::physics::PhysicsWorld;
use crate::types::input::{PLAYERFLAG_KILL, PlayerInput};
use crate::types::track::StartingConfig;

pub const MAX_CHARACTERS: usize = 64;

const FLOOR_Y: f32 = 0.0;
const GRAVITY: f32 = 0.5;
const GROUND_ACCEL: f32 = 2.0;
const AIR_ACCEL: f32 = 1.5;
const MAX_RUN_SPEED: f32 = 10.0;
const GROUND_FRICTION: f32 = 0.5;
const AIR_FRICTION: f32 = 0.95;
const JUMP_IMPULSE: f32 = 13.2;

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxCharacter {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
    pub spawn: [f32; 2],
    pub spawn_vel: [f32; 2],
    pub active_weapon: i32,
    pub grounded: bool,
    prev_jump: bool,
    input: PlayerInput,
}

impl SandboxCharacter {
    fn new(spawn: [f32; 2]) -> Self {
        SandboxCharacter {
            pos: spawn,
            vel: [0.0, 0.0],
            spawn,
            spawn_vel: [0.0, 0.0],
            active_weapon: 1,
            grounded: spawn[1] >= FLOOR_Y,
            prev_jump: false,
            input: PlayerInput::default(),
        }
    }

    fn respawn(&mut self) {
        self.pos = self.spawn;
        self.vel = self.spawn_vel;
        self.grounded = self.pos[1] >= FLOOR_Y;
        self.prev_jump = false;
    }

    fn step(&mut self) {
        let input = self.input;
        if input.player_flags & PLAYERFLAG_KILL != 0 {
            self.respawn();
            return;
        }

        let accel = if self.grounded { GROUND_ACCEL } else { AIR_ACCEL };
        let dir = input.direction.signum() as f32;
        if dir != 0.0 {
            let target = dir * MAX_RUN_SPEED;
            if dir > 0.0 {
                self.vel[0] = (self.vel[0] + accel).min(target.max(self.vel[0]));
            } else {
                self.vel[0] = (self.vel[0] - accel).max(target.min(self.vel[0]));
            }
        } else if self.grounded {
            self.vel[0] *= GROUND_FRICTION;
        } else {
            self.vel[0] *= AIR_FRICTION;
        }

        let jump = input.jump != 0;
        if jump && !self.prev_jump && self.grounded {
            self.vel[1] = -JUMP_IMPULSE;
        }
        self.prev_jump = jump;

        if input.wanted_weapon != 0 {
            self.active_weapon = input.wanted_weapon as i32 - 1;
        }

        self.vel[1] += GRAVITY;
        self.pos[0] += self.vel[0];
        self.pos[1] += self.vel[1];

        if self.pos[1] >= FLOOR_Y {
            self.pos[1] = FLOOR_Y;
            self.vel[1] = 0.0;
            self.grounded = true;
        } else {
            self.grounded = false;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SandboxWorld {
    game_tick: i32,
    characters: Vec<SandboxCharacter>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_characters(count: usize) -> Self {
        let mut world = Self::new();
        world.add_characters(count);
        world
    }

    pub fn characters(&self) -> &[SandboxCharacter] {
        &self.characters
    }

    fn default_spawn(index: usize) -> [f32; 2] {
        [index as f32 * 64.0, FLOOR_Y]
    }
}

impl PhysicsWorld for SandboxWorld {
    fn game_tick(&self) -> i32 {
        self.game_tick
    }

    fn num_characters(&self) -> usize {
        self.characters.len()
    }

    fn on_input(&mut self, character: usize, input: &PlayerInput) {
        if let Some(c) = self.characters.get_mut(character) {
            c.input = *input;
        }
    }

    fn tick(&mut self) {
        for c in &mut self.characters {
            c.step();
        }
        self.game_tick += 1;
    }

    fn add_characters(&mut self, count: usize) -> bool {
        if self.characters.len() + count > MAX_CHARACTERS {
            return false;
        }
        for _ in 0..count {
            let spawn = Self::default_spawn(self.characters.len());
            self.characters.push(SandboxCharacter::new(spawn));
        }
        true
    }

    fn remove_character(&mut self, index: usize) {
        if index < self.characters.len() {
            self.characters.remove(index);
        }
    }

    fn insert_character(&mut self, index: usize) {
        let index = index.min(self.characters.len());
        self.characters
            .insert(index, SandboxCharacter::new(Self::default_spawn(index)));
    }

    fn character_position(&self, index: usize) -> Option<[f32; 2]> {
        self.characters.get(index).map(|c| c.pos)
    }

    fn character_velocity(&self, index: usize) -> Option<[f32; 2]> {
        self.characters.get(index).map(|c| c.vel)
    }

    fn apply_starting_config(&mut self, index: usize, config: &StartingConfig) {
        let Some(c) = self.characters.get_mut(index) else {
            return;
        };
        if config.enabled {
            c.spawn = config.position;
            c.spawn_vel = config.velocity;
            c.active_weapon = config.active_weapon;
        } else {
            c.spawn = Self::default_spawn(index);
            c.spawn_vel = [0.0, 0.0];
            c.active_weapon = 1;
        }
        c.respawn();
    }
}
