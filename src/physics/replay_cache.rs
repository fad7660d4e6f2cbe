use log::trace;

use crate::physics::PhysicsWorld;

pub const CHECKPOINT_INTERVAL: i32 = 50;

/// World snapshots every `CHECKPOINT_INTERVAL` ticks plus the last exact state
/// that was computed.
///
/// Checkpoint `i` holds the world at tick `i * CHECKPOINT_INTERVAL`. Checkpoint 0
/// is the spawn state and is never dropped.
#[derive(Debug, Clone)]
pub struct PhysicsReplayCache<W: PhysicsWorld> {
    checkpoints: Vec<W>,
    previous_world: Option<W>,
}

impl<W: PhysicsWorld> PhysicsReplayCache<W> {
    pub fn new(base: &W) -> Self {
        PhysicsReplayCache {
            checkpoints: vec![base.clone()],
            previous_world: None,
        }
    }

    /// Number of valid checkpoints.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn base(&self) -> &W {
        &self.checkpoints[0]
    }

    pub fn checkpoint(&self, index: usize) -> Option<&W> {
        self.checkpoints.get(index)
    }

    pub fn previous_world(&self) -> Option<&W> {
        self.previous_world.as_ref()
    }

    /// Drops every cached state that may depend on inputs at or after `tick`.
    pub fn invalidate_from(&mut self, tick: i32) {
        let keep = (tick.max(0) / CHECKPOINT_INTERVAL) as usize + 1;
        self.checkpoints.truncate(keep.max(1));
        if self
            .previous_world
            .as_ref()
            .is_some_and(|w| w.game_tick() > tick)
        {
            self.previous_world = None;
        }
    }

    /// Throws everything away and restarts from `base`.
    pub fn reset(&mut self, base: &W) {
        self.checkpoints.clear();
        self.checkpoints.push(base.clone());
        self.previous_world = None;
    }

    /// Replays forward to `tick`, asking `input_for(character, tick)` for every
    /// character before each step.
    pub fn world_at<F>(&mut self, tick: i32, mut input_for: F) -> W
    where
        F: FnMut(usize, i32) -> crate::types::input::PlayerInput,
    {
        let mut world = match &self.previous_world {
            Some(prev) if tick >= prev.game_tick() => prev.clone(),
            _ => {
                let base = ((tick - 1).max(0) / CHECKPOINT_INTERVAL) as usize;
                let base = base.min(self.checkpoints.len() - 1);
                trace!("replay to tick {} from checkpoint {}", tick, base);
                self.checkpoints[base].clone()
            }
        };

        while world.game_tick() < tick {
            let now = world.game_tick();
            for p in 0..world.num_characters() {
                let input = input_for(p, now);
                world.on_input(p, &input);
            }
            world.tick();
            self.store_checkpoint(&world);
        }

        self.previous_world = Some(world.clone());
        world
    }

    fn store_checkpoint(&mut self, world: &W) {
        let tick = world.game_tick();
        if tick % CHECKPOINT_INTERVAL != 0 {
            return;
        }
        let index = (tick / CHECKPOINT_INTERVAL) as usize;
        if index < self.checkpoints.len() {
            self.checkpoints[index] = world.clone();
        } else if index == self.checkpoints.len() {
            self.checkpoints.push(world.clone());
        }
    }

    /// Applies a structural change (character added/removed) to every cached mirror
    /// that stays valid, then drops everything past the spawn state.
    pub fn edit_base(&mut self, mut edit: impl FnMut(&mut W)) {
        self.checkpoints.truncate(1);
        edit(&mut self.checkpoints[0]);
        self.previous_world = None;
    }
}
