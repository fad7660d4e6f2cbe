use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub const NUM_WEAPONS: usize = 6;

/// Player flag bit that kills the character on the tick it is set.
pub const PLAYERFLAG_KILL: u16 = 1 << 0;

/// One tick of player input. Fixed 16-byte layout so snippets can be written to
/// disk as raw records.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct PlayerInput {
    pub direction: i8,
    pub jump: u8,
    pub fire: u8,
    pub hook: u8,
    pub wanted_weapon: u8,
    pub tele_out: u8,
    pub player_flags: u16,
    pub target_x: i32,
    pub target_y: i32,
}

impl PlayerInput {
    /// Returned for ticks that no snippet has ever reached.
    pub const NONE: PlayerInput = PlayerInput {
        direction: 0,
        jump: 0,
        fire: 0,
        hook: 0,
        wanted_weapon: 0,
        tele_out: 0,
        player_flags: 0,
        target_x: 0,
        target_y: -1,
    };

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn with_direction(mut self, direction: i8) -> Self {
        self.direction = direction.clamp(-1, 1);
        self
    }

    pub fn with_target(mut self, x: i32, y: i32) -> Self {
        self.target_x = x;
        self.target_y = y;
        self
    }
}
