use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::input::PlayerInput;

pub const MAX_SNIPPET_LAYERS: u8 = 8;

/// Session-unique snippet handle. Handed out by the timeline counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnippetId(pub u32);

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A contiguous run of per-tick inputs covering `[start_tick, end_tick)`.
///
/// `end_tick` is derived from the input count, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub start_tick: i32,
    pub is_active: bool,
    pub layer: u8,
    inputs: Vec<PlayerInput>,
}

impl Snippet {
    /// A snippet of `duration` neutral inputs.
    pub fn new(id: SnippetId, start_tick: i32, duration: i32) -> Self {
        Self::from_inputs(
            id,
            start_tick,
            vec![PlayerInput::default(); duration.max(0) as usize],
        )
    }

    pub fn from_inputs(id: SnippetId, start_tick: i32, inputs: Vec<PlayerInput>) -> Self {
        Snippet {
            id,
            start_tick,
            is_active: true,
            layer: 0,
            inputs,
        }
    }

    pub fn end_tick(&self) -> i32 {
        self.start_tick + self.inputs.len() as i32
    }

    pub fn duration(&self) -> i32 {
        self.inputs.len() as i32
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[PlayerInput] {
        &self.inputs
    }

    pub fn covers(&self, tick: i32) -> bool {
        tick >= self.start_tick && tick < self.end_tick()
    }

    /// Half-open range overlap.
    pub fn overlaps(&self, start: i32, end: i32) -> bool {
        self.start_tick < end && start < self.end_tick()
    }

    pub fn input_at(&self, tick: i32) -> Option<&PlayerInput> {
        if !self.covers(tick) {
            return None;
        }
        self.inputs.get((tick - self.start_tick) as usize)
    }

    pub fn last_input(&self) -> Option<&PlayerInput> {
        self.inputs.last()
    }

    /// Grows with neutral inputs or truncates. A non-positive duration empties the
    /// snippet and collapses its start onto the old end; the owner must then drop it.
    pub fn resize(&mut self, new_duration: i32) {
        if new_duration <= 0 {
            self.start_tick = self.end_tick();
            self.inputs = Vec::new();
            return;
        }
        self.inputs
            .resize(new_duration as usize, PlayerInput::default());
    }

    /// Appends `count` copies of `input`.
    pub fn extend_with(&mut self, count: usize, input: PlayerInput) {
        self.inputs.extend(std::iter::repeat_n(input, count));
    }

    pub fn append_inputs(&mut self, inputs: &[PlayerInput]) {
        self.inputs.extend_from_slice(inputs);
    }

    /// Overwrites inputs starting at `offset`. Returns false when the range does not fit.
    pub fn write_inputs(&mut self, offset: usize, inputs: &[PlayerInput]) -> bool {
        let end = offset + inputs.len();
        if end > self.inputs.len() {
            return false;
        }
        self.inputs[offset..end].copy_from_slice(inputs);
        true
    }

    /// Removes and returns every input from `offset` onward.
    pub fn split_off_inputs(&mut self, offset: usize) -> Vec<PlayerInput> {
        let offset = offset.min(self.inputs.len());
        self.inputs.split_off(offset)
    }
}
