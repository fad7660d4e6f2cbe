/// Frames longer than this are treated as this long, so a stalled UI does not
/// replay thousands of ticks in one go.
pub const MAX_FRAME_SECS: f64 = 5.0;

/// Runtime play/reverse state. Only the tick rate is persisted, via the config.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Held reverse; runs at twice the play rate.
    pub is_reversing: bool,
    /// Ticks per second.
    pub playback_speed: u32,
    pub auto_scroll: bool,
    elapsed: f64,
}

impl PlaybackState {
    pub fn new(playback_speed: u32) -> Self {
        PlaybackState {
            is_playing: false,
            is_reversing: false,
            playback_speed,
            auto_scroll: true,
            elapsed: 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_playing || self.is_reversing
    }

    pub fn toggle_play(&mut self) {
        self.is_playing = !self.is_playing;
        self.is_reversing = false;
        self.elapsed = 0.0;
    }

    pub fn stop(&mut self) {
        self.is_playing = false;
        self.is_reversing = false;
        self.elapsed = 0.0;
    }

    /// Reversing takes over from forward play.
    pub fn set_reversing(&mut self, reversing: bool) {
        if reversing == self.is_reversing {
            return;
        }
        self.is_reversing = reversing;
        if reversing {
            self.is_playing = false;
        }
        self.elapsed = 0.0;
    }

    /// Seconds between two ticks at the current rate.
    pub fn tick_interval(&self) -> f64 {
        let factor = if self.is_reversing { 2 } else { 1 };
        1.0 / (self.playback_speed.max(1) * factor) as f64
    }

    /// Accumulates `dt` seconds and returns how many ticks to step, negative when
    /// reversing. The fractional remainder carries over to the next frame.
    pub fn steps_due(&mut self, dt: f64) -> i32 {
        if !self.is_running() {
            self.elapsed = 0.0;
            return 0;
        }
        let interval = self.tick_interval();
        self.elapsed = (self.elapsed + dt).clamp(0.0, MAX_FRAME_SECS);
        let steps = (self.elapsed / interval).floor();
        self.elapsed -= steps * interval;
        if self.is_reversing {
            -(steps as i32)
        } else {
            steps as i32
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_playback_never_steps() {
        let mut playback = PlaybackState::default();
        assert_eq!(playback.steps_due(1.0), 0);
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut playback = PlaybackState::new(8);
        playback.toggle_play();
        assert_eq!(playback.steps_due(0.3), 2);
        assert_eq!(playback.steps_due(0.1), 1);
        assert_eq!(playback.steps_due(0.0), 0);
    }

    #[test]
    fn test_reverse_is_twice_as_fast_and_stops_play() {
        let mut playback = PlaybackState::new(8);
        playback.toggle_play();
        playback.set_reversing(true);
        assert!(!playback.is_playing);
        assert_eq!(playback.steps_due(0.5), -8);
        playback.set_reversing(false);
        assert!(!playback.is_running());
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut playback = PlaybackState::new(50);
        playback.toggle_play();
        assert_eq!(playback.steps_due(60.0), 250);
        assert_eq!(playback.steps_due(-3.0), 0);
    }
}
