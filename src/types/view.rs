use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 20.0;
pub const DEFAULT_TRACK_HEIGHT: f32 = 60.0;

/// Horizontal zoom and scroll of the timeline plus row height. All mapping
/// between ticks and pixels goes through here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Pixels per tick.
    pub zoom: f32,
    /// Tick drawn at the left edge of the track area.
    pub view_start_tick: i32,
    pub track_height: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        ViewTransform {
            zoom: 4.0,
            view_start_tick: 0,
            track_height: DEFAULT_TRACK_HEIGHT,
        }
    }
}

impl ViewTransform {
    pub fn new(zoom: f32, track_height: f32) -> Self {
        ViewTransform {
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            view_start_tick: 0,
            track_height,
        }
    }

    pub fn tick_to_screen_x(&self, tick: i32, origin_x: f32) -> f32 {
        origin_x + (tick - self.view_start_tick) as f32 * self.zoom
    }

    pub fn screen_x_to_tick(&self, screen_x: f32, origin_x: f32) -> i32 {
        if self.zoom.abs() < 1e-6 {
            return self.view_start_tick;
        }
        self.view_start_tick + ((screen_x - origin_x) / self.zoom).round() as i32
    }

    /// Top edge of a track row.
    pub fn track_screen_y(&self, track: usize, origin_y: f32, scroll_y: f32) -> f32 {
        origin_y + track as f32 * self.track_height - scroll_y
    }

    /// Row under `screen_y`, or `None` above the first or past the last track.
    pub fn screen_y_to_track_index(
        &self,
        screen_y: f32,
        origin_y: f32,
        scroll_y: f32,
        track_count: usize,
    ) -> Option<usize> {
        let content_y = screen_y - origin_y + scroll_y;
        if content_y < 0.0 || self.track_height <= 0.0 {
            return None;
        }
        let index = (content_y / self.track_height).floor() as usize;
        (index < track_count).then_some(index)
    }

    /// Zooms by `factor`, keeping the tick under `pointer_x` in place.
    pub fn zoom_at(&mut self, factor: f32, pointer_x: f32, origin_x: f32) {
        let before = self.screen_x_to_tick(pointer_x, origin_x);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let after = self.screen_x_to_tick(pointer_x, origin_x);
        self.view_start_tick = (self.view_start_tick + before - after).max(0);
    }

    /// Scrolls by a pixel delta; dragging right reveals earlier ticks.
    pub fn pan_pixels(&mut self, delta_x: f32) {
        let ticks = (-delta_x / self.zoom) as i32;
        self.pan_ticks(ticks);
    }

    pub fn pan_ticks(&mut self, ticks: i32) {
        self.view_start_tick = (self.view_start_tick + ticks).max(0);
    }

    /// Ticks visible in a track area `width` pixels wide.
    pub fn visible_ticks(&self, width: f32) -> i32 {
        (width / self.zoom).ceil() as i32
    }

    /// Scrolls just enough to keep `tick` on screen.
    pub fn follow(&mut self, tick: i32, width: f32) {
        let visible = self.visible_ticks(width).max(1);
        if tick < self.view_start_tick {
            self.view_start_tick = tick.max(0);
        } else if tick >= self.view_start_tick + visible {
            self.view_start_tick = (tick - visible + visible / 8).max(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_and_screen_x_are_inverse() {
        let view = ViewTransform {
            zoom: 2.5,
            view_start_tick: 40,
            track_height: 60.0,
        };
        let x = view.tick_to_screen_x(100, 120.0);
        assert_eq!(x, 120.0 + 60.0 * 2.5);
        assert_eq!(view.screen_x_to_tick(x, 120.0), 100);
        assert_eq!(view.screen_x_to_tick(120.0, 120.0), 40);
    }

    #[test]
    fn test_track_index_bounds() {
        let view = ViewTransform::default();
        assert_eq!(view.screen_y_to_track_index(30.0, 30.0, 0.0, 3), Some(0));
        assert_eq!(view.screen_y_to_track_index(150.0, 30.0, 0.0, 3), Some(2));
        assert_eq!(view.screen_y_to_track_index(210.0, 30.0, 0.0, 3), None);
        assert_eq!(view.screen_y_to_track_index(10.0, 30.0, 0.0, 3), None);
        assert_eq!(view.screen_y_to_track_index(10.0, 30.0, 60.0, 3), Some(0));
    }

    #[test]
    fn test_zoom_is_clamped_and_anchored() {
        let mut view = ViewTransform {
            zoom: 1.0,
            view_start_tick: 100,
            track_height: 60.0,
        };
        let under = view.screen_x_to_tick(300.0, 0.0);
        view.zoom_at(2.0, 300.0, 0.0);
        assert_eq!(view.zoom, 2.0);
        assert_eq!(view.screen_x_to_tick(300.0, 0.0), under);

        view.zoom_at(1000.0, 300.0, 0.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.zoom_at(0.0, 300.0, 0.0);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_pan_never_goes_negative() {
        let mut view = ViewTransform::default();
        view.pan_pixels(400.0);
        assert_eq!(view.view_start_tick, 0);
        view.pan_pixels(-400.0);
        assert_eq!(view.view_start_tick, 100);
    }

    #[test]
    fn test_follow_keeps_playhead_visible() {
        let mut view = ViewTransform::default();
        view.follow(500, 400.0);
        assert!(view.view_start_tick <= 500);
        assert!(500 < view.view_start_tick + view.visible_ticks(400.0));
        view.follow(3, 400.0);
        assert_eq!(view.view_start_tick, 3);
    }
}
