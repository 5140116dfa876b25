//! Sprite-sheet animation renderer
//!
//! Frames are laid out left to right on the sheet starting at the
//! animation's origin. The renderer advances its clock during update and
//! emits exactly one draw request per frame. On zero-dt (paused) frames the
//! clock holds but the draw still happens.

use macroquad::math::Rect;

use crate::behaviour::{BehaviourUnit, UpdateCtx};
use crate::consts::PIXELS_ZOOM;
use crate::entity::{EntityCore, Units};
use crate::services::{DrawRequest, SpriteSheetId};

/// What happens when the clock passes the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Loop,
    StopAndLast,
    StopAndFirst,
    Bounce,
    /// One forward-and-back pass, then hold the first frame.
    BounceAndStop,
    /// One backward pass from the last frame, then hold the first. The
    /// strip's forward playback run in reverse (a shield closing the way it
    /// opened).
    Reverse,
}

/// One named strip of frames on a sprite sheet. Coordinates and sizes are in
/// source pixels; `anchor` is the point drawn at the entity position.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: &'static str,
    pub sheet_x: f32,
    pub sheet_y: f32,
    pub frame_w: f32,
    pub frame_h: f32,
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub frames: usize,
    pub frame_time: f32,
    pub playback: Playback,
}

impl Animation {
    /// Frame index at `time` seconds since the animation (re)started.
    pub fn frame_at(&self, time: f32) -> usize {
        let n = self.frames;
        if n <= 1 {
            return 0;
        }
        let elapsed = (time / self.frame_time) as usize;
        match self.playback {
            Playback::Loop => elapsed % n,
            Playback::StopAndLast => elapsed.min(n - 1),
            Playback::StopAndFirst => {
                if elapsed >= n {
                    0
                } else {
                    elapsed
                }
            }
            Playback::Bounce => {
                let period = 2 * n - 2;
                let k = elapsed % period;
                if k < n {
                    k
                } else {
                    period - k
                }
            }
            Playback::BounceAndStop => {
                if elapsed >= 2 * n - 1 {
                    return 0;
                }
                let k = elapsed;
                if k < n {
                    k
                } else {
                    2 * n - 2 - k
                }
            }
            Playback::Reverse => {
                if elapsed >= n {
                    0
                } else {
                    n - 1 - elapsed
                }
            }
        }
    }

    /// Whether a non-looping animation has run its course at `time`.
    pub fn is_finished(&self, time: f32) -> bool {
        let n = self.frames;
        let elapsed = (time / self.frame_time) as usize;
        match self.playback {
            Playback::Loop | Playback::Bounce => false,
            Playback::StopAndLast | Playback::StopAndFirst | Playback::Reverse => elapsed >= n,
            Playback::BounceAndStop => elapsed >= 2 * n.max(1) - 1,
        }
    }
}

/// Draws the current frame of the selected animation every update.
pub struct AnimationRenderer {
    sheet: SpriteSheetId,
    animations: Vec<Animation>,
    current: usize,
    time: f32,
    playing: bool,
    pub mirror: bool,
}

impl AnimationRenderer {
    pub fn new(sheet: SpriteSheetId) -> Self {
        Self {
            sheet,
            animations: Vec::new(),
            current: 0,
            time: 0.0,
            playing: false,
            mirror: false,
        }
    }

    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.animations.push(animation);
        self
    }

    pub fn add_animation(&mut self, animation: Animation) {
        self.animations.push(animation);
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|a| a.name == name)
    }

    /// Select and play an animation. Selecting the one already playing does
    /// not restart it.
    pub fn play(&mut self, index: usize) {
        if index != self.current {
            self.current = index;
            self.time = 0.0;
        }
        self.playing = true;
    }

    pub fn play_named(&mut self, name: &str) {
        if let Some(index) = self.find(name) {
            self.play(index);
        }
    }

    /// Play from frame zero even if already selected.
    pub fn restart(&mut self, index: usize) {
        self.current = index;
        self.time = 0.0;
        self.playing = true;
    }

    pub fn restart_named(&mut self, name: &str) {
        if let Some(index) = self.find(name) {
            self.restart(index);
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_name(&self) -> Option<&'static str> {
        self.animations.get(self.current).map(|a| a.name)
    }

    /// Whether the selected animation has run its course.
    pub fn is_finished(&self) -> bool {
        self.animations
            .get(self.current)
            .map_or(true, |a| a.is_finished(self.time))
    }
}

impl BehaviourUnit for AnimationRenderer {
    fn update(&mut self, core: &mut EntityCore, _siblings: &Units, ctx: &mut UpdateCtx, dt: f32) {
        if self.playing {
            self.time += dt;
        }
        let Some(animation) = self.animations.get(self.current) else {
            return;
        };
        let frame = animation.frame_at(self.time) as f32;
        let src = Rect::new(
            animation.sheet_x + frame * animation.frame_w,
            animation.sheet_y,
            animation.frame_w,
            animation.frame_h,
        );
        let dst = Rect::new(
            core.position.x - animation.anchor_x * PIXELS_ZOOM - ctx.camera_x,
            core.position.y - animation.anchor_y * PIXELS_ZOOM,
            animation.frame_w * PIXELS_ZOOM,
            animation.frame_h * PIXELS_ZOOM,
        );
        ctx.batch.draw(&DrawRequest {
            sheet: self.sheet,
            src,
            dst,
            mirror: self.mirror,
        });
    }

    // Pooled entities re-enter play through enable; the strip restarts so a
    // recycled bullet doesn't resume mid-animation.
    fn on_enabled(&mut self, _core: &mut EntityCore) {
        self.time = 0.0;
        self.playing = true;
    }

    fn on_disabled(&mut self, _core: &mut EntityCore) {
        self.playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(frames: usize, playback: Playback) -> Animation {
        Animation {
            name: "Test",
            sheet_x: 0.0,
            sheet_y: 0.0,
            frame_w: 16.0,
            frame_h: 16.0,
            anchor_x: 8.0,
            anchor_y: 16.0,
            frames,
            frame_time: 0.1,
            playback,
        }
    }

    #[test]
    fn looping_wraps_around() {
        let a = strip(4, Playback::Loop);
        assert_eq!(a.frame_at(0.0), 0);
        assert_eq!(a.frame_at(0.35), 3);
        assert_eq!(a.frame_at(0.45), 0);
        assert!(!a.is_finished(10.0));
    }

    #[test]
    fn stop_and_last_holds_final_frame() {
        let a = strip(3, Playback::StopAndLast);
        assert_eq!(a.frame_at(0.25), 2);
        assert_eq!(a.frame_at(5.0), 2);
        assert!(!a.is_finished(0.25));
        assert!(a.is_finished(0.31));
    }

    #[test]
    fn stop_and_first_returns_home() {
        let a = strip(3, Playback::StopAndFirst);
        assert_eq!(a.frame_at(0.15), 1);
        assert_eq!(a.frame_at(5.0), 0);
    }

    #[test]
    fn bounce_runs_forward_then_back() {
        let a = strip(3, Playback::Bounce);
        let frames: Vec<usize> = (0..6).map(|i| a.frame_at(i as f32 * 0.1)).collect();
        assert_eq!(frames, vec![0, 1, 2, 1, 0, 1]);
    }

    #[test]
    fn bounce_and_stop_ends_on_first_frame() {
        let a = strip(3, Playback::BounceAndStop);
        let frames: Vec<usize> = (0..6).map(|i| a.frame_at(i as f32 * 0.1)).collect();
        assert_eq!(frames, vec![0, 1, 2, 1, 0, 0]);
        assert!(a.is_finished(0.55));
    }

    #[test]
    fn reverse_plays_backward_then_holds_the_first_frame() {
        let a = strip(4, Playback::Reverse);
        let frames: Vec<usize> = (0..6).map(|i| a.frame_at(i as f32 * 0.1)).collect();
        assert_eq!(frames, vec![3, 2, 1, 0, 0, 0]);
        assert!(!a.is_finished(0.35));
        assert!(a.is_finished(0.41));
    }

    #[test]
    fn play_does_not_restart_the_current_strip() {
        let mut r = AnimationRenderer::new(SpriteSheetId(0))
            .with_animation(strip(4, Playback::Loop));
        r.play(0);
        r.time = 0.25;
        r.play(0);
        assert_eq!(r.time, 0.25);
        r.restart(0);
        assert_eq!(r.time, 0.0);
    }
}
