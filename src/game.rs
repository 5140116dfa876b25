//! Game shell: fixed timestep, pause, quit
//!
//! The shell turns wall-clock frames into fixed simulation steps. Rendering
//! happens inside the level's update pass, so paused frames still step the
//! level — with a dt of zero, which freezes every clock while renderers keep
//! drawing the frozen frame.

use crate::consts::FIXED_STEP;
use crate::level::Level;
use crate::services::{KeyStatus, SpriteBatch};

/// How many fixed steps one frame may catch up on before dropping time.
const MAX_CATCH_UP_STEPS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Quit,
}

pub struct Game {
    pub level: Option<Level>,
    paused: bool,
    pause_held: bool,
    accumulator: f32,
}

impl Game {
    pub fn new() -> Self {
        Self {
            level: None,
            paused: false,
            pause_held: false,
            accumulator: 0.0,
        }
    }

    pub fn with_level(level: Level) -> Self {
        let mut game = Self::new();
        game.level = Some(level);
        game
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance by one wall-clock frame of `real_dt` seconds, running as many
    /// fixed steps as fit. Escape tears the level down and quits.
    pub fn frame(
        &mut self,
        input: &KeyStatus,
        batch: &mut dyn SpriteBatch,
        real_dt: f32,
    ) -> FrameOutcome {
        if input.esc {
            if let Some(level) = &mut self.level {
                level.destroy();
            }
            return FrameOutcome::Quit;
        }

        // Toggle on the press edge only; holding the key is one toggle.
        if input.pause && !self.pause_held {
            self.paused = !self.paused;
            log::info!("{}", if self.paused { "paused" } else { "unpaused" });
        }
        self.pause_held = input.pause;

        self.accumulator = (self.accumulator + real_dt).min(MAX_CATCH_UP_STEPS * FIXED_STEP);
        while self.accumulator >= FIXED_STEP {
            self.accumulator -= FIXED_STEP;
            let dt = if self.paused { 0.0 } else { FIXED_STEP };
            if let Some(level) = &mut self.level {
                level.update(input, &mut *batch, dt);
            }
        }
        FrameOutcome::Continue
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, RemovalPolicy};
    use crate::level::{Layer, LevelConfig};
    use crate::services::NullBatch;
    use macroquad::math::vec2;

    fn game_with_moving_entity() -> (Game, crate::EntityId) {
        use crate::behaviours::movement::LinearMovement;
        let mut level = crate::level::Level::new(8000.0, LevelConfig::default());
        let entity = Entity::new(vec2(100.0, 100.0), RemovalPolicy::Destroy).with_unit(
            crate::Behaviour::Movement(LinearMovement::new(vec2(60.0, 0.0))),
        );
        let id = level.add_live(entity, Layer::Player);
        (Game::with_level(level), id)
    }

    fn x_of(game: &Game, id: crate::EntityId) -> f32 {
        game.level
            .as_ref()
            .unwrap()
            .arena()
            .get(id)
            .unwrap()
            .position()
            .x
    }

    #[test]
    fn holding_pause_toggles_once() {
        let (mut game, _) = game_with_moving_entity();
        let pause = KeyStatus {
            pause: true,
            ..Default::default()
        };
        for _ in 0..10 {
            game.frame(&pause, &mut NullBatch, FIXED_STEP);
        }
        assert!(game.is_paused());
        // Release, then press again: unpauses.
        game.frame(&KeyStatus::default(), &mut NullBatch, FIXED_STEP);
        game.frame(&pause, &mut NullBatch, FIXED_STEP);
        assert!(!game.is_paused());
    }

    #[test]
    fn paused_frames_freeze_the_simulation() {
        let (mut game, id) = game_with_moving_entity();
        let pause = KeyStatus {
            pause: true,
            ..Default::default()
        };
        game.frame(&pause, &mut NullBatch, FIXED_STEP);
        let frozen_x = x_of(&game, id);
        for _ in 0..30 {
            game.frame(&pause, &mut NullBatch, FIXED_STEP);
        }
        assert_eq!(x_of(&game, id), frozen_x);
    }

    #[test]
    fn fixed_steps_accumulate_fractional_frames() {
        let (mut game, id) = game_with_moving_entity();
        // Two frames of two-thirds of a step each: exactly one step runs.
        game.frame(&KeyStatus::default(), &mut NullBatch, FIXED_STEP * 2.0 / 3.0);
        assert_eq!(x_of(&game, id), 100.0);
        game.frame(&KeyStatus::default(), &mut NullBatch, FIXED_STEP * 2.0 / 3.0);
        assert_eq!(x_of(&game, id), 100.0 + 60.0 * FIXED_STEP);
    }

    #[test]
    fn a_stall_does_not_spiral_the_accumulator() {
        let (mut game, id) = game_with_moving_entity();
        // A two-second stall runs at most the capped number of steps.
        game.frame(&KeyStatus::default(), &mut NullBatch, 2.0);
        let advanced = x_of(&game, id) - 100.0;
        assert!(advanced <= 60.0 * FIXED_STEP * MAX_CATCH_UP_STEPS + 1e-3);
    }

    #[test]
    fn escape_quits_and_tears_down() {
        let (mut game, id) = game_with_moving_entity();
        let esc = KeyStatus {
            esc: true,
            ..Default::default()
        };
        assert_eq!(game.frame(&esc, &mut NullBatch, FIXED_STEP), FrameOutcome::Quit);
        assert!(game.level.as_ref().unwrap().arena().get(id).is_none());
        assert!(!game.level.as_ref().unwrap().is_initialized());
    }
}
