//! Simple kinematic units

use macroquad::math::Vec2;

use crate::behaviour::{BehaviourUnit, UpdateCtx};
use crate::entity::{EntityCore, Units};

/// Moves the entity at a constant velocity (zoomed pixels per second).
pub struct LinearMovement {
    pub velocity: Vec2,
}

impl LinearMovement {
    pub fn new(velocity: Vec2) -> Self {
        Self { velocity }
    }
}

impl BehaviourUnit for LinearMovement {
    fn update(&mut self, core: &mut EntityCore, _siblings: &Units, _ctx: &mut UpdateCtx, dt: f32) {
        core.position += self.velocity * dt;
    }
}

/// Sinusoidal vertical bobbing around the spawn height. Flying pickup
/// holders combine this with a leftward [`LinearMovement`].
pub struct Bob {
    amplitude: f32,
    frequency: f32,
    time: f32,
    base_y: f32,
}

impl Bob {
    pub fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
            time: 0.0,
            base_y: 0.0,
        }
    }
}

impl BehaviourUnit for Bob {
    fn init(&mut self, core: &mut EntityCore, _siblings: &Units) {
        self.base_y = core.position.y;
    }

    fn update(&mut self, core: &mut EntityCore, _siblings: &Units, _ctx: &mut UpdateCtx, dt: f32) {
        self.time += dt;
        let phase = std::f32::consts::TAU * self.frequency * self.time;
        core.position.y = self.base_y + self.amplitude * phase.sin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, RemovalPolicy};
    use crate::level::Level;
    use crate::services::NullBatch;
    use crate::{Behaviour, KeyStatus, LevelConfig};
    use macroquad::math::vec2;

    #[test]
    fn linear_movement_advances_position() {
        let mut level = Level::new(4000.0, LevelConfig::default());
        let e = Entity::new(vec2(100.0, 50.0), RemovalPolicy::Destroy)
            .with_unit(Behaviour::Movement(LinearMovement::new(vec2(60.0, -30.0))));
        let id = level.add_live(e, crate::Layer::Player);
        level.update(&KeyStatus::default(), &mut NullBatch, 0.5);
        let pos = level.arena().get(id).unwrap().position();
        assert!((pos.x - 130.0).abs() < 1e-3);
        assert!((pos.y - 35.0).abs() < 1e-3);
    }

    #[test]
    fn bob_oscillates_around_spawn_height() {
        let mut level = Level::new(4000.0, LevelConfig::default());
        let e = Entity::new(vec2(0.0, 200.0), RemovalPolicy::Destroy)
            .with_unit(Behaviour::Bob(Bob::new(10.0, 1.0)));
        let id = level.add_live(e, crate::Layer::Player);
        // Quarter period of a 1 Hz bob: peak amplitude.
        level.update(&KeyStatus::default(), &mut NullBatch, 0.25);
        let peak = level.arena().get(id).unwrap().position().y;
        assert!((peak - 210.0).abs() < 1e-3);
        // Another quarter period: back at the base height.
        level.update(&KeyStatus::default(), &mut NullBatch, 0.25);
        let back = level.arena().get(id).unwrap().position().y;
        assert!((back - 200.0).abs() < 1e-3);
    }
}
