//! Pooled projectile behaviour
//!
//! Bullets never allocate: they are pool slots that cycle between parked
//! (disabled, slot free) and in flight. Leaving play means releasing the
//! slot, marking for removal (the entity's policy is `DoNotDestroy`, so the
//! removal pass only drops it from its layer) and disabling.

use macroquad::math::Vec2;

use crate::behaviour::{BehaviourUnit, UpdateCtx};
use crate::entity::{EntityCore, Units};
use crate::message::Message;
use crate::pool::PoolKind;

pub struct Bullet {
    pool: PoolKind,
    damage: i32,
    velocity: Vec2,
}

impl Bullet {
    pub fn new(pool: PoolKind, damage: i32) -> Self {
        Self {
            pool,
            damage,
            velocity: Vec2::ZERO,
        }
    }

    /// Reset transient flight state on (re)acquisition from the pool.
    pub fn fire(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    fn leave_play(&mut self, core: &mut EntityCore, ctx: &mut UpdateCtx) {
        ctx.pools.get_mut(self.pool).release(core.id());
        core.mark_for_removal();
        core.disable();
    }
}

impl BehaviourUnit for Bullet {
    fn update(&mut self, core: &mut EntityCore, _siblings: &Units, ctx: &mut UpdateCtx, dt: f32) {
        core.position += self.velocity * dt;

        // Expiry follows the level's own viewport and margin, not the global
        // window constants.
        let left = ctx.camera_x - ctx.streaming_margin;
        let right = ctx.camera_x + ctx.viewport_width + ctx.streaming_margin;
        let out_of_window = core.position.x < left
            || core.position.x > right
            || core.position.y < -ctx.streaming_margin
            || core.position.y > ctx.viewport_height + ctx.streaming_margin;
        if out_of_window {
            self.leave_play(core, ctx);
            return;
        }

        // Grid boxes are from the last rebuild; a bullet spends its first
        // frame pending, so by its first update it is registered.
        if let Some(victim) = ctx.grid.first_hit(core.id()) {
            ctx.deliver(victim, &Message::Hit { damage: self.damage });
            self.leave_play(core, ctx);
        }
    }
}
