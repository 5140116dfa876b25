//! Pickup holders and the pickups they release
//!
//! A holder is a destructible container (ground capsule or flying carrier).
//! Shooting it open spawns the pickup itself, which falls to the floor and
//! waits for the player to touch it.

use std::rc::Rc;

use macroquad::math::Vec2;

use crate::behaviour::{BehaviourUnit, UpdateCtx};
use crate::consts::GRAVITY;
use crate::entity::{EntityCore, Units};
use crate::level::factory;
use crate::level::Layer;
use crate::message::{Message, PickupKind};
use crate::services::{Floor, SpriteSheetId};

/// Destructible container carrying one pickup.
pub struct PickupHolder {
    content: PickupKind,
    life: i32,
    dying: bool,
    pickups_sheet: SpriteSheetId,
    floor: Rc<dyn Floor>,
}

impl PickupHolder {
    pub fn new(content: PickupKind, pickups_sheet: SpriteSheetId, floor: Rc<dyn Floor>) -> Self {
        Self {
            content,
            life: 1,
            dying: false,
            pickups_sheet,
            floor,
        }
    }
}

impl BehaviourUnit for PickupHolder {
    fn update(&mut self, core: &mut EntityCore, siblings: &Units, ctx: &mut UpdateCtx, _dt: f32) {
        if self.dying {
            let finished = siblings.animator_mut().map_or(true, |a| a.is_finished());
            if finished {
                core.mark_for_removal();
            }
            return;
        }
        if self.life > 0 {
            return;
        }
        // Shot open: release the pickup and play out the destruction.
        self.dying = true;
        if let Some(mut collider) = siblings.collider_mut() {
            collider.enabled = false;
        }
        if let Some(mut animator) = siblings.animator_mut() {
            animator.play_named("Dying");
        }
        let pickup = factory::pickup_at(
            self.pickups_sheet,
            self.floor.clone(),
            core.position,
            self.content,
        );
        ctx.spawn(pickup, Layer::Enemies);
        ctx.send(core, &Message::Killed { at: core.position });
    }

    fn receive(&mut self, _core: &mut EntityCore, _siblings: &Units, msg: &Message) {
        if let Message::Hit { damage } = msg {
            self.life -= damage;
        }
    }
}

/// The released pickup: falls to the floor, then waits to be collected.
pub struct Pickup {
    kind: PickupKind,
    floor: Rc<dyn Floor>,
    vertical_speed: f32,
    grounded: bool,
}

impl Pickup {
    pub fn new(kind: PickupKind, floor: Rc<dyn Floor>) -> Self {
        Self {
            kind,
            floor,
            vertical_speed: 0.0,
            grounded: false,
        }
    }

    pub fn kind(&self) -> PickupKind {
        self.kind
    }
}

impl BehaviourUnit for Pickup {
    fn update(&mut self, core: &mut EntityCore, _siblings: &Units, ctx: &mut UpdateCtx, dt: f32) {
        if !self.grounded {
            self.vertical_speed += GRAVITY * dt;
            core.position += Vec2::new(0.0, self.vertical_speed * dt);
            let floor_y = self.floor.height_at(core.position.x);
            if core.position.y >= floor_y {
                core.position.y = floor_y;
                self.grounded = true;
            }
        }
        if let Some(player) = ctx.grid.first_hit(core.id()) {
            ctx.deliver(player, &Message::PickupCollected { kind: self.kind });
            core.mark_for_removal();
            core.disable();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviours::collider::BoxCollider;
    use crate::behaviours::player::PlayerControl;
    use crate::entity::{Entity, RemovalPolicy};
    use crate::grid::layers;
    use crate::level::Level;
    use crate::services::{FlatFloor, NullBatch};
    use crate::{Behaviour, EntityId, KeyStatus, LevelConfig};
    use macroquad::math::{vec2, Rect};

    fn player_lives(level: &Level, id: EntityId) -> i32 {
        let entity = level.arena().get(id).unwrap();
        match &*entity.units().0[0].borrow() {
            Behaviour::PlayerControl(p) => p.lives(),
            _ => panic!("player unit first"),
        }
    }

    #[test]
    fn shot_holder_releases_a_collectable_pickup() {
        let floor: Rc<dyn Floor> = Rc::new(FlatFloor(800.0));
        let mut level = Level::new(4000.0, LevelConfig::default());

        let player = Entity::new(vec2(300.0, 800.0), RemovalPolicy::Destroy)
            .with_unit(Behaviour::PlayerControl(PlayerControl::new(floor.clone())))
            .with_unit(Behaviour::Collider(BoxCollider::new(
                Rect::new(-24.0, -132.0, 48.0, 132.0),
                layers::PLAYER,
                layers::NONE,
            )));
        let player_id = level.add_live(player, crate::Layer::Player);
        level.set_player(player_id);
        assert_eq!(player_lives(&level, player_id), 2);

        let holder = factory::covered_pickup_at(
            crate::services::SpriteSheetId(0),
            floor,
            vec2(300.0, 700.0),
            PickupKind::ExtraLife,
        );
        let holder_id = level.add_live(holder, crate::Layer::Enemies);

        level.test_deliver(holder_id, &Message::Hit { damage: 1 });
        for _ in 0..120 {
            level.update(&KeyStatus::default(), &mut NullBatch, 1.0 / 60.0);
        }

        // Holder played out its destruction and left; the pickup was
        // collected by the overlapping player.
        assert!(level.arena().get(holder_id).is_none());
        assert_eq!(player_lives(&level, player_id), 3);
    }
}
