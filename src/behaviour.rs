//! Behaviour units and the per-frame update context
//!
//! A behaviour unit is one slice of an entity's logic (movement, rendering,
//! shooting, being shot). Units implement [`BehaviourUnit`] and are stored as
//! variants of the closed [`Behaviour`] enum — the simulation knows every
//! kind of unit it can host, which keeps dispatch static and lets siblings
//! find each other by variant.
//!
//! [`UpdateCtx`] is the frame-scoped view a unit gets of the world around its
//! entity: the arena (minus the entity being updated, which is checked out),
//! the collision grid, the bullet pools, input, the sprite batch and camera
//! state. All cross-entity effects flow through it.

use std::collections::VecDeque;

use macroquad::math::Vec2;

use crate::behaviours::animation::AnimationRenderer;
use crate::behaviours::bullet::Bullet;
use crate::behaviours::canon::CanonBehaviour;
use crate::behaviours::collider::BoxCollider;
use crate::behaviours::movement::{Bob, LinearMovement};
use crate::behaviours::pickup::{Pickup, PickupHolder};
use crate::behaviours::player::PlayerControl;
use crate::entity::{Arena, Entity, EntityCore, EntityId, Units};
use crate::grid::CollisionGrid;
use crate::level::Layer;
use crate::message::Message;
use crate::pool::{PoolKind, PoolRegistry};
use crate::services::{KeyStatus, SpriteBatch};

/// Lifecycle hooks every behaviour unit can implement. All default to no-ops
/// so data-only units (colliders) stay empty.
pub trait BehaviourUnit {
    /// Called once when the entity enters play.
    fn init(&mut self, _core: &mut EntityCore, _siblings: &Units) {}

    /// Called every simulated frame while the entity is enabled. `dt` is zero
    /// while the game is paused; renderers still draw on zero-dt frames.
    fn update(&mut self, _core: &mut EntityCore, _siblings: &Units, _ctx: &mut UpdateCtx, _dt: f32) {
    }

    /// Called once when the entity is destroyed.
    fn destroy(&mut self) {}

    /// Called when the entity transitions disabled -> enabled.
    fn on_enabled(&mut self, _core: &mut EntityCore) {}

    /// Called when the entity transitions enabled -> disabled.
    fn on_disabled(&mut self, _core: &mut EntityCore) {}

    /// Synchronous message delivery. Deliberately has no world access: a
    /// receiver records what happened and reacts in its own next update.
    fn receive(&mut self, _core: &mut EntityCore, _siblings: &Units, _msg: &Message) {}
}

/// Every kind of behaviour unit the simulation hosts.
pub enum Behaviour {
    Movement(LinearMovement),
    Bob(Bob),
    Render(AnimationRenderer),
    Collider(BoxCollider),
    Bullet(Bullet),
    PlayerControl(PlayerControl),
    Canon(CanonBehaviour),
    PickupHolder(PickupHolder),
    Pickup(Pickup),
    #[cfg(test)]
    Tap(MessageTap),
}

/// Test-only unit: appends its tag to a shared log on every delivery, so
/// tests can observe who received a message, and in which order.
#[cfg(test)]
pub struct MessageTap {
    pub log: std::rc::Rc<std::cell::RefCell<Vec<u32>>>,
    pub tag: u32,
}

#[cfg(test)]
impl BehaviourUnit for MessageTap {
    fn receive(&mut self, _core: &mut EntityCore, _siblings: &Units, _msg: &Message) {
        self.log.borrow_mut().push(self.tag);
    }
}

impl Behaviour {
    fn unit_mut(&mut self) -> &mut dyn BehaviourUnit {
        match self {
            Behaviour::Movement(u) => u,
            Behaviour::Bob(u) => u,
            Behaviour::Render(u) => u,
            Behaviour::Collider(u) => u,
            Behaviour::Bullet(u) => u,
            Behaviour::PlayerControl(u) => u,
            Behaviour::Canon(u) => u,
            Behaviour::PickupHolder(u) => u,
            Behaviour::Pickup(u) => u,
            #[cfg(test)]
            Behaviour::Tap(u) => u,
        }
    }
}

impl BehaviourUnit for Behaviour {
    fn init(&mut self, core: &mut EntityCore, siblings: &Units) {
        self.unit_mut().init(core, siblings);
    }

    fn update(&mut self, core: &mut EntityCore, siblings: &Units, ctx: &mut UpdateCtx, dt: f32) {
        self.unit_mut().update(core, siblings, ctx, dt);
    }

    fn destroy(&mut self) {
        self.unit_mut().destroy();
    }

    fn on_enabled(&mut self, core: &mut EntityCore) {
        self.unit_mut().on_enabled(core);
    }

    fn on_disabled(&mut self, core: &mut EntityCore) {
        self.unit_mut().on_disabled(core);
    }

    fn receive(&mut self, core: &mut EntityCore, siblings: &Units, msg: &Message) {
        self.unit_mut().receive(core, siblings, msg);
    }
}

/// Frame-scoped world access handed to each unit's update.
///
/// The entity being updated is checked out of `arena`, so looking up one's
/// own id yields `None` — by the same token, messages sent to the entity
/// currently updating are dropped like messages to disabled receivers.
pub struct UpdateCtx<'a> {
    pub arena: &'a mut Arena,
    pub grid: &'a mut CollisionGrid,
    pub pools: &'a mut PoolRegistry,
    /// Entities activated this frame; the level moves them into their layer
    /// at the end of the frame.
    pub pending: &'a mut VecDeque<(EntityId, Layer)>,
    pub input: &'a KeyStatus,
    pub batch: &'a mut dyn SpriteBatch,
    pub camera_x: f32,
    pub level_width: f32,
    /// Viewport and streaming geometry of the level being simulated, not
    /// the global window constants: units must expire and clamp against the
    /// world they actually run in.
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub streaming_margin: f32,
    pub player: Option<EntityId>,
}

impl UpdateCtx<'_> {
    /// Current player position, if the player is alive and not the entity
    /// being updated.
    pub fn player_position(&self) -> Option<Vec2> {
        let id = self.player?;
        self.arena.get(id).map(|e| e.position())
    }

    /// Send `msg` to every receiver registered on `from`, in registration
    /// order. Missing and disabled receivers are skipped silently.
    pub fn send(&mut self, from: &EntityCore, msg: &Message) {
        for i in 0..from.receivers().len() {
            let to = from.receivers()[i];
            self.deliver(to, msg);
        }
    }

    /// Deliver `msg` to one entity, if it exists and is enabled.
    pub fn deliver(&mut self, to: EntityId, msg: &Message) {
        if let Some(entity) = self.arena.get_mut(to) {
            if entity.is_enabled() {
                entity.receive(msg);
            }
        }
    }

    /// Acquire a projectile from `kind`'s pool, aim it and schedule it for
    /// play. Returns false (silently, by design of the fire-rate cap) when
    /// the pool is exhausted.
    pub fn fire_bullet(&mut self, kind: PoolKind, origin: Vec2, velocity: Vec2) -> bool {
        let id = match self.pools.get_mut(kind).acquire() {
            Ok(id) => id,
            Err(_) => {
                log::debug!("{kind:?} pool exhausted, shot dropped");
                return false;
            }
        };
        let Some(entity) = self.arena.get_mut(id) else {
            debug_assert!(false, "pool slot {} missing from arena", id.raw());
            return false;
        };
        entity.core.position = origin;
        if let Some(mut bullet) = entity.units().bullet_mut() {
            bullet.fire(velocity);
        }
        entity.set_enabled(true);
        self.pending.push_back((id, Layer::Bullets));
        true
    }

    /// Insert a freshly built entity into the world. It is initialized now
    /// and joins `layer` at the end of the frame.
    pub fn spawn(&mut self, entity: Entity, layer: Layer) -> EntityId {
        let id = self.arena.insert(entity);
        if let Some(e) = self.arena.get_mut(id) {
            e.init();
        }
        self.pending.push_back((id, layer));
        id
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use macroquad::math::vec2;

    use super::*;
    use crate::entity::RemovalPolicy;
    use crate::services::NullBatch;

    fn tap_entity(log: &Rc<RefCell<Vec<u32>>>, tag: u32) -> Entity {
        Entity::new(vec2(0.0, 0.0), RemovalPolicy::Destroy).with_unit(Behaviour::Tap(MessageTap {
            log: log.clone(),
            tag,
        }))
    }

    #[test]
    fn send_walks_receivers_in_registration_order_and_skips_the_unreachable() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut arena = Arena::new();
        let first = arena.insert(tap_entity(&log, 1));
        let muted = arena.insert(tap_entity(&log, 2));
        let last = arena.insert(tap_entity(&log, 3));
        for id in [first, muted, last] {
            arena.get_mut(id).unwrap().init();
        }
        arena.get_mut(muted).unwrap().set_enabled(false);
        let gone = arena.insert(tap_entity(&log, 4));
        arena.remove(gone);

        let mut sender = Entity::new(vec2(0.0, 0.0), RemovalPolicy::Destroy);
        sender.core.add_receiver(first);
        sender.core.add_receiver(muted);
        sender.core.add_receiver(gone);
        sender.core.add_receiver(last);

        let mut grid = CollisionGrid::new(136.0, 1000.0);
        let mut pools = PoolRegistry::empty();
        let mut pending = VecDeque::new();
        let input = KeyStatus::default();
        let mut batch = NullBatch;
        let mut ctx = UpdateCtx {
            arena: &mut arena,
            grid: &mut grid,
            pools: &mut pools,
            pending: &mut pending,
            input: &input,
            batch: &mut batch,
            camera_x: 0.0,
            level_width: 1000.0,
            viewport_width: 1020.0,
            viewport_height: 896.0,
            streaming_margin: 200.0,
            player: None,
        };
        ctx.send(&sender.core, &Message::Hit { damage: 1 });

        // Disabled and missing receivers are passed over; the rest hear the
        // message in the order they registered.
        assert_eq!(*log.borrow(), vec![1, 3]);
    }
}
