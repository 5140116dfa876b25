//! Entity runtime
//!
//! An entity is a position plus an ordered set of behaviour units. Units are
//! driven through lifecycle calls (init, per-frame update, destroy,
//! enable/disable notifications) in insertion order. Entities live in an
//! [`Arena`] and reference each other by [`EntityId`] — a weak handle that
//! resolves to nothing once the entity is gone.
//!
//! Units are stored in `RefCell`s so that the unit currently being updated
//! can reach its siblings (the animator, the collider) the way the rest of
//! the codebase reaches components: ask for them by capability. The whole
//! simulation is single-threaded, so the only dynamic-borrow hazard would be
//! a unit requesting its own variant, which none do.

use std::cell::{Ref, RefCell, RefMut};

use macroquad::math::Vec2;

use crate::behaviour::{Behaviour, BehaviourUnit, UpdateCtx};
use crate::behaviours::animation::AnimationRenderer;
use crate::behaviours::bullet::Bullet;
use crate::behaviours::collider::BoxCollider;
use crate::message::Message;

/// Unique identity of an entity, monotonically assigned by the arena.
///
/// Doubles as the arena slot index; slots are never reused within a level,
/// so a stale id simply resolves to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }

    /// Placeholder id carried by entities not yet inserted into an arena.
    const UNASSIGNED: EntityId = EntityId(u32::MAX);
}

/// What the removal pass does with a marked entity.
///
/// Pooled entities are `DoNotDestroy`: removal only deactivates them and
/// their own behaviour returns them to pool availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Destroy,
    DoNotDestroy,
}

/// The non-unit state of an entity: identity, position and lifecycle flags.
///
/// Split from [`Entity`] so a behaviour unit can mutate its owner's state
/// while the unit list is borrowed for iteration.
#[derive(Debug)]
pub struct EntityCore {
    id: EntityId,
    pub position: Vec2,
    pub on_removal: RemovalPolicy,
    enabled: bool,
    marked_for_removal: bool,
    destroyed: bool,
    receivers: Vec<EntityId>,
    /// Enable-state change requested mid-pass; hooks fire once the unit
    /// iteration that requested it has finished.
    enable_hook_pending: Option<bool>,
}

impl EntityCore {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.marked_for_removal
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Mark for removal. Takes effect at the next removal pass, never
    /// immediately, so in-flight references stay valid until the frame
    /// boundary.
    pub fn mark_for_removal(&mut self) {
        self.marked_for_removal = true;
    }

    pub(crate) fn unmark_removal(&mut self) {
        self.marked_for_removal = false;
    }

    /// Disable from within a unit pass. Later units are skipped this frame;
    /// disable hooks fire after the pass.
    pub fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            self.enable_hook_pending = Some(false);
        }
    }

    /// Enable from within a unit pass; enable hooks fire after the pass.
    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.enable_hook_pending = Some(true);
        }
    }

    /// Register another entity to receive this entity's messages.
    /// Registration order is delivery order.
    pub fn add_receiver(&mut self, id: EntityId) {
        self.receivers.push(id);
    }

    pub fn receivers(&self) -> &[EntityId] {
        &self.receivers
    }
}

/// Ordered set of behaviour units. Insertion order is initialization and
/// update order.
#[derive(Default)]
pub struct Units(pub(crate) Vec<RefCell<Behaviour>>);

impl Units {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn find_mut<T>(&self, pick: fn(&mut Behaviour) -> Option<&mut T>) -> Option<RefMut<'_, T>> {
        for cell in &self.0 {
            let Ok(unit) = cell.try_borrow_mut() else {
                continue;
            };
            if let Ok(found) = RefMut::filter_map(unit, |u| pick(u)) {
                return Some(found);
            }
        }
        None
    }

    fn find_ref<T>(&self, pick: fn(&Behaviour) -> Option<&T>) -> Option<Ref<'_, T>> {
        for cell in &self.0 {
            let Ok(unit) = cell.try_borrow() else {
                continue;
            };
            if let Ok(found) = Ref::filter_map(unit, |u| pick(u)) {
                return Some(found);
            }
        }
        None
    }

    /// The entity's animation renderer, if any.
    pub fn animator_mut(&self) -> Option<RefMut<'_, AnimationRenderer>> {
        self.find_mut(|u| match u {
            Behaviour::Render(a) => Some(a),
            _ => None,
        })
    }

    /// The entity's box collider, if any.
    pub fn collider_mut(&self) -> Option<RefMut<'_, BoxCollider>> {
        self.find_mut(|u| match u {
            Behaviour::Collider(c) => Some(c),
            _ => None,
        })
    }

    pub fn collider_ref(&self) -> Option<Ref<'_, BoxCollider>> {
        self.find_ref(|u| match u {
            Behaviour::Collider(c) => Some(c),
            _ => None,
        })
    }

    /// The entity's pooled-projectile behaviour, if any.
    pub fn bullet_mut(&self) -> Option<RefMut<'_, Bullet>> {
        self.find_mut(|u| match u {
            Behaviour::Bullet(b) => Some(b),
            _ => None,
        })
    }
}

/// A simulated object: core state plus its owned behaviour units.
pub struct Entity {
    pub core: EntityCore,
    units: Units,
}

impl Entity {
    /// A new, disabled entity at `position`. Id is assigned on arena insert.
    pub fn new(position: Vec2, on_removal: RemovalPolicy) -> Self {
        Self {
            core: EntityCore {
                id: EntityId::UNASSIGNED,
                position,
                on_removal,
                enabled: false,
                marked_for_removal: false,
                destroyed: false,
                receivers: Vec::new(),
                enable_hook_pending: None,
            },
            units: Units::default(),
        }
    }

    /// Builder-style unit attachment, used by the level factory.
    pub fn with_unit(mut self, unit: Behaviour) -> Self {
        self.add_unit(unit);
        self
    }

    pub fn add_unit(&mut self, unit: Behaviour) {
        self.units.0.push(RefCell::new(unit));
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn id(&self) -> EntityId {
        self.core.id
    }

    pub fn position(&self) -> Vec2 {
        self.core.position
    }

    pub fn is_enabled(&self) -> bool {
        self.core.enabled
    }

    /// Initialize every unit in insertion order, then enable the entity.
    /// Called exactly once, at the moment the entity first enters play
    /// (spawn pass or pool construction).
    pub fn init(&mut self) {
        for cell in &self.units.0 {
            cell.borrow_mut().init(&mut self.core, &self.units);
        }
        self.core.enabled = true;
        self.core.enable_hook_pending = None;
        self.flush_enable_hooks();
    }

    /// Update units in insertion order while the entity remains enabled.
    /// A unit disabling the entity mid-pass short-circuits the rest of the
    /// pass for this frame; that is expected, not an error.
    pub fn update(&mut self, ctx: &mut UpdateCtx, dt: f32) {
        for i in 0..self.units.0.len() {
            if !self.core.enabled {
                break;
            }
            let cell = &self.units.0[i];
            cell.borrow_mut().update(&mut self.core, &self.units, ctx, dt);
        }
        self.flush_enable_hooks();
    }

    /// Invoke every unit's destroy hook. Safe to call multiple times; only
    /// the first call has any effect.
    pub fn destroy(&mut self) {
        if self.core.destroyed {
            return;
        }
        self.core.destroyed = true;
        for cell in &self.units.0 {
            cell.borrow_mut().destroy();
        }
    }

    /// Deliver a message to every unit. Callers are expected to have checked
    /// the enabled flag; disabled receivers are skipped at the send site.
    pub fn receive(&mut self, msg: &Message) {
        for cell in &self.units.0 {
            cell.borrow_mut().receive(&mut self.core, &self.units, msg);
        }
        self.flush_enable_hooks();
    }

    /// Flip the enabled flag and notify all units through the dedicated
    /// enable/disable hooks (distinct from update, so units can react to
    /// pausing independently of frame ticks).
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.core.enabled == enabled {
            self.core.enable_hook_pending = None;
            return;
        }
        self.core.enabled = enabled;
        self.core.enable_hook_pending = None;
        self.notify_enable(enabled);
    }

    fn flush_enable_hooks(&mut self) {
        if let Some(enabled) = self.core.enable_hook_pending.take() {
            self.notify_enable(enabled);
        }
    }

    fn notify_enable(&mut self, enabled: bool) {
        for cell in &self.units.0 {
            let mut unit = cell.borrow_mut();
            if enabled {
                unit.on_enabled(&mut self.core);
            } else {
                unit.on_disabled(&mut self.core);
            }
        }
    }
}

/// Slot store owning every entity in a level.
///
/// Behaviour units never own other entities; they hold [`EntityId`]s and go
/// through the arena. `take`/`put_back` check an entity out for its update
/// so its units can reach the rest of the arena through [`UpdateCtx`].
#[derive(Default)]
pub struct Arena {
    slots: Vec<Option<Entity>>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, assigning the next monotonic id.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.slots.len() as u32);
        entity.core.id = id;
        self.slots.push(Some(entity));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.index()).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.index()).and_then(|s| s.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.get(id.index()).map_or(false, |s| s.is_some())
    }

    /// Check an entity out of its slot (for the update pass).
    pub fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.slots.get_mut(id.index()).and_then(|s| s.take())
    }

    /// Return a checked-out entity to its slot.
    pub fn put_back(&mut self, id: EntityId, entity: Entity) {
        debug_assert_eq!(entity.core.id, id);
        if let Some(slot) = self.slots.get_mut(id.index()) {
            debug_assert!(slot.is_none(), "put_back into an occupied slot");
            *slot = Some(entity);
        }
    }

    /// Remove an entity permanently. The slot stays empty.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.take(id)
    }

    pub fn alive_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Ids of every occupied slot.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| EntityId(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviours::movement::LinearMovement;
    use macroquad::math::vec2;

    #[test]
    fn ids_are_monotonic() {
        let mut arena = Arena::new();
        let a = arena.insert(Entity::new(vec2(0.0, 0.0), RemovalPolicy::Destroy));
        let b = arena.insert(Entity::new(vec2(1.0, 0.0), RemovalPolicy::Destroy));
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn stale_id_resolves_to_none() {
        let mut arena = Arena::new();
        let id = arena.insert(Entity::new(vec2(0.0, 0.0), RemovalPolicy::Destroy));
        arena.remove(id);
        assert!(arena.get(id).is_none());
        assert!(!arena.contains(id));
    }

    #[test]
    fn init_runs_units_then_enables() {
        let mut e = Entity::new(vec2(0.0, 0.0), RemovalPolicy::Destroy)
            .with_unit(Behaviour::Movement(LinearMovement::new(vec2(1.0, 0.0))));
        assert!(!e.is_enabled());
        e.init();
        assert!(e.is_enabled());
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut e = Entity::new(vec2(0.0, 0.0), RemovalPolicy::Destroy)
            .with_unit(Behaviour::Movement(LinearMovement::new(vec2(1.0, 0.0))));
        e.init();
        e.destroy();
        assert!(e.core.is_destroyed());
        // Second call must be a no-op, not a panic or a double hook.
        e.destroy();
        assert!(e.core.is_destroyed());
    }

    #[test]
    fn mark_for_removal_is_deferred_state_only() {
        let mut e = Entity::new(vec2(0.0, 0.0), RemovalPolicy::DoNotDestroy);
        e.init();
        e.core.mark_for_removal();
        // Marking alone changes nothing about enablement or destruction.
        assert!(e.is_enabled());
        assert!(!e.core.is_destroyed());
        e.core.unmark_removal();
        assert!(!e.core.is_marked_for_removal());
    }

    #[test]
    fn receivers_keep_registration_order() {
        let mut e = Entity::new(vec2(0.0, 0.0), RemovalPolicy::Destroy);
        e.core.add_receiver(EntityId::from_raw(7));
        e.core.add_receiver(EntityId::from_raw(3));
        let order: Vec<u32> = e.core.receivers().iter().map(|r| r.raw()).collect();
        assert_eq!(order, vec![7, 3]);
    }
}
