//! Object pools for reusable entities
//!
//! Projectiles are allocated once at level creation and cycled through an
//! availability pool instead of being created per shot. Pool capacity is the
//! on-screen cap: when every slot is taken, firing silently does nothing
//! until a slot returns.

use crate::entity::EntityId;

/// No free slot in the pool. Recoverable by design; callers skip the spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolExhausted;

impl std::fmt::Display for PoolExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "object pool exhausted")
    }
}

impl std::error::Error for PoolExhausted {}

/// Which pool a projectile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    PlayerBullets,
    EnemyBullets,
}

/// Fixed-capacity pool over pre-built entities.
///
/// The pool tracks availability only. Resetting a slot's transient state is
/// the acquirer's job (`Bullet::fire`), and slots are returned explicitly by
/// the behaviour that took them out of play.
pub struct ObjectPool {
    slots: Vec<EntityId>,
    available: Vec<bool>,
    free: Vec<usize>,
}

impl ObjectPool {
    /// Wrap pre-built entities into a pool. All slots start free.
    pub fn create(slots: Vec<EntityId>) -> Self {
        let n = slots.len();
        Self {
            slots,
            available: vec![true; n],
            free: (0..n).rev().collect(),
        }
    }

    /// Take a free slot out of the pool.
    pub fn acquire(&mut self) -> Result<EntityId, PoolExhausted> {
        let index = self.free.pop().ok_or(PoolExhausted)?;
        self.available[index] = false;
        Ok(self.slots[index])
    }

    /// Return a slot to the pool. Releasing an id that is not a member, or
    /// one that is already free, is a caller bug.
    pub fn release(&mut self, id: EntityId) {
        let Some(index) = self.slots.iter().position(|&s| s == id) else {
            debug_assert!(false, "release of non-member entity {}", id.raw());
            return;
        };
        if self.available[index] {
            debug_assert!(false, "double release of entity {}", id.raw());
            return;
        }
        self.available[index] = true;
        self.free.push(index);
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains(&id)
    }

    /// Every entity owned by the pool, free or taken. Used at level teardown.
    pub fn slots(&self) -> &[EntityId] {
        &self.slots
    }
}

/// The level's pools, one per [`PoolKind`].
pub struct PoolRegistry {
    player_bullets: ObjectPool,
    enemy_bullets: ObjectPool,
}

impl PoolRegistry {
    pub fn new(player_bullets: ObjectPool, enemy_bullets: ObjectPool) -> Self {
        Self {
            player_bullets,
            enemy_bullets,
        }
    }

    /// Registry with zero-capacity pools, for levels without projectiles.
    pub fn empty() -> Self {
        Self::new(ObjectPool::create(Vec::new()), ObjectPool::create(Vec::new()))
    }

    pub fn get(&self, kind: PoolKind) -> &ObjectPool {
        match kind {
            PoolKind::PlayerBullets => &self.player_bullets,
            PoolKind::EnemyBullets => &self.enemy_bullets,
        }
    }

    pub fn get_mut(&mut self, kind: PoolKind) -> &mut ObjectPool {
        match kind {
            PoolKind::PlayerBullets => &mut self.player_bullets,
            PoolKind::EnemyBullets => &mut self.enemy_bullets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<EntityId> {
        (0..n).map(EntityId::from_raw).collect()
    }

    #[test]
    fn acquire_until_exhausted() {
        let mut pool = ObjectPool::create(ids(3));
        assert_eq!(pool.capacity(), 3);
        for i in 0..3 {
            assert_eq!(pool.active_count(), i);
            assert!(pool.acquire().is_ok());
        }
        assert_eq!(pool.acquire(), Err(PoolExhausted));
        assert_eq!(pool.active_count(), 3);
    }

    #[test]
    fn release_makes_slot_reusable() {
        let mut pool = ObjectPool::create(ids(1));
        let a = pool.acquire().unwrap();
        assert!(pool.acquire().is_err());
        pool.release(a);
        assert_eq!(pool.active_count(), 0);
        let b = pool.acquire().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn full_round_trip_restores_capacity() {
        let mut pool = ObjectPool::create(ids(5));
        let taken: Vec<_> = (0..5).map(|_| pool.acquire().unwrap()).collect();
        for id in taken {
            pool.release(id);
        }
        assert_eq!(pool.active_count(), 0);
        for _ in 0..5 {
            assert!(pool.acquire().is_ok());
        }
    }

    #[test]
    fn empty_pool_is_always_exhausted() {
        let mut pool = ObjectPool::create(Vec::new());
        assert_eq!(pool.acquire(), Err(PoolExhausted));
    }

    #[test]
    fn registry_routes_by_kind() {
        let mut reg = PoolRegistry::new(ObjectPool::create(ids(2)), ObjectPool::create(Vec::new()));
        assert!(reg.get_mut(PoolKind::PlayerBullets).acquire().is_ok());
        assert!(reg.get_mut(PoolKind::EnemyBullets).acquire().is_err());
        assert_eq!(reg.get(PoolKind::PlayerBullets).active_count(), 1);
    }
}
