//! Spatial collision grid
//!
//! Levels are much wider than tall, so collision space is bucketed along x
//! only. The grid is rebuilt from scratch every frame before any entity
//! updates, which keeps every query within a frame consistent: all boxes are
//! where the previous frame left them, regardless of update order.
//!
//! Layers are bitmask-based and asymmetric: a box declares the layer bit it
//! occupies and, separately, the mask of layers it wants to test against. A
//! player bullet checks the enemy layer without enemies checking bullets
//! back.

use std::collections::HashMap;
use std::ops::Range;

use macroquad::math::Rect;

use crate::entity::{Arena, EntityId};

/// Collision layer bits.
pub mod layers {
    pub const NONE: u8 = 0;
    pub const PLAYER: u8 = 1 << 0;
    pub const PLAYER_BULLETS: u8 = 1 << 1;
    pub const ENEMIES: u8 = 1 << 2;
    pub const ENEMY_BULLETS: u8 = 1 << 3;
}

struct Entry {
    id: EntityId,
    bounds: Rect,
    layer: u8,
    check_mask: u8,
}

/// One frame's collision space.
pub struct CollisionGrid {
    cell_width: f32,
    cells: Vec<Vec<usize>>,
    entries: Vec<Entry>,
    index: HashMap<EntityId, usize>,
    /// Memoized first-hit results, valid until the next rebuild.
    first_hit_cache: HashMap<EntityId, Option<EntityId>>,
}

impl CollisionGrid {
    pub fn new(cell_width: f32, level_width: f32) -> Self {
        debug_assert!(cell_width > 0.0);
        let cell_count = (level_width / cell_width).ceil().max(1.0) as usize;
        Self {
            cell_width,
            cells: (0..cell_count).map(|_| Vec::new()).collect(),
            entries: Vec::new(),
            index: HashMap::new(),
            first_hit_cache: HashMap::new(),
        }
    }

    /// Drop all boxes and cached results.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.entries.clear();
        self.index.clear();
        self.first_hit_cache.clear();
    }

    /// Register one absolute-coordinate box. Boxes with non-positive extent
    /// are rejected: a degenerate box is a construction bug, not a valid
    /// "never collides" encoding.
    pub fn register(&mut self, id: EntityId, bounds: Rect, layer: u8, check_mask: u8) -> bool {
        if bounds.w <= 0.0 || bounds.h <= 0.0 {
            debug_assert!(false, "degenerate collision box for entity {}", id.raw());
            return false;
        }
        let entry_index = self.entries.len();
        for cell in self.cell_range(&bounds) {
            self.cells[cell].push(entry_index);
        }
        self.entries.push(Entry {
            id,
            bounds,
            layer,
            check_mask,
        });
        self.index.insert(id, entry_index);
        true
    }

    /// Rebuild from every live, enabled entity in `ids` that carries an
    /// enabled collider. Called once per frame, before the update pass.
    pub fn rebuild(&mut self, arena: &Arena, ids: impl Iterator<Item = EntityId>) {
        self.clear();
        for id in ids {
            let Some(entity) = arena.get(id) else {
                continue;
            };
            if !entity.is_enabled() {
                continue;
            }
            let Some(collider) = entity.units().collider_ref() else {
                continue;
            };
            if !collider.enabled {
                continue;
            }
            let bounds = collider.bounds_at(entity.position());
            let (layer, mask) = (collider.layer, collider.check_mask);
            drop(collider);
            self.register(id, bounds, layer, mask);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// First overlapping box whose layer is in `id`'s check mask. Memoized:
    /// repeat queries within a frame are map lookups.
    pub fn first_hit(&mut self, id: EntityId) -> Option<EntityId> {
        let Some(&entry_index) = self.index.get(&id) else {
            debug_assert!(false, "collision query for unregistered entity {}", id.raw());
            return None;
        };
        if let Some(&cached) = self.first_hit_cache.get(&id) {
            return cached;
        }
        let hit = self.scan(entry_index).into_iter().next();
        self.first_hit_cache.insert(id, hit);
        hit
    }

    /// Every overlapping box in `id`'s check mask, deduplicated, in cell
    /// order. Not cached.
    pub fn hits(&self, id: EntityId) -> Vec<EntityId> {
        let Some(&entry_index) = self.index.get(&id) else {
            debug_assert!(false, "collision query for unregistered entity {}", id.raw());
            return Vec::new();
        };
        self.scan(entry_index)
    }

    fn scan(&self, entry_index: usize) -> Vec<EntityId> {
        let entry = &self.entries[entry_index];
        let mut found = Vec::new();
        for cell in self.cell_range(&entry.bounds) {
            for &other_index in &self.cells[cell] {
                if other_index == entry_index {
                    continue;
                }
                let other = &self.entries[other_index];
                if other.layer & entry.check_mask == 0 {
                    continue;
                }
                if !entry.bounds.overlaps(&other.bounds) {
                    continue;
                }
                // A wide box sits in several cells; report it once.
                if !found.contains(&other.id) {
                    found.push(other.id);
                }
            }
        }
        found
    }

    fn cell_range(&self, bounds: &Rect) -> Range<usize> {
        let last_cell = self.cells.len() - 1;
        let first = ((bounds.x / self.cell_width).floor().max(0.0) as usize).min(last_cell);
        let last = (((bounds.x + bounds.w) / self.cell_width).floor().max(0.0) as usize)
            .min(last_cell);
        first..last + 1
    }
}
