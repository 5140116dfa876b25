//! Level streaming and the frame loop
//!
//! A level owns the arena, the collision grid, the bullet pools and three
//! update layers (enemies, player, bullets). Content is authored across the
//! whole level width but only lives near the camera: a backlog ordered by x
//! releases entities as the camera approaches, and a cull pass retires
//! enemies left behind.
//!
//! Every frame runs the same fixed pass order: camera, spawn, cull, grid
//! rebuild, update, removal, addition. Entities activated mid-frame join
//! their layer at the addition pass and first update the following frame.

pub mod descriptor;
pub mod factory;

pub use descriptor::{LevelDescriptor, LevelError};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::path::Path;

use macroquad::math::Rect;

use crate::behaviour::UpdateCtx;
use crate::consts::{
    COLLISION_CELL_WIDTH, PIXELS_ZOOM, PLAYER_SPEED, STREAMING_MARGIN, WINDOW_HEIGHT, WINDOW_WIDTH,
};
use crate::entity::{Arena, Entity, EntityId, RemovalPolicy};
use crate::grid::CollisionGrid;
use crate::pool::PoolRegistry;
use crate::services::{AssetStore, DrawRequest, KeyStatus, SpriteBatch, SpriteSheet};

/// Update layers, in update order. Enemies act first, then the player, then
/// bullets resolve against the state both have settled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Enemies,
    Player,
    Bullets,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Enemies, Layer::Player, Layer::Bullets];

    fn index(self) -> usize {
        match self {
            Layer::Enemies => 0,
            Layer::Player => 1,
            Layer::Bullets => 2,
        }
    }
}

/// Streaming and viewport tuning. Defaults come from the shipped window
/// geometry; tests shrink them to taste.
#[derive(Debug, Clone)]
pub struct LevelConfig {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub streaming_margin: f32,
    pub cell_width: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            viewport_width: WINDOW_WIDTH,
            viewport_height: WINDOW_HEIGHT,
            streaming_margin: STREAMING_MARGIN,
            cell_width: COLLISION_CELL_WIDTH,
        }
    }
}

/// Backlog entry: an entity waiting at `x` for the camera.
struct SpawnEntry {
    x: f32,
    id: EntityId,
    layer: Layer,
}

impl PartialEq for SpawnEntry {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.id == other.id
    }
}

impl Eq for SpawnEntry {}

impl PartialOrd for SpawnEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpawnEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.x.total_cmp(&other.x).then(self.id.cmp(&other.id))
    }
}

pub struct Level {
    config: LevelConfig,
    pub camera_x: f32,
    level_width: f32,
    arena: Arena,
    grid: CollisionGrid,
    pools: PoolRegistry,
    layers: [Vec<EntityId>; 3],
    backlog: BinaryHeap<Reverse<SpawnEntry>>,
    pending: VecDeque<(EntityId, Layer)>,
    player: Option<EntityId>,
    background: Option<SpriteSheet>,
    initialized: bool,
}

impl Level {
    /// An empty, ready-to-run level of the given width.
    pub fn new(level_width: f32, config: LevelConfig) -> Self {
        let grid = CollisionGrid::new(config.cell_width, level_width);
        Self {
            config,
            camera_x: 0.0,
            level_width,
            arena: Arena::new(),
            grid,
            pools: PoolRegistry::empty(),
            layers: [Vec::new(), Vec::new(), Vec::new()],
            backlog: BinaryHeap::new(),
            pending: VecDeque::new(),
            player: None,
            background: None,
            initialized: false,
        }
    }

    /// The level a failed load produces: no entities, camera at zero, update
    /// is a no-op.
    fn unloaded(config: LevelConfig) -> Self {
        Self::new(0.0, config)
    }

    /// Load `folder/level.ron` and build the level it describes. Load and
    /// validation failures are recoverable: they are logged and yield an
    /// unloaded level instead of tearing the game down.
    pub fn create(folder: &Path, assets: &mut dyn AssetStore, config: LevelConfig) -> Level {
        match Self::try_create(folder, assets, config.clone()) {
            Ok(level) => level,
            Err(err) => {
                log::error!("failed to load level from {}: {err}", folder.display());
                Level::unloaded(config)
            }
        }
    }

    pub fn try_create(
        folder: &Path,
        assets: &mut dyn AssetStore,
        config: LevelConfig,
    ) -> Result<Level, LevelError> {
        let desc = descriptor::load(folder)?;
        factory::build_level(&desc, folder, assets, config)
    }

    /// Prime the initial streaming window and start the frame loop.
    pub fn init(&mut self) {
        self.initialized = true;
        self.spawn_pass();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn level_width(&self) -> f32 {
        self.level_width
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn pools_mut(&mut self) -> &mut PoolRegistry {
        &mut self.pools
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn set_player(&mut self, id: EntityId) {
        self.player = Some(id);
    }

    pub fn set_background(&mut self, sheet: SpriteSheet) {
        self.background = Some(sheet);
    }

    pub fn layer(&self, layer: Layer) -> &[EntityId] {
        &self.layers[layer.index()]
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue an entity to spawn when the camera reaches its x. It is not
    /// initialized until then.
    pub fn add_to_backlog(&mut self, entity: Entity, layer: Layer) -> EntityId {
        let x = entity.position().x;
        let id = self.arena.insert(entity);
        self.backlog.push(Reverse(SpawnEntry { x, id, layer }));
        id
    }

    /// Insert, initialize and activate an entity immediately.
    pub fn add_live(&mut self, entity: Entity, layer: Layer) -> EntityId {
        let id = self.arena.insert(entity);
        if !self.initialized {
            self.initialized = true;
        }
        if let Some(e) = self.arena.get_mut(id) {
            e.init();
        }
        self.layers[layer.index()].push(id);
        id
    }

    /// Run one simulated frame. `dt` is zero on paused frames; passes still
    /// run so renderers keep drawing.
    pub fn update(&mut self, input: &KeyStatus, batch: &mut dyn SpriteBatch, dt: f32) {
        if !self.initialized {
            return;
        }
        self.step_camera(dt);
        self.draw_background(batch);
        self.spawn_pass();
        self.cull_pass();
        self.grid
            .rebuild(&self.arena, self.layers.iter().flatten().copied());
        self.update_pass(input, batch, dt);
        self.removal_pass();
        self.addition_pass();
    }

    /// Destroy every entity (pool slots included) and stop the frame loop.
    pub fn destroy(&mut self) {
        let ids: Vec<EntityId> = self.arena.ids().collect();
        for id in ids {
            if let Some(mut entity) = self.arena.remove(id) {
                entity.destroy();
            }
        }
        for layer in &mut self.layers {
            layer.clear();
        }
        self.backlog.clear();
        self.pending.clear();
        self.player = None;
        self.initialized = false;
    }

    // ----- frame passes -------------------------------------------------

    /// The camera follows the player once it crosses the viewport midpoint,
    /// auto-scrolls through the level's end zone, and never moves backward.
    fn step_camera(&mut self, dt: f32) {
        let vw = self.config.viewport_width;
        let max_camera = (self.level_width - vw).max(0.0);
        let player_x = self
            .player
            .and_then(|id| self.arena.get(id))
            .map(|e| e.position().x);
        match player_x {
            Some(px) if px < self.level_width - vw => {
                if px > self.camera_x + vw / 2.0 {
                    self.camera_x = (px - vw / 2.0).min(max_camera);
                }
            }
            _ => {
                let scroll = PLAYER_SPEED * PIXELS_ZOOM * 2.0 * dt;
                self.camera_x = (self.camera_x + scroll).min(max_camera);
            }
        }
    }

    fn draw_background(&self, batch: &mut dyn SpriteBatch) {
        let Some(bg) = self.background else {
            return;
        };
        let src = Rect::new(
            self.camera_x / PIXELS_ZOOM,
            0.0,
            self.config.viewport_width / PIXELS_ZOOM,
            self.config.viewport_height / PIXELS_ZOOM,
        );
        let dst = Rect::new(0.0, 0.0, self.config.viewport_width, self.config.viewport_height);
        batch.draw(&DrawRequest {
            sheet: bg.id,
            src,
            dst,
            mirror: false,
        });
    }

    /// Release backlog entries strictly inside the look-ahead window and
    /// initialize them, exactly once each.
    fn spawn_pass(&mut self) {
        let threshold = self.camera_x + self.config.viewport_width + self.config.streaming_margin;
        while let Some(Reverse(next)) = self.backlog.peek() {
            if next.x >= threshold {
                break;
            }
            let Some(Reverse(entry)) = self.backlog.pop() else {
                break;
            };
            self.layers[entry.layer.index()].push(entry.id);
            if let Some(entity) = self.arena.get_mut(entry.id) {
                entity.init();
            }
        }
    }

    /// Retire enemies that fell behind the camera by more than the margin.
    fn cull_pass(&mut self) {
        let behind = self.camera_x - self.config.streaming_margin;
        let arena = &self.arena;
        let mut destroy_list = Vec::new();
        self.layers[Layer::Enemies.index()].retain(|&id| match arena.get(id) {
            Some(e) if e.position().x >= behind => true,
            Some(e) => {
                if e.core.on_removal == RemovalPolicy::Destroy {
                    destroy_list.push(id);
                }
                false
            }
            None => false,
        });
        for id in destroy_list {
            if let Some(mut entity) = self.arena.remove(id) {
                entity.destroy();
            }
        }
    }

    fn update_pass(&mut self, input: &KeyStatus, batch: &mut dyn SpriteBatch, dt: f32) {
        for layer in Layer::ALL {
            // Snapshot: entities activated during this pass wait for the
            // addition pass, entities removed mid-pass are skipped by lookup.
            let ids = self.layers[layer.index()].clone();
            for id in ids {
                let skip = match self.arena.get(id) {
                    Some(e) => !e.is_enabled() || e.core.is_marked_for_removal(),
                    None => true,
                };
                if skip {
                    continue;
                }
                let Some(mut entity) = self.arena.take(id) else {
                    continue;
                };
                let mut ctx = UpdateCtx {
                    arena: &mut self.arena,
                    grid: &mut self.grid,
                    pools: &mut self.pools,
                    pending: &mut self.pending,
                    input,
                    batch: &mut *batch,
                    camera_x: self.camera_x,
                    level_width: self.level_width,
                    viewport_width: self.config.viewport_width,
                    viewport_height: self.config.viewport_height,
                    streaming_margin: self.config.streaming_margin,
                    player: self.player,
                };
                entity.update(&mut ctx, dt);
                self.arena.put_back(id, entity);
            }
        }
    }

    /// Honor removal marks: drop from layers, then destroy or merely unmark
    /// per the entity's policy.
    fn removal_pass(&mut self) {
        let mut marked = Vec::new();
        for layer in &self.layers {
            for &id in layer {
                let is_marked = self
                    .arena
                    .get(id)
                    .map_or(false, |e| e.core.is_marked_for_removal());
                if is_marked {
                    marked.push(id);
                }
            }
        }
        if marked.is_empty() {
            return;
        }
        for layer in &mut self.layers {
            layer.retain(|id| !marked.contains(id));
        }
        for id in marked {
            let destroy = self
                .arena
                .get(id)
                .map_or(false, |e| e.core.on_removal == RemovalPolicy::Destroy);
            if destroy {
                if let Some(mut entity) = self.arena.remove(id) {
                    entity.destroy();
                }
            } else if let Some(entity) = self.arena.get_mut(id) {
                entity.core.unmark_removal();
            }
        }
    }

    /// Entities activated during the frame join their layer now, so nothing
    /// updates in the same frame it appeared.
    fn addition_pass(&mut self) {
        while let Some((id, layer)) = self.pending.pop_front() {
            if !self.arena.contains(id) {
                continue;
            }
            self.layers[layer.index()].push(id);
        }
    }
}

#[cfg(test)]
impl Level {
    pub(crate) fn test_fire(
        &mut self,
        kind: crate::pool::PoolKind,
        origin: macroquad::math::Vec2,
        velocity: macroquad::math::Vec2,
    ) -> bool {
        let mut batch = crate::services::NullBatch;
        let mut ctx = UpdateCtx {
            arena: &mut self.arena,
            grid: &mut self.grid,
            pools: &mut self.pools,
            pending: &mut self.pending,
            input: &KeyStatus::default(),
            batch: &mut batch,
            camera_x: self.camera_x,
            level_width: self.level_width,
            viewport_width: self.config.viewport_width,
            viewport_height: self.config.viewport_height,
            streaming_margin: self.config.streaming_margin,
            player: self.player,
        };
        ctx.fire_bullet(kind, origin, velocity)
    }

    pub(crate) fn test_deliver(&mut self, to: EntityId, msg: &crate::message::Message) {
        if let Some(entity) = self.arena.get_mut(to) {
            if entity.is_enabled() {
                entity.receive(msg);
            }
        }
    }

    pub(crate) fn install_test_bullet_pool(&mut self, kind: crate::pool::PoolKind, count: usize) {
        use crate::pool::ObjectPool;
        let mut slots = Vec::new();
        for _ in 0..count {
            let id = self
                .arena
                .insert(factory::bullet_entity(kind, crate::services::SpriteSheetId(0)));
            let entity = self.arena.get_mut(id).unwrap();
            entity.init();
            entity.set_enabled(false);
            slots.push(id);
        }
        *self.pools.get_mut(kind) = ObjectPool::create(slots);
    }
}
